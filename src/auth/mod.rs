use axum::{routing::{get, post}, Router};
use serde::Serialize;

use crate::{db::{PublicUser, User}, AppState};

pub mod gate;
mod login;
mod logout;
mod password;
mod profile;
mod refresh;
mod register;
pub mod tokens;

pub use gate::{authenticate, AuthUser, Identity};
pub use tokens::Tokens;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthResponse {
    message: &'static str,
    user: PublicUser,
    #[serde(flatten)]
    tokens: tokens::TokenPair,
}

impl AuthResponse {
    fn new(message: &'static str, user: &User, tokens: tokens::TokenPair) -> Self {
        AuthResponse {
            message,
            user: PublicUser::from(user),
            tokens,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register::register))
        .route("/login", post(login::login))
        .route("/refresh-token", post(refresh::refresh_token))
        .route("/logout", post(logout::logout))
        .route("/profile", get(profile::profile))
}
