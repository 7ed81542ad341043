use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{store::users, AppError, AppResult, AppState};

use super::{password, AuthResponse, Tokens};

#[derive(Deserialize)]
pub(crate) struct LoginBody {
    email: String,
    password: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    State(tokens): State<Tokens>,
    Json(LoginBody { email, password }): Json<LoginBody>,
) -> AppResult<Json<AuthResponse>> {
    let email = email.trim().to_lowercase();
    let Some(user) = users::find_by_email(&db_pool, &email).await? else {
        return Err(AppError::Unauthenticated("Invalid credentials"));
    };
    if !password::verify(&password, &user.password_hash) {
        return Err(AppError::Unauthenticated("Invalid credentials"));
    }

    let pair = tokens.issue_pair(user.id)?;
    users::set_refresh_token(&db_pool, user.id, Some(&pair.refresh_token)).await?;

    tracing::info!(user_id = %user.id, "welcome back @{}", user.username);
    Ok(Json(AuthResponse::new("Login successful", &user, pair)))
}
