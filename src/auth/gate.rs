//! Resolves the identity behind a presented credential.
//!
//! Both the socket upgrade and the REST extractor go through [`authenticate`]:
//! a request either comes out with an [`Identity`] or is refused before any
//! per-connection state exists.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{db::{User, UserSummary}, store::users, AppError, AppResult};

use super::Tokens;

/// Authenticated subject, fixed for the lifetime of the connection that presented it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
    pub profile_picture: String,
}

impl Identity {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.user_id,
            username: self.username.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Identity {
            user_id: user.id,
            username: user.username.clone(),
            profile_picture: user.profile_picture.clone(),
        }
    }
}

pub async fn authenticate(db_pool: &SqlitePool, tokens: &Tokens, token: Option<&str>) -> AppResult<Identity> {
    let token = token
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthenticated("Authentication error"))?;
    let user_id = tokens.verify_access(token)?;

    let Some(user) = users::find(db_pool, user_id).await? else {
        return Err(AppError::Unauthenticated("User not found"));
    };
    Ok(Identity::from(&user))
}

pub fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Extractor for routes that need a signed-in caller.
pub struct AuthUser(pub Identity);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
    Tokens: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let db_pool = SqlitePool::from_ref(state);
        let tokens = Tokens::from_ref(state);
        authenticate(&db_pool, &tokens, bearer(&parts.headers))
            .await
            .map(AuthUser)
    }
}
