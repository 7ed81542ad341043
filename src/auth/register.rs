use axum::{debug_handler, extract::State, http::StatusCode, Json};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{store::users::{self, NewUser}, AppError, AppResult, AppState};

use super::{password, AuthResponse, Tokens};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterBody {
    username: String,
    email: String,
    password: String,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    profile_picture: String,
}

impl RegisterBody {
    fn validate(self) -> AppResult<RegisterBody> {
        let username = self.username.trim().to_owned();
        let email = self.email.trim().to_lowercase();

        if username.chars().count() < 3 {
            return Err(AppError::BadRequest("Username must be at least 3 characters".into()));
        }
        if !email.contains('@') {
            return Err(AppError::BadRequest("A valid email is required".into()));
        }
        if self.password.chars().count() < 6 {
            return Err(AppError::BadRequest("Password must be at least 6 characters".into()));
        }
        if self.bio.chars().count() > 500 {
            return Err(AppError::BadRequest("Bio must be at most 500 characters".into()));
        }

        Ok(RegisterBody { username, email, ..self })
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    State(tokens): State<Tokens>,
    Json(body): Json<RegisterBody>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let body = body.validate()?;
    let password_hash = password::hash(&body.password)?;

    let user = users::create(&db_pool, NewUser {
        username: &body.username,
        email: &body.email,
        password_hash: &password_hash,
        bio: &body.bio,
        profile_picture: &body.profile_picture,
    })
    .await?;

    let pair = tokens.issue_pair(user.id)?;
    users::set_refresh_token(&db_pool, user.id, Some(&pair.refresh_token)).await?;

    tracing::info!(user_id = %user.id, "registered @{}", user.username);
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new("User registered successfully", &user, pair)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(username: &str, email: &str, password: &str) -> RegisterBody {
        RegisterBody {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            bio: String::new(),
            profile_picture: String::new(),
        }
    }

    #[test]
    fn validate_normalises_and_rejects() {
        let ok = body("  alice ", " Alice@Example.COM", "secret1").validate().unwrap();
        assert_eq!(ok.username, "alice");
        assert_eq!(ok.email, "alice@example.com");

        assert!(body("al", "a@b.c", "secret1").validate().is_err());
        assert!(body("alice", "nope", "secret1").validate().is_err());
        assert!(body("alice", "a@b.c", "short").validate().is_err());
    }
}
