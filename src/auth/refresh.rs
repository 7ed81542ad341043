use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{store::users, AppError, AppResult, AppState};

use super::{tokens::TokenPair, Tokens};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshBody {
    refresh_token: Option<String>,
}

/// Single use: the presented token must be the one last issued, and is replaced.
#[debug_handler(state = AppState)]
pub(crate) async fn refresh_token(
    State(db_pool): State<SqlitePool>,
    State(tokens): State<Tokens>,
    Json(RefreshBody { refresh_token }): Json<RefreshBody>,
) -> AppResult<Json<TokenPair>> {
    let Some(refresh_token) = refresh_token else {
        return Err(AppError::Unauthenticated("Refresh token required"));
    };
    let user_id = tokens.verify_refresh(&refresh_token)?;

    let pair = tokens.issue_pair(user_id)?;
    if !users::rotate_refresh_token(&db_pool, user_id, &refresh_token, &pair.refresh_token).await? {
        return Err(AppError::Unauthenticated("Invalid refresh token"));
    }
    Ok(Json(pair))
}
