use axum::{debug_handler, extract::{Path, Query, State}, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::AuthUser, db::Message, store::{messages, social}, AppError, AppResult, AppState};

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Deserialize)]
pub(crate) struct HistoryQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Serialize)]
pub(crate) struct History {
    messages: Vec<Message>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn history(
    State(db_pool): State<SqlitePool>,
    AuthUser(me): AuthUser,
    Path(user_id): Path<Uuid>,
    Query(HistoryQuery { page, limit }): Query<HistoryQuery>,
) -> AppResult<Json<History>> {
    if !social::is_mutual(&db_pool, me.user_id, user_id).await? {
        return Err(AppError::Forbidden("Can only chat with mutual followers".into()));
    }

    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(50).clamp(1, MAX_PAGE_SIZE);
    Ok(Json(History {
        messages: messages::conversation(&db_pool, me.user_id, user_id, page, limit).await?,
    }))
}
