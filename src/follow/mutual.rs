use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::AuthUser, db::PresenceUser, store::social, AppResult, AppState};

#[derive(Serialize)]
pub(crate) struct Mutuals {
    users: Vec<PresenceUser>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn mutuals(
    State(db_pool): State<SqlitePool>,
    AuthUser(me): AuthUser,
) -> AppResult<Json<Mutuals>> {
    Ok(Json(Mutuals {
        users: social::mutuals(&db_pool, me.user_id).await?,
    }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn unfollow(
    State(db_pool): State<SqlitePool>,
    AuthUser(me): AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    social::unfollow(&db_pool, me.user_id, user_id).await?;
    Ok(Json(json!({ "message": "Unfollowed successfully" })))
}
