use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::AuthUser, store::messages, AppResult, AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MarkReadBody {
    #[serde(default)]
    message_ids: Vec<Uuid>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn mark_read(
    State(db_pool): State<SqlitePool>,
    AuthUser(me): AuthUser,
    Json(MarkReadBody { message_ids }): Json<MarkReadBody>,
) -> AppResult<Json<Value>> {
    let count = messages::mark_read(&db_pool, me.user_id, &message_ids).await?;
    Ok(Json(json!({ "message": "Messages marked as read", "count": count })))
}
