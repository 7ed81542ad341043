use axum::{debug_handler, extract::State, Json};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{auth::AuthUser, db::{Message, PresenceUser}, store::{messages, social}, AppResult, AppState};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChatEntry {
    user: PresenceUser,
    last_message: Option<Message>,
    unread_count: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChatList {
    chat_list: Vec<ChatEntry>,
}

/// One entry per mutual follower, most recent conversation first.
#[debug_handler(state = AppState)]
pub(crate) async fn chat_list(
    State(db_pool): State<SqlitePool>,
    AuthUser(me): AuthUser,
) -> AppResult<Json<ChatList>> {
    let mut chat_list = Vec::new();
    for user in social::mutuals(&db_pool, me.user_id).await? {
        let last_message = messages::last_between(&db_pool, me.user_id, user.id).await?;
        let unread_count = messages::unread_from(&db_pool, user.id, me.user_id).await?;
        chat_list.push(ChatEntry { user, last_message, unread_count });
    }

    chat_list.sort_by(|a, b| {
        let a = a.last_message.as_ref().map(|m| m.created_at);
        let b = b.last_message.as_ref().map(|m| m.created_at);
        b.cmp(&a)
    });
    Ok(Json(ChatList { chat_list }))
}
