mod history;
mod list;
mod read;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages/{user_id}", get(history::history))
        .route("/mark-read", post(read::mark_read))
        .route("/list", get(list::chat_list))
}
