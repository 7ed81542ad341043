mod mutual;
mod requests;
mod search;

use axum::{routing::{delete, get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search::search))
        .route("/request/{user_id}", post(requests::send_request))
        .route("/accept/{request_id}", post(requests::accept_request))
        .route("/requests", get(requests::pending))
        .route("/mutual", get(mutual::mutuals))
        .route("/unfollow/{user_id}", delete(mutual::unfollow))
}
