pub mod appresult;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod follow;
pub mod index;
pub mod realtime;
pub mod store;

use axum::{extract::FromRef, routing::get, Router};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use appresult::{AppError, AppResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub tokens: auth::Tokens,
    pub hub: realtime::Hub,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, tokens: auth::Tokens, outbound_queue: usize) -> AppState {
        AppState {
            hub: realtime::Hub::new(db_pool.clone(), outbound_queue),
            db_pool,
            tokens,
        }
    }
}

pub fn app(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(index::health))
        .merge(realtime::router())
        .nest("/api/auth", auth::router())
        .nest("/api/follow", follow::router())
        .nest("/api/chat", chat::router())

        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
