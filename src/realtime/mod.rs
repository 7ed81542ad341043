//! The live layer: who is connected, and relaying chat, typing and call
//! signaling between them.

pub mod calls;
pub mod events;
mod hub;
pub mod messaging;
pub mod presence;
pub mod registry;
pub mod typing;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use events::{CallKind, ClientEvent, ServerEvent};
pub use hub::{Hub, LiveConnection};
pub use registry::{ConnectionHandle, ConnectionId, SessionRegistry};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::connect_ws))
}
