use axum::{debug_handler, extract::State, Json};
use serde_json::{json, Value};

use crate::realtime::Hub;

#[debug_handler(state = crate::AppState)]
pub async fn health(State(hub): State<Hub>) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "connections": hub.registry().len(),
    }))
}
