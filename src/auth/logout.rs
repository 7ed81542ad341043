use axum::{debug_handler, extract::State, Json};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{store::users, AppResult};

use super::AuthUser;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn logout(
    State(db_pool): State<SqlitePool>,
    AuthUser(me): AuthUser,
) -> AppResult<Json<Value>> {
    users::set_refresh_token(&db_pool, me.user_id, None).await?;
    Ok(Json(json!({ "message": "Logout successful" })))
}
