use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    db::FollowRequest,
    realtime::{Hub, ServerEvent},
    store::{social, users},
    AppError, AppResult, AppState,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestSent {
    message: &'static str,
    follow_request: FollowRequest,
}

#[debug_handler(state = AppState)]
pub(crate) async fn send_request(
    State(db_pool): State<SqlitePool>,
    State(hub): State<Hub>,
    AuthUser(me): AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<RequestSent>> {
    if user_id == me.user_id {
        return Err(AppError::BadRequest("Cannot follow yourself".into()));
    }
    if users::find(&db_pool, user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }
    if social::request_exists(&db_pool, me.user_id, user_id).await? {
        return Err(AppError::Conflict("Follow request already sent".into()));
    }

    let follow_request = social::create_request(&db_pool, me.user_id, user_id).await?;
    hub.notify(user_id, ServerEvent::FollowRequestReceived { request: follow_request.clone() });

    tracing::info!(from = %me.user_id, to = %user_id, "follow request sent");
    Ok(Json(RequestSent {
        message: "Follow request sent",
        follow_request,
    }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn accept_request(
    State(db_pool): State<SqlitePool>,
    AuthUser(me): AuthUser,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let request = social::find_request(&db_pool, request_id)
        .await?
        .filter(|request| request.to == me.user_id)
        .ok_or_else(|| AppError::NotFound("Follow request not found".into()))?;

    social::accept_request(&db_pool, &request).await?;
    Ok(Json(json!({ "message": "Follow request accepted" })))
}

#[derive(Serialize)]
pub(crate) struct PendingRequests {
    requests: Vec<FollowRequest>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn pending(
    State(db_pool): State<SqlitePool>,
    AuthUser(me): AuthUser,
) -> AppResult<Json<PendingRequests>> {
    Ok(Json(PendingRequests {
        requests: social::pending_for(&db_pool, me.user_id).await?,
    }))
}
