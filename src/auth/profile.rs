use axum::{debug_handler, extract::State, Json};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{db::{PublicUser, UserSummary}, store::{social, users}, AppError, AppResult, AppState};

use super::AuthUser;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Profile {
    #[serde(flatten)]
    user: PublicUser,
    is_online: bool,
    #[serde(with = "time::serde::rfc3339")]
    last_seen: time::OffsetDateTime,
    followers: Vec<UserSummary>,
    following: Vec<UserSummary>,
}

#[derive(Serialize)]
pub(crate) struct ProfileResponse {
    user: Profile,
}

#[debug_handler(state = AppState)]
pub(crate) async fn profile(
    State(db_pool): State<SqlitePool>,
    AuthUser(me): AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    let Some(user) = users::find(&db_pool, me.user_id).await? else {
        return Err(AppError::NotFound("User not found".into()));
    };

    Ok(Json(ProfileResponse {
        user: Profile {
            user: PublicUser::from(&user),
            is_online: user.is_online,
            last_seen: user.last_seen,
            followers: social::followers(&db_pool, me.user_id).await?,
            following: social::following(&db_pool, me.user_id).await?,
        },
    }))
}
