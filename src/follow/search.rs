use axum::{debug_handler, extract::{Query, State}, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{auth::AuthUser, db::PublicUser, store::users, AppResult, AppState};

#[derive(Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    query: String,
}

#[derive(Serialize)]
pub(crate) struct SearchResults {
    users: Vec<PublicUser>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn search(
    State(db_pool): State<SqlitePool>,
    AuthUser(me): AuthUser,
    Query(SearchQuery { query }): Query<SearchQuery>,
) -> AppResult<Json<SearchResults>> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Json(SearchResults { users: Vec::new() }));
    }

    Ok(Json(SearchResults {
        users: users::search(&db_pool, me.user_id, query).await?,
    }))
}
