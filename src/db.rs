use serde::Serialize;
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, FromRow, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AppResult;

pub async fn connect(url: &str, max_connections: u32) -> AppResult<SqlitePool> {
    let options: SqliteConnectOptions = url.parse()?;
    let db_pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options.foreign_keys(true))
        .await?;

    sqlx::migrate!("./migrations").run(&db_pool).await?;
    Ok(db_pool)
}

/// Single-connection in-memory database, schema applied.
#[cfg(test)]
pub(crate) async fn memory() -> SqlitePool {
    connect("sqlite::memory:", 1).await.unwrap()
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub bio: String,
    pub profile_picture: String,
    pub refresh_token: Option<String>,
    pub is_online: bool,
    pub last_seen: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

/// The slice of a user attached to messages and call offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub profile_picture: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub profile_picture: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            bio: user.bio.clone(),
            profile_picture: user.profile_picture.clone(),
        }
    }
}

/// A user together with their presence, as the reconciliation queries return it.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_picture: String,
    pub is_online: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub is_online: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender: UserSummary,
    pub receiver: UserSummary,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
}

/// Flat join row, folded into [`Message`].
#[derive(FromRow)]
pub(crate) struct MessageRow {
    id: Uuid,
    content: String,
    created_at: OffsetDateTime,
    is_read: bool,
    read_at: Option<OffsetDateTime>,

    sender_id: Uuid,
    sender_username: String,
    sender_picture: String,
    receiver_id: Uuid,
    receiver_username: String,
    receiver_picture: String,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            sender: UserSummary {
                id: row.sender_id,
                username: row.sender_username,
                profile_picture: row.sender_picture,
            },
            receiver: UserSummary {
                id: row.receiver_id,
                username: row.receiver_username,
                profile_picture: row.receiver_picture,
            },
            content: row.content,
            created_at: row.created_at,
            is_read: row.is_read,
            read_at: row.read_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum FollowStatus {
    Pending,
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub id: Uuid,
    pub from: UserSummary,
    pub to: Uuid,
    pub status: FollowStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(FromRow)]
pub(crate) struct FollowRequestRow {
    id: Uuid,
    to_id: Uuid,
    status: FollowStatus,
    created_at: OffsetDateTime,

    from_id: Uuid,
    from_username: String,
    from_picture: String,
}

impl From<FollowRequestRow> for FollowRequest {
    fn from(row: FollowRequestRow) -> Self {
        FollowRequest {
            id: row.id,
            from: UserSummary {
                id: row.from_id,
                username: row.from_username,
                profile_picture: row.from_picture,
            },
            to: row.to_id,
            status: row.status,
            created_at: row.created_at,
        }
    }
}
