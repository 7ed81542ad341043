use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{db::{Presence, PublicUser, User, UserSummary}, AppError, AppResult};

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub bio: &'a str,
    pub profile_picture: &'a str,
}

pub async fn create(db_pool: &SqlitePool, new: NewUser<'_>) -> AppResult<User> {
    let taken = sqlx::query("SELECT 1 FROM users WHERE email=? OR username=?")
        .bind(new.email)
        .bind(new.username)
        .fetch_optional(db_pool)
        .await?;
    if taken.is_some() {
        return Err(AppError::Conflict("User already exists".into()));
    }

    let id = Uuid::now_v7();
    let now = OffsetDateTime::now_utc();
    sqlx::query(
        "INSERT INTO users (id,username,email,password_hash,bio,profile_picture,is_online,last_seen,created_at) \
         VALUES (?,?,?,?,?,?,0,?,?)",
    )
    .bind(id)
    .bind(new.username)
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.bio)
    .bind(new.profile_picture)
    .bind(now)
    .bind(now)
    .execute(db_pool)
    .await?;

    find(db_pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {id} vanished after insert").into())
}

pub async fn find(db_pool: &SqlitePool, id: Uuid) -> AppResult<Option<User>> {
    Ok(sqlx::query_as("SELECT * FROM users WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await?)
}

pub async fn find_by_email(db_pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
    Ok(sqlx::query_as("SELECT * FROM users WHERE email=?")
        .bind(email)
        .fetch_optional(db_pool)
        .await?)
}

pub async fn summary(db_pool: &SqlitePool, id: Uuid) -> AppResult<Option<UserSummary>> {
    Ok(sqlx::query_as("SELECT id,username,profile_picture FROM users WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await?)
}

pub async fn set_refresh_token(db_pool: &SqlitePool, id: Uuid, token: Option<&str>) -> AppResult<()> {
    sqlx::query("UPDATE users SET refresh_token=? WHERE id=?")
        .bind(token)
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(())
}

/// Swaps the stored refresh token, but only while it still equals `presented`.
/// Returns false when another refresh or a logout got there first.
pub async fn rotate_refresh_token(db_pool: &SqlitePool, id: Uuid, presented: &str, next: &str) -> AppResult<bool> {
    let result = sqlx::query("UPDATE users SET refresh_token=? WHERE id=? AND refresh_token=?")
        .bind(next)
        .bind(id)
        .bind(presented)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_online(db_pool: &SqlitePool, id: Uuid) -> AppResult<()> {
    sqlx::query("UPDATE users SET is_online=1 WHERE id=?")
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(())
}

pub async fn set_offline(db_pool: &SqlitePool, id: Uuid, last_seen: OffsetDateTime) -> AppResult<()> {
    sqlx::query("UPDATE users SET is_online=0, last_seen=? WHERE id=?")
        .bind(last_seen)
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(())
}

pub async fn presence(db_pool: &SqlitePool, id: Uuid) -> AppResult<Option<Presence>> {
    Ok(sqlx::query_as("SELECT is_online,last_seen FROM users WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await?)
}

/// Case-insensitive substring match on username or email, never including `me`.
pub async fn search(db_pool: &SqlitePool, me: Uuid, query: &str) -> AppResult<Vec<PublicUser>> {
    let pattern = format!("%{}%", escape_like(query));
    Ok(sqlx::query_as(
        "SELECT id,username,email,bio,profile_picture FROM users \
         WHERE id<>?1 AND (username LIKE ?2 ESCAPE '\\' OR email LIKE ?2 ESCAPE '\\') \
         ORDER BY username LIMIT 20",
    )
    .bind(me)
    .bind(pattern)
    .fetch_all(db_pool)
    .await?)
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
