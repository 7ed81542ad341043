use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{db::{Message, MessageRow}, AppResult};

const SELECT_MESSAGE: &str = "\
    SELECT m.id, m.content, m.created_at, m.is_read, m.read_at, \
           s.id AS sender_id, s.username AS sender_username, s.profile_picture AS sender_picture, \
           r.id AS receiver_id, r.username AS receiver_username, r.profile_picture AS receiver_picture \
    FROM messages m \
    JOIN users s ON s.id = m.sender_id \
    JOIN users r ON r.id = m.receiver_id";

const BETWEEN: &str = "((m.sender_id=?1 AND m.receiver_id=?2) OR (m.sender_id=?2 AND m.receiver_id=?1))";

pub async fn insert(db_pool: &SqlitePool, sender: Uuid, receiver: Uuid, content: &str) -> AppResult<Message> {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO messages (id,sender_id,receiver_id,content,created_at) VALUES (?,?,?,?,?)")
        .bind(id)
        .bind(sender)
        .bind(receiver)
        .bind(content)
        .bind(OffsetDateTime::now_utc())
        .execute(db_pool)
        .await?;

    get(db_pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("message {id} vanished after insert").into())
}

pub async fn get(db_pool: &SqlitePool, id: Uuid) -> AppResult<Option<Message>> {
    let row: Option<MessageRow> = sqlx::query_as(&format!("{SELECT_MESSAGE} WHERE m.id=?"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?;
    Ok(row.map(Message::from))
}

/// One page of the conversation between `a` and `b`, newest page first,
/// each page in chronological order.
pub async fn conversation(db_pool: &SqlitePool, a: Uuid, b: Uuid, page: u32, limit: u32) -> AppResult<Vec<Message>> {
    let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
    let rows: Vec<MessageRow> =
        sqlx::query_as(&format!("{SELECT_MESSAGE} WHERE {BETWEEN} ORDER BY m.id DESC LIMIT ?3 OFFSET ?4"))
            .bind(a)
            .bind(b)
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(db_pool)
            .await?;
    Ok(rows.into_iter().rev().map(Message::from).collect())
}

pub async fn last_between(db_pool: &SqlitePool, a: Uuid, b: Uuid) -> AppResult<Option<Message>> {
    let row: Option<MessageRow> =
        sqlx::query_as(&format!("{SELECT_MESSAGE} WHERE {BETWEEN} ORDER BY m.id DESC LIMIT 1"))
            .bind(a)
            .bind(b)
            .fetch_optional(db_pool)
            .await?;
    Ok(row.map(Message::from))
}

pub async fn unread_from(db_pool: &SqlitePool, sender: Uuid, receiver: Uuid) -> AppResult<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM messages WHERE sender_id=? AND receiver_id=? AND is_read=0")
            .bind(sender)
            .bind(receiver)
            .fetch_one(db_pool)
            .await?;
    Ok(count)
}

/// Ids bound per UPDATE; SQLite caps the number of bind parameters.
const MARK_READ_CHUNK: usize = 500;

/// Read receipt for a batch of ids. Only messages addressed to `reader` that
/// are still unread change; anything else in `ids` is ignored.
pub async fn mark_read(db_pool: &SqlitePool, reader: Uuid, ids: &[Uuid]) -> AppResult<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let read_at = OffsetDateTime::now_utc();
    let mut tx = db_pool.begin().await?;
    let mut affected = 0;
    for chunk in ids.chunks(MARK_READ_CHUNK) {
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE messages SET is_read=1, read_at=");
        query
            .push_bind(read_at)
            .push(" WHERE is_read=0 AND receiver_id=")
            .push_bind(reader)
            .push(" AND id IN (");
        let mut list = query.separated(", ");
        for id in chunk {
            list.push_bind(*id);
        }
        list.push_unseparated(")");

        affected += query.build().execute(&mut *tx).await?.rows_affected();
    }
    tx.commit().await?;

    Ok(affected)
}
