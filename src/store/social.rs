use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{db::{FollowRequest, FollowRequestRow, FollowStatus, PresenceUser, UserSummary}, AppResult};

const SELECT_REQUEST: &str = "\
    SELECT fr.id, fr.to_id, fr.status, fr.created_at, \
           u.id AS from_id, u.username AS from_username, u.profile_picture AS from_picture \
    FROM follow_requests fr JOIN users u ON u.id = fr.from_id";

/// Adds the directed edge `follower -> followee`. Existing edges are left alone.
pub async fn follow(db_pool: &SqlitePool, follower: Uuid, followee: Uuid) -> AppResult<()> {
    sqlx::query("INSERT OR IGNORE INTO follows (follower_id,followee_id,created_at) VALUES (?,?,?)")
        .bind(follower)
        .bind(followee)
        .bind(OffsetDateTime::now_utc())
        .execute(db_pool)
        .await?;
    Ok(())
}

/// True when edges exist in both directions, as of this query.
pub async fn is_mutual(db_pool: &SqlitePool, a: Uuid, b: Uuid) -> AppResult<bool> {
    if a == b {
        return Ok(false);
    }

    let (edges,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM follows \
         WHERE (follower_id=?1 AND followee_id=?2) OR (follower_id=?2 AND followee_id=?1)",
    )
    .bind(a)
    .bind(b)
    .fetch_one(db_pool)
    .await?;
    Ok(edges == 2)
}

/// Drops the edges in both directions along with any request between the pair.
pub async fn unfollow(db_pool: &SqlitePool, a: Uuid, b: Uuid) -> AppResult<()> {
    let mut tx = db_pool.begin().await?;
    sqlx::query(
        "DELETE FROM follows \
         WHERE (follower_id=?1 AND followee_id=?2) OR (follower_id=?2 AND followee_id=?1)",
    )
    .bind(a)
    .bind(b)
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "DELETE FROM follow_requests \
         WHERE (from_id=?1 AND to_id=?2) OR (from_id=?2 AND to_id=?1)",
    )
    .bind(a)
    .bind(b)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn request_exists(db_pool: &SqlitePool, from: Uuid, to: Uuid) -> AppResult<bool> {
    Ok(sqlx::query("SELECT 1 FROM follow_requests WHERE from_id=? AND to_id=?")
        .bind(from)
        .bind(to)
        .fetch_optional(db_pool)
        .await?
        .is_some())
}

/// Records a pending request. Edges only appear once it is accepted.
pub async fn create_request(db_pool: &SqlitePool, from: Uuid, to: Uuid) -> AppResult<FollowRequest> {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO follow_requests (id,from_id,to_id,status,created_at) VALUES (?,?,?,?,?)")
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(FollowStatus::Pending)
        .bind(OffsetDateTime::now_utc())
        .execute(db_pool)
        .await?;

    find_request(db_pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("follow request {id} vanished after insert").into())
}

pub async fn find_request(db_pool: &SqlitePool, id: Uuid) -> AppResult<Option<FollowRequest>> {
    let row: Option<FollowRequestRow> = sqlx::query_as(&format!("{SELECT_REQUEST} WHERE fr.id=?"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?;
    Ok(row.map(FollowRequest::from))
}

/// Marks the request accepted and links both users in both directions.
pub async fn accept_request(db_pool: &SqlitePool, request: &FollowRequest) -> AppResult<()> {
    let now = OffsetDateTime::now_utc();

    let mut tx = db_pool.begin().await?;
    sqlx::query("UPDATE follow_requests SET status=? WHERE id=?")
        .bind(FollowStatus::Accepted)
        .bind(request.id)
        .execute(&mut *tx)
        .await?;
    for (follower, followee) in [(request.from.id, request.to), (request.to, request.from.id)] {
        sqlx::query("INSERT OR IGNORE INTO follows (follower_id,followee_id,created_at) VALUES (?,?,?)")
            .bind(follower)
            .bind(followee)
            .bind(now)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn pending_for(db_pool: &SqlitePool, to: Uuid) -> AppResult<Vec<FollowRequest>> {
    let rows: Vec<FollowRequestRow> =
        sqlx::query_as(&format!("{SELECT_REQUEST} WHERE fr.to_id=? AND fr.status=? ORDER BY fr.id"))
            .bind(to)
            .bind(FollowStatus::Pending)
            .fetch_all(db_pool)
            .await?;
    Ok(rows.into_iter().map(FollowRequest::from).collect())
}

pub async fn mutuals(db_pool: &SqlitePool, me: Uuid) -> AppResult<Vec<PresenceUser>> {
    Ok(sqlx::query_as(
        "SELECT u.id, u.username, u.email, u.profile_picture, u.is_online, u.last_seen \
         FROM follows out_edge \
         JOIN follows in_edge ON in_edge.follower_id = out_edge.followee_id AND in_edge.followee_id = out_edge.follower_id \
         JOIN users u ON u.id = out_edge.followee_id \
         WHERE out_edge.follower_id=? \
         ORDER BY u.username",
    )
    .bind(me)
    .fetch_all(db_pool)
    .await?)
}

pub async fn followers(db_pool: &SqlitePool, me: Uuid) -> AppResult<Vec<UserSummary>> {
    Ok(sqlx::query_as(
        "SELECT u.id, u.username, u.profile_picture FROM follows f \
         JOIN users u ON u.id = f.follower_id WHERE f.followee_id=? ORDER BY u.username",
    )
    .bind(me)
    .fetch_all(db_pool)
    .await?)
}

pub async fn following(db_pool: &SqlitePool, me: Uuid) -> AppResult<Vec<UserSummary>> {
    Ok(sqlx::query_as(
        "SELECT u.id, u.username, u.profile_picture FROM follows f \
         JOIN users u ON u.id = f.followee_id WHERE f.follower_id=? ORDER BY u.username",
    )
    .bind(me)
    .fetch_all(db_pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, store::users::tests::user};

    #[tokio::test]
    async fn one_way_follow_is_not_mutual() {
        let db_pool = db::memory().await;
        let (alice, bob) = (user(&db_pool, "alice").await, user(&db_pool, "bob").await);

        follow(&db_pool, alice.id, bob.id).await.unwrap();
        assert!(!is_mutual(&db_pool, alice.id, bob.id).await.unwrap());
        assert!(!is_mutual(&db_pool, bob.id, alice.id).await.unwrap());

        follow(&db_pool, bob.id, alice.id).await.unwrap();
        assert!(is_mutual(&db_pool, alice.id, bob.id).await.unwrap());
        assert!(is_mutual(&db_pool, bob.id, alice.id).await.unwrap());
    }

    #[tokio::test]
    async fn accepting_a_request_links_both_ways() {
        let db_pool = db::memory().await;
        let (alice, bob) = (user(&db_pool, "alice").await, user(&db_pool, "bob").await);

        let request = create_request(&db_pool, alice.id, bob.id).await.unwrap();
        assert_eq!(request.status, FollowStatus::Pending);
        assert_eq!(request.from.username, "alice");
        assert!(!is_mutual(&db_pool, alice.id, bob.id).await.unwrap());
        assert_eq!(pending_for(&db_pool, bob.id).await.unwrap().len(), 1);

        accept_request(&db_pool, &request).await.unwrap();
        assert!(is_mutual(&db_pool, alice.id, bob.id).await.unwrap());
        assert!(pending_for(&db_pool, bob.id).await.unwrap().is_empty());

        let bobs = mutuals(&db_pool, bob.id).await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].id, alice.id);
    }

    #[tokio::test]
    async fn unfollow_clears_edges_and_requests() {
        let db_pool = db::memory().await;
        let (alice, bob) = (user(&db_pool, "alice").await, user(&db_pool, "bob").await);

        let request = create_request(&db_pool, alice.id, bob.id).await.unwrap();
        accept_request(&db_pool, &request).await.unwrap();

        unfollow(&db_pool, bob.id, alice.id).await.unwrap();
        assert!(!is_mutual(&db_pool, alice.id, bob.id).await.unwrap());
        assert!(!request_exists(&db_pool, alice.id, bob.id).await.unwrap());
        assert!(followers(&db_pool, bob.id).await.unwrap().is_empty());
        assert!(following(&db_pool, alice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn crossing_requests_are_not_mutual_until_accepted() {
        let db_pool = db::memory().await;
        let (alice, bob) = (user(&db_pool, "alice").await, user(&db_pool, "bob").await);

        let to_bob = create_request(&db_pool, alice.id, bob.id).await.unwrap();
        create_request(&db_pool, bob.id, alice.id).await.unwrap();
        assert!(!is_mutual(&db_pool, alice.id, bob.id).await.unwrap());
        assert!(mutuals(&db_pool, alice.id).await.unwrap().is_empty());
        assert!(following(&db_pool, alice.id).await.unwrap().is_empty());

        accept_request(&db_pool, &to_bob).await.unwrap();
        assert!(is_mutual(&db_pool, alice.id, bob.id).await.unwrap());
        assert_eq!(pending_for(&db_pool, alice.id).await.unwrap().len(), 1);
    }
}
