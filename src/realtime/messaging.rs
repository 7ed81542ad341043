use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::Identity, db::Message, store::{messages, social}, AppError, AppResult};

use super::{events::ServerEvent, registry::{ConnectionHandle, SessionRegistry}};

#[derive(Debug)]
pub struct Delivery {
    pub message: Message,
    /// Whether the receiver was reachable and the event was queued for it.
    pub delivered: bool,
}

/// Persists a direct message and fans it out: an ack on the sender's own
/// connection, and a delivery to the receiver when it is online.
pub async fn send_message(
    db_pool: &SqlitePool,
    registry: &SessionRegistry,
    sender: &Identity,
    origin: &ConnectionHandle,
    receiver_id: Uuid,
    content: &str,
) -> AppResult<Delivery> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Message content is required".into()));
    }

    if !social::is_mutual(db_pool, sender.user_id, receiver_id).await? {
        return Err(AppError::Forbidden("Can only message mutual followers".into()));
    }

    let message = messages::insert(db_pool, sender.user_id, receiver_id, content).await?;

    origin.send(ServerEvent::MessageSent(message.clone()));
    let delivered = match registry.resolve(receiver_id) {
        Some(peer) => peer.send(ServerEvent::ReceiveMessage(message.clone())),
        None => false,
    };

    tracing::debug!(
        sender = %sender.user_id,
        receiver = %receiver_id,
        message = %message.id,
        delivered,
        "message stored",
    );
    Ok(Delivery { message, delivered })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, store::{messages::tests::count_between, users::tests::user}};

    async fn befriend(db_pool: &SqlitePool, a: Uuid, b: Uuid) {
        social::follow(db_pool, a, b).await.unwrap();
        social::follow(db_pool, b, a).await.unwrap();
    }

    #[tokio::test]
    async fn non_mutual_pair_is_rejected_without_a_record() {
        let db_pool = db::memory().await;
        let registry = SessionRegistry::new();
        let (alice, bob) = (user(&db_pool, "alice").await, user(&db_pool, "bob").await);
        social::follow(&db_pool, alice.id, bob.id).await.unwrap();

        let (origin, mut origin_rx) = ConnectionHandle::new(alice.id, 8);
        let (bob_conn, mut bob_rx) = ConnectionHandle::new(bob.id, 8);
        registry.register(origin.clone());
        registry.register(bob_conn);

        let err = send_message(&db_pool, &registry, &Identity::from(&alice), &origin, bob.id, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(count_between(&db_pool, alice.id, bob.id).await, 0);
        assert!(origin_rx.try_recv().is_err());
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn online_receiver_gets_exactly_one_delivery() {
        let db_pool = db::memory().await;
        let registry = SessionRegistry::new();
        let (alice, bob) = (user(&db_pool, "alice").await, user(&db_pool, "bob").await);
        befriend(&db_pool, alice.id, bob.id).await;

        let (origin, mut origin_rx) = ConnectionHandle::new(alice.id, 8);
        let (bob_conn, mut bob_rx) = ConnectionHandle::new(bob.id, 8);
        registry.register(origin.clone());
        registry.register(bob_conn);

        let delivery = send_message(&db_pool, &registry, &Identity::from(&alice), &origin, bob.id, "  hi bob ")
            .await
            .unwrap();
        assert!(delivery.delivered);
        assert_eq!(delivery.message.content, "hi bob");

        assert_eq!(origin_rx.try_recv().unwrap(), ServerEvent::MessageSent(delivery.message.clone()));
        assert!(origin_rx.try_recv().is_err());
        assert_eq!(bob_rx.try_recv().unwrap(), ServerEvent::ReceiveMessage(delivery.message.clone()));
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn offline_receiver_still_gets_a_stored_unread_message() {
        let db_pool = db::memory().await;
        let registry = SessionRegistry::new();
        let (alice, bob) = (user(&db_pool, "alice").await, user(&db_pool, "bob").await);
        befriend(&db_pool, alice.id, bob.id).await;

        let (origin, mut origin_rx) = ConnectionHandle::new(alice.id, 8);
        registry.register(origin.clone());

        let delivery = send_message(&db_pool, &registry, &Identity::from(&alice), &origin, bob.id, "later")
            .await
            .unwrap();
        assert!(!delivery.delivered);
        assert!(matches!(origin_rx.try_recv().unwrap(), ServerEvent::MessageSent(_)));
        assert_eq!(messages::unread_from(&db_pool, alice.id, bob.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn blank_content_is_refused() {
        let db_pool = db::memory().await;
        let registry = SessionRegistry::new();
        let (alice, bob) = (user(&db_pool, "alice").await, user(&db_pool, "bob").await);
        befriend(&db_pool, alice.id, bob.id).await;
        let (origin, _origin_rx) = ConnectionHandle::new(alice.id, 8);

        let err = send_message(&db_pool, &registry, &Identity::from(&alice), &origin, bob.id, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(count_between(&db_pool, alice.id, bob.id).await, 0);
    }
}
