use sqlx::SqlitePool;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::store::users;

use super::{events::ServerEvent, registry::SessionRegistry};

/// A presence transition, fanned out to every connection except the subject's.
#[derive(Debug, Clone)]
pub struct PresenceNotice {
    pub subject: Uuid,
    pub event: ServerEvent,
}

/// Fire-and-forget online/offline announcements. Subscribers that lag or
/// reconnect miss notices and reconcile through the REST queries.
#[derive(Debug, Clone)]
pub struct PresenceBroadcaster {
    tx: broadcast::Sender<PresenceNotice>,
}

impl PresenceBroadcaster {
    pub fn new(capacity: usize) -> PresenceBroadcaster {
        PresenceBroadcaster {
            tx: broadcast::channel(capacity.max(1)).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PresenceNotice> {
        self.tx.subscribe()
    }

    pub async fn online(&self, db_pool: &SqlitePool, user_id: Uuid) {
        if let Err(err) = users::set_online(db_pool, user_id).await {
            tracing::warn!(%user_id, "could not persist online state: {err}");
        }
        self.announce(user_id, ServerEvent::UserOnline { user_id });
    }

    /// Persists last-seen and announces the departure. Returns `None` without
    /// announcing when the user reconnected while the update was in flight.
    pub async fn offline(&self, db_pool: &SqlitePool, registry: &SessionRegistry, user_id: Uuid) -> Option<OffsetDateTime> {
        let last_seen_at = OffsetDateTime::now_utc();
        if let Err(err) = users::set_offline(db_pool, user_id, last_seen_at).await {
            tracing::warn!(%user_id, "could not persist offline state: {err}");
        }

        if registry.is_online(user_id) {
            if let Err(err) = users::set_online(db_pool, user_id).await {
                tracing::warn!(%user_id, "could not restore online state: {err}");
            }
            return None;
        }

        self.announce(user_id, ServerEvent::UserOffline { user_id, last_seen_at });
        Some(last_seen_at)
    }

    fn announce(&self, subject: Uuid, event: ServerEvent) {
        // no subscribers is not an error
        let _ = self.tx.send(PresenceNotice { subject, event });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, realtime::registry::ConnectionHandle, store::users::tests::user};

    #[tokio::test]
    async fn offline_persists_and_announces() {
        let db_pool = db::memory().await;
        let alice = user(&db_pool, "alice").await;
        let presence = PresenceBroadcaster::new(8);
        let registry = SessionRegistry::new();
        let mut rx = presence.subscribe();

        let connected_at = OffsetDateTime::now_utc();
        presence.online(&db_pool, alice.id).await;
        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.subject, alice.id);
        assert_eq!(notice.event, ServerEvent::UserOnline { user_id: alice.id });

        let seen = presence.offline(&db_pool, &registry, alice.id).await.unwrap();
        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.event, ServerEvent::UserOffline { user_id: alice.id, last_seen_at: seen });

        let state = users::presence(&db_pool, alice.id).await.unwrap().unwrap();
        assert!(!state.is_online);
        assert!(state.last_seen >= connected_at);
    }

    #[tokio::test]
    async fn offline_yields_to_a_reconnect() {
        let db_pool = db::memory().await;
        let alice = user(&db_pool, "alice").await;
        let presence = PresenceBroadcaster::new(8);
        let registry = SessionRegistry::new();
        let mut rx = presence.subscribe();

        let (fresh, _fresh_rx) = ConnectionHandle::new(alice.id, 4);
        registry.register(fresh);

        assert!(presence.offline(&db_pool, &registry, alice.id).await.is_none());
        assert!(rx.try_recv().is_err());
        assert!(users::presence(&db_pool, alice.id).await.unwrap().unwrap().is_online);
    }
}
