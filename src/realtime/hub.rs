use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::{auth::Identity, AppResult};

use super::{
    calls,
    events::{ClientEvent, ServerEvent},
    messaging,
    presence::{PresenceBroadcaster, PresenceNotice},
    registry::{ConnectionHandle, ConnectionId, SessionRegistry},
    typing::TypingTracker,
};

/// Everything a freshly registered socket needs to run.
pub struct LiveConnection {
    pub handle: ConnectionHandle,
    pub outbound: mpsc::Receiver<ServerEvent>,
    pub presence: broadcast::Receiver<PresenceNotice>,
}

/// The relay: registry plus the components that route through it.
#[derive(Clone)]
pub struct Hub {
    db_pool: SqlitePool,
    registry: Arc<SessionRegistry>,
    presence: PresenceBroadcaster,
    typing: Arc<TypingTracker>,
    outbound_queue: usize,
}

impl Hub {
    pub fn new(db_pool: SqlitePool, outbound_queue: usize) -> Hub {
        Hub {
            db_pool,
            registry: Arc::new(SessionRegistry::new()),
            presence: PresenceBroadcaster::new(outbound_queue),
            typing: Arc::new(TypingTracker::new()),
            outbound_queue,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    #[cfg(test)]
    pub(crate) fn typing(&self) -> &TypingTracker {
        &self.typing
    }

    /// Registers a new connection for `identity` and announces it online.
    /// Any previous connection for the same identity stops being addressable.
    pub async fn connect(&self, identity: &Identity) -> LiveConnection {
        let (handle, outbound) = ConnectionHandle::new(identity.user_id, self.outbound_queue);
        let presence = self.presence.subscribe();

        if let Some(previous) = self.registry.register(handle.clone()) {
            tracing::info!(user_id = %identity.user_id, previous = %previous.id(), "connection superseded");
        }
        tracing::info!(user_id = %identity.user_id, connection = %handle.id(), "user connected: @{}", identity.username);

        self.presence.online(&self.db_pool, identity.user_id).await;
        LiveConnection { handle, outbound, presence }
    }

    /// Tears down `connection`. A connection that was already superseded leaves
    /// the registry, typing flags and presence alone.
    pub async fn disconnect(&self, identity: &Identity, connection: ConnectionId) {
        if !self.registry.remove(identity.user_id, connection) {
            tracing::debug!(user_id = %identity.user_id, %connection, "stale disconnect ignored");
            return;
        }
        tracing::info!(user_id = %identity.user_id, %connection, "user disconnected: @{}", identity.username);

        self.typing.clear_sender(&self.registry, identity.user_id);
        self.presence.offline(&self.db_pool, &self.registry, identity.user_id).await;
    }

    /// Handles one inbound event. Errors belong to the originator only.
    pub async fn dispatch(&self, identity: &Identity, origin: &ConnectionHandle, event: ClientEvent) -> AppResult<()> {
        let me = identity.user_id;
        match event {
            ClientEvent::SendMessage { receiver_id, content } => {
                messaging::send_message(&self.db_pool, &self.registry, identity, origin, receiver_id, &content).await?;
            }
            ClientEvent::TypingStart { receiver_id } => {
                self.typing.start(&self.registry, me, receiver_id);
            }
            ClientEvent::TypingStop { receiver_id } => {
                self.typing.stop(&self.registry, me, receiver_id);
            }
            ClientEvent::CallUser { to, offer, call_type } => {
                calls::call_user(&self.db_pool, &self.registry, identity, to, offer, call_type).await?;
            }
            ClientEvent::CallAnswer { to, answer } => {
                calls::answer(&self.registry, me, to, answer);
            }
            ClientEvent::IceCandidate { to, candidate } => {
                calls::ice_candidate(&self.registry, me, to, candidate);
            }
            ClientEvent::CallReject { to } => {
                calls::reject(&self.registry, me, to);
            }
            ClientEvent::CallEnd { to } => {
                calls::end(&self.registry, me, to);
            }
        }
        Ok(())
    }

    /// Pushes an out-of-band event to a user's current connection, if any.
    pub fn notify(&self, user_id: Uuid, event: ServerEvent) -> bool {
        self.registry
            .resolve(user_id)
            .is_some_and(|peer| peer.send(event))
    }
}
