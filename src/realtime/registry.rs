//! Who is reachable right now, and through which connection.

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::events::ServerEvent;

pub type ConnectionId = Uuid;

/// Address of one live socket. Cloning shares the same outbound queue.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    user_id: Uuid,
    outbound: mpsc::Sender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(user_id: Uuid, capacity: usize) -> (ConnectionHandle, mpsc::Receiver<ServerEvent>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let handle = ConnectionHandle {
            id: Uuid::now_v7(),
            user_id,
            outbound,
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Queues `event` without waiting. A full or closed queue drops it.
    pub fn send(&self, event: ServerEvent) -> bool {
        match self.outbound.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(user_id = %self.user_id, connection = %self.id, "outbound queue full, event dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(user_id = %self.user_id, connection = %self.id, "connection gone, event dropped");
                false
            }
        }
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

/// Identity to current connection. At most one entry per identity; the most
/// recent registration wins.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<Uuid, ConnectionHandle>,
}

impl SessionRegistry {
    pub fn new() -> SessionRegistry {
        SessionRegistry::default()
    }

    /// Returns the handle this registration displaced, if any.
    pub fn register(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        self.sessions.insert(handle.user_id, handle)
    }

    pub fn resolve(&self, user_id: Uuid) -> Option<ConnectionHandle> {
        self.sessions.get(&user_id).map(|entry| entry.value().clone())
    }

    /// Removes the mapping only while it still points at `connection`, so a
    /// late disconnect can't evict a newer reconnection.
    pub fn remove(&self, user_id: Uuid, connection: ConnectionId) -> bool {
        self.sessions
            .remove_if(&user_id, |_, current| current.id == connection)
            .is_some()
    }

    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.sessions.contains_key(&user_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
