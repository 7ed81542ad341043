use dashmap::DashSet;
use uuid::Uuid;

use super::{events::ServerEvent, registry::SessionRegistry};

/// Transient "is typing" flags keyed by (sender, receiver). Never persisted.
///
/// There is no expiry: a client that vanishes without `typing-stop` keeps its
/// flag until it disconnects.
#[derive(Debug, Default)]
pub struct TypingTracker {
    active: DashSet<(Uuid, Uuid)>,
}

impl TypingTracker {
    pub fn new() -> TypingTracker {
        TypingTracker::default()
    }

    /// Returns whether the flag was newly set. The receiver is told either way.
    pub fn start(&self, registry: &SessionRegistry, sender: Uuid, receiver: Uuid) -> bool {
        let fresh = self.active.insert((sender, receiver));
        if let Some(peer) = registry.resolve(receiver) {
            peer.send(ServerEvent::UserTyping { user_id: sender });
        }
        fresh
    }

    /// Returns whether a flag was cleared. The receiver is told either way.
    pub fn stop(&self, registry: &SessionRegistry, sender: Uuid, receiver: Uuid) -> bool {
        let cleared = self.active.remove(&(sender, receiver)).is_some();
        if let Some(peer) = registry.resolve(receiver) {
            peer.send(ServerEvent::UserStoppedTyping { user_id: sender });
        }
        cleared
    }

    pub fn is_typing(&self, sender: Uuid, receiver: Uuid) -> bool {
        self.active.contains(&(sender, receiver))
    }

    /// Drops every flag `sender` holds and tells each reachable receiver.
    pub fn clear_sender(&self, registry: &SessionRegistry, sender: Uuid) -> Vec<Uuid> {
        let receivers: Vec<Uuid> = self
            .active
            .iter()
            .filter(|pair| pair.0 == sender)
            .map(|pair| pair.1)
            .collect();

        receivers
            .into_iter()
            .filter(|receiver| self.stop(registry, sender, *receiver))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::registry::ConnectionHandle;

    #[test]
    fn repeated_start_is_idempotent() {
        let registry = SessionRegistry::new();
        let typing = TypingTracker::new();
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());

        assert!(typing.start(&registry, alice, bob));
        assert!(!typing.start(&registry, alice, bob));
        assert!(typing.is_typing(alice, bob));
        assert!(!typing.is_typing(bob, alice));

        assert!(typing.stop(&registry, alice, bob));
        assert!(!typing.is_typing(alice, bob));
    }

    #[test]
    fn stop_without_start_is_harmless() {
        let registry = SessionRegistry::new();
        let typing = TypingTracker::new();
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());

        assert!(!typing.stop(&registry, alice, bob));
        assert!(!typing.is_typing(alice, bob));
    }

    #[test]
    fn receiver_hears_start_and_stop() {
        let registry = SessionRegistry::new();
        let typing = TypingTracker::new();
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let (bob_conn, mut bob_rx) = ConnectionHandle::new(bob, 8);
        registry.register(bob_conn);

        typing.start(&registry, alice, bob);
        typing.stop(&registry, alice, bob);
        assert_eq!(bob_rx.try_recv().unwrap(), ServerEvent::UserTyping { user_id: alice });
        assert_eq!(bob_rx.try_recv().unwrap(), ServerEvent::UserStoppedTyping { user_id: alice });
        assert!(bob_rx.try_recv().is_err());
    }

    #[test]
    fn clearing_a_sender_notifies_its_receivers() {
        let registry = SessionRegistry::new();
        let typing = TypingTracker::new();
        let (alice, bob, carol) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        let (bob_conn, mut bob_rx) = ConnectionHandle::new(bob, 8);
        registry.register(bob_conn);

        typing.start(&registry, alice, bob);
        typing.start(&registry, alice, carol);
        typing.start(&registry, carol, bob);
        bob_rx.try_recv().unwrap();
        bob_rx.try_recv().unwrap();

        let mut cleared = typing.clear_sender(&registry, alice);
        cleared.sort();
        let mut expected = vec![bob, carol];
        expected.sort();
        assert_eq!(cleared, expected);

        assert_eq!(bob_rx.try_recv().unwrap(), ServerEvent::UserStoppedTyping { user_id: alice });
        assert!(typing.is_typing(carol, bob));
        assert!(!typing.is_typing(alice, carol));
    }
}
