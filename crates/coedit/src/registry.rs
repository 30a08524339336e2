//! Identity to connection bijection. Registration is a single test-and-set
//! through the map entry; removal is conditional on the connection id so a
//! rejected duplicate's close cannot clear the live entry.
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;

use crate::{ConnId, Frame, Identity};

pub type FrameSender = UnboundedSender<Frame>;

#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub conn_id: ConnId,
    pub tx: FrameSender,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    Granted,
    AlreadyConnected,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    clients: HashMap<Identity, ClientHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, identity: Identity, conn_id: ConnId, tx: FrameSender) -> RegisterOutcome {
        match self.clients.entry(identity) {
            Entry::Occupied(_) => RegisterOutcome::AlreadyConnected,
            Entry::Vacant(slot) => {
                slot.insert(ClientHandle { conn_id, tx });
                RegisterOutcome::Granted
            }
        }
    }

    /// Removes the entry only when it still belongs to `conn_id`.
    pub fn unregister(&mut self, identity: &Identity, conn_id: ConnId) -> bool {
        match self.clients.get(identity) {
            Some(handle) if handle.conn_id == conn_id => {
                self.clients.remove(identity);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.clients.contains_key(identity)
    }

    pub fn sender_for(&self, identity: &Identity) -> Option<&FrameSender> {
        self.clients.get(identity).map(|handle| &handle.tx)
    }

    /// Sorted snapshot for presence broadcasts.
    pub fn identities(&self) -> Vec<Identity> {
        let mut identities: Vec<Identity> = self.clients.keys().cloned().collect();
        identities.sort();
        identities
    }

    /// Snapshot of senders so delivery never iterates the live map.
    pub fn senders(&self) -> Vec<(Identity, FrameSender)> {
        self.clients
            .iter()
            .map(|(identity, handle)| (identity.clone(), handle.tx.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn sender() -> FrameSender {
        mpsc::unbounded_channel().0
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let mut registry = ConnectionRegistry::new();
        let alice = Identity::from("alice");

        assert_eq!(
            registry.register(alice.clone(), ConnId::new(), sender()),
            RegisterOutcome::Granted
        );
        assert_eq!(
            registry.register(alice.clone(), ConnId::new(), sender()),
            RegisterOutcome::AlreadyConnected
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn stale_unregister_keeps_live_entry() {
        let mut registry = ConnectionRegistry::new();
        let alice = Identity::from("alice");
        let live = ConnId::new();
        let rejected = ConnId::new();

        registry.register(alice.clone(), live, sender());

        // The rejected duplicate closing must not evict the live connection.
        assert!(!registry.unregister(&alice, rejected));
        assert!(registry.contains(&alice));

        assert!(registry.unregister(&alice, live));
        assert!(registry.is_empty());
    }

    #[test]
    fn identities_snapshot_is_sorted() {
        let mut registry = ConnectionRegistry::new();
        for name in ["carol", "alice", "bob"] {
            registry.register(Identity::from(name), ConnId::new(), sender());
        }
        assert_eq!(
            registry.identities(),
            vec![
                Identity::from("alice"),
                Identity::from("bob"),
                Identity::from("carol")
            ]
        );
    }
}
