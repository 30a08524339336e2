//! Fan-out of outbound frames over a snapshot of the connection registry.
//! Delivery is best-effort: a closed channel is logged and skipped, never
//! aborting the loop or the operation that triggered the broadcast.
use tracing::warn;

use crate::{ConnectionRegistry, Frame, Identity};

pub fn broadcast_all(registry: &ConnectionRegistry, frame: Frame) {
    deliver(registry, frame, None);
}

pub fn broadcast_except(registry: &ConnectionRegistry, frame: Frame, sender: &Identity) {
    deliver(registry, frame, Some(sender));
}

fn deliver(registry: &ConnectionRegistry, frame: Frame, skip: Option<&Identity>) {
    for (identity, tx) in registry.senders() {
        if skip == Some(&identity) {
            continue;
        }
        if tx.send(frame.clone()).is_err() {
            warn!("dropping frame for {identity}: channel closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConnId, ServerMessage};
    use tokio::sync::mpsc;

    fn registry_with(names: &[&str]) -> (ConnectionRegistry, Vec<mpsc::UnboundedReceiver<Frame>>) {
        let mut registry = ConnectionRegistry::new();
        let mut receivers = Vec::new();
        for name in names {
            let (tx, rx) = mpsc::unbounded_channel();
            registry.register(Identity::from(*name), ConnId::new(), tx);
            receivers.push(rx);
        }
        (registry, receivers)
    }

    #[test]
    fn broadcast_all_reaches_everyone() {
        let (registry, mut receivers) = registry_with(&["alice", "bob"]);
        broadcast_all(&registry, Frame::Notice("hello".into()));
        for rx in &mut receivers {
            assert_eq!(rx.try_recv(), Ok(Frame::Notice("hello".into())));
        }
    }

    #[test]
    fn broadcast_except_skips_the_sender() {
        let (registry, mut receivers) = registry_with(&["alice", "bob"]);
        let frame = Frame::Message(ServerMessage::Init { text: "x".into() });
        broadcast_except(&registry, frame.clone(), &Identity::from("alice"));

        assert!(receivers[0].try_recv().is_err());
        assert_eq!(receivers[1].try_recv(), Ok(frame));
    }

    #[test]
    fn dead_receiver_does_not_block_others() {
        let (registry, mut receivers) = registry_with(&["alice", "bob", "carol"]);
        drop(receivers.remove(1));

        broadcast_all(&registry, Frame::Notice("still here".into()));
        assert_eq!(receivers[0].try_recv(), Ok(Frame::Notice("still here".into())));
        assert_eq!(receivers[1].try_recv(), Ok(Frame::Notice("still here".into())));
    }
}
