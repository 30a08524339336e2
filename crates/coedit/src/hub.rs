//! Protocol handler composing the registry, document, and lock table. All
//! three live behind one guard so a lock check and the document mutation it
//! authorizes form a single critical section, and exactly one mutation is in
//! flight at a time. Nothing awaits while the guard is held; outbound frames
//! go onto unbounded channels.
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{
    broadcast::{broadcast_all, broadcast_except},
    ClientMessage, CoeditError, ConnId, ConnectionRegistry, Document, Frame, FrameSender,
    Identity, LineLockManager, LockOutcome, RegisterOutcome, Result, ServerMessage,
};

struct HubState {
    registry: ConnectionRegistry,
    document: Document,
    locks: LineLockManager,
}

pub struct EditorHub {
    state: Mutex<HubState>,
}

impl EditorHub {
    pub fn new(lease: Duration) -> Self {
        Self {
            state: Mutex::new(HubState {
                registry: ConnectionRegistry::new(),
                document: Document::new(),
                locks: LineLockManager::new(lease),
            }),
        }
    }

    /// Admits a connection: registers the identity, announces it, and sends
    /// the newcomer the document snapshot plus the current lock table.
    pub fn connect(&self, identity: &Identity, conn_id: ConnId, tx: FrameSender) -> Result<()> {
        if identity.is_blank() {
            return Err(CoeditError::InvalidIdentity);
        }
        let state = &mut *self.state.lock();
        match state.registry.register(identity.clone(), conn_id, tx.clone()) {
            RegisterOutcome::AlreadyConnected => {
                return Err(CoeditError::AlreadyConnected(identity.clone()));
            }
            RegisterOutcome::Granted => {}
        }
        info!("{identity} connected ({conn_id})");

        broadcast_all(&state.registry, Frame::Notice(format!("{identity} joined")));
        broadcast_all(
            &state.registry,
            Frame::Message(ServerMessage::UserList {
                users: state.registry.identities(),
            }),
        );
        send_to(
            &state.registry,
            identity,
            ServerMessage::Init {
                text: state.document.snapshot(),
            },
        );
        send_to(
            &state.registry,
            identity,
            ServerMessage::LineOwnership {
                ownership: state.locks.ownership(),
            },
        );
        Ok(())
    }

    /// Tears down a connection if it is still the registered one for its
    /// identity, releasing any held line.
    pub fn disconnect(&self, identity: &Identity, conn_id: ConnId) {
        let state = &mut *self.state.lock();
        if !state.registry.unregister(identity, conn_id) {
            return;
        }
        let released = state.locks.release(identity);
        info!("{identity} disconnected ({conn_id})");

        broadcast_all(&state.registry, Frame::Notice(format!("{identity} left")));
        broadcast_all(
            &state.registry,
            Frame::Message(ServerMessage::UserList {
                users: state.registry.identities(),
            }),
        );
        if released.is_some() {
            broadcast_all(&state.registry, ownership_frame(&state.locks));
        }
    }

    /// Parses a raw text payload; anything that is not a known message
    /// degrades to a plain-text echo instead of failing the connection.
    pub fn handle_text(&self, identity: &Identity, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => self.handle_message(identity, msg),
            Err(_) => {
                debug!("{identity} sent an unrecognized payload, echoing");
                let state = self.state.lock();
                if let Some(tx) = state.registry.sender_for(identity) {
                    if tx.send(Frame::Notice(format!("echo: {text}"))).is_err() {
                        warn!("dropping echo for {identity}: channel closed");
                    }
                }
            }
        }
    }

    pub fn handle_message(&self, identity: &Identity, msg: ClientMessage) {
        let now = Instant::now();
        let state = &mut *self.state.lock();
        match msg {
            ClientMessage::RequestLineLock { line } => {
                match state.locks.request(identity, line, now) {
                    LockOutcome::Granted => {
                        debug!("{identity} holds line {line}");
                        send_to(
                            &state.registry,
                            identity,
                            ServerMessage::LineLockGranted { line },
                        );
                        broadcast_all(&state.registry, ownership_frame(&state.locks));
                    }
                    LockOutcome::Denied { owner } => {
                        debug!("line {line} denied for {identity}: held by {owner}");
                        send_to(
                            &state.registry,
                            identity,
                            ServerMessage::LineLockDenied { line, owner },
                        );
                    }
                }
            }

            ClientMessage::ReleaseLineLock => {
                if let Some(line) = state.locks.release(identity) {
                    debug!("{identity} released line {line}");
                    broadcast_all(&state.registry, ownership_frame(&state.locks));
                }
            }

            ClientMessage::Add { position, text } => {
                if !state.document.in_bounds(position, position) {
                    debug!("{identity} add at {position} out of range, dropped");
                    return;
                }
                let line = state.document.line_of_offset(position);
                match state.locks.check_editable(identity, [line], now) {
                    Err((line, owner)) => deny_edit(&state.registry, identity, line, &owner),
                    Ok(()) => {
                        state.document.insert(position, &text);
                        let full_text = state.document.snapshot();
                        broadcast_except(
                            &state.registry,
                            Frame::Message(ServerMessage::Add {
                                position,
                                text,
                                full_text,
                            }),
                            identity,
                        );
                    }
                }
            }

            ClientMessage::Delete { start, end } => {
                if !state.document.in_bounds(start, end) {
                    debug!("{identity} delete {start}..{end} out of range, dropped");
                    return;
                }
                let lines = state.document.touched_lines(start, end);
                match state.locks.check_editable(identity, lines, now) {
                    Err((line, owner)) => deny_edit(&state.registry, identity, line, &owner),
                    Ok(()) => {
                        state.document.delete(start, end);
                        let full_text = state.document.snapshot();
                        broadcast_except(
                            &state.registry,
                            Frame::Message(ServerMessage::Delete {
                                start,
                                end,
                                full_text,
                            }),
                            identity,
                        );
                    }
                }
            }

            ClientMessage::Edit { start, end, text } => {
                if !state.document.in_bounds(start, end) {
                    debug!("{identity} edit {start}..{end} out of range, dropped");
                    return;
                }
                let lines = state.document.touched_lines(start, end);
                match state.locks.check_editable(identity, lines, now) {
                    Err((line, owner)) => deny_edit(&state.registry, identity, line, &owner),
                    Ok(()) => {
                        state.document.replace(start, end, &text);
                        let full_text = state.document.snapshot();
                        broadcast_except(
                            &state.registry,
                            Frame::Message(ServerMessage::Edit {
                                start,
                                end,
                                text,
                                full_text,
                            }),
                            identity,
                        );
                    }
                }
            }

            ClientMessage::Sync => {
                send_to(
                    &state.registry,
                    identity,
                    ServerMessage::Init {
                        text: state.document.snapshot(),
                    },
                );
            }
        }
    }

    /// Force-releases expired leases; returns how many were reclaimed.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let state = &mut *self.state.lock();
        let expired = state.locks.sweep(now);
        if expired.is_empty() {
            return 0;
        }
        for (line, owner) in &expired {
            info!("lease expired on line {line}, held by {owner}");
        }
        broadcast_all(&state.registry, ownership_frame(&state.locks));
        expired.len()
    }

    pub fn snapshot(&self) -> String {
        self.state.lock().document.snapshot()
    }

    /// Replaces the whole document (snapshot load). Line numbering changes
    /// wholesale, so all locks are dropped; everyone gets the new text and
    /// the emptied lock table.
    pub fn load_text(&self, text: String) {
        let state = &mut *self.state.lock();
        state.locks.clear();
        state.document.replace_all(text);
        broadcast_all(
            &state.registry,
            Frame::Message(ServerMessage::Init {
                text: state.document.snapshot(),
            }),
        );
        broadcast_all(&state.registry, ownership_frame(&state.locks));
    }

    pub fn identities(&self) -> Vec<Identity> {
        self.state.lock().registry.identities()
    }

    pub fn ownership(&self) -> BTreeMap<usize, Identity> {
        self.state.lock().locks.ownership()
    }
}

fn ownership_frame(locks: &LineLockManager) -> Frame {
    Frame::Message(ServerMessage::LineOwnership {
        ownership: locks.ownership(),
    })
}

fn send_to(registry: &ConnectionRegistry, identity: &Identity, msg: ServerMessage) {
    if let Some(tx) = registry.sender_for(identity) {
        if tx.send(Frame::Message(msg)).is_err() {
            warn!("dropping reply for {identity}: channel closed");
        }
    }
}

fn deny_edit(registry: &ConnectionRegistry, identity: &Identity, line: usize, owner: &Identity) {
    debug!("edit denied for {identity}: line {line} held by {owner}");
    send_to(
        registry,
        identity,
        ServerMessage::EditDenied {
            reason: format!("line {line} is locked by {owner}"),
            line,
        },
    );
}
