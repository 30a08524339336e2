//! Shared-document collaboration core: one in-memory text document, a
//! per-line lock table with lease expiry, and a registry of connected
//! identities that outbound frames are fanned out to.
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod broadcast;
pub use broadcast::*;

mod document;
pub use document::*;

mod hub;
pub use hub::*;

mod locks;
pub use locks::*;

mod protocol;
pub use protocol::*;

mod registry;
pub use registry::*;

#[derive(Debug, Error)]
pub enum CoeditError {
    #[error("missing or blank identity")]
    InvalidIdentity,

    #[error("identity already connected: {0}")]
    AlreadyConnected(Identity),
}

pub type Result<T> = std::result::Result<T, CoeditError>;

/// Client-chosen name, unique among active connections.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Opaque handle for one open connection. An identity may be rejected while
/// another connection holds it, so registry entries are keyed by identity but
/// guarded by this id on removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnId(pub uuid::Uuid);

impl ConnId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
