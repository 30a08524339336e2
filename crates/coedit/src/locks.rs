//! Per-line pessimistic locks with lease expiry. At most one owner per line
//! and at most one line per identity; a new grant implicitly releases the
//! identity's previous line. Expired leases are treated as vacant by grant
//! and edit checks, and reclaimed in bulk by the periodic sweep.
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use crate::Identity;

pub const DEFAULT_LEASE: Duration = Duration::from_secs(30);
pub const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct LockEntry {
    owner: Identity,
    acquired_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    Granted,
    Denied { owner: Identity },
}

#[derive(Debug)]
pub struct LineLockManager {
    lease: Duration,
    locks: HashMap<usize, LockEntry>,
}

impl LineLockManager {
    pub fn new(lease: Duration) -> Self {
        Self {
            lease,
            locks: HashMap::new(),
        }
    }

    /// Grants when the line is unlocked, held by an expired lease, or already
    /// held by the requester (which renews the lease timestamp).
    pub fn request(&mut self, identity: &Identity, line: usize, now: Instant) -> LockOutcome {
        if let Some(entry) = self.locks.get(&line) {
            if entry.owner != *identity && !self.is_expired(entry, now) {
                return LockOutcome::Denied {
                    owner: entry.owner.clone(),
                };
            }
        }
        self.release(identity);
        self.locks.insert(
            line,
            LockEntry {
                owner: identity.clone(),
                acquired_at: now,
            },
        );
        LockOutcome::Granted
    }

    /// Drops whatever line the identity holds, returning it.
    pub fn release(&mut self, identity: &Identity) -> Option<usize> {
        let line = self
            .locks
            .iter()
            .find(|(_, entry)| entry.owner == *identity)
            .map(|(line, _)| *line)?;
        self.locks.remove(&line);
        Some(line)
    }

    /// Force-releases every expired lease, returning the released entries.
    /// Collects from a snapshot before mutating.
    pub fn sweep(&mut self, now: Instant) -> Vec<(usize, Identity)> {
        let expired: Vec<(usize, Identity)> = self
            .locks
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(line, entry)| (*line, entry.owner.clone()))
            .collect();
        for (line, _) in &expired {
            self.locks.remove(line);
        }
        expired
    }

    pub fn clear(&mut self) {
        self.locks.clear();
    }

    /// Effective owner of a line; expired leases count as vacant.
    pub fn owner_of(&self, line: usize, now: Instant) -> Option<&Identity> {
        self.locks
            .get(&line)
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| &entry.owner)
    }

    /// Checks that every touched line is vacant or held by the requester.
    /// The first conflicting line and its owner are reported.
    pub fn check_editable(
        &self,
        identity: &Identity,
        lines: impl IntoIterator<Item = usize>,
        now: Instant,
    ) -> std::result::Result<(), (usize, Identity)> {
        for line in lines {
            if let Some(owner) = self.owner_of(line, now) {
                if owner != identity {
                    return Err((line, owner.clone()));
                }
            }
        }
        Ok(())
    }

    /// Current ownership table for broadcast.
    pub fn ownership(&self) -> BTreeMap<usize, Identity> {
        self.locks
            .iter()
            .map(|(line, entry)| (*line, entry.owner.clone()))
            .collect()
    }

    fn is_expired(&self, entry: &LockEntry, now: Instant) -> bool {
        now.duration_since(entry.acquired_at) > self.lease
    }
}

impl Default for LineLockManager {
    fn default() -> Self {
        Self::new(DEFAULT_LEASE)
    }
}
