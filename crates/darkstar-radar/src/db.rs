//! In-memory contact store using DashMap.

use dashmap::DashMap;

use darkstar_core::trackfile::{Frame, Trackfile};

/// Thread-safe mapping from unit ID to trackfile.
///
/// One writer (the scope event loop) and many readers (the query API).
/// Readers observe each trackfile either before or after a mutation, never
/// torn; snapshots do not hold the shard locks across the caller's work.
#[derive(Default)]
pub struct ContactDatabase {
    contacts: DashMap<u64, Trackfile>,
}

impl ContactDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_by_id(&self, unit_id: u64) -> Option<Trackfile> {
        self.contacts.get(&unit_id).map(|r| r.value().clone())
    }

    /// Insert or replace a trackfile.
    pub fn set(&self, trackfile: Trackfile) {
        self.contacts.insert(trackfile.id(), trackfile);
    }

    /// Append a frame to an existing trackfile in place. Returns false when
    /// no trackfile exists for the unit.
    pub fn update(&self, unit_id: u64, frame: Frame) -> bool {
        match self.contacts.get_mut(&unit_id) {
            Some(mut entry) => {
                entry.append(frame);
                true
            }
            None => false,
        }
    }

    pub fn delete(&self, unit_id: u64) -> Option<Trackfile> {
        self.contacts.remove(&unit_id).map(|(_, tf)| tf)
    }

    /// Drop every trackfile.
    pub fn reset(&self) {
        self.contacts.clear();
    }

    /// Cloned snapshot of every live trackfile. Does not block writers while
    /// the caller iterates.
    pub fn values(&self) -> Vec<Trackfile> {
        self.contacts.iter().map(|r| r.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}
