//! Bounded duplicate suppression for execution ids
//!
//! Remembers the most recent `capacity` distinct keys. Eviction is strict
//! FIFO by first insertion: seeing a key again does not refresh it.

use log::trace;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};

/// Number of distinct ids remembered by default
pub const DEFAULT_CAPACITY: usize = 10_000;

struct DedupState {
    seen: HashSet<String>,
    order: VecDeque<String>,
}

/// Bounded FIFO membership cache
///
/// Shared by reference (usually behind an `Arc`). A single mutex guards both
/// the membership set and the eviction queue so they never disagree.
pub struct DedupCache {
    capacity: usize,
    state: Mutex<DedupState>,
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DedupCache {
    /// Create a cache holding [`DEFAULT_CAPACITY`] ids
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a cache with a custom bound (at least one entry)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(DedupState {
                seen: HashSet::with_capacity(capacity + 1),
                order: VecDeque::with_capacity(capacity + 1),
            }),
        }
    }

    /// Record `key` and report whether it had been seen before.
    ///
    /// An empty key is never a duplicate and is not recorded.
    pub fn is_duplicate(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }

        let mut state = self.state.lock();
        if state.seen.contains(key) {
            return true;
        }

        state.seen.insert(key.to_string());
        state.order.push_back(key.to_string());

        if state.seen.len() > self.capacity
            && let Some(oldest) = state.order.pop_front()
        {
            state.seen.remove(&oldest);
            trace!("Dedup cache full, evicted {}", oldest);
        }

        false
    }

    /// Check membership without recording anything
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().seen.contains(key)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state.lock().seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the remembered keys, oldest first
    pub fn keys(&self) -> Vec<String> {
        self.state.lock().order.iter().cloned().collect()
    }
}
