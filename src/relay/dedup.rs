//! Bounded set of message identities already accepted by the pipeline.

use courier_core::message::DedupKey;
use std::collections::{HashSet, VecDeque};

/// Insertion-ordered, bounded key set.
///
/// When an insert pushes the size past `capacity`, the oldest half is evicted
/// in one sweep, so the set never holds more than `capacity` keys.
pub(crate) struct DedupCache {
    capacity: usize,
    order: VecDeque<DedupKey>,
    seen: HashSet<DedupKey>,
}

impl DedupCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity + 1),
            seen: HashSet::with_capacity(capacity + 1),
        }
    }

    /// Returns true and marks `key` as seen iff it has not been seen before.
    pub fn should_process(&mut self, key: &DedupKey) -> bool {
        if self.seen.contains(key) {
            return false;
        }
        self.seen.insert(key.clone());
        self.order.push_back(key.clone());
        if self.order.len() > self.capacity {
            self.evict_oldest_half();
        }
        true
    }

    fn evict_oldest_half(&mut self) {
        let count = (self.capacity / 2).max(1);
        for key in self.order.drain(..count) {
            self.seen.remove(&key);
        }
        tracing::debug!(
            "dedup cache evicted {count} oldest keys ({} remain)",
            self.order.len()
        );
    }

    #[cfg(test)]
    pub fn contains(&self, key: &DedupKey) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
