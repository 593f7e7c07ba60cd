//! Bounded set of already-delivered event identifiers.
//!
//! The server delivers events at least once: a poll retried after a failure,
//! or a timeline re-sent after a gappy sync, can repeat events the client
//! has already surfaced. [`SeenSet`] remembers the most recent identifiers so
//! repeats are dropped.
//!
//! Eviction is insertion-ordered (FIFO): once the set is full, recording a
//! new identifier forgets the oldest one. An identifier is therefore
//! guaranteed to be recognised until `capacity` newer distinct identifiers
//! have been recorded after it; beyond that it may be delivered again.

use std::collections::{HashSet, VecDeque};
use roomsync_types::EventId;

/// Default number of identifiers remembered.
pub const DEFAULT_SEEN_CAPACITY: usize = 1000;

/// Bounded membership set with FIFO eviction.
///
/// Single-writer: the check and the insert happen in one `&mut self` call.
/// Callers sharing a set between tasks must hold a lock around
/// [`SeenSet::was_seen`].
#[derive(Debug, Clone)]
pub struct SeenSet {
    /// Maximum number of identifiers kept.
    capacity: usize,
    /// Identifiers in insertion order, oldest first.
    order: VecDeque<EventId>,
    /// Membership index over `order`.
    members: HashSet<EventId>,
}

impl SeenSet {
    /// Create a set remembering at most `capacity` identifiers.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
        }
    }

    /// Create a set with [`DEFAULT_SEEN_CAPACITY`].
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_SEEN_CAPACITY)
    }

    /// Report whether `id` was already recorded, recording it if not.
    ///
    /// Returns `true` for a repeat (the caller should drop the event) and
    /// `false` the first time an identifier is seen.
    pub fn was_seen(&mut self, id: &EventId) -> bool {
        if self.members.contains(id) {
            return true;
        }

        while self.order.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.members.remove(&oldest);
                }
                None => break,
            }
        }

        self.order.push_back(id.clone());
        self.members.insert(id.clone());
        false
    }

    /// Check membership without recording.
    pub fn contains(&self, id: &EventId) -> bool {
        self.members.contains(id)
    }

    /// Number of identifiers currently remembered.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Maximum number of identifiers remembered.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}

impl Default for SeenSet {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: usize) -> EventId {
        EventId::new(format!("$event{}", n))
    }

    #[test]
    fn first_sighting_is_not_seen() {
        let mut seen = SeenSet::new(10);
        assert!(!seen.was_seen(&id(1)));
        assert!(seen.contains(&id(1)));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn repeat_is_seen() {
        let mut seen = SeenSet::new(10);
        assert!(!seen.was_seen(&id(1)));
        assert!(seen.was_seen(&id(1)));
        assert!(seen.was_seen(&id(1)));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let mut seen = SeenSet::new(3);
        for n in 0..50 {
            seen.was_seen(&id(n));
            assert!(seen.len() <= seen.capacity());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut seen = SeenSet::new(3);
        seen.was_seen(&id(1));
        seen.was_seen(&id(2));
        seen.was_seen(&id(3));

        // Fourth insert pushes out the first
        seen.was_seen(&id(4));

        assert!(!seen.contains(&id(1)));
        assert!(seen.contains(&id(2)));
        assert!(seen.contains(&id(3)));
        assert!(seen.contains(&id(4)));
    }

    #[test]
    fn repeat_does_not_refresh_position() {
        let mut seen = SeenSet::new(2);
        seen.was_seen(&id(1));
        seen.was_seen(&id(2));
        assert!(seen.was_seen(&id(1))); // still oldest

        seen.was_seen(&id(3));
        assert!(!seen.contains(&id(1)));
        assert!(seen.contains(&id(2)));
    }

    #[test]
    fn remembered_until_capacity_newer_ids() {
        let mut seen = SeenSet::with_default_capacity();
        seen.was_seen(&id(0));

        // 999 newer distinct ids: id(0) still remembered
        for n in 1..DEFAULT_SEEN_CAPACITY {
            assert!(!seen.was_seen(&id(n)));
        }
        assert!(seen.contains(&id(0)));

        // One more evicts it, so it would be delivered again
        seen.was_seen(&id(DEFAULT_SEEN_CAPACITY));
        assert!(!seen.was_seen(&id(0)));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut seen = SeenSet::new(0);
        assert_eq!(seen.capacity(), 1);
        assert!(!seen.was_seen(&id(1)));
        assert!(seen.was_seen(&id(1)));
        assert!(!seen.was_seen(&id(2)));
        assert!(!seen.contains(&id(1)));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut seen = SeenSet::new(5);
        seen.was_seen(&id(1));
        seen.was_seen(&id(2));

        seen.clear();

        assert!(seen.is_empty());
        assert!(!seen.was_seen(&id(1)));
    }
}
