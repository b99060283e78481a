use crate::common::config::FrameId;
use std::collections::{HashSet, VecDeque};

/// LRU eviction oracle over frame identifiers (§4.1).
///
/// The replacer knows nothing of page-ids -- it is solely responsible for
/// tracking which frames are currently eviction candidates and handing back
/// the least-recently-unpinned one. The pool is responsible for keeping this
/// in sync with resident, unpinned frames.
///
/// Backed by a recency queue (back = victim, front = most recently made
/// evictable) plus a membership set, generalizing the teacher's
/// node-store-per-frame design down from LRU-K's access-history window to a
/// single recency ordering, per the distilled spec.
#[derive(Debug)]
pub struct LRUReplacer {
    queue: VecDeque<FrameId>,
    candidates: HashSet<FrameId>,
    capacity: usize,
}

impl LRUReplacer {
    /// `capacity` equals the pool size -- the replacer must never hold more
    /// candidates than there are frames (§4.1 edge case).
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            candidates: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Removes and returns the least-recently unpinned frame, or `None` if
    /// the replacer holds no candidates.
    pub fn victim(&mut self) -> Option<FrameId> {
        let frame_id = self.queue.pop_back()?;
        self.candidates.remove(&frame_id);
        log::trace!("replacer evicted frame_id={frame_id}");
        Some(frame_id)
    }

    /// Removes `frame_id` from eviction candidacy if present. A no-op
    /// otherwise -- pinning a frame that was never a candidate (e.g. it was
    /// just read off the free list) is expected.
    pub fn pin(&mut self, frame_id: FrameId) {
        if self.candidates.remove(&frame_id) {
            self.queue.retain(|&fid| fid != frame_id);
        }
    }

    /// Inserts `frame_id` at the most-recent end, resetting its recency. A
    /// no-op if it is already a candidate.
    pub fn unpin(&mut self, frame_id: FrameId) {
        if self.candidates.contains(&frame_id) {
            return;
        }
        assert!(
            self.candidates.len() < self.capacity,
            "replacer overflow: frame_id={frame_id} exceeds capacity {}",
            self.capacity
        );
        self.candidates.insert(frame_id);
        self.queue.push_front(frame_id);
    }

    pub fn size(&self) -> usize {
        self.candidates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn victim_returns_least_recently_unpinned() {
        let mut replacer = LRUReplacer::new(3);
        replacer.unpin(1);
        replacer.unpin(2);
        replacer.unpin(3);
        assert_eq!(replacer.victim(), Some(1));
        assert_eq!(replacer.victim(), Some(2));
        assert_eq!(replacer.victim(), Some(3));
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn pin_removes_candidate() {
        let mut replacer = LRUReplacer::new(3);
        replacer.unpin(1);
        replacer.unpin(2);
        replacer.pin(1);
        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.victim(), Some(2));
    }

    #[test]
    fn reunpin_resets_recency() {
        let mut replacer = LRUReplacer::new(3);
        replacer.unpin(1);
        replacer.unpin(2);
        replacer.pin(1);
        replacer.unpin(1);
        // 1 was re-inserted most-recently, so 2 is now the oldest candidate.
        assert_eq!(replacer.victim(), Some(2));
        assert_eq!(replacer.victim(), Some(1));
    }

    #[test]
    fn double_unpin_is_noop() {
        let mut replacer = LRUReplacer::new(3);
        replacer.unpin(1);
        replacer.unpin(1);
        assert_eq!(replacer.size(), 1);
    }

    #[test]
    #[should_panic(expected = "replacer overflow")]
    fn overflow_asserts() {
        let mut replacer = LRUReplacer::new(1);
        replacer.unpin(1);
        replacer.unpin(2);
    }
}
