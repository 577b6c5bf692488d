//! Chunk generation hook and its FIFO work queue

use std::collections::{HashSet, VecDeque};

use glam::IVec2;

use super::Level;

/// Content generator invoked once per newly created chunk.
///
/// Runs during `Level::tick`, so implementations may call `Level::add` for
/// the entities they create.
pub trait ChunkGenerator {
    /// Populate the chunk whose top-left level tile is `origin`
    fn generate_chunk(&mut self, origin: IVec2, level: &mut Level);
}

/// Chunks waiting for generation, in creation order.
///
/// Each chunk coordinate can only be queued once.
#[derive(Debug, Default)]
pub struct GenerationQueue {
    queue: VecDeque<IVec2>,
    /// Every coordinate ever enqueued
    seen: HashSet<IVec2>,
}

impl GenerationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chunk; returns false if it was queued before
    pub fn enqueue(&mut self, coord: IVec2) -> bool {
        if self.seen.insert(coord) {
            self.queue.push_back(coord);
            true
        } else {
            false
        }
    }

    pub fn extend(&mut self, coords: impl IntoIterator<Item = IVec2>) {
        for coord in coords {
            self.enqueue(coord);
        }
    }

    pub fn pop(&mut self) -> Option<IVec2> {
        self.queue.pop_front()
    }

    /// Drop pending work (the chunks stay marked as seen)
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_is_fifo_and_deduplicated() {
        let mut queue = GenerationQueue::new();
        assert!(queue.enqueue(IVec2::new(0, 0)));
        assert!(queue.enqueue(IVec2::new(-1, 0)));
        assert!(!queue.enqueue(IVec2::new(0, 0)));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop(), Some(IVec2::new(0, 0)));
        // Generated chunks are never queued again
        assert!(!queue.enqueue(IVec2::new(0, 0)));
        assert_eq!(queue.pop(), Some(IVec2::new(-1, 0)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear_keeps_seen() {
        let mut queue = GenerationQueue::new();
        queue.extend([IVec2::new(1, 1), IVec2::new(2, 2)]);
        queue.clear();
        assert!(queue.is_empty());
        assert!(!queue.enqueue(IVec2::new(1, 1)));
        assert!(queue.enqueue(IVec2::new(3, 3)));
    }
}
