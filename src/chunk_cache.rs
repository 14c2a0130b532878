//! Bounded map from chunk number to a fully decoded frame set, with
//! strict admission-order LRU eviction.
//!
//! Eviction here is deliberately *not* access-order: the `OrderedStack`
//! tracks admission recency only, and reads (`get`, `has`) never reorder
//! it. Decoded chunks are written once and read many times by the UI's
//! short-window navigation, so admission order is already a good proxy
//! for temporal locality, and leaving reads lock-free-on-order avoids the
//! contention the teacher's own `ByteCache::get_segment` comment flags
//! for the opposite (access-order) choice.

use crate::frame::DecodedChunk;
use crate::types::{ChunkNumber, FrameNumber};
use std::collections::{BTreeMap, VecDeque};

/// Chunk numbers ordered by decreasing admission recency; front is
/// newest, back is the eviction candidate.
#[derive(Debug, Default)]
struct OrderedStack {
    order: VecDeque<ChunkNumber>,
}

impl OrderedStack {
    fn push_top(&mut self, chunk: ChunkNumber) {
        self.order.push_front(chunk);
    }

    fn pop_bottom(&mut self) -> Option<ChunkNumber> {
        self.order.pop_back()
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Ordered mapping from `ChunkNumber` to `DecodedChunk`, bounded to
/// `capacity` entries and evicted in strict admission order.
pub struct ChunkCache {
    chunks: BTreeMap<ChunkNumber, DecodedChunk>,
    stack: OrderedStack,
    capacity: usize,
}

impl ChunkCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            chunks: BTreeMap::new(),
            stack: OrderedStack::default(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn has(&self, chunk_number: ChunkNumber) -> bool {
        self.chunks.contains_key(&chunk_number)
    }

    /// Look up a frame within a resident chunk. Undefined (returns
    /// `None`) if the chunk is not present.
    pub fn get(&self, chunk_number: ChunkNumber, frame_number: FrameNumber) -> Option<&crate::frame::DecodedFrame> {
        self.chunks.get(&chunk_number)?.get(&frame_number)
    }

    /// Insert a fully decoded chunk and push it to the top of the
    /// admission stack. Must not be called twice for the same chunk
    /// without an intervening eviction.
    pub fn admit(&mut self, chunk_number: ChunkNumber, chunk: DecodedChunk) {
        debug_assert!(
            !self.chunks.contains_key(&chunk_number),
            "admit called twice for chunk {chunk_number} without an intervening eviction"
        );
        self.chunks.insert(chunk_number, chunk);
        self.stack.push_top(chunk_number);
        tracing::debug!(chunk = %chunk_number, resident = self.chunks.len(), "admitted chunk");
    }

    /// Pop the bottom of the admission stack until at most
    /// `capacity - min(target_free_slots, capacity)` entries remain,
    /// releasing every `Bitmap` frame of each evicted chunk.
    pub fn evict_down_to(&mut self, target_free_slots: usize) {
        let free = target_free_slots.min(self.capacity);
        let target_size = self.capacity - free;
        while self.chunks.len() > target_size {
            let Some(victim) = self.stack.pop_bottom() else {
                break;
            };
            if let Some(chunk) = self.chunks.remove(&victim) {
                for frame in chunk.values() {
                    frame.release();
                }
                tracing::debug!(chunk = %victim, "evicted chunk");
            }
        }
    }

    /// Evict every resident chunk, releasing all `Bitmap` frames.
    pub fn clear(&mut self) {
        self.evict_down_to(self.capacity);
        debug_assert_eq!(self.chunks.len(), 0);
        debug_assert_eq!(self.stack.len(), 0);
    }

    /// Ascending chunk numbers currently resident.
    pub fn keys_sorted(&self) -> Vec<ChunkNumber> {
        self.chunks.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    include!("chunk_cache_test.rs");
}
