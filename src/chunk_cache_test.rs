use super::*;
use crate::frame::{Bitmap, DecodedFrame};
use image::RgbaImage;

fn bitmap_frame() -> DecodedFrame {
    DecodedFrame::Bitmap(Bitmap::new(RgbaImage::new(1, 1)))
}

fn chunk_of(frames: &[u64]) -> DecodedChunk {
    frames
        .iter()
        .map(|&f| (FrameNumber(f), bitmap_frame()))
        .collect()
}

#[test]
fn admit_then_get_returns_frame() {
    let mut cache = ChunkCache::new(2);
    cache.admit(ChunkNumber(0), chunk_of(&[0, 1, 2]));
    assert!(cache.has(ChunkNumber(0)));
    assert!(cache.get(ChunkNumber(0), FrameNumber(1)).is_some());
    assert!(cache.get(ChunkNumber(0), FrameNumber(99)).is_none());
}

#[test]
fn get_on_absent_chunk_returns_none() {
    let cache = ChunkCache::new(2);
    assert!(cache.get(ChunkNumber(5), FrameNumber(0)).is_none());
}

#[test]
fn capacity_is_at_least_one() {
    let cache = ChunkCache::new(0);
    assert_eq!(cache.capacity(), 1);
}

#[test]
fn lru_eviction_evicts_oldest_admission_first() {
    // Scenario 1 from the spec: capacity=2, chunks admitted 0, 1, 2 in
    // order; expect cached_chunks == [1, 2], chunk 0 gone.
    let mut cache = ChunkCache::new(2);
    cache.admit(ChunkNumber(0), chunk_of(&[0, 1, 2]));
    cache.evict_down_to(1);
    cache.admit(ChunkNumber(1), chunk_of(&[10, 11, 12]));
    cache.evict_down_to(1);
    cache.admit(ChunkNumber(2), chunk_of(&[20, 21, 22]));

    assert_eq!(
        cache.keys_sorted(),
        vec![ChunkNumber(1), ChunkNumber(2)]
    );
    assert!(!cache.has(ChunkNumber(0)));
    assert!(cache.has(ChunkNumber(1)));
}

#[test]
fn eviction_releases_bitmap_frames() {
    let mut cache = ChunkCache::new(1);
    let bitmap = Bitmap::new(RgbaImage::new(1, 1));
    let mut chunk = DecodedChunk::new();
    chunk.insert(FrameNumber(0), DecodedFrame::Bitmap(bitmap.clone()));
    cache.admit(ChunkNumber(0), chunk);

    cache.evict_down_to(1); // target_free_slots == capacity -> evict everything
    assert!(bitmap.is_released());
    assert!(!cache.has(ChunkNumber(0)));
}

#[test]
fn capacity_one_evicting_a_admits_b_cleanly() {
    let mut cache = ChunkCache::new(1);
    let bitmap_a = Bitmap::new(RgbaImage::new(1, 1));
    let mut chunk_a = DecodedChunk::new();
    chunk_a.insert(FrameNumber(0), DecodedFrame::Bitmap(bitmap_a.clone()));
    cache.admit(ChunkNumber(0), chunk_a);

    cache.evict_down_to(1);
    assert!(bitmap_a.is_released());
    assert!(!cache.has(ChunkNumber(0)));

    cache.admit(ChunkNumber(1), chunk_of(&[10]));
    assert!(cache.has(ChunkNumber(1)));
}

#[test]
fn clear_evicts_everything_and_releases_all_bitmaps() {
    let mut cache = ChunkCache::new(3);
    let b0 = Bitmap::new(RgbaImage::new(1, 1));
    let b1 = Bitmap::new(RgbaImage::new(1, 1));
    let mut c0 = DecodedChunk::new();
    c0.insert(FrameNumber(0), DecodedFrame::Bitmap(b0.clone()));
    let mut c1 = DecodedChunk::new();
    c1.insert(FrameNumber(10), DecodedFrame::Bitmap(b1.clone()));
    cache.admit(ChunkNumber(0), c0);
    cache.admit(ChunkNumber(1), c1);

    cache.clear();

    assert!(b0.is_released());
    assert!(b1.is_released());
    assert!(cache.keys_sorted().is_empty());
}

#[test]
fn keys_sorted_is_ascending_and_stable_across_calls() {
    let mut cache = ChunkCache::new(5);
    cache.admit(ChunkNumber(3), chunk_of(&[30]));
    cache.admit(ChunkNumber(1), chunk_of(&[10]));
    cache.admit(ChunkNumber(2), chunk_of(&[20]));

    let first = cache.keys_sorted();
    let second = cache.keys_sorted();
    assert_eq!(first, vec![ChunkNumber(1), ChunkNumber(2), ChunkNumber(3)]);
    assert_eq!(first, second);
}

#[test]
fn reads_do_not_reorder_the_admission_stack() {
    // Admission order 0, 1; reading chunk 0 repeatedly must not protect
    // it from eviction the way access-order LRU would.
    let mut cache = ChunkCache::new(2);
    cache.admit(ChunkNumber(0), chunk_of(&[0]));
    cache.admit(ChunkNumber(1), chunk_of(&[10]));
    for _ in 0..5 {
        let _ = cache.get(ChunkNumber(0), FrameNumber(0));
    }
    cache.evict_down_to(1);
    cache.admit(ChunkNumber(2), chunk_of(&[20]));

    // Chunk 0 was admitted first and is evicted first despite reads.
    assert!(!cache.has(ChunkNumber(0)));
    assert!(cache.has(ChunkNumber(1)));
    assert!(cache.has(ChunkNumber(2)));
}
