//! Decoded frame values: 2D bitmaps and 3D point-cloud blobs

use bytes::Bytes;
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A decoded raster with a native resource that must be released
/// deterministically (on cache eviction or `FrameDecoder::close`).
///
/// `release()` is idempotent: calling it more than once is a no-op rather
/// than a double-free, which keeps the cache's eviction path simple even
/// when a frame is released from more than one call site (e.g. an error
/// path that releases a partially-built chunk).
#[derive(Debug, Clone)]
pub struct Bitmap {
    image: Arc<RgbaImage>,
    released: Arc<AtomicBool>,
}

impl Bitmap {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying RGBA8 raster. Callers that receive a
    /// `Bitmap` via `on_decode` borrow it from the cache; they must not
    /// call `release()` themselves.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Release the native resource. Exactly-once per `Bitmap` identity:
    /// subsequent calls (including on clones sharing the same underlying
    /// handle) are no-ops.
    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// A tagged decoded frame value.
#[derive(Debug, Clone)]
pub enum DecodedFrame {
    /// A decoded raster owning a native resource.
    Bitmap(Bitmap),
    /// An opaque payload for 3D point-cloud frames. Inert data; no
    /// release is needed.
    Blob(Bytes),
}

impl DecodedFrame {
    /// Release the native resource if this is a `Bitmap`; a no-op for
    /// `Blob`.
    pub fn release(&self) {
        if let DecodedFrame::Bitmap(bitmap) = self {
            bitmap.release();
        }
    }
}

/// Mapping from frame number to decoded frame, covering exactly the
/// frames a request declared. Only ever observable once every frame has
/// completed — see `ChunkCache::admit`.
pub type DecodedChunk = std::collections::BTreeMap<crate::types::FrameNumber, DecodedFrame>;

#[cfg(test)]
mod tests {
    include!("frame_test.rs");
}
