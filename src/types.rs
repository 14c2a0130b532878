//! Core identifiers and configuration types

use crate::worker::{ArchiveCodecRunner, VideoCodecRunner, VideoUnitExtractor};
use std::fmt;
use std::sync::Arc;

/// Identifies a contiguous group of frames decoded as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkNumber(pub u64);

impl fmt::Display for ChunkNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Global index of a frame within the source media. Every frame belongs
/// to exactly one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameNumber(pub u64);

impl fmt::Display for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A total function mapping a frame to the chunk that contains it.
pub type ChunkOfFn = std::sync::Arc<dyn Fn(FrameNumber) -> ChunkNumber + Send + Sync>;

/// Render target size in pixels, as requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Which family of decode worker this `FrameDecoder` dispatches to, and
/// the external collaborators (the actual NAL decoder / archive
/// unzipper, named only by interface) it dispatches work through.
///
/// Fixed for the lifetime of a `FrameDecoder` instance: a single decoder
/// never switches between decoding a video track and decoding an image
/// archive.
#[derive(Clone)]
pub enum BlockKind {
    /// Container carrying a single video track; frames are RGBA bitmaps.
    Video {
        extractor: Arc<dyn VideoUnitExtractor>,
        runner: Arc<dyn VideoCodecRunner>,
    },
    /// Zipped archive of still images. `three_d` selects whether archive
    /// members decode to `Bitmap` (2D) or `Blob` (3D point-cloud) frames.
    Archive {
        three_d: bool,
        runner: Arc<dyn ArchiveCodecRunner>,
    },
}

impl BlockKind {
    /// `Some(true/false)` for `Archive`, `None` for `Video`.
    pub fn three_d(&self) -> Option<bool> {
        match self {
            BlockKind::Video { .. } => None,
            BlockKind::Archive { three_d, .. } => Some(*three_d),
        }
    }
}

impl fmt::Debug for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Video { .. } => f.debug_struct("Video").finish(),
            BlockKind::Archive { three_d, .. } => {
                f.debug_struct("Archive").field("three_d", three_d).finish()
            }
        }
    }
}
