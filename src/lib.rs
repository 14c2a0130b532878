//! Frame-chunk decoder cache for a video/image annotation client.
//!
//! A `FrameDecoder` maps frame numbers to decoded bitmaps (or opaque 3D
//! blobs), decoding and caching whole chunks at a time and superseding
//! stale requests as navigation moves on. See [`frame_decoder`] for the
//! public facade.

pub mod chunk_cache;
pub mod error;
pub mod frame;
pub mod frame_decoder;
pub mod image_ops;
pub mod request_slot;
pub mod types;
pub mod worker;

pub use error::{FrameCacheError, Result};
pub use frame::{Bitmap, DecodedChunk, DecodedFrame};
pub use frame_decoder::FrameDecoder;
pub use types::{BlockKind, ChunkNumber, ChunkOfFn, FrameNumber, RenderSize};
pub use worker::{
    ArchiveCodecRunner, ArchiveMessage, DecodeWorker, ExtractedVideoUnits, FrameEvent, FramePayload,
    VideoCodecRunner, VideoInitMessage, VideoPayloadMessage, VideoUnitExtractor,
};
