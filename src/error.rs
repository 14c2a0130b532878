//! Error taxonomy for the frame-chunk decoder cache

use thiserror::Error;

/// Errors delivered to a request's `on_reject`, or raised synchronously
/// at `request_decode` entry.
#[derive(Error, Debug, Clone)]
pub enum FrameCacheError {
    /// The request was superseded by a later `request_decode` call before
    /// it could complete. Non-fatal; clients typically ignore it.
    #[error("request superseded by a newer request_decode")]
    Outdated,

    /// The codec/archive worker failed mid-session. No chunk is admitted;
    /// the worker is terminated; the decoder remains usable.
    #[error("decode worker failed: {0}")]
    Worker(String),

    /// `frame_numbers` was empty or not strictly ascending. Raised
    /// synchronously; never delivered via `on_reject`.
    #[error("invalid frame_numbers: {0}")]
    Programmer(String),

    /// An invariant the caller can't violate through the public API was
    /// nonetheless violated (double admission of a chunk, etc).
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, FrameCacheError>;
