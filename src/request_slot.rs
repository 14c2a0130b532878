//! The single-queued/single-in-flight request state machine and its
//! supersession protocol.
//!
//! `RequestSlot` holds at most one queued and one in-flight request.
//! Deeper queues only delay discovering that an intermediate navigation
//! target went stale before the UI moved on — the teacher's
//! `AsyncJobManager` makes the analogous "latest-wins" call for its
//! per-stream job queues.

use crate::error::FrameCacheError;
use crate::frame::DecodedFrame;
use crate::types::{ChunkNumber, FrameNumber};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;

type OnDecode = Box<dyn Fn(FrameNumber, DecodedFrame) + Send>;
type OnDecodeAll = Box<dyn FnOnce() + Send>;
type OnReject = Box<dyn FnOnce(FrameCacheError) + Send>;

/// The callback triple a caller passes to `request_decode`.
pub struct CallbackSet {
    pub on_decode: OnDecode,
    pub on_decode_all: OnDecodeAll,
    pub on_reject: OnReject,
}

/// Interior-mutable holder for a request's callbacks, so the
/// supersession protocol can swap them onto an already-queued or
/// in-flight request without replacing the request record itself.
struct Callbacks {
    on_decode: OnDecode,
    on_decode_all: Option<OnDecodeAll>,
    on_reject: Option<OnReject>,
}

impl From<CallbackSet> for Callbacks {
    fn from(set: CallbackSet) -> Self {
        Self {
            on_decode: set.on_decode,
            on_decode_all: Some(set.on_decode_all),
            on_reject: Some(set.on_reject),
        }
    }
}

/// A not-yet-stored request: what `FrameDecoder::request_decode` builds
/// from its arguments before handing it to `RequestSlot::submit`.
pub struct NewRequest {
    pub frame_numbers: Vec<FrameNumber>,
    pub chunk_number: ChunkNumber,
    pub block: Bytes,
    pub callbacks: CallbackSet,
}

/// A request record: the chunk's bytes, the frame numbers it covers, and
/// the callback triple that will receive its outcome. Lives until
/// exactly one terminal callback fires, then is discarded.
pub struct BlockToDecode {
    pub frame_numbers: Vec<FrameNumber>,
    pub chunk_number: ChunkNumber,
    pub block: Bytes,
    callbacks: Mutex<Callbacks>,
}

impl BlockToDecode {
    fn new(req: NewRequest) -> Self {
        Self {
            frame_numbers: req.frame_numbers,
            chunk_number: req.chunk_number,
            block: req.block,
            callbacks: Mutex::new(req.callbacks.into()),
        }
    }

    /// Replace all three callbacks in place. Used when a later
    /// `request_decode` targets the same pending/in-flight chunk: its
    /// outputs must now be delivered to the new caller instead.
    fn replace_callbacks(&self, set: CallbackSet) {
        *self.callbacks.lock() = set.into();
    }

    pub fn fire_on_decode(&self, frame: FrameNumber, decoded: DecodedFrame) {
        (self.callbacks.lock().on_decode)(frame, decoded);
    }

    /// Fire `on_decode_all` exactly once; a second call, or a call after
    /// `fire_on_reject` already consumed the terminal slot, is a no-op.
    pub fn fire_on_decode_all(&self) {
        let cb = {
            let mut guard = self.callbacks.lock();
            guard.on_reject = None;
            guard.on_decode_all.take()
        };
        if let Some(cb) = cb {
            cb();
        }
    }

    /// Fire `on_reject` exactly once; exclusive with `on_decode_all`.
    pub fn fire_on_reject(&self, error: FrameCacheError) {
        let cb = {
            let mut guard = self.callbacks.lock();
            guard.on_decode_all = None;
            guard.on_reject.take()
        };
        if let Some(cb) = cb {
            cb(error);
        }
    }
}

/// At most one queued and one in-flight request.
#[derive(Default)]
pub enum RequestSlot {
    #[default]
    Idle,
    Queued(Arc<BlockToDecode>),
    InFlight(Arc<BlockToDecode>),
    QueuedWhileInFlight(Arc<BlockToDecode>, Arc<BlockToDecode>),
}

impl RequestSlot {
    pub fn in_flight(&self) -> Option<&Arc<BlockToDecode>> {
        match self {
            RequestSlot::InFlight(f) | RequestSlot::QueuedWhileInFlight(f, _) => Some(f),
            _ => None,
        }
    }

    pub fn queued(&self) -> Option<&Arc<BlockToDecode>> {
        match self {
            RequestSlot::Queued(q) | RequestSlot::QueuedWhileInFlight(_, q) => Some(q),
            _ => None,
        }
    }

    /// Apply the supersession protocol (spec §4.4) for a new request.
    pub fn submit(&mut self, req: NewRequest) {
        *self = match std::mem::take(self) {
            RequestSlot::Idle => RequestSlot::Queued(Self::wrap(req)),
            RequestSlot::Queued(q) => RequestSlot::Queued(Self::supersede_queued(q, req)),
            RequestSlot::InFlight(f) => {
                if req.frame_numbers == f.frame_numbers {
                    f.fire_on_reject(FrameCacheError::Outdated);
                    f.replace_callbacks(req.callbacks);
                    RequestSlot::InFlight(f)
                } else {
                    RequestSlot::QueuedWhileInFlight(f, Self::wrap(req))
                }
            }
            RequestSlot::QueuedWhileInFlight(f, q) => {
                RequestSlot::QueuedWhileInFlight(f, Self::supersede_queued(q, req))
            }
        };
    }

    /// Acquire the decode mutex and re-check `Q`: promote it to `F` if
    /// it is still the request that was snapshotted, returning it.
    /// Called only when no worker is currently running.
    pub fn begin_flight(&mut self) -> Option<Arc<BlockToDecode>> {
        match std::mem::take(self) {
            RequestSlot::Queued(q) => {
                *self = RequestSlot::InFlight(q.clone());
                Some(q)
            }
            other => {
                *self = other;
                None
            }
        }
    }

    /// End the current session: drop `F`, promoting a
    /// queued-while-in-flight request back to plain `Queued` so the next
    /// `start_decode` can pick it up.
    pub fn end_flight(&mut self) {
        *self = match std::mem::take(self) {
            RequestSlot::InFlight(_) => RequestSlot::Idle,
            RequestSlot::QueuedWhileInFlight(_, q) => RequestSlot::Queued(q),
            other => other,
        };
    }

    fn wrap(req: NewRequest) -> Arc<BlockToDecode> {
        Arc::new(BlockToDecode::new(req))
    }

    fn supersede_queued(old_q: Arc<BlockToDecode>, req: NewRequest) -> Arc<BlockToDecode> {
        old_q.fire_on_reject(FrameCacheError::Outdated);
        if req.frame_numbers == old_q.frame_numbers {
            old_q.replace_callbacks(req.callbacks);
            old_q
        } else {
            Self::wrap(req)
        }
    }
}

#[cfg(test)]
mod tests {
    include!("request_slot_test.rs");
}
