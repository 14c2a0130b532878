//! Decode worker handles: codec worker (video) and unzipper (archive).
//!
//! Grounded on the teacher's worker runtime (`bitvue-core::worker`,
//! `AsyncJobManager`): a worker is a capability reached only through an
//! event channel, never a shared mutable struct, so a session's decode
//! work can be terminated and its thread torn down without the core
//! ever touching codec-owned memory directly.

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};

/// One event emitted by a worker while processing a session.
#[derive(Debug, Clone)]
pub enum FrameEvent {
    /// The 0-based position within the request's `frame_numbers` list,
    /// and its decoded payload.
    Ready { index: usize, payload: FramePayload },
    /// The worker failed; reported at most once, after which the worker
    /// is considered terminated.
    Error { cause: String },
    /// Opaque initialization chatter (e.g. a console log from the
    /// worker). Ignored by the core.
    Init,
}

/// The raw payload a worker hands back for one frame, before
/// `ImageOps::crop` and tagging turn it into a `DecodedFrame`.
#[derive(Debug, Clone)]
pub enum FramePayload {
    /// Raw decoded RGBA plus the dimensions the codec reported.
    Rgba {
        buf: Bytes,
        width: u32,
        height: u32,
    },
    /// An inert 3D point-cloud payload, passed through unchanged.
    Blob(Bytes),
}

/// Video init message sent to the codec worker before any payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoInitMessage {
    pub rgb: bool,
    pub reuse_memory: bool,
}

impl Default for VideoInitMessage {
    fn default() -> Self {
        Self {
            rgb: true,
            reuse_memory: false,
        }
    }
}

/// One SPS/PPS/NAL-unit payload handed to the video worker.
#[derive(Debug, Clone)]
pub struct VideoPayloadMessage {
    pub buf: Bytes,
    pub offset: usize,
    pub length: usize,
}

/// The units a `VideoUnitExtractor` pulls out of a container block before
/// the core streams them to the codec worker. Container parsing itself
/// is an out-of-scope collaborator; this crate only defines the seam.
#[derive(Debug, Clone)]
pub struct ExtractedVideoUnits {
    pub sps: Bytes,
    pub pps: Bytes,
    pub access_units: Vec<Bytes>,
}

/// Extracts SPS/PPS/access-unit payloads from a video container block.
/// Implemented by an external collaborator; not part of this crate's
/// scope beyond the trait seam.
pub trait VideoUnitExtractor: Send + Sync {
    fn extract(&self, block: &Bytes) -> crate::error::Result<ExtractedVideoUnits>;
}

/// The actual NAL decoder. An external collaborator named only by this
/// interface — decoding itself is out of this crate's scope.
pub trait VideoCodecRunner: Send + Sync {
    fn run(&self, init: VideoInitMessage, payloads: Vec<VideoPayloadMessage>, tx: Sender<FrameEvent>);
}

/// The actual archive unzipper. An external collaborator named only by
/// this interface.
pub trait ArchiveCodecRunner: Send + Sync {
    fn run(&self, message: ArchiveMessage, tx: Sender<FrameEvent>);
}

/// Archive message sent to the unzip worker.
#[derive(Debug, Clone)]
pub struct ArchiveMessage {
    pub block: Bytes,
    pub start: usize,
    pub end: usize,
    pub three_d: bool,
}

/// A handle over a codec/archive worker: submit a session, receive its
/// event stream, and terminate it.
pub trait DecodeWorker: Send {
    type Context;

    /// Start a decode session, returning the channel on which
    /// `FrameEvent`s will arrive. Each call starts exactly one session;
    /// a fresh `start` after a prior session's completion (or error) is
    /// only valid for workers documented as reusable (`ArchiveWorker`).
    fn start(&mut self, context: Self::Context) -> Receiver<FrameEvent>;

    /// Tear the worker down. Safe to call even if a session never
    /// started, or already completed/errored.
    fn terminate(&mut self);
}

/// Video decode worker: consumes extracted SPS/PPS/access-unit payloads.
/// Never survives across chunks — `FrameDecoder` creates a fresh
/// `VideoWorker` for every session and terminates it unconditionally at
/// session end.
pub struct VideoWorker {
    handle: Option<std::thread::JoinHandle<()>>,
}

impl VideoWorker {
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Spawn the worker thread driving `run`, which receives the init
    /// message and each payload in order and must emit one `Ready` per
    /// access unit (plus at most one `Error`) on `tx`.
    pub fn start_with(
        &mut self,
        units: ExtractedVideoUnits,
        run: impl FnOnce(VideoInitMessage, Vec<VideoPayloadMessage>, Sender<FrameEvent>) + Send + 'static,
    ) -> Receiver<FrameEvent> {
        self.terminate();
        let (tx, rx) = crossbeam_channel::unbounded();
        let init = VideoInitMessage::default();
        let mut payloads = Vec::with_capacity(units.access_units.len() + 2);
        payloads.push(VideoPayloadMessage {
            buf: units.sps.clone(),
            offset: 0,
            length: units.sps.len(),
        });
        payloads.push(VideoPayloadMessage {
            buf: units.pps.clone(),
            offset: 0,
            length: units.pps.len(),
        });
        for au in units.access_units {
            let length = au.len();
            payloads.push(VideoPayloadMessage {
                buf: au,
                offset: 0,
                length,
            });
        }
        self.handle = Some(std::thread::spawn(move || run(init, payloads, tx)));
        rx
    }
}

impl Default for VideoWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeWorker for VideoWorker {
    type Context = (ExtractedVideoUnits, Box<dyn FnOnce(VideoInitMessage, Vec<VideoPayloadMessage>, Sender<FrameEvent>) + Send>);

    fn start(&mut self, (units, run): Self::Context) -> Receiver<FrameEvent> {
        self.start_with(units, run)
    }

    fn terminate(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!("terminating video worker");
            let _ = handle.join();
        }
    }
}

/// Archive (zipped-image) decode worker. Retained and reused across
/// sessions inside `FrameDecoder`; released only by `close()`.
pub struct ArchiveWorker {
    handle: Option<std::thread::JoinHandle<()>>,
}

impl ArchiveWorker {
    pub fn new() -> Self {
        Self { handle: None }
    }

    pub fn start_with(
        &mut self,
        message: ArchiveMessage,
        run: impl FnOnce(ArchiveMessage, Sender<FrameEvent>) + Send + 'static,
    ) -> Receiver<FrameEvent> {
        // A reused worker only ever has one session in flight at a time;
        // join any stale thread from a prior session before starting.
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        let (tx, rx) = crossbeam_channel::unbounded();
        self.handle = Some(std::thread::spawn(move || run(message, tx)));
        rx
    }
}

impl Default for ArchiveWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeWorker for ArchiveWorker {
    type Context = (ArchiveMessage, Box<dyn FnOnce(ArchiveMessage, Sender<FrameEvent>) + Send>);

    fn start(&mut self, (message, run): Self::Context) -> Receiver<FrameEvent> {
        self.start_with(message, run)
    }

    fn terminate(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!("terminating archive worker");
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    include!("worker_test.rs");
}
