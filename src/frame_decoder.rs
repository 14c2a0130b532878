//! `FrameDecoder` — the public facade over `ChunkCache`, `RequestSlot`,
//! and the two `DecodeWorker` variants.
//!
//! State machine: `CLOSED -> OPEN` on construction; `OPEN` self-loops on
//! `request_decode`, worker completion, and worker error; `OPEN ->
//! CLOSED` on `close()`.

use crate::chunk_cache::ChunkCache;
use crate::error::{FrameCacheError, Result};
use crate::frame::{DecodedChunk, DecodedFrame};
use crate::image_ops;
use crate::request_slot::{BlockToDecode, CallbackSet, NewRequest, RequestSlot};
use crate::types::{BlockKind, ChunkNumber, ChunkOfFn, FrameNumber, RenderSize};
use crate::worker::{ArchiveMessage, ArchiveWorker, FrameEvent, FramePayload, VideoWorker};
use bytes::Bytes;
use crossbeam_channel::Receiver;
use parking_lot::Mutex as SyncMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

struct State {
    cache: ChunkCache,
    slot: RequestSlot,
    render_size: RenderSize,
}

struct Inner {
    state: SyncMutex<State>,
    decode_gate: AsyncMutex<()>,
    archive_worker: Option<Arc<SyncMutex<ArchiveWorker>>>,
    kind: BlockKind,
    chunk_of: ChunkOfFn,
    closed: AtomicBool,
}

/// The decoder cache facade: owns the cache, the request slot, and
/// serializes decode sessions under a fair async mutex.
#[derive(Clone)]
pub struct FrameDecoder {
    inner: Arc<Inner>,
}

impl FrameDecoder {
    pub fn new(kind: BlockKind, capacity: usize, chunk_of: ChunkOfFn, render_size: RenderSize) -> Self {
        let archive_worker = match &kind {
            BlockKind::Archive { .. } => Some(Arc::new(SyncMutex::new(ArchiveWorker::new()))),
            BlockKind::Video { .. } => None,
        };
        Self {
            inner: Arc::new(Inner {
                state: SyncMutex::new(State {
                    cache: ChunkCache::new(capacity),
                    slot: RequestSlot::Idle,
                    render_size,
                }),
                decode_gate: AsyncMutex::new(()),
                archive_worker,
                kind,
                chunk_of,
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn is_chunk_cached(&self, chunk_number: ChunkNumber) -> bool {
        self.inner.state.lock().cache.has(chunk_number)
    }

    /// Look up by `chunk_of(frame)`, then within the chunk. `None` if the
    /// chunk is not resident.
    pub fn frame(&self, frame_number: FrameNumber) -> Option<DecodedFrame> {
        let chunk_number = (self.inner.chunk_of)(frame_number);
        let state = self.inner.state.lock();
        if !state.cache.has(chunk_number) {
            return None;
        }
        state.cache.get(chunk_number, frame_number).cloned()
    }

    /// Affects subsequent video decodes only; no effect in archive mode.
    pub fn set_render_size(&self, width: u32, height: u32) {
        self.inner.state.lock().render_size = RenderSize::new(width, height);
    }

    /// Validates `frame_numbers` (non-empty, strictly ascending) and
    /// synchronously returns `Err(FrameCacheError::Programmer)` without
    /// mutating any state if they aren't. Otherwise runs the
    /// supersession protocol and schedules the decode session.
    pub fn request_decode(
        &self,
        block: Bytes,
        frame_numbers: Vec<FrameNumber>,
        on_decode: impl Fn(FrameNumber, DecodedFrame) + Send + 'static,
        on_decode_all: impl FnOnce() + Send + 'static,
        on_reject: impl FnOnce(FrameCacheError) + Send + 'static,
    ) -> Result<()> {
        validate_frame_numbers(&frame_numbers)?;
        let chunk_number = (self.inner.chunk_of)(frame_numbers[0]);

        let req = NewRequest {
            frame_numbers,
            chunk_number,
            block,
            callbacks: CallbackSet {
                on_decode: Box::new(on_decode),
                on_decode_all: Box::new(on_decode_all),
                on_reject: Box::new(on_reject),
            },
        };

        {
            let mut state = self.inner.state.lock();
            state.slot.submit(req);
        }

        let inner = self.inner.clone();
        tokio::spawn(async move { Self::run_sessions(inner).await });
        Ok(())
    }

    /// Ascending chunk numbers currently resident; appends the in-flight
    /// chunk number too when `include_in_progress` is set.
    pub fn cached_chunks(&self, include_in_progress: bool) -> Vec<ChunkNumber> {
        let state = self.inner.state.lock();
        let mut chunks = state.cache.keys_sorted();
        if include_in_progress {
            if let Some(in_flight) = state.slot.in_flight() {
                chunks.push(in_flight.chunk_number);
            }
        }
        chunks
    }

    /// Terminate the retained archive worker (if any) and clear the
    /// cache, releasing every resident `Bitmap`. Does not reject an
    /// in-flight request's callbacks — they may simply never arrive.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        if let Some(worker) = &self.inner.archive_worker {
            worker.lock().terminate();
        }
        self.inner.state.lock().cache.clear();
    }

    /// Acquire the decode gate and process whatever is queued, looping
    /// while the gate is held if a new request arrived during the prior
    /// session (queued-while-in-flight promoted back to queued).
    async fn run_sessions(inner: Arc<Inner>) {
        loop {
            if inner.closed.load(Ordering::SeqCst) {
                return;
            }
            let _gate = inner.decode_gate.lock().await;
            if inner.closed.load(Ordering::SeqCst) {
                return;
            }

            let req = {
                let mut state = inner.state.lock();
                state.slot.begin_flight()
            };
            let Some(req) = req else {
                return;
            };

            let render_size = inner.state.lock().render_size;
            match &inner.kind {
                BlockKind::Video { extractor, runner } => {
                    Self::run_video_session(&inner, &req, extractor.clone(), runner.clone(), render_size).await;
                }
                BlockKind::Archive { three_d, runner } => {
                    Self::run_archive_session(&inner, &req, *three_d, runner.clone()).await;
                }
            }

            let more_queued = {
                let mut state = inner.state.lock();
                state.slot.end_flight();
                state.slot.queued().is_some()
            };
            if !more_queued {
                return;
            }
            // Loop again under a freshly-acquired gate rather than
            // holding `_gate` across the re-check, so a concurrent
            // `close()` gets a chance to observe `closed` between
            // sessions.
        }
    }

    async fn run_video_session(
        inner: &Arc<Inner>,
        req: &Arc<BlockToDecode>,
        extractor: Arc<dyn crate::worker::VideoUnitExtractor>,
        runner: Arc<dyn crate::worker::VideoCodecRunner>,
        render_size: RenderSize,
    ) {
        let units = match extractor.extract(&req.block) {
            Ok(units) => units,
            Err(err) => {
                req.fire_on_reject(FrameCacheError::Worker(err.to_string()));
                return;
            }
        };

        let mut worker = VideoWorker::new();
        let rx = worker.start_with(units, move |init, payloads, tx| runner.run(init, payloads, tx));

        let len = req.frame_numbers.len();
        let mut chunk = DecodedChunk::new();
        loop {
            match recv_event(&rx).await {
                Some(FrameEvent::Ready { index, payload }) => {
                    let frame_number = req.frame_numbers[index];
                    let decoded = video_payload_to_frame(payload, render_size);
                    chunk.insert(frame_number, decoded.clone());
                    req.fire_on_decode(frame_number, decoded);
                    if index + 1 == len {
                        break;
                    }
                }
                Some(FrameEvent::Error { cause }) => {
                    worker.terminate();
                    release_all(&chunk);
                    req.fire_on_reject(FrameCacheError::Worker(cause));
                    return;
                }
                Some(FrameEvent::Init) => continue,
                None => {
                    worker.terminate();
                    release_all(&chunk);
                    req.fire_on_reject(FrameCacheError::Worker(
                        "video worker channel closed unexpectedly".to_string(),
                    ));
                    return;
                }
            }
        }
        worker.terminate();
        admit_and_complete(inner, req, chunk);
    }

    async fn run_archive_session(
        inner: &Arc<Inner>,
        req: &Arc<BlockToDecode>,
        three_d: bool,
        runner: Arc<dyn crate::worker::ArchiveCodecRunner>,
    ) {
        let Some(archive_worker) = &inner.archive_worker else {
            req.fire_on_reject(FrameCacheError::Internal(
                "archive session requested without an archive worker".to_string(),
            ));
            return;
        };

        let message = ArchiveMessage {
            block: req.block.clone(),
            start: 0,
            end: req.frame_numbers.len().saturating_sub(1),
            three_d,
        };
        let rx: Receiver<FrameEvent> = {
            let mut worker = archive_worker.lock();
            worker.start_with(message, move |msg, tx| runner.run(msg, tx))
        };

        let len = req.frame_numbers.len();
        let mut chunk = DecodedChunk::new();
        loop {
            match recv_event(&rx).await {
                Some(FrameEvent::Ready { index, payload }) => {
                    let frame_number = req.frame_numbers[index];
                    let decoded = archive_payload_to_frame(payload);
                    chunk.insert(frame_number, decoded.clone());
                    req.fire_on_decode(frame_number, decoded);
                    // Admit when the accumulated frame set reaches the
                    // declared length, not a pre-increment counter
                    // reaching len - 1 (events may arrive out of order).
                    if chunk.len() == len {
                        break;
                    }
                }
                Some(FrameEvent::Error { cause }) => {
                    release_all(&chunk);
                    req.fire_on_reject(FrameCacheError::Worker(cause));
                    return;
                }
                Some(FrameEvent::Init) => continue,
                None => {
                    release_all(&chunk);
                    req.fire_on_reject(FrameCacheError::Worker(
                        "archive worker channel closed unexpectedly".to_string(),
                    ));
                    return;
                }
            }
        }
        admit_and_complete(inner, req, chunk);
    }
}

fn admit_and_complete(inner: &Arc<Inner>, req: &Arc<BlockToDecode>, chunk: DecodedChunk) {
    {
        let mut state = inner.state.lock();
        state.cache.evict_down_to(1);
        state.cache.admit(req.chunk_number, chunk);
    }
    req.fire_on_decode_all();
}

fn release_all(chunk: &DecodedChunk) {
    for frame in chunk.values() {
        frame.release();
    }
}

fn video_payload_to_frame(payload: FramePayload, render_size: RenderSize) -> DecodedFrame {
    match payload {
        FramePayload::Rgba { buf, width, height } => {
            let (out_w, out_h) = image_ops::render_crop_target(width, height, render_size.width, render_size.height);
            DecodedFrame::Bitmap(image_ops::crop(&buf, width, height, out_w, out_h))
        }
        FramePayload::Blob(bytes) => DecodedFrame::Blob(bytes),
    }
}

fn archive_payload_to_frame(payload: FramePayload) -> DecodedFrame {
    match payload {
        FramePayload::Rgba { buf, width, height } => {
            DecodedFrame::Bitmap(image_ops::crop(&buf, width, height, width, height))
        }
        FramePayload::Blob(bytes) => DecodedFrame::Blob(bytes),
    }
}

/// Bridge a blocking `crossbeam_channel::Receiver` into an async await
/// point, one event at a time — the only suspension inside a session
/// besides the initial gate acquisition.
async fn recv_event(rx: &Receiver<FrameEvent>) -> Option<FrameEvent> {
    let rx = rx.clone();
    tokio::task::spawn_blocking(move || rx.recv().ok())
        .await
        .unwrap_or(None)
}

fn validate_frame_numbers(frame_numbers: &[FrameNumber]) -> Result<()> {
    if frame_numbers.is_empty() {
        return Err(FrameCacheError::Programmer(
            "frame_numbers must not be empty".to_string(),
        ));
    }
    if !frame_numbers.windows(2).all(|pair| pair[0] < pair[1]) {
        return Err(FrameCacheError::Programmer(
            "frame_numbers must be strictly ascending".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    include!("frame_decoder_test.rs");
}
