//! Shared test doubles for the session integration suites.
#![allow(dead_code)]

use core_runtime::events::{EventStream, SessionEvent};
use engine_traits::error::{EngineError, Result as EngineResult};
use engine_traits::{
    FocusChange, FocusHost, FocusKind, FocusResponse, LoadCompletion, MediaHandle, MediaSource,
    PlaybackEngine, StreamKind,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

// ============================================================================
// Recording Engine
// ============================================================================

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOp {
    Load,
    Start(MediaHandle),
    Pause(MediaHandle),
    Resume(MediaHandle),
    Stop(MediaHandle),
    SetVolume(MediaHandle, f32, f32),
    SetRate(MediaHandle, f32),
    SetLooping(MediaHandle, bool),
    Unload(MediaHandle),
    Shutdown,
}

/// Playback engine that records every call and can be scripted to fail
/// individual operations.
pub struct RecordingEngine {
    ops: Mutex<Vec<EngineOp>>,
    completions: broadcast::Sender<LoadCompletion>,
    fail_start: bool,
    fail_stop: bool,
}

impl RecordingEngine {
    pub fn new() -> Arc<Self> {
        let (completions, _) = broadcast::channel(16);
        Arc::new(Self {
            ops: Mutex::new(Vec::new()),
            completions,
            fail_start: false,
            fail_stop: false,
        })
    }

    pub fn with_start_failure() -> Arc<Self> {
        let (completions, _) = broadcast::channel(16);
        Arc::new(Self {
            ops: Mutex::new(Vec::new()),
            completions,
            fail_start: true,
            fail_stop: false,
        })
    }

    pub fn with_stop_failure() -> Arc<Self> {
        let (completions, _) = broadcast::channel(16);
        Arc::new(Self {
            ops: Mutex::new(Vec::new()),
            completions,
            fail_start: false,
            fail_stop: true,
        })
    }

    /// Snapshot of every recorded call, in order.
    pub fn ops(&self) -> Vec<EngineOp> {
        self.ops.lock().clone()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.ops.lock().clear();
    }

    /// Whether the given call was recorded.
    pub fn saw(&self, op: &EngineOp) -> bool {
        self.ops.lock().contains(op)
    }

    /// Push a load-completion notice to every subscriber. Returns the
    /// subscriber count reached.
    pub fn complete_load(&self, handle: MediaHandle, success: bool) -> usize {
        self.completions
            .send(LoadCompletion { handle, success })
            .unwrap_or(0)
    }

    fn record(&self, op: EngineOp) {
        self.ops.lock().push(op);
    }
}

impl PlaybackEngine for RecordingEngine {
    fn load(&self, _source: MediaSource) -> EngineResult<MediaHandle> {
        self.record(EngineOp::Load);
        Ok(MediaHandle::new())
    }

    fn start(&self, handle: MediaHandle) -> EngineResult<()> {
        if self.fail_start {
            return Err(EngineError::OperationFailed(
                "scripted start failure".to_string(),
            ));
        }
        self.record(EngineOp::Start(handle));
        Ok(())
    }

    fn pause(&self, handle: MediaHandle) -> EngineResult<()> {
        self.record(EngineOp::Pause(handle));
        Ok(())
    }

    fn resume(&self, handle: MediaHandle) -> EngineResult<()> {
        self.record(EngineOp::Resume(handle));
        Ok(())
    }

    fn stop(&self, handle: MediaHandle) -> EngineResult<()> {
        if self.fail_stop {
            return Err(EngineError::OperationFailed(
                "scripted stop failure".to_string(),
            ));
        }
        self.record(EngineOp::Stop(handle));
        Ok(())
    }

    fn set_volume(&self, handle: MediaHandle, left: f32, right: f32) -> EngineResult<()> {
        self.record(EngineOp::SetVolume(handle, left, right));
        Ok(())
    }

    fn set_rate(&self, handle: MediaHandle, rate: f32) -> EngineResult<()> {
        self.record(EngineOp::SetRate(handle, rate));
        Ok(())
    }

    fn set_looping(&self, handle: MediaHandle, looping: bool) -> EngineResult<()> {
        self.record(EngineOp::SetLooping(handle, looping));
        Ok(())
    }

    fn unload(&self, handle: MediaHandle) -> EngineResult<()> {
        self.record(EngineOp::Unload(handle));
        Ok(())
    }

    fn shutdown(&self) -> EngineResult<()> {
        self.record(EngineOp::Shutdown);
        Ok(())
    }

    fn load_completions(&self) -> broadcast::Receiver<LoadCompletion> {
        self.completions.subscribe()
    }
}

// ============================================================================
// Scripted Focus Host
// ============================================================================

/// Focus host with a scriptable verdict that records every request.
pub struct ScriptedFocus {
    response: Mutex<FocusResponse>,
    requests: Mutex<Vec<(StreamKind, FocusKind)>>,
    abandons: AtomicUsize,
    changes: broadcast::Sender<FocusChange>,
}

impl ScriptedFocus {
    pub fn granting() -> Arc<Self> {
        Self::with_response(FocusResponse::Granted)
    }

    pub fn denying() -> Arc<Self> {
        Self::with_response(FocusResponse::Denied)
    }

    fn with_response(response: FocusResponse) -> Arc<Self> {
        let (changes, _) = broadcast::channel(16);
        Arc::new(Self {
            response: Mutex::new(response),
            requests: Mutex::new(Vec::new()),
            abandons: AtomicUsize::new(0),
            changes,
        })
    }

    /// Change the verdict for subsequent requests.
    pub fn set_response(&self, response: FocusResponse) {
        *self.response.lock() = response;
    }

    /// Every focus request seen so far, in order.
    pub fn requests(&self) -> Vec<(StreamKind, FocusKind)> {
        self.requests.lock().clone()
    }

    /// How many times focus was abandoned.
    pub fn abandon_count(&self) -> usize {
        self.abandons.load(Ordering::Acquire)
    }

    /// Push a focus-change event to every subscriber.
    pub fn announce(&self, change: FocusChange) -> usize {
        self.changes.send(change).unwrap_or(0)
    }
}

impl FocusHost for ScriptedFocus {
    fn request_focus(&self, stream: StreamKind, kind: FocusKind) -> FocusResponse {
        self.requests.lock().push((stream, kind));
        *self.response.lock()
    }

    fn abandon_focus(&self) {
        self.abandons.fetch_add(1, Ordering::AcqRel);
    }

    fn focus_changes(&self) -> broadcast::Receiver<FocusChange> {
        self.changes.subscribe()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Drain every pending event without blocking.
pub fn drain_events(stream: &mut EventStream) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Some(Ok(event)) = stream.try_recv() {
        events.push(event);
    }
    events
}
