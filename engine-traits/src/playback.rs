//! Playback engine contract and supporting media types.
//!
//! The control core never decodes, mixes, or outputs audio itself. Host
//! applications implement [`PlaybackEngine`] over their native audio stack
//! (media player, sound pool, mixer process) and inject it at session
//! construction. Every method is required to be non-blocking: an
//! implementation that needs real work queues it internally and returns
//! immediately, so the core can call into the engine from synchronous
//! volume-change dispatch without stalling.

use crate::error::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Unique identifier for media loaded into the engine.
///
/// Handles are opaque to the core: one handle may stand for a streamed
/// track in a media player or a decoded sample slot in a sound pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaHandle(Uuid);

impl MediaHandle {
    /// Generate a fresh handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct a handle from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MediaHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Media source descriptor handed to [`PlaybackEngine::load`].
#[derive(Debug, Clone)]
pub enum MediaSource {
    /// Local file accessible to the host runtime.
    LocalFile { path: PathBuf },
    /// Remote HTTP(S) stream fetched by the host.
    RemoteStream {
        url: String,
        headers: HashMap<String, String>,
    },
    /// In-memory buffer supplied by the caller (typical for short effects).
    MemoryBuffer { data: Bytes },
}

impl MediaSource {
    /// Determine whether the source represents remote content.
    pub fn is_remote(&self) -> bool {
        matches!(self, MediaSource::RemoteStream { .. })
    }
}

/// Completion notice for an asynchronous [`PlaybackEngine::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadCompletion {
    /// Handle returned by the originating `load` call.
    pub handle: MediaHandle,
    /// Whether the media is now ready to play.
    pub success: bool,
}

/// Trait for host audio engines driven by the control core.
///
/// `load` is asynchronous in effect, not in signature: it returns the
/// handle immediately and reports readiness through the
/// [`load_completions`](PlaybackEngine::load_completions) channel. All
/// other calls are fire-and-forget; the engine's own state is the source
/// of truth for what is audible, the core's state machines track intent.
pub trait PlaybackEngine: Send + Sync {
    /// Begin loading a media source. The returned handle is valid for
    /// control calls right away, but playback starts silently failing or
    /// no-oping until the matching [`LoadCompletion`] reports success.
    fn load(&self, source: MediaSource) -> Result<MediaHandle>;

    /// Start playback from the beginning of the media.
    fn start(&self, handle: MediaHandle) -> Result<()>;

    /// Pause playback, keeping the current position.
    fn pause(&self, handle: MediaHandle) -> Result<()>;

    /// Resume playback from the paused position.
    fn resume(&self, handle: MediaHandle) -> Result<()>;

    /// Stop playback and reset the position to the start.
    fn stop(&self, handle: MediaHandle) -> Result<()>;

    /// Adjust per-channel output level, normalized `0.0..=1.0` each.
    fn set_volume(&self, handle: MediaHandle, left: f32, right: f32) -> Result<()>;

    /// Adjust playback rate (`1.0` = normal speed).
    fn set_rate(&self, handle: MediaHandle, rate: f32) -> Result<()>;

    /// Toggle seamless looping.
    fn set_looping(&self, handle: MediaHandle, looping: bool) -> Result<()>;

    /// Release engine resources tied to one handle.
    fn unload(&self, handle: MediaHandle) -> Result<()>;

    /// Release every engine resource. Called when a session tears down
    /// its whole object pool.
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    /// Subscribe to load-completion notices.
    fn load_completions(&self) -> broadcast::Receiver<LoadCompletion>;
}
