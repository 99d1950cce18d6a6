//! Playback state machines and the capability contract shared by pooled
//! audio objects.

use crate::error::Result;
use core_volume::Volume;
use engine_traits::MediaHandle;
use serde::{Deserialize, Serialize};

/// Play state of a single audio object.
///
/// Transitions: `Stopped -> play -> Playing`, `Playing -> pause ->
/// Paused`, `Paused -> play -> Playing`, any state `-> stop -> Stopped`.
/// Release is reachable from any state and terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayState {
    /// The object is audibly playing.
    Playing,
    /// Playback is suspended and can resume from the current position.
    Paused,
    /// Nothing is playing; a play starts from the beginning.
    Stopped,
}

impl PlayState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlayState::Playing)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, PlayState::Paused)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, PlayState::Stopped)
    }
}

impl Default for PlayState {
    fn default() -> Self {
        PlayState::Stopped
    }
}

/// Lifecycle state of an audio session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Constructed, or torn down after a release-all.
    Idle,
    /// Accepting and driving playback.
    Started,
    /// Temporarily halted; playback resumes when started again.
    Stopped,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn is_started(&self) -> bool {
        matches!(self, SessionState::Started)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, SessionState::Stopped)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

/// Capability contract for objects living in an audio session pool.
///
/// Implementations drive the external engine first and only then apply
/// the local state transition, so state reflects confirmed engine
/// actions. All methods take `&self`; implementations synchronize
/// internally and are shared through `Arc`.
pub trait Playable: Send + Sync {
    /// Start or resume playback.
    fn play(&self) -> Result<()>;

    /// Suspend playback, keeping the position.
    fn pause(&self) -> Result<()>;

    /// Halt playback and reset to the beginning.
    fn stop(&self) -> Result<()>;

    /// Deregister from the owning session and free engine resources.
    /// Idempotent; every other operation fails afterwards.
    fn release(&self) -> Result<()>;

    /// Current play state.
    fn state(&self) -> PlayState;

    /// Shared handle to the object's local volume.
    fn volume(&self) -> Volume;

    /// Engine handle identifying the loaded media.
    fn handle(&self) -> MediaHandle;
}
