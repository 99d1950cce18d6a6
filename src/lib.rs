//! Workspace facade crate.
//!
//! This crate re-exports the individual workspace crates (`engine-traits`,
//! `core-volume`, `core-runtime`, `core-session`) under one roof. Host
//! applications can depend on `msc-workspace` and reach the whole
//! playback-control surface without wiring each crate individually.

pub use core_runtime as runtime;
pub use core_session as session;
pub use core_volume as volume;
pub use engine_traits as traits;

pub use core_runtime::events::{EventBus, EventStream, SessionEvent};
pub use core_session::{
    AudioPool, AudioSession, EffectSample, EffectsSession, EffectsSessionConfig, MusicSession,
    MusicSessionConfig, MusicTrack, PlayState, Playable, SessionError, SessionState,
};
pub use core_volume::{FadeHandle, FadeOutcome, Volume, VolumeError, VolumeEvent};
pub use engine_traits::{
    EngineError, FocusChange, FocusHost, FocusKind, FocusResponse, LoadCompletion, MediaHandle,
    MediaSource, OutputRoute, OutputRouting, PlaybackEngine, StreamKind,
};
