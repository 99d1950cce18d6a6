//! # Audio Session Module
//!
//! Session lifecycle, the generic audio-object pool, and the concrete
//! playable objects for music tracks and effect samples.
//!
//! ## Overview
//!
//! This module handles:
//! - Generic pool of playable objects with master-volume fan-out
//! - Music session: exclusive playback, focus arbitration, crossfade
//! - Effects session: polyphonic samples, async load routing, stream cap
//! - Session lifecycle (start / stop / release_all) and output routing
//!
//! Decoding, mixing, and output stay behind the `engine-traits`
//! collaborators injected at session construction.

pub mod config;
pub mod effects;
pub mod error;
pub mod music;
pub mod playable;
pub mod pool;
pub mod session;

pub use config::{EffectsSessionConfig, MusicSessionConfig, DEFAULT_CROSSFADE};
pub use effects::{EffectSample, EffectsSession};
pub use error::{Result, SessionError};
pub use music::{MusicSession, MusicTrack};
pub use playable::{PlayState, Playable, SessionState};
pub use pool::AudioPool;
pub use session::AudioSession;
