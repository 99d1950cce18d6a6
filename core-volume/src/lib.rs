//! # Volume Composition & Fade Engine
//!
//! Stereo volume model with multiplicative composition, ducking, mute,
//! and a timer-driven fade engine.
//!
//! ## Overview
//!
//! This crate is the leaf of the playback-control stack. A [`Volume`]
//! holds two channel levels and a channel offset; the calculated output
//! is `level × offset`, or 0 while muted. Sessions compose volumes by
//! writing the master's calculated channel into each pooled object's
//! local offset, so a local Volume's calculated levels are the final
//! per-channel values handed to the playback engine.
//!
//! Every effective change is fanned out synchronously to token-addressed
//! subscribers, in registration order. Fades run as a repeating timer
//! task on the ambient async runtime; one fade slot per Volume, a new
//! fade cancels the old one, and cancellation leaves the last applied
//! tick value.
//!
//! ## Usage
//!
//! ```rust
//! use core_volume::Volume;
//!
//! # fn main() -> Result<(), core_volume::VolumeError> {
//! let volume = Volume::new();
//! volume.set_channel(0.8)?;
//! volume.set_offset(0.5)?;
//! assert!((volume.calculated_channel() - 0.4).abs() < f32::EPSILON);
//!
//! // Ducking saves the offset and restores it exactly.
//! volume.duck();
//! assert_eq!(volume.offset(), Volume::DUCK_FLOOR);
//! volume.raise();
//! assert_eq!(volume.offset(), 0.5);
//! # Ok(())
//! # }
//! ```
//!
//! Fading needs a Tokio runtime to own the timer:
//!
//! ```rust,no_run
//! use core_volume::{FadeOutcome, Volume};
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), core_volume::VolumeError> {
//! let volume = Volume::new();
//! let fade = volume.fade_channel(0.0, Volume::FADE_NORMAL)?;
//! assert_eq!(fade.outcome().await, FadeOutcome::Completed);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod fade;
pub mod volume;

pub use error::VolumeError;
pub use fade::{FadeHandle, FadeOutcome, FADE_TICK};
pub use volume::{SubscriberId, Volume, VolumeEvent};
