//! # Playback Engine Traits
//!
//! Host abstraction traits consumed by the playback-control core.
//!
//! ## Overview
//!
//! This crate defines the contract between the control core and whatever
//! actually produces sound. The core tracks playback intent, composes
//! volumes, and arbitrates audio focus; everything that touches a codec,
//! a mixer, or an output device lives behind these traits and is injected
//! at session construction.
//!
//! ## Traits
//!
//! - [`PlaybackEngine`](playback::PlaybackEngine) - Load media, start /
//!   pause / resume / stop handles, push per-channel levels
//! - [`FocusHost`](focus::FocusHost) - Request and abandon audio focus,
//!   receive asynchronous focus-change events
//! - [`OutputRouting`](routing::OutputRouting) - Read-only query of the
//!   active physical output connections
//!
//! ## Non-blocking Contract
//!
//! The core calls into [`PlaybackEngine`](playback::PlaybackEngine) from
//! synchronous volume-change dispatch, so every trait method must return
//! without waiting on hardware or I/O. Engines queue real work internally;
//! asynchronous outcomes (media readiness, focus changes) come back over
//! broadcast channels rather than blocking calls.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` so sessions can share them across
//! async tasks. Implementations must ensure their own interior
//! synchronization.
//!
//! ## Examples
//!
//! ### Implementing PlaybackEngine
//!
//! ```ignore
//! use engine_traits::playback::{LoadCompletion, MediaHandle, MediaSource, PlaybackEngine};
//! use engine_traits::error::Result;
//! use tokio::sync::broadcast;
//!
//! pub struct MyEngine {
//!     completions: broadcast::Sender<LoadCompletion>,
//!     // native player state...
//! }
//!
//! impl PlaybackEngine for MyEngine {
//!     fn load(&self, source: MediaSource) -> Result<MediaHandle> {
//!         let handle = MediaHandle::new();
//!         // hand off to the native loader, report through `completions`
//!         Ok(handle)
//!     }
//!
//!     fn start(&self, handle: MediaHandle) -> Result<()> {
//!         // enqueue a start command
//!         Ok(())
//!     }
//!
//!     // ...remaining control calls...
//!     # fn pause(&self, _: MediaHandle) -> Result<()> { Ok(()) }
//!     # fn resume(&self, _: MediaHandle) -> Result<()> { Ok(()) }
//!     # fn stop(&self, _: MediaHandle) -> Result<()> { Ok(()) }
//!     # fn set_volume(&self, _: MediaHandle, _: f32, _: f32) -> Result<()> { Ok(()) }
//!     # fn set_rate(&self, _: MediaHandle, _: f32) -> Result<()> { Ok(()) }
//!     # fn set_looping(&self, _: MediaHandle, _: bool) -> Result<()> { Ok(()) }
//!     # fn unload(&self, _: MediaHandle) -> Result<()> { Ok(()) }
//!
//!     fn load_completions(&self) -> broadcast::Receiver<LoadCompletion> {
//!         self.completions.subscribe()
//!     }
//! }
//! ```

pub mod error;
pub mod focus;
pub mod playback;
pub mod routing;

pub use error::EngineError;

// Re-export commonly used types
pub use focus::{FocusChange, FocusHost, FocusKind, FocusResponse, GrantAllFocus, StreamKind};
pub use playback::{LoadCompletion, MediaHandle, MediaSource, PlaybackEngine};
pub use routing::{FixedRouting, OutputRoute, OutputRouting};
