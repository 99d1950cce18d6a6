//! Output-route query contract.
//!
//! Sessions expose "where is the audio going" as a read-only question
//! answered by the host. Several physical connections can be active at
//! the same time (a Bluetooth sink plus a wired headset, say); the host
//! only reports which are on, and the session applies the priority
//! ordering to pick the effective route.

use serde::{Deserialize, Serialize};

/// Physical output carrying the audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputRoute {
    /// Bluetooth A2DP sink.
    A2dp,
    /// Speakerphone mode.
    Speakerphone,
    /// Wired headset or headphones.
    Headset,
    /// Built-in speaker, the default route.
    Speaker,
}

/// Read-only view of the device's active output connections.
pub trait OutputRouting: Send + Sync {
    fn is_a2dp_on(&self) -> bool;

    fn is_speakerphone_on(&self) -> bool;

    fn is_wired_headset_on(&self) -> bool;
}

/// Routing stub reporting a fixed configuration.
///
/// The default reports nothing connected, which resolves to the built-in
/// speaker.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedRouting {
    pub a2dp: bool,
    pub speakerphone: bool,
    pub wired_headset: bool,
}

impl OutputRouting for FixedRouting {
    fn is_a2dp_on(&self) -> bool {
        self.a2dp
    }

    fn is_speakerphone_on(&self) -> bool {
        self.speakerphone
    }

    fn is_wired_headset_on(&self) -> bool {
        self.wired_headset
    }
}
