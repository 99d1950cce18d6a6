//! Audio-focus host contract.
//!
//! A device has one physical output and the platform arbitrates which
//! client may use it. The control core requests focus before starting
//! music playback, abandons it whenever playback pauses or stops, and
//! reacts to asynchronous focus-change events pushed by the host.
//!
//! Focus denial is an ordinary outcome, not an error: a denied request
//! leaves the core's playback state untouched and the caller may retry.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Buffer size for focus-change subscriptions on the built-in host.
const FOCUS_CHANNEL_CAPACITY: usize = 16;

/// Stream category a focus request applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    /// Long-form music playback.
    Music,
    /// Short sound effects.
    Effects,
}

/// How much of the output a focus request claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FocusKind {
    /// Long-lived focus for an open-ended playback session.
    Gain,
    /// Short-lived focus for a transient sound.
    GainTransient,
}

/// Host verdict on a focus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusResponse {
    Granted,
    Denied,
}

impl FocusResponse {
    pub fn is_granted(&self) -> bool {
        matches!(self, FocusResponse::Granted)
    }
}

/// Focus-change event pushed by the host arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FocusChange {
    /// Focus (re)acquired; playback may resume at full level.
    Gain,
    /// Focus lost for good; playback should stop.
    Loss,
    /// Focus lost briefly; playback should pause and await a `Gain`.
    LossTransient,
    /// Another sound plays briefly; keep playing at a lowered level.
    LossTransientCanDuck,
}

/// Trait for the platform audio-focus arbiter.
pub trait FocusHost: Send + Sync {
    /// Ask for focus on the given stream.
    fn request_focus(&self, stream: StreamKind, kind: FocusKind) -> FocusResponse;

    /// Give previously granted focus back.
    fn abandon_focus(&self);

    /// Subscribe to focus-change events.
    fn focus_changes(&self) -> broadcast::Receiver<FocusChange>;
}

/// Focus host that grants every request.
///
/// Suitable for hosts without platform arbitration and for tests, where
/// [`announce`](GrantAllFocus::announce) simulates external focus events.
pub struct GrantAllFocus {
    changes: broadcast::Sender<FocusChange>,
}

impl GrantAllFocus {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(FOCUS_CHANNEL_CAPACITY);
        Self { changes }
    }

    /// Push a focus-change event to every subscriber. Returns how many
    /// subscribers received it.
    pub fn announce(&self, change: FocusChange) -> usize {
        self.changes.send(change).unwrap_or(0)
    }
}

impl Default for GrantAllFocus {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusHost for GrantAllFocus {
    fn request_focus(&self, _stream: StreamKind, _kind: FocusKind) -> FocusResponse {
        FocusResponse::Granted
    }

    fn abandon_focus(&self) {}

    fn focus_changes(&self) -> broadcast::Receiver<FocusChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_all_grants() {
        let host = GrantAllFocus::new();
        let response = host.request_focus(StreamKind::Music, FocusKind::Gain);
        assert!(response.is_granted());
    }

    #[test]
    fn announce_without_subscribers_is_silent() {
        let host = GrantAllFocus::new();
        assert_eq!(host.announce(FocusChange::Gain), 0);
    }

    #[tokio::test]
    async fn announce_reaches_subscribers() {
        let host = GrantAllFocus::new();
        let mut rx = host.focus_changes();
        assert_eq!(host.announce(FocusChange::LossTransientCanDuck), 1);
        assert_eq!(rx.recv().await.unwrap(), FocusChange::LossTransientCanDuck);
    }
}
