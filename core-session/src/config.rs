//! Session configuration types with serde defaults and validation.

use core_runtime::events::DEFAULT_EVENT_BUFFER_SIZE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Conventional crossfade duration for musical segues.
pub const DEFAULT_CROSSFADE: Duration = Duration::from_millis(2000);

/// Upper bound a configured crossfade may take.
const MAX_CROSSFADE: Duration = Duration::from_secs(60);

/// Default cap on simultaneously playing effect streams.
const DEFAULT_MAX_STREAMS: usize = 5;

/// Configuration for a music session.
///
/// # Example
///
/// ```rust
/// use core_session::config::MusicSessionConfig;
/// use std::time::Duration;
///
/// let config = MusicSessionConfig::default()
///     .with_crossfade(Duration::from_millis(800));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicSessionConfig {
    /// Crossfade stamped onto newly loaded tracks. Zero disables
    /// crossfading; tracks can still opt in individually later.
    #[serde(default)]
    pub crossfade: Duration,

    /// Buffer capacity of the session event bus.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for MusicSessionConfig {
    fn default() -> Self {
        Self {
            crossfade: Duration::ZERO,
            event_buffer: default_event_buffer(),
        }
    }
}

impl MusicSessionConfig {
    /// Preset with the conventional two-second crossfade on every track.
    pub fn crossfaded() -> Self {
        Self {
            crossfade: DEFAULT_CROSSFADE,
            ..Self::default()
        }
    }

    /// Set the crossfade applied to newly loaded tracks.
    pub fn with_crossfade(mut self, crossfade: Duration) -> Self {
        self.crossfade = crossfade;
        self
    }

    /// Set the event bus buffer capacity.
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.crossfade > MAX_CROSSFADE {
            return Err(format!(
                "crossfade must not exceed {} seconds",
                MAX_CROSSFADE.as_secs()
            ));
        }
        if self.event_buffer == 0 {
            return Err("event_buffer must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Configuration for an effects session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectsSessionConfig {
    /// Maximum simultaneously playing effect streams. Starting one more
    /// steals the oldest playing stream.
    #[serde(default = "default_max_streams")]
    pub max_streams: usize,

    /// Buffer capacity of the session event bus.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for EffectsSessionConfig {
    fn default() -> Self {
        Self {
            max_streams: default_max_streams(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl EffectsSessionConfig {
    /// Set the simultaneous stream cap.
    pub fn with_max_streams(mut self, max_streams: usize) -> Self {
        self.max_streams = max_streams;
        self
    }

    /// Set the event bus buffer capacity.
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_streams == 0 {
            return Err("max_streams must be at least 1".to_string());
        }
        if self.max_streams > 64 {
            return Err("max_streams must not exceed 64".to_string());
        }
        if self.event_buffer == 0 {
            return Err("event_buffer must be at least 1".to_string());
        }
        Ok(())
    }
}

fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER_SIZE
}

fn default_max_streams() -> usize {
    DEFAULT_MAX_STREAMS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_music_defaults() {
        let config = MusicSessionConfig::default();
        assert_eq!(config.crossfade, Duration::ZERO);
        assert_eq!(config.event_buffer, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_crossfaded_preset() {
        let config = MusicSessionConfig::crossfaded();
        assert_eq!(config.crossfade, DEFAULT_CROSSFADE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_music_builder_chaining() {
        let config = MusicSessionConfig::default()
            .with_crossfade(Duration::from_millis(500))
            .with_event_buffer(16);
        assert_eq!(config.crossfade, Duration::from_millis(500));
        assert_eq!(config.event_buffer, 16);
    }

    #[test]
    fn test_music_validation_rejects_extremes() {
        let config = MusicSessionConfig::default().with_crossfade(Duration::from_secs(61));
        assert!(config.validate().is_err());

        let config = MusicSessionConfig::default().with_event_buffer(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_effects_defaults() {
        let config = EffectsSessionConfig::default();
        assert_eq!(config.max_streams, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_effects_validation_bounds() {
        assert!(EffectsSessionConfig::default()
            .with_max_streams(0)
            .validate()
            .is_err());
        assert!(EffectsSessionConfig::default()
            .with_max_streams(65)
            .validate()
            .is_err());
        assert!(EffectsSessionConfig::default()
            .with_max_streams(64)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: MusicSessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.crossfade, Duration::ZERO);
        assert_eq!(config.event_buffer, DEFAULT_EVENT_BUFFER_SIZE);

        let config: EffectsSessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_streams, 5);
    }
}
