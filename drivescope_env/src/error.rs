//! Error types for the DriveScope environment abstraction.

use crate::types::SensorChannel;
use thiserror::Error;

/// Errors that can occur between the pipeline and the platform it runs on.
///
/// None of these are fatal to a session: sensor errors degrade a single
/// channel, audio errors are retried on the next qualifying event.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    /// User declined the platform grant for a sensor channel
    #[error("Permission denied for {0} sensor")]
    PermissionDenied(SensorChannel),

    /// Grant succeeded (or was not needed) but no data arrives, or the
    /// platform lacks the capability altogether
    #[error("{0} sensor not available: {1}")]
    SensorUnavailable(SensorChannel, String),

    /// Malformed sample, dropped at the ingestion boundary
    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    /// Beep requested before the sound device was unlocked
    #[error("Audio output is locked")]
    AudioLocked,

    /// Beep suppressed by the minimum-interval rate limit
    #[error("Beep debounced ({remaining_ms}ms remaining)")]
    Debounced { remaining_ms: u64 },

    /// Sound device refused to arm or play
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    /// Settings store I/O or decoding failure
    #[error("Settings error: {0}")]
    Settings(String),

    /// The consuming end of a sample channel is gone
    #[error("Sample channel closed")]
    ChannelClosed,
}

impl SensorError {
    /// Creates an unavailable error for a channel.
    pub fn unavailable(channel: SensorChannel, reason: impl Into<String>) -> Self {
        Self::SensorUnavailable(channel, reason.into())
    }

    /// Creates an invalid-sample error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidSample(reason.into())
    }

    /// Creates a settings error.
    pub fn settings(reason: impl std::fmt::Display) -> Self {
        Self::Settings(reason.to_string())
    }

    /// Returns true for the two audio outcomes that are expected during
    /// normal operation rather than faults.
    pub fn is_audio_suppression(&self) -> bool {
        matches!(self, Self::AudioLocked | Self::Debounced { .. })
    }
}
