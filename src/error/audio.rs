// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// A single source of truth for the numeric codes reported across the host
/// boundary when a device operation fails.
///
/// Error code range: 1001-1005
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// No usable output device was found
    pub const DEVICE_UNAVAILABLE: i32 = 1001;

    /// Failed to open the output stream
    pub const STREAM_OPEN_FAILED: i32 = 1002;

    /// Hardware error during stream start/write
    pub const HARDWARE_ERROR: i32 = 1003;

    /// Stream died while playback was running
    pub const STREAM_FAILURE: i32 = 1004;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1005;
}

/// Log an audio error with structured context
///
/// Playback-boundary errors are logged and swallowed rather than propagated
/// (the engine degrades to stopped-silent), so this is the single place where
/// device failures become visible.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=AudioSink, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These cover sink lifecycle operations: device lookup, stream open/start,
/// and streaming writes.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No usable output device was found
    DeviceUnavailable { reason: String },

    /// Failed to open the output stream
    StreamOpenFailed { reason: String },

    /// Hardware error during stream start/write
    HardwareError { details: String },

    /// Stream died while playback was running (callback side gone)
    StreamFailure { reason: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::DeviceUnavailable { .. } => AudioErrorCodes::DEVICE_UNAVAILABLE,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::StreamFailure { .. } => AudioErrorCodes::STREAM_FAILURE,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::DeviceUnavailable { reason } => {
                format!("No output device available: {}", reason)
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::StreamFailure { reason } => {
                format!("Audio stream failed: {}", reason)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AudioError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::HardwareError {
            details: err.to_string(),
        }
    }
}
