// Metronome configuration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Metronome error code constants
///
/// Error code range: 2001-2003
pub struct MetronomeErrorCodes {}

impl MetronomeErrorCodes {
    /// Time signature numerator outside 1-20
    pub const NUMERATOR_OUT_OF_RANGE: i32 = 2001;

    /// Subdivisions per beat outside 1-4
    pub const SUBDIVISION_OUT_OF_RANGE: i32 = 2002;

    /// Shared metronome state lock was poisoned
    pub const STATE_POISONED: i32 = 2003;
}

/// Log a metronome configuration error with structured context
pub fn log_metronome_error(err: &MetronomeError, context: &str) {
    error!(
        "Metronome error in {}: code={}, component=Metronome, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Metronome configuration errors
///
/// Time signature fields are caller-validated value objects and fail fast on
/// construction; tempo and volume are clamped by the facade instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetronomeError {
    /// Time signature numerator outside 1-20
    NumeratorOutOfRange { numerator: u8 },

    /// Subdivisions per beat outside 1-4
    SubdivisionOutOfRange { subdivisions: u8 },

    /// Shared metronome state lock was poisoned
    StatePoisoned,
}

impl ErrorCode for MetronomeError {
    fn code(&self) -> i32 {
        match self {
            MetronomeError::NumeratorOutOfRange { .. } => {
                MetronomeErrorCodes::NUMERATOR_OUT_OF_RANGE
            }
            MetronomeError::SubdivisionOutOfRange { .. } => {
                MetronomeErrorCodes::SUBDIVISION_OUT_OF_RANGE
            }
            MetronomeError::StatePoisoned => MetronomeErrorCodes::STATE_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            MetronomeError::NumeratorOutOfRange { numerator } => {
                format!("Time signature numerator must be 1-20 (got {})", numerator)
            }
            MetronomeError::SubdivisionOutOfRange { subdivisions } => {
                format!("Subdivisions per beat must be 1-4 (got {})", subdivisions)
            }
            MetronomeError::StatePoisoned => "Metronome state lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for MetronomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MetronomeError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for MetronomeError {}
