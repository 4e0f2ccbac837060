//! Time signature value type
//!
//! A validated pair of measure numerator and subdivisions per beat.
//! Construction outside the valid ranges fails fast; everything downstream
//! can therefore treat the fields as trusted.

use serde::{Deserialize, Serialize};

use crate::error::MetronomeError;

/// Beats per measure and subdivisions per beat.
///
/// `numerator` is 1-20, `subdivisions` 1-4. The numerator also determines
/// how many visual indicators a measure gets (capped by display capacity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    numerator: u8,
    subdivisions: u8,
}

impl TimeSignature {
    /// 4/4 with quarter-note pulses
    pub const COMMON_TIME: TimeSignature = TimeSignature {
        numerator: 4,
        subdivisions: 1,
    };

    /// Validated constructor
    ///
    /// # Errors
    /// `MetronomeError::NumeratorOutOfRange` / `SubdivisionOutOfRange` when a
    /// field falls outside its range.
    pub fn new(numerator: u8, subdivisions: u8) -> Result<Self, MetronomeError> {
        if !(1..=20).contains(&numerator) {
            return Err(MetronomeError::NumeratorOutOfRange { numerator });
        }
        if !(1..=4).contains(&subdivisions) {
            return Err(MetronomeError::SubdivisionOutOfRange { subdivisions });
        }
        Ok(Self {
            numerator,
            subdivisions,
        })
    }

    pub fn numerator(&self) -> u8 {
        self.numerator
    }

    pub fn subdivisions(&self) -> u8 {
        self.subdivisions
    }

    /// Number of visual indicators for one measure (before display capping)
    pub fn indicator_count(&self) -> usize {
        self.numerator as usize
    }

    /// Beat-subdivision slots in one measure; the pulse counter wraps here
    pub fn pulses_per_measure(&self) -> u32 {
        self.numerator as u32 * self.subdivisions as u32
    }

    /// Display label in "N/D" form
    pub fn label(&self) -> String {
        format!("{}/{}", self.numerator, self.subdivisions)
    }

    /// Pack into a u32 for atomic storage
    pub(crate) fn pack(self) -> u32 {
        ((self.numerator as u32) << 8) | self.subdivisions as u32
    }

    /// Inverse of `pack`; only ever fed values produced by `pack`
    pub(crate) fn unpack(raw: u32) -> Self {
        Self {
            numerator: ((raw >> 8) & 0xFF) as u8,
            subdivisions: (raw & 0xFF) as u8,
        }
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::COMMON_TIME
    }
}
