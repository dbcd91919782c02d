//! Equal-tempered pitch conversion.

use crate::Note;

/// Concert A (note 69).
pub const A4_NOTE: Note = 69;
pub const A4_FREQUENCY: f64 = 440.0;

/// Convert a note index to a frequency in Hz.
///
/// Total over all integers; notes far outside the audible range simply
/// produce very small or very large frequencies.
#[inline]
pub fn frequency_of(note: Note) -> f64 {
    A4_FREQUENCY * 2.0_f64.powf((note as f64 - A4_NOTE as f64) / 12.0)
}

/// Frequency ratio for a pitch offset in cents (100 cents = 1 semitone).
#[inline]
pub fn cents_to_ratio(cents: f64) -> f64 {
    2.0_f64.powf(cents / 1200.0)
}
