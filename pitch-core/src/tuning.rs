//! # Musical Tuning Module
//!
//! Conversions between frequency and continuous musical pitch in
//! 12-tone equal temperament, relative to a configurable reference pitch.
//!
//! ## Features
//! - Validated reference pitch (A4) with a 415-465 Hz window
//! - Frequency <-> continuous MIDI-style pitch conversions
//! - Note names and octaves for the nearest semitone
//! - Cent deviation between two frequencies

use log::debug;
use once_cell::sync::Lazy;

use crate::error::EngineError;

/// Default concert pitch for A4 in Hz.
pub const DEFAULT_REFERENCE_HZ: f32 = 440.0;

/// Lowest accepted reference pitch in Hz.
pub const MIN_REFERENCE_HZ: f32 = 415.0;

/// Highest accepted reference pitch in Hz.
pub const MAX_REFERENCE_HZ: f32 = 465.0;

/// Pitch number of A4, the note the reference pitch is tuned to.
pub const A4_PITCH: f32 = 69.0;

/// Note names indexed by pitch class, starting from C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Labels such as "A4" or "C#3" for pitch numbers 0..=127.
static NOTE_LABELS: Lazy<Vec<String>> = Lazy::new(|| {
    (0..128)
        .map(|pitch| format!("{}{}", note_name(pitch), octave(pitch)))
        .collect()
});

/// The frequency A4 is tuned to.
///
/// Owned by whoever drives a session and handed to the tracker on every
/// update. The only way to change it is [`ReferencePitch::set`], which
/// refuses values outside 415-465 Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePitch(f32);

impl Default for ReferencePitch {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl ReferencePitch {
    /// Standard concert pitch, A4 = 440 Hz.
    pub const DEFAULT: Self = Self(DEFAULT_REFERENCE_HZ);

    /// Creates a reference pitch, validating the range.
    pub fn new(hz: f32) -> Result<Self, EngineError> {
        let mut reference = Self::default();
        reference.set(hz)?;
        Ok(reference)
    }

    pub fn hz(self) -> f32 {
        self.0
    }

    /// Updates the reference pitch.
    ///
    /// # Returns
    /// * `Ok(())` - The new value is in effect
    /// * `Err(EngineError::InvalidReferencePitch)` - Out of range; the previous
    ///   value is kept
    pub fn set(&mut self, hz: f32) -> Result<(), EngineError> {
        if !(MIN_REFERENCE_HZ..=MAX_REFERENCE_HZ).contains(&hz) {
            debug!("Rejected reference pitch {} Hz, keeping {} Hz", hz, self.0);
            return Err(EngineError::InvalidReferencePitch(hz));
        }
        self.0 = hz;
        Ok(())
    }
}

/// Converts a frequency to continuous musical pitch:
/// `69 + 12 * log2(freq / reference)`.
pub fn frequency_to_pitch(freq: f32, reference: ReferencePitch) -> f32 {
    A4_PITCH + 12.0 * (freq / reference.hz()).log2()
}

/// Converts continuous musical pitch back to a frequency in Hz.
pub fn pitch_to_frequency(pitch: f32, reference: ReferencePitch) -> f32 {
    reference.hz() * 2.0_f32.powf((pitch - A4_PITCH) / 12.0)
}

/// Nearest semitone to a continuous pitch.
pub fn nearest_semitone(pitch: f32) -> i32 {
    pitch.round() as i32
}

/// Deviation of a continuous pitch from its nearest semitone, in cents.
/// Unclamped; lies in [-50, 50] up to rounding ties.
pub fn cents_from_nearest(pitch: f32) -> f32 {
    (pitch - pitch.round()) * 100.0
}

/// Note name of a semitone number, e.g. `"A"` for 69.
pub fn note_name(semitone: i32) -> &'static str {
    NOTE_NAMES[semitone.rem_euclid(12) as usize]
}

/// Octave of a semitone number in scientific pitch notation (69 -> 4).
pub fn octave(semitone: i32) -> i32 {
    (semitone - 12).div_euclid(12)
}

/// Label combining note name and octave, e.g. `"C#3"`.
pub fn note_label(semitone: i32) -> String {
    match usize::try_from(semitone) {
        Ok(index) if index < NOTE_LABELS.len() => NOTE_LABELS[index].clone(),
        _ => format!("{}{}", note_name(semitone), octave(semitone)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_pitch_rejects_out_of_range_values() {
        let mut reference = ReferencePitch::new(442.0).unwrap();
        assert_eq!(
            reference.set(500.0),
            Err(EngineError::InvalidReferencePitch(500.0))
        );
        assert_eq!(reference.hz(), 442.0);

        assert!(reference.set(f32::NAN).is_err());
        assert!(reference.set(414.9).is_err());
        assert_eq!(reference.hz(), 442.0);

        assert!(reference.set(415.0).is_ok());
        assert!(reference.set(465.0).is_ok());
        assert_eq!(reference.hz(), 465.0);
    }

    #[test]
    fn a4_is_pitch_69() {
        let reference = ReferencePitch::default();
        assert!((frequency_to_pitch(440.0, reference) - 69.0).abs() < 1e-5);

        let baroque = ReferencePitch::new(415.0).unwrap();
        assert!((frequency_to_pitch(415.0, baroque) - 69.0).abs() < 1e-5);
        assert!((frequency_to_pitch(440.0, baroque) - 70.0).abs() < 0.02);
    }

    #[test]
    fn frequency_pitch_round_trip() {
        for reference_hz in [415.0, 432.0, 440.0, 465.0] {
            let reference = ReferencePitch::new(reference_hz).unwrap();
            for freq in [27.5, 82.41, 261.63, 440.0, 1046.5, 2500.0] {
                let back = pitch_to_frequency(frequency_to_pitch(freq, reference), reference);
                assert!(
                    (back - freq).abs() / freq < 1e-4,
                    "{} Hz came back as {} Hz (reference {})",
                    freq,
                    back,
                    reference_hz
                );
            }
        }
    }

    #[test]
    fn names_and_octaves() {
        assert_eq!(note_name(69), "A");
        assert_eq!(octave(69), 4);
        assert_eq!(note_name(60), "C");
        assert_eq!(octave(60), 4);
        assert_eq!(note_name(59), "B");
        assert_eq!(octave(59), 3);
        assert_eq!(note_name(-1), "B");
        assert_eq!(octave(-1), -2);
        assert_eq!(note_label(61), "C#4");
        assert_eq!(note_label(21), "A0");
        assert_eq!(note_label(200), "G#15");
    }

    #[test]
    fn cents_from_nearest_semitone() {
        assert!((cents_from_nearest(69.25) - 25.0).abs() < 1e-3);
        assert!((cents_from_nearest(68.9) + 10.0).abs() < 1e-3);
    }
}
