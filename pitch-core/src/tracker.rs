//! # Pitch Tracker
//!
//! Turns the noisy per-frame pitch candidates into a stable displayed pitch.
//!
//! ## Behaviour
//! - Candidates outside a plausible instrument range count as no pitch
//! - A single-pole low-pass smooths the continuous pitch
//! - Short dropouts are bridged: the displayed pitch is only cleared after
//!   more than [`DROPOUT_FRAMES`] consecutive frames without a candidate
//! - Every update appends to a bounded cents-deviation history

use log::debug;

use crate::history::History;
use crate::tuning::{self, ReferencePitch};

/// Lowest candidate frequency accepted as a real note, in Hz.
pub const MIN_INSTRUMENT_HZ: f32 = 25.0;

/// Highest candidate frequency accepted as a real note, in Hz.
pub const MAX_INSTRUMENT_HZ: f32 = 2500.0;

/// Weight of the newest pitch in the low-pass filter.
pub const SMOOTHING: f32 = 0.32;

/// Consecutive silent frames tolerated before the pitch is cleared.
pub const DROPOUT_FRAMES: u32 = 5;

/// Largest deviation, in cents, still reported as in tune.
pub const IN_TUNE_CENTS: f32 = 5.0;

/// Display range of the cents deviation.
pub const DISPLAY_CENTS_LIMIT: f32 = 50.0;

/// Display-ready view of a tracked pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchReading {
    /// Smoothed continuous pitch (69.0 = A4 at the reference pitch).
    pub pitch: f32,
    /// Smoothed pitch converted back to Hz.
    pub frequency: f32,
    /// Nearest semitone number.
    pub semitone: i32,
    pub note: &'static str,
    pub octave: i32,
    /// Unclamped deviation from the nearest semitone.
    pub cents: f32,
    pub in_tune: bool,
}

impl PitchReading {
    /// Derives the display values for a continuous pitch.
    pub fn from_pitch(pitch: f32, reference: ReferencePitch) -> Self {
        let semitone = tuning::nearest_semitone(pitch);
        let cents = tuning::cents_from_nearest(pitch);
        Self {
            pitch,
            frequency: tuning::pitch_to_frequency(pitch, reference),
            semitone,
            note: tuning::note_name(semitone),
            octave: tuning::octave(semitone),
            cents,
            in_tune: cents.abs() <= IN_TUNE_CENTS,
        }
    }

    /// Cents deviation clamped to the display range.
    pub fn display_cents(&self) -> f32 {
        self.cents.clamp(-DISPLAY_CENTS_LIMIT, DISPLAY_CENTS_LIMIT)
    }

    /// Note name with octave, e.g. "A4".
    pub fn label(&self) -> String {
        tuning::note_label(self.semitone)
    }
}

/// Smoothing and dropout-hysteresis state for one capture session.
#[derive(Debug, Clone)]
pub struct PitchTracker {
    smoothed: Option<f32>,
    silent_frames: u32,
    cents_history: History<f32>,
}

impl PitchTracker {
    /// Creates a tracker keeping `history_capacity` recent cents values.
    pub fn new(history_capacity: usize) -> Self {
        Self {
            smoothed: None,
            silent_frames: 0,
            cents_history: History::new(history_capacity),
        }
    }

    /// Feeds one frame's candidate frequency into the tracker.
    ///
    /// # Arguments
    /// * `candidate` - The estimator's frequency for this frame, if any
    /// * `reference` - The reference pitch in effect for this frame
    ///
    /// # Returns
    /// The reading to display after this frame, or `None` once the signal is
    /// considered gone.
    pub fn update(
        &mut self,
        candidate: Option<f32>,
        reference: ReferencePitch,
    ) -> Option<PitchReading> {
        let voiced = candidate
            .filter(|freq| (MIN_INSTRUMENT_HZ..=MAX_INSTRUMENT_HZ).contains(freq));

        match voiced {
            Some(freq) => {
                let pitch = tuning::frequency_to_pitch(freq, reference);
                let smoothed = match self.smoothed {
                    Some(previous) => SMOOTHING * pitch + (1.0 - SMOOTHING) * previous,
                    None => pitch,
                };
                self.smoothed = Some(smoothed);
                self.silent_frames = 0;
                self.cents_history.push(tuning::cents_from_nearest(smoothed));
            }
            None => {
                self.silent_frames = self.silent_frames.saturating_add(1);
                // Flat line during silence rather than a gap.
                self.cents_history.push(0.0);
                if self.silent_frames > DROPOUT_FRAMES && self.smoothed.take().is_some() {
                    debug!("Pitch lost after {} silent frames", self.silent_frames);
                }
            }
        }

        self.reading(reference)
    }

    /// The current reading without feeding a new frame.
    pub fn reading(&self, reference: ReferencePitch) -> Option<PitchReading> {
        self.smoothed
            .map(|pitch| PitchReading::from_pitch(pitch, reference))
    }

    pub fn smoothed_pitch(&self) -> Option<f32> {
        self.smoothed
    }

    /// Consecutive frames without a usable candidate.
    pub fn silent_frames(&self) -> u32 {
        self.silent_frames
    }

    pub fn cents_history(&self) -> &History<f32> {
        &self.cents_history
    }

    /// Returns to the state of a freshly created tracker.
    pub fn reset(&mut self) {
        self.smoothed = None;
        self.silent_frames = 0;
        self.cents_history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A4: ReferencePitch = ReferencePitch::DEFAULT;

    #[test]
    fn first_candidate_is_adopted_directly() {
        let mut tracker = PitchTracker::new(16);
        let reading = tracker.update(Some(440.0), A4).unwrap();
        assert!((reading.pitch - 69.0).abs() < 1e-4);
        assert_eq!(reading.note, "A");
        assert_eq!(reading.octave, 4);
        assert!(reading.in_tune);
        assert_eq!(reading.label(), "A4");
    }

    #[test]
    fn later_candidates_are_low_passed() {
        let mut tracker = PitchTracker::new(16);
        tracker.update(Some(440.0), A4);
        let a_sharp = tuning::pitch_to_frequency(70.0, A4);
        let reading = tracker.update(Some(a_sharp), A4).unwrap();
        assert!(
            (reading.pitch - 69.32).abs() < 1e-3,
            "Expected 69.32, got {}",
            reading.pitch
        );
        assert!((reading.cents - 32.0).abs() < 0.1);
        assert!(!reading.in_tune);
    }

    #[test]
    fn single_dropout_keeps_the_pitch() {
        let mut tracker = PitchTracker::new(16);
        for _ in 0..4 {
            tracker.update(Some(440.0), A4);
        }
        assert!(tracker.update(None, A4).is_some());
        assert_eq!(tracker.silent_frames(), 1);

        // Voicing resumes and the counter resets.
        assert!(tracker.update(Some(440.0), A4).is_some());
        assert_eq!(tracker.silent_frames(), 0);
    }

    #[test]
    fn pitch_clears_after_hysteresis() {
        let mut tracker = PitchTracker::new(16);
        for _ in 0..4 {
            tracker.update(Some(440.0), A4);
        }
        for frame in 1..=DROPOUT_FRAMES {
            assert!(
                tracker.update(None, A4).is_some(),
                "pitch cleared after only {} silent frames",
                frame
            );
        }
        assert!(tracker.update(None, A4).is_none());
        assert_eq!(tracker.smoothed_pitch(), None);
    }

    #[test]
    fn out_of_range_candidates_count_as_silence() {
        let mut tracker = PitchTracker::new(16);
        tracker.update(Some(440.0), A4);
        tracker.update(Some(3000.0), A4);
        tracker.update(Some(10.0), A4);
        tracker.update(Some(f32::NAN), A4);
        assert_eq!(tracker.silent_frames(), 3);
        assert!((tracker.smoothed_pitch().unwrap() - 69.0).abs() < 1e-4);
    }

    #[test]
    fn silence_writes_zero_cents() {
        let mut tracker = PitchTracker::new(4);
        let sharp = tuning::pitch_to_frequency(69.2, A4);
        tracker.update(Some(sharp), A4);
        tracker.update(None, A4);
        let history: Vec<f32> = tracker.cents_history().iter().copied().collect();
        assert_eq!(history.len(), 2);
        assert!((history[0] - 20.0).abs() < 0.1);
        assert_eq!(history[1], 0.0);

        for _ in 0..10 {
            tracker.update(None, A4);
        }
        assert_eq!(tracker.cents_history().len(), 4);
    }

    #[test]
    fn reference_pitch_shifts_the_reading() {
        let mut tracker = PitchTracker::new(16);
        let reference = ReferencePitch::new(442.0).unwrap();
        let reading = tracker.update(Some(442.0), reference).unwrap();
        assert_eq!(reading.label(), "A4");
        assert!(reading.cents.abs() < 0.01);
        assert!((reading.frequency - 442.0).abs() < 0.01);
    }

    #[test]
    fn display_cents_is_clamped() {
        let reading = PitchReading {
            cents: -72.0,
            ..PitchReading::from_pitch(69.0, A4)
        };
        assert_eq!(reading.display_cents(), -50.0);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut tracker = PitchTracker::new(16);
        tracker.update(Some(440.0), A4);
        tracker.update(None, A4);
        tracker.reset();
        assert_eq!(tracker.smoothed_pitch(), None);
        assert_eq!(tracker.silent_frames(), 0);
        assert!(tracker.cents_history().is_empty());
    }
}
