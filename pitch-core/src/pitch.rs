//! # Pitch Detection Module
//!
//! Estimates the fundamental frequency of one frame of monophonic audio with
//! a direct (non-FFT) autocorrelation search.
//!
//! ## Features
//! - RMS noise gate so silence reads as "no pitch" rather than 0 Hz
//! - Unbiased autocorrelation over a 40-1600 Hz lag range
//! - Weak-peak rejection and an octave-error guard
//! - Parabolic interpolation for sub-sample lag accuracy

/// Frames quieter than this RMS (on the [-1, 1] scale) are silence.
pub const SILENCE_RMS: f32 = 0.007;

/// Correlation peaks weaker than this are too unreliable to report.
const WEAK_PEAK: f32 = 0.05 * SILENCE_RMS;

/// Highest fundamental searched for, in Hz. Sets the shortest lag.
pub const MAX_SEARCH_HZ: u32 = 1600;

/// Lowest fundamental searched for, in Hz. Sets the longest lag.
pub const MIN_SEARCH_HZ: u32 = 40;

/// A candidate lag must reach this fraction of the strongest correlation.
/// Multiples of the true period score almost as high as the period itself,
/// so the first peak clearing this bar is taken instead of the global one.
const OCTAVE_GUARD: f32 = 0.9;

/// Parabolic refinement is skipped below this denominator magnitude.
const INTERPOLATION_EPSILON: f32 = 1e-9;

/// A per-frame pitch estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchCandidate {
    /// Estimated fundamental frequency in Hz.
    pub frequency: f32,
    /// Peak correlation relative to the frame energy (0.0 to 1.0).
    pub confidence: f32,
}

/// Root-mean-square amplitude of a frame. Zero for an empty frame.
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|&s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
}

/// Unbiased autocorrelation of `frame` at `lag`:
/// `sum(x[i] * x[i + lag]) / (N - lag)`.
///
/// Returns 0.0 when `lag` leaves no overlapping samples.
pub fn autocorrelation(frame: &[f32], lag: usize) -> f32 {
    let n = frame.len();
    if lag >= n {
        return 0.0;
    }
    let sum: f32 = frame[..n - lag]
        .iter()
        .zip(&frame[lag..])
        .map(|(a, b)| a * b)
        .sum();
    sum / (n - lag) as f32
}

/// The inclusive lag range searched for a frame of `frame_len` samples.
///
/// The upper bound is limited to half the frame so every lag keeps at least
/// half the frame in the overlap.
///
/// # Returns
/// * `Some((min_lag, max_lag))` - A non-empty search range
/// * `None` - The frame is too short for this sample rate
pub fn lag_range(sample_rate: u32, frame_len: usize) -> Option<(usize, usize)> {
    let min_lag = ((sample_rate / MAX_SEARCH_HZ) as usize).max(1);
    let max_lag = ((sample_rate / MIN_SEARCH_HZ) as usize).min(frame_len / 2);
    (min_lag < max_lag).then_some((min_lag, max_lag))
}

/// Autocorrelation pitch estimator.
///
/// Holds a correlation buffer that is reused from frame to frame, so a
/// long-lived estimator does not allocate on the per-frame path.
#[derive(Debug, Clone, Default)]
pub struct PitchEstimator {
    correlations: Vec<f32>,
}

impl PitchEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimates the fundamental frequency of `frame`.
    ///
    /// # Arguments
    /// * `frame` - Normalized samples in [-1, 1]
    /// * `sample_rate` - The session's actual sample rate in Hz
    ///
    /// # Returns
    /// * `Some(candidate)` - A detected fundamental
    /// * `None` - Silence, a correlation peak too weak to trust, or a frame
    ///   too short to search
    pub fn estimate(&mut self, frame: &[f32], sample_rate: u32) -> Option<PitchCandidate> {
        // --- Noise gate: silence is "no pitch", never "pitch zero" ---
        if rms(frame) < SILENCE_RMS {
            return None;
        }

        let (min_lag, max_lag) = lag_range(sample_rate, frame.len())?;

        self.correlations.clear();
        self.correlations
            .extend((min_lag..=max_lag).map(|lag| autocorrelation(frame, lag)));
        let corr = &self.correlations;

        let (strongest, peak) = corr
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, c)| {
                if c > best.1 { (i, c) } else { best }
            });

        if peak < WEAK_PEAK {
            return None;
        }

        // --- Octave guard: earliest local peak close to the strongest one ---
        let floor = OCTAVE_GUARD * peak;
        let index = (1..corr.len() - 1)
            .find(|&i| corr[i] >= floor && corr[i] >= corr[i - 1] && corr[i] >= corr[i + 1])
            .unwrap_or(strongest);

        // --- Parabolic interpolation around the chosen lag ---
        let mut lag = (min_lag + index) as f32;
        if index > 0 && index + 1 < corr.len() {
            let (y0, y1, y2) = (corr[index - 1], corr[index], corr[index + 1]);
            let denominator = 2.0 * (2.0 * y1 - y0 - y2);
            if denominator.abs() > INTERPOLATION_EPSILON {
                lag += (y0 - y2) / denominator;
            }
        }

        let energy = autocorrelation(frame, 0);
        let confidence = if energy > 0.0 {
            (corr[index] / energy).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Some(PitchCandidate {
            frequency: sample_rate as f32 / lag,
            confidence,
        })
    }
}

/// One-shot pitch estimate for a single frame.
///
/// Convenience wrapper around [`PitchEstimator`]; allocates a correlation
/// buffer per call.
pub fn estimate_pitch(frame: &[f32], sample_rate: u32) -> Option<f32> {
    PitchEstimator::new()
        .estimate(frame, sample_rate)
        .map(|candidate| candidate.frequency)
}
