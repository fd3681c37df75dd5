//! # Band Energy Estimator
//!
//! A coarse pseudo-spectrum for visualization. Each band samples the
//! unbiased autocorrelation at the lag of a log-spaced target frequency, so
//! it reports periodicity at musically relevant frequencies rather than
//! literal spectral magnitude.

use crate::pitch::autocorrelation;

/// Lowest band target frequency in Hz.
pub const LOW_BAND_HZ: f32 = 80.0;

/// Highest band target frequency in Hz.
pub const HIGH_BAND_HZ: f32 = 5000.0;

/// Shortest lag a band can sample.
const MIN_BAND_LAG: usize = 2;

/// Target frequency of band `index` out of `band_count`, log-spaced between
/// [`LOW_BAND_HZ`] and [`HIGH_BAND_HZ`].
pub fn band_frequency(index: usize, band_count: usize) -> f32 {
    if band_count < 2 {
        return LOW_BAND_HZ;
    }
    let position = index as f32 / (band_count - 1) as f32;
    LOW_BAND_HZ * (HIGH_BAND_HZ / LOW_BAND_HZ).powf(position)
}

/// Computes band energies for a session's fixed sample rate and band count.
///
/// The per-band lags are worked out once up front.
#[derive(Debug, Clone)]
pub struct BandEstimator {
    lags: Vec<usize>,
}

impl BandEstimator {
    pub fn new(band_count: usize, sample_rate: u32) -> Self {
        let lags = (0..band_count)
            .map(|i| (sample_rate as f32 / band_frequency(i, band_count)).round() as usize)
            .collect();
        Self { lags }
    }

    pub fn band_count(&self) -> usize {
        self.lags.len()
    }

    /// Fills `bands` with normalized energies for `frame`.
    ///
    /// `bands` is resized to the band count. A band whose lag falls outside
    /// `[2, frame.len())` reads zero. The vector is normalized by its own
    /// maximum so the strongest band is exactly 1.0; it is all zero only when
    /// no band saw positive correlation.
    pub fn compute_into(&self, frame: &[f32], bands: &mut Vec<f32>) {
        bands.clear();
        bands.extend(self.lags.iter().map(|&lag| {
            if lag < MIN_BAND_LAG || lag >= frame.len() {
                0.0
            } else {
                autocorrelation(frame, lag)
            }
        }));

        let max = bands.iter().copied().fold(0.0f32, f32::max);
        if max > 0.0 {
            for energy in bands.iter_mut() {
                *energy = (*energy / max).clamp(0.0, 1.0);
            }
        } else {
            bands.iter_mut().for_each(|energy| *energy = 0.0);
        }
    }

    pub fn compute(&self, frame: &[f32]) -> Vec<f32> {
        let mut bands = Vec::with_capacity(self.lags.len());
        self.compute_into(frame, &mut bands);
        bands
    }
}

/// One-shot band energies for a single frame.
pub fn compute_bands(frame: &[f32], sample_rate: u32, band_count: usize) -> Vec<f32> {
    BandEstimator::new(band_count, sample_rate).compute(frame)
}
