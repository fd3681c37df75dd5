//! # Level Meter
//!
//! Fast-attack, slow-release envelope follower over per-frame RMS, with a
//! peak marker that holds for a while before sinking back down.

use crate::pitch::rms;

/// Gain applied to frame RMS before clamping to [0, 1].
pub const LEVEL_GAIN: f32 = 3.0;

/// Per-frame envelope release factor.
pub const LEVEL_DECAY: f32 = 0.9;

/// Frames the peak marker holds before it starts to fall.
pub const PEAK_HOLD_FRAMES: u32 = 30;

/// Per-frame peak release factor once the hold has expired.
pub const PEAK_DECAY: f32 = 0.97;

/// Envelope and peak-hold state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LevelMeter {
    level: f32,
    peak: f32,
    hold: u32,
}

/// Level and peak after a frame, both in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LevelReading {
    pub level: f32,
    pub peak: f32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantaneous meter value for a frame: scaled, clamped RMS.
    pub fn instant(frame: &[f32]) -> f32 {
        (rms(frame) * LEVEL_GAIN).clamp(0.0, 1.0)
    }

    /// Advances the meter by one frame.
    pub fn update(&mut self, frame: &[f32]) -> LevelReading {
        let instant = Self::instant(frame);

        if instant > self.level {
            self.level = instant;
        } else {
            self.level *= LEVEL_DECAY;
        }

        if self.level > self.peak {
            self.peak = self.level;
            self.hold = PEAK_HOLD_FRAMES;
        } else if self.hold > 0 {
            self.hold -= 1;
        } else {
            self.peak *= PEAK_DECAY;
        }

        self.reading()
    }

    pub fn reading(&self) -> LevelReading {
        LevelReading {
            level: self.level,
            peak: self.peak,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
