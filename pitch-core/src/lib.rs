// pitch-core/src/lib.rs

//! The core analysis engine for the pitchscope tuner.
//! This crate turns a stream of 16-bit PCM bytes into a stable displayed
//! pitch, a coarse pseudo-spectrum and a level meter. It is completely
//! headless: it performs no I/O, no capture and no drawing.

pub mod analyzer;
pub mod assembler;
pub mod bands;
pub mod config;
pub mod error;
pub mod history;
pub mod level;
pub mod pitch;
pub mod tracker;
pub mod tuning;

pub use analyzer::{Analyzer, SessionInfo, Snapshot, State};
pub use config::EngineConfig;
pub use error::EngineError;
pub use level::LevelReading;
pub use tracker::PitchReading;
pub use tuning::ReferencePitch;

/// Owned copy of a single frame's analysis, for sending to another thread.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// Frame number within the session.
    pub sequence: u64,
    /// The raw per-frame frequency estimate in Hz.
    pub detected_frequency: Option<f32>,
    /// The confidence of the raw estimate (0.0 to 1.0).
    pub confidence: Option<f32>,
    /// The tracked pitch to display.
    pub pitch: Option<PitchReading>,
    /// Normalized band energies for visualization.
    pub bands: Vec<f32>,
    pub level: LevelReading,
    /// Recent cents deviations, oldest first.
    pub cents_history: Vec<f32>,
}
