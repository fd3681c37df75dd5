//! # Analysis Pipeline
//!
//! Owns one capture session at a time and runs every complete frame through
//! the estimator, tracker, band estimator and level meter, publishing a
//! read-only [`Snapshot`] per frame.
//!
//! ## Lifecycle
//! - **Idle**: no session; incoming bytes are ignored
//! - **Analyzing**: [`Analyzer::start`] built fresh per-session state
//!
//! Stopping drops the whole session, so neither the tracked pitch nor any
//! history can leak into the next one.

use log::{debug, info};

use crate::assembler::FrameAssembler;
use crate::bands::BandEstimator;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::history::History;
use crate::level::{LevelMeter, LevelReading};
use crate::pitch::{PitchCandidate, PitchEstimator};
use crate::tracker::{PitchReading, PitchTracker};
use crate::tuning::ReferencePitch;
use crate::AnalysisResult;

/// Smallest frame size a session accepts.
pub const MIN_FRAME_SIZE: usize = 64;

/// Largest frame size a session accepts.
pub const MAX_FRAME_SIZE: usize = 1 << 16;

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Analyzing,
}

/// Read-only view of the analysis state right after a frame.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    /// Number of frames analyzed in this session, counting this one.
    pub sequence: u64,
    pub sample_rate: u32,
    /// The estimator's raw output for this frame, before tracking.
    pub candidate: Option<PitchCandidate>,
    /// The tracked pitch to display, if any.
    pub pitch: Option<PitchReading>,
    /// Normalized band energies for this frame.
    pub bands: &'a [f32],
    pub level: LevelReading,
    /// Recent cents deviations, oldest first.
    pub cents_history: &'a History<f32>,
    /// Recent band vectors, oldest first.
    pub band_history: &'a History<Vec<f32>>,
    /// Recent level readings, oldest first.
    pub level_history: &'a History<LevelReading>,
}

impl Snapshot<'_> {
    /// Copies the snapshot into an owned result that can cross threads.
    pub fn to_result(&self) -> AnalysisResult {
        AnalysisResult {
            sequence: self.sequence,
            detected_frequency: self.candidate.map(|c| c.frequency),
            confidence: self.candidate.map(|c| c.confidence),
            pitch: self.pitch,
            bands: self.bands.to_vec(),
            level: self.level,
            cents_history: self.cents_history.iter().copied().collect(),
        }
    }
}

/// Everything that lives for exactly one capture session.
#[derive(Debug)]
struct Session {
    sample_rate: u32,
    assembler: FrameAssembler,
    frame: Vec<f32>,
    estimator: PitchEstimator,
    tracker: PitchTracker,
    band_estimator: BandEstimator,
    bands: Vec<f32>,
    level_meter: LevelMeter,
    band_history: History<Vec<f32>>,
    level_history: History<LevelReading>,
    // Evicted band vector, reused for the next history entry.
    spare_bands: Option<Vec<f32>>,
    frames: u64,
    candidate: Option<PitchCandidate>,
    pitch: Option<PitchReading>,
    level: LevelReading,
}

impl Session {
    fn new(config: &EngineConfig, sample_rate: u32, frame_size: usize) -> Self {
        Self {
            sample_rate,
            assembler: FrameAssembler::new(frame_size),
            frame: Vec::with_capacity(frame_size),
            estimator: PitchEstimator::new(),
            tracker: PitchTracker::new(config.cents_history),
            band_estimator: BandEstimator::new(config.band_count, sample_rate),
            bands: Vec::with_capacity(config.band_count),
            level_meter: LevelMeter::new(),
            band_history: History::new(config.band_history),
            level_history: History::new(config.level_history),
            spare_bands: None,
            frames: 0,
            candidate: None,
            pitch: None,
            level: LevelReading::default(),
        }
    }

    fn next_frame(&mut self) -> bool {
        self.assembler.next_frame(&mut self.frame)
    }

    /// Runs every analysis stage over the current frame.
    fn analyze(&mut self, reference: ReferencePitch) {
        self.candidate = self.estimator.estimate(&self.frame, self.sample_rate);
        self.pitch = self
            .tracker
            .update(self.candidate.map(|c| c.frequency), reference);

        self.band_estimator.compute_into(&self.frame, &mut self.bands);
        let mut entry = self.spare_bands.take().unwrap_or_default();
        entry.clear();
        entry.extend_from_slice(&self.bands);
        self.spare_bands = self.band_history.push(entry);

        self.level = self.level_meter.update(&self.frame);
        self.level_history.push(self.level);

        self.frames += 1;
    }

    fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            sequence: self.frames,
            sample_rate: self.sample_rate,
            candidate: self.candidate,
            pitch: self.pitch,
            bands: &self.bands,
            level: self.level,
            cents_history: self.tracker.cents_history(),
            band_history: &self.band_history,
            level_history: &self.level_history,
        }
    }
}

/// Summary of the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub sample_rate: u32,
    pub frame_size: usize,
    pub frames: u64,
}

/// The real-time pitch and spectral analysis engine.
#[derive(Debug)]
pub struct Analyzer {
    config: EngineConfig,
    reference: ReferencePitch,
    session: Option<Session>,
}

impl Analyzer {
    /// Creates an idle analyzer.
    pub fn new(config: EngineConfig, reference: ReferencePitch) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            reference,
            session: None,
        })
    }

    pub fn state(&self) -> State {
        if self.session.is_some() {
            State::Analyzing
        } else {
            State::Idle
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn reference(&self) -> ReferencePitch {
        self.reference
    }

    /// Changes the reference pitch used from the next frame on.
    ///
    /// Out-of-range values are rejected and the previous value is kept.
    pub fn set_reference_pitch(&mut self, hz: f32) -> Result<(), EngineError> {
        self.reference.set(hz)?;
        info!("Reference pitch set to {} Hz", hz);
        Ok(())
    }

    /// Starts a session, replacing any session already running.
    ///
    /// # Arguments
    /// * `sample_rate` - Fixed sample rate of the incoming stream in Hz
    /// * `frame_size` - Samples per analysis frame
    pub fn start(&mut self, sample_rate: u32, frame_size: usize) -> Result<(), EngineError> {
        if sample_rate == 0 || !(MIN_FRAME_SIZE..=MAX_FRAME_SIZE).contains(&frame_size) {
            return Err(EngineError::InvalidSession {
                sample_rate,
                frame_size,
            });
        }
        if self.session.is_some() {
            debug!("Restarting session; previous state discarded");
        }
        self.session = Some(Session::new(&self.config, sample_rate, frame_size));
        info!(
            "Analysis session started: {} Hz, {} samples per frame, {} bands",
            sample_rate, frame_size, self.config.band_count
        );
        Ok(())
    }

    /// Ends the session because the byte source ended or failed.
    ///
    /// The tracked pitch and all histories are dropped with the session.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.assembler.finish();
            info!("Analysis session stopped after {} frames", session.frames);
        }
    }

    /// Feeds a chunk of raw PCM bytes and analyzes every completed frame.
    ///
    /// # Returns
    /// The number of frames analyzed. Always 0 while idle.
    pub fn push(&mut self, bytes: &[u8]) -> usize {
        self.push_with(bytes, |_| {})
    }

    /// Like [`Analyzer::push`], calling `on_frame` with the snapshot of each
    /// analyzed frame, in order.
    pub fn push_with<F>(&mut self, bytes: &[u8], mut on_frame: F) -> usize
    where
        F: FnMut(&Snapshot<'_>),
    {
        let reference = self.reference;
        let Some(session) = self.session.as_mut() else {
            debug!("Ignoring {} bytes while idle", bytes.len());
            return 0;
        };

        session.assembler.push(bytes);
        let mut analyzed = 0;
        while session.next_frame() {
            session.analyze(reference);
            on_frame(&session.snapshot());
            analyzed += 1;
        }
        analyzed
    }

    /// Snapshot of the most recent frame, if a session is running.
    pub fn snapshot(&self) -> Option<Snapshot<'_>> {
        self.session.as_ref().map(Session::snapshot)
    }

    /// The pitch currently on display. Always `None` while idle.
    pub fn current_pitch(&self) -> Option<PitchReading> {
        self.session.as_ref().and_then(|session| session.pitch)
    }

    pub fn session_info(&self) -> Option<SessionInfo> {
        self.session.as_ref().map(|session| SessionInfo {
            sample_rate: session.sample_rate,
            frame_size: session.assembler.frame_size(),
            frames: session.frames,
        })
    }
}
