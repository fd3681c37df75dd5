//! # pitchscope - Terminal Tuner
//!
//! Thin driver around `pitch-core`: picks a capture source, feeds its byte
//! stream to the analysis engine and prints a live one-line readout.
//!
//! ## Architecture
//! - **Main thread**: renders results and owns the terminal
//! - **Analysis thread**: owns the capture source and the analyzer
//! - **Communication**: crossbeam channels, one ordered producer each

mod capture;
mod cli;
mod display;
mod settings;

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::{Receiver, Sender};
use log::{error, info, warn};
use pitch_core::{AnalysisResult, Analyzer, EngineConfig, ReferencePitch};
use std::io::Write;
use std::thread;
use std::time::Duration;

use capture::{CaptureEvent, DEFAULT_CAPTURE_COMMAND, SourceKind};
use cli::Cli;
use settings::Settings;

/// How long the capture may stay silent before a warning is logged.
const STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Messages from the analysis thread to the renderer.
#[derive(Debug)]
enum Update {
    Frame(AnalysisResult),
    Stopped(String),
}

/// Everything the analysis thread needs to run a session.
#[derive(Debug, Clone)]
struct SessionPlan {
    source: SourceKind,
    command: String,
    sample_rate: u32,
    frame_size: usize,
    engine: EngineConfig,
    reference: ReferencePitch,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let settings_path = settings::settings_path();
    let mut settings = settings_path
        .as_deref()
        .map(Settings::load)
        .unwrap_or_default();

    let mut reference = ReferencePitch::new(settings.reference_pitch).unwrap_or_else(|e| {
        warn!("{}; using the default", e);
        ReferencePitch::default()
    });
    if let Some(hz) = cli.reference {
        match reference.set(hz) {
            Ok(()) => info!("Reference pitch A4 = {} Hz", hz),
            Err(e) => warn!("{}; keeping {} Hz", e, reference.hz()),
        }
    }
    settings.reference_pitch = reference.hz();

    let source = cli
        .source
        .or(settings.last_source)
        .unwrap_or(SourceKind::Device);
    settings.last_source = Some(source);
    if let Some(command) = cli.command {
        settings.capture_command = Some(command);
    }
    if let Some(bands) = cli.bands {
        settings.engine.band_count = bands;
    }
    settings.ensure_valid_engine();

    if let Some(path) = &settings_path {
        if let Err(e) = settings.save(path) {
            warn!("Could not save settings: {:#}", e);
        }
    }

    let plan = SessionPlan {
        source,
        command: settings
            .capture_command
            .clone()
            .unwrap_or_else(|| DEFAULT_CAPTURE_COMMAND.to_string()),
        sample_rate: cli.rate,
        frame_size: cli.frame_size,
        engine: settings.engine.clone(),
        reference,
    };

    let (update_tx, update_rx) = crossbeam_channel::unbounded();
    let worker = thread::Builder::new()
        .name("analysis".into())
        .spawn(move || {
            let stopped = Update::Stopped(match run_session(plan, &update_tx) {
                Ok(reason) => reason,
                Err(e) => format!("{:#}", e),
            });
            let _ = update_tx.send(stopped);
        })?;

    let reason = render_loop(&update_rx, cli.lines)?;
    if worker.join().is_err() {
        error!("Analysis thread panicked");
    }
    info!("Stopped: {}", reason);
    Ok(())
}

/// Runs one capture session until the source ends or fails.
///
/// # Returns
/// A description of why the session ended.
fn run_session(plan: SessionPlan, updates: &Sender<Update>) -> Result<String> {
    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let capture = capture::start_capture(plan.source, plan.sample_rate, &plan.command, event_tx)?;

    let mut analyzer = Analyzer::new(plan.engine, plan.reference)?;
    analyzer.start(capture.sample_rate(), plan.frame_size)?;

    let reason = loop {
        crossbeam_channel::select! {
            recv(event_rx) -> msg => match msg {
                Ok(CaptureEvent::Data(bytes)) => {
                    analyzer.push_with(&bytes, |snapshot| {
                        let _ = updates.send(Update::Frame(snapshot.to_result()));
                    });
                }
                Ok(CaptureEvent::Ended) => break "capture stream ended".to_string(),
                Ok(CaptureEvent::Failed(e)) => break format!("capture failed: {}", e),
                Err(_) => break "capture channel closed".to_string(),
            },
            default(STALL_TIMEOUT) => {
                warn!("No audio received for {:?}", STALL_TIMEOUT);
            }
        }
    };

    // No stale pitch outlives the source.
    analyzer.stop();
    drop(capture);
    Ok(reason)
}

/// Draws results until the analysis thread reports that it stopped.
fn render_loop(updates: &Receiver<Update>, lines: bool) -> Result<String> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for update in updates.iter() {
        let mut latest = None;
        let mut stopped = None;
        // Only the newest frame is worth drawing.
        for update in std::iter::once(update).chain(updates.try_iter()) {
            match update {
                Update::Frame(result) if lines => writeln!(out, "{}", display::render_line(&result))?,
                Update::Frame(result) => latest = Some(result),
                Update::Stopped(reason) => {
                    stopped = Some(reason);
                    break;
                }
            }
        }

        if let Some(result) = latest {
            write!(out, "\r{}\x1b[K", display::render_line(&result))?;
        }
        out.flush()?;

        if let Some(reason) = stopped {
            if !lines {
                writeln!(out)?;
            }
            return Ok(reason);
        }
    }

    Ok("analysis thread exited".to_string())
}
