//! # Audio Capture Module
//!
//! Produces the raw byte stream the analysis engine consumes: signed 16-bit
//! little-endian mono PCM, delivered in whatever chunk sizes the source
//! hands over.
//!
//! ## Sources
//! - The default audio input device, through CPAL
//! - A capture subprocess writing PCM to its stdout (e.g. `parec`, `arecord`)
//! - Standard input
//!
//! Every source reports through one ordered channel of [`CaptureEvent`]s.

use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};

/// Capture command used when none is configured.
pub const DEFAULT_CAPTURE_COMMAND: &str = "parec --raw --format=s16le --channels=1 --rate={rate}";

/// Bytes read from a pipe per chunk.
const READ_CHUNK: usize = 4096;

/// Where the PCM stream comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Default audio input device
    Device,
    /// Stdout of a capture subprocess
    Command,
    /// Standard input
    Stdin,
}

/// Messages from a capture source, in stream order.
#[derive(Debug)]
pub enum CaptureEvent {
    /// A chunk of s16le mono PCM bytes.
    Data(Vec<u8>),
    /// The source ended normally.
    Ended,
    /// The source failed and will deliver nothing more.
    Failed(String),
}

/// A running capture source. Dropping it stops the capture.
pub struct Capture {
    sample_rate: u32,
    stream: Option<cpal::Stream>,
    child: Option<Child>,
    reader: Option<JoinHandle<()>>,
}

impl Capture {
    /// The sample rate of the delivered stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                warn!("Error pausing audio stream: {}", e);
            }
        }
        if let Some(mut child) = self.child.take() {
            // The reader thread sees EOF once the child is gone.
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(reader) = self.reader.take() {
            // A stdin reader may be blocked on input; leave it detached.
            if reader.is_finished() {
                let _ = reader.join();
            }
        }
    }
}

/// Starts capturing from `source`.
///
/// # Arguments
/// * `source` - Which capture source to open
/// * `sample_rate` - Requested sample rate in Hz
/// * `command` - Capture command line for [`SourceKind::Command`]
/// * `sender` - Channel receiving the byte stream
///
/// # Returns
/// * `Ok(capture)` - Running capture; its `sample_rate` is the actual rate
/// * `Err(e)` - No device, unsupported format, or the command failed to start
pub fn start_capture(
    source: SourceKind,
    sample_rate: u32,
    command: &str,
    sender: Sender<CaptureEvent>,
) -> Result<Capture> {
    match source {
        SourceKind::Device => start_device_capture(sample_rate, sender),
        SourceKind::Command => start_command_capture(command, sample_rate, sender),
        SourceKind::Stdin => {
            info!("Reading s16le mono PCM at {} Hz from stdin", sample_rate);
            let reader = spawn_reader(std::io::stdin(), sender)?;
            Ok(Capture {
                sample_rate,
                stream: None,
                child: None,
                reader: Some(reader),
            })
        }
    }
}

fn start_command_capture(
    command: &str,
    sample_rate: u32,
    sender: Sender<CaptureEvent>,
) -> Result<Capture> {
    let command_line = command.replace("{rate}", &sample_rate.to_string());
    info!("Starting capture command: {}", command_line);

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(&command_line)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start capture command `{}`", command_line))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("capture command has no stdout"))?;
    let reader = spawn_reader(stdout, sender)?;

    Ok(Capture {
        sample_rate,
        stream: None,
        child: Some(child),
        reader: Some(reader),
    })
}

/// Copies a byte pipe into the channel on a dedicated thread.
fn spawn_reader<R>(mut source: R, sender: Sender<CaptureEvent>) -> Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    let handle = thread::Builder::new()
        .name("capture-reader".into())
        .spawn(move || {
            let mut buffer = [0u8; READ_CHUNK];
            loop {
                let event = match source.read(&mut buffer) {
                    Ok(0) => CaptureEvent::Ended,
                    Ok(n) => CaptureEvent::Data(buffer[..n].to_vec()),
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => CaptureEvent::Failed(e.to_string()),
                };
                let last = !matches!(event, CaptureEvent::Data(_));
                if sender.send(event).is_err() || last {
                    break;
                }
            }
        })?;
    Ok(handle)
}

fn start_device_capture(target_rate: u32, sender: Sender<CaptureEvent>) -> Result<Capture> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, target_rate)
        .ok_or_else(|| anyhow!("No suitable i16 or f32 input format found"))?;

    let rate = target_rate.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let sample_format = supported_config.sample_format();
    let config: cpal::StreamConfig = supported_config
        .with_sample_rate(cpal::SampleRate(rate))
        .into();
    let channels = config.channels as usize;

    info!(
        "Selected {} Hz, {} channel(s), {:?}",
        rate, channels, sample_format
    );
    if rate != target_rate {
        warn!("Requested {} Hz, device delivers {} Hz", target_rate, rate);
    }

    let error_sender = sender.clone();
    let err_fn = move |err: cpal::StreamError| {
        let _ = error_sender.send(CaptureEvent::Failed(err.to_string()));
    };

    let stream = match sample_format {
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let _ = sender.send(CaptureEvent::Data(interleaved_to_bytes(data, channels)));
            },
            err_fn,
            None,
        )?,
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let samples: Vec<i16> = data.iter().map(|&s| f32_to_i16(s)).collect();
                let _ = sender.send(CaptureEvent::Data(interleaved_to_bytes(&samples, channels)));
            },
            err_fn,
            None,
        )?,
        other => return Err(anyhow!("Unsupported sample format {:?}", other)),
    };

    stream.play()?;

    Ok(Capture {
        sample_rate: rate,
        stream: Some(stream),
        child: None,
        reader: None,
    })
}

/// Finds the best supported configuration for the target sample rate.
///
/// Prefers mono, then i16 over f32, then the range closest to the target.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| {
            matches!(
                c.sample_format(),
                cpal::SampleFormat::I16 | cpal::SampleFormat::F32
            )
        })
        .min_by_key(|c| {
            let rate_distance = if (c.min_sample_rate().0..=c.max_sample_rate().0)
                .contains(&target_rate)
            {
                0
            } else {
                let min_diff = c.min_sample_rate().0.abs_diff(target_rate);
                let max_diff = c.max_sample_rate().0.abs_diff(target_rate);
                min_diff.min(max_diff)
            };
            (
                c.channels() != 1,
                c.sample_format() != cpal::SampleFormat::I16,
                rate_distance,
            )
        })
}

/// Converts a normalized float sample to 16-bit, saturating out-of-range values.
fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Downmixes interleaved frames to mono and encodes them as s16le bytes.
fn interleaved_to_bytes(samples: &[i16], channels: usize) -> Vec<u8> {
    let channels = channels.max(1);
    let mut bytes = Vec::with_capacity(samples.len() / channels * 2);
    for frame in samples.chunks_exact(channels) {
        let sum: i32 = frame.iter().map(|&s| s as i32).sum();
        let mono = (sum / channels as i32) as i16;
        bytes.extend_from_slice(&mono.to_le_bytes());
    }
    bytes
}
