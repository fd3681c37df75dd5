//! # Terminal Readout
//!
//! Formats one analysis result as a single status line: note and cents,
//! a pseudo-spectrum strip and a level meter with its peak marker.

use pitch_core::AnalysisResult;

/// Glyphs for band energies, quietest first.
const BAND_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Character cells in the level meter.
const METER_WIDTH: usize = 20;

/// Renders the status line for `result`.
pub fn render_line(result: &AnalysisResult) -> String {
    let pitch = match &result.pitch {
        Some(reading) => format!(
            "{:<4} {:>+6.1}c {:>7.1} Hz {}",
            reading.label(),
            reading.display_cents(),
            reading.frequency,
            if reading.in_tune { '*' } else { ' ' }
        ),
        None => format!("{:<4} {:>7} {:>10} {}", "--", "", "", ' '),
    };

    format!(
        "{}  {}  {}",
        pitch,
        spectrum_strip(&result.bands),
        level_meter(result.level.level, result.level.peak)
    )
}

/// One glyph per band.
fn spectrum_strip(bands: &[f32]) -> String {
    let top = (BAND_GLYPHS.len() - 1) as f32;
    bands
        .iter()
        .map(|&energy| BAND_GLYPHS[(energy.clamp(0.0, 1.0) * top).round() as usize])
        .collect()
}

/// A bar filled up to `level` with a `|` at the peak position.
fn level_meter(level: f32, peak: f32) -> String {
    let cells = |value: f32| (value.clamp(0.0, 1.0) * METER_WIDTH as f32).round() as usize;
    let filled = cells(level);
    let peak_cell = cells(peak).min(METER_WIDTH).saturating_sub(1);

    let bar: String = (0..METER_WIDTH)
        .map(|i| {
            if i < filled {
                '#'
            } else if i == peak_cell && peak > 0.0 {
                '|'
            } else {
                '.'
            }
        })
        .collect();
    format!("[{}]", bar)
}
