use pitch_core::tracker::DROPOUT_FRAMES;
use pitch_core::{Analyzer, EngineConfig, EngineError, ReferencePitch, State};

/// Continuous sine as 16-bit little-endian PCM bytes.
fn sine_bytes(freq: f32, amplitude: f32, sample_rate: u32, samples: usize) -> Vec<u8> {
    (0..samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (amplitude * (2.0 * std::f32::consts::PI * freq * t).sin() * 32767.0) as i16
        })
        .flat_map(|s| s.to_le_bytes())
        .collect()
}

fn silence_bytes(samples: usize) -> Vec<u8> {
    vec![0u8; samples * 2]
}

fn analyzer() -> Analyzer {
    Analyzer::new(EngineConfig::default(), ReferencePitch::default()).unwrap()
}

#[test]
fn a440_settles_in_tune() {
    let mut analyzer = analyzer();
    analyzer.start(48000, 2048).unwrap();

    let mut last = None;
    analyzer.push_with(&sine_bytes(440.0, 0.5, 48000, 2048 * 12), |snapshot| {
        let candidate = snapshot.candidate.expect("every frame of a steady tone is voiced");
        let error = (candidate.frequency - 440.0).abs() / 440.0;
        assert!(error < 0.01, "frame {} read {} Hz", snapshot.sequence, candidate.frequency);
        last = snapshot.pitch;
    });

    let reading = last.expect("tracked pitch after a steady tone");
    assert_eq!(reading.label(), "A4");
    assert!(
        reading.cents.abs() <= 5.0,
        "Expected A4 within 5 cents, got {:.2}",
        reading.cents
    );
    assert!(reading.in_tune);
}

#[test]
fn chunking_does_not_change_results() {
    let bytes = sine_bytes(330.0, 0.4, 48000, 1024 * 4);

    let mut whole = analyzer();
    whole.start(48000, 1024).unwrap();
    let mut expected = Vec::new();
    whole.push_with(&bytes, |snapshot| expected.push(snapshot.to_result()));

    let mut trickled = analyzer();
    trickled.start(48000, 1024).unwrap();
    let mut results = Vec::new();
    for chunk in bytes.chunks(7) {
        trickled.push_with(chunk, |snapshot| results.push(snapshot.to_result()));
    }

    assert_eq!(expected.len(), 4);
    assert_eq!(results, expected);
}

#[test]
fn short_dropout_keeps_the_displayed_pitch() {
    let mut analyzer = analyzer();
    analyzer.start(48000, 2048).unwrap();
    analyzer.push(&sine_bytes(440.0, 0.5, 48000, 2048 * 4));
    assert!(analyzer.current_pitch().is_some());

    for _ in 0..DROPOUT_FRAMES {
        analyzer.push(&silence_bytes(2048));
        assert!(analyzer.current_pitch().is_some());
    }

    analyzer.push(&silence_bytes(2048));
    assert!(analyzer.current_pitch().is_none());
}

#[test]
fn stopping_clears_the_pitch_and_restart_is_fresh() {
    let mut analyzer = analyzer();
    analyzer.start(48000, 2048).unwrap();
    analyzer.push(&sine_bytes(440.0, 0.5, 48000, 2048 * 3));
    assert!(analyzer.current_pitch().is_some());

    analyzer.stop();
    assert_eq!(analyzer.state(), State::Idle);
    assert!(analyzer.current_pitch().is_none());

    analyzer.start(48000, 2048).unwrap();
    let snapshot = analyzer.snapshot().unwrap();
    assert_eq!(snapshot.sequence, 0);
    assert!(snapshot.pitch.is_none());
    assert!(snapshot.cents_history.is_empty());
    assert!(snapshot.band_history.is_empty());
    assert_eq!(snapshot.level.level, 0.0);
}

#[test]
fn session_sample_rate_is_used_throughout() {
    let mut analyzer = analyzer();
    analyzer.start(44100, 2048).unwrap();
    let mut frequencies = Vec::new();
    analyzer.push_with(&sine_bytes(440.0, 0.5, 44100, 2048 * 3), |snapshot| {
        frequencies.push(snapshot.candidate.unwrap().frequency);
    });

    assert_eq!(frequencies.len(), 3);
    for freq in frequencies {
        assert!((freq - 440.0).abs() / 440.0 < 0.01, "read {} Hz at 44.1 kHz", freq);
    }
    assert_eq!(analyzer.current_pitch().unwrap().label(), "A4");
}

#[test]
fn invalid_reference_pitch_is_ignored() {
    let mut analyzer = analyzer();
    analyzer.set_reference_pitch(442.0).unwrap();
    assert_eq!(
        analyzer.set_reference_pitch(500.0),
        Err(EngineError::InvalidReferencePitch(500.0))
    );
    assert_eq!(analyzer.reference().hz(), 442.0);
}

#[test]
fn bands_and_level_track_the_signal() {
    let mut analyzer = analyzer();
    analyzer.start(48000, 1024).unwrap();

    let mut levels = Vec::new();
    analyzer.push_with(&sine_bytes(523.25, 0.3, 48000, 1024 * 2), |snapshot| {
        assert_eq!(snapshot.bands.iter().copied().fold(0.0f32, f32::max), 1.0);
        levels.push(snapshot.level);
    });
    analyzer.push_with(&silence_bytes(1024 * 5), |snapshot| {
        levels.push(snapshot.level);
    });

    assert!(levels[0].level > 0.5);
    for pair in levels[1..].windows(2) {
        assert!(pair[1].level <= pair[0].level);
        assert!(pair[1].peak >= pair[1].level);
    }
}
