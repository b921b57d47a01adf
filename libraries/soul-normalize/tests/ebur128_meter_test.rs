//! End-to-end tests with the EBU R128 meter
//!
//! Levels are only checked loosely: the meter is the reference here, these
//! tests make sure the engine reacts to it sensibly. Channels are measured
//! separately and averaged, so a 1 kHz sine of amplitude `a` on both
//! channels reads about `20 * log10(a) - 3` LUFS.

use soul_normalize::{BlockOutcome, NormalizationEngine, NormalizationSettings};
use std::f32::consts::PI;

const SAMPLE_RATE: u32 = 48000;
const BLOCK: usize = 480;

/// Stereo 1 kHz sine, generated block by block with continuous phase
struct SineSource {
    amplitude: f32,
    position: usize,
}

impl SineSource {
    fn new(amplitude: f32) -> Self {
        Self {
            amplitude,
            position: 0,
        }
    }

    fn next_block(&mut self) -> (Vec<f32>, Vec<f32>) {
        let left: Vec<f32> = (self.position..self.position + BLOCK)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                self.amplitude * (2.0 * PI * 1000.0 * t).sin()
            })
            .collect();
        self.position += BLOCK;
        (left.clone(), left)
    }
}

/// Run `seconds` of a sine through the engine, returning the last outcome
fn run(engine: &NormalizationEngine, source: &mut SineSource, seconds: usize) -> BlockOutcome {
    let mut outcome = BlockOutcome::Buffering;
    for _ in 0..seconds * SAMPLE_RATE as usize / BLOCK {
        let (mut left, mut right) = source.next_block();
        outcome = engine.process(&mut [Some(&mut left[..]), Some(&mut right[..])]);
    }
    outcome
}

fn no_lookahead() -> NormalizationSettings {
    NormalizationSettings {
        window_seconds: 3,
        lookahead_percent: 0,
        ..Default::default()
    }
}

#[test]
fn test_quiet_signal_is_boosted() {
    let engine = NormalizationEngine::new(2, SAMPLE_RATE, &no_lookahead()).unwrap();
    // Around -37 LUFS
    let mut source = SineSource::new(0.02);

    assert_eq!(run(&engine, &mut source, 3), BlockOutcome::Emit);

    let gain_db = engine.last_gain_db().unwrap();
    assert!(
        gain_db > 12.0 && gain_db < 17.0,
        "Expected about +14 dB of boost, got {:.2}",
        gain_db
    );
}

#[test]
fn test_boost_stops_at_cap() {
    let engine = NormalizationEngine::new(2, SAMPLE_RATE, &no_lookahead()).unwrap();
    // Around -63 LUFS, 40 dB below target
    let mut source = SineSource::new(0.001);

    let _ = run(&engine, &mut source, 3);
    assert_eq!(engine.last_gain_db().unwrap(), 20.0);
}

#[test]
fn test_loud_signal_is_attenuated() {
    let engine = NormalizationEngine::new(2, SAMPLE_RATE, &no_lookahead()).unwrap();
    // Around -4 LUFS
    let mut source = SineSource::new(0.9);

    let _ = run(&engine, &mut source, 3);
    let gain_db = engine.last_gain_db().unwrap();
    assert!(
        gain_db < -16.0 && gain_db > -22.0,
        "Expected about -19 dB of attenuation, got {:.2}",
        gain_db
    );
}

#[test]
fn test_silence_passes_unchanged() {
    let engine = NormalizationEngine::new(2, SAMPLE_RATE, &no_lookahead()).unwrap();
    let mut source = SineSource::new(0.0);

    for _ in 0..200 {
        let (mut left, mut right) = source.next_block();
        let outcome = engine.process(&mut [Some(&mut left[..]), Some(&mut right[..])]);
        assert_eq!(outcome, BlockOutcome::Emit);
        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
    }
    assert_eq!(engine.last_gain_db().unwrap(), 0.0);
}

#[test]
fn test_lookahead_delays_output() {
    let settings = NormalizationSettings {
        window_seconds: 3,
        lookahead_percent: 10,
        ..Default::default()
    };
    let engine = NormalizationEngine::new(2, SAMPLE_RATE, &settings).unwrap();
    // 3 s * 10% * 48 kHz
    assert_eq!(engine.capacity().unwrap(), 14_400);

    let mut source = SineSource::new(0.1);
    let mut buffering = 0;
    for _ in 0..40 {
        let (mut left, mut right) = source.next_block();
        if engine.process(&mut [Some(&mut left[..]), Some(&mut right[..])])
            == BlockOutcome::Buffering
        {
            buffering += 1;
        }
    }

    assert_eq!(buffering, 30);
    assert_eq!(engine.latency_frames().unwrap(), 14_400);
}

#[test]
fn test_output_level_moves_towards_target() {
    let settings = NormalizationSettings {
        target_db: -23.0,
        ..no_lookahead()
    };
    let engine = NormalizationEngine::new(2, SAMPLE_RATE, &settings).unwrap();
    // Around -33 LUFS, needs roughly +10 dB
    let mut source = SineSource::new(0.0316);
    let _ = run(&engine, &mut source, 3);

    let (mut left, mut right) = source.next_block();
    let input_peak = left.iter().fold(0.0_f32, |peak, s| peak.max(s.abs()));
    let _ = engine.process(&mut [Some(&mut left[..]), Some(&mut right[..])]);
    let output_peak = left.iter().fold(0.0_f32, |peak, s| peak.max(s.abs()));

    let applied_db = 20.0 * (output_peak / input_peak).log10();
    assert!(
        applied_db > 7.0 && applied_db < 13.0,
        "Expected about +10 dB applied, got {:.2}",
        applied_db
    );
}
