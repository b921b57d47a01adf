//! Per-block normalization engine
//!
//! Ties the meter, the gain policy and the lookahead buffer together. One
//! engine serves one audio source; the host hands it planar blocks and gets
//! them back in place.
//!
//! ```text
//! block ─► meter.feed ─► query_integrated ─► GainPolicy ─► push_and_pull ─► emit / buffering
//! ```

use crate::error::{NormalizeError, Result};
use crate::gain::{db_to_linear, GainPolicy};
use crate::lookahead::LookaheadBuffer;
use crate::meter::{EbuR128Meter, LoudnessMeter};
use crate::settings::NormalizationSettings;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// What the host should do with a block after [`NormalizationEngine::process`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum BlockOutcome {
    /// The block now holds delayed, gain-adjusted audio
    Emit,
    /// The lookahead buffer absorbed the block; forward nothing this call
    Buffering,
    /// The block was left untouched and should be forwarded as is
    Bypassed,
}

impl BlockOutcome {
    /// Whether the block should be sent downstream
    pub fn should_emit(self) -> bool {
        !matches!(self, Self::Buffering)
    }
}

struct EngineState<M> {
    meter: M,
    buffer: LookaheadBuffer,
    policy: GainPolicy,
    settings: NormalizationSettings,
    last_gain_db: f64,
    /// Unequal plane lengths are reported once per engine
    length_mismatch_reported: bool,
}

/// Real-time loudness normalizer for one audio source
///
/// All mutable state sits behind one mutex, so [`update`](Self::update) may
/// be called from a different thread than [`process`](Self::process).
///
/// # Example
///
/// ```ignore
/// use soul_normalize::{NormalizationEngine, NormalizationSettings};
///
/// let engine = NormalizationEngine::new(2, 48000, &NormalizationSettings::default())?;
///
/// let mut planes = [Some(&mut left[..]), Some(&mut right[..])];
/// if engine.process(&mut planes).should_emit() {
///     // forward left/right downstream
/// }
/// ```
pub struct NormalizationEngine<M: LoudnessMeter = EbuR128Meter> {
    channels: usize,
    sample_rate: u32,
    state: Mutex<EngineState<M>>,
}

impl NormalizationEngine<EbuR128Meter> {
    /// Create an engine measuring with EBU R128
    ///
    /// # Arguments
    /// * `channels` - Number of channels (1-8)
    /// * `sample_rate` - Sample rate in Hz (8000-384000)
    /// * `settings` - Initial settings
    pub fn new(channels: usize, sample_rate: u32, settings: &NormalizationSettings) -> Result<Self> {
        validate_format(channels, sample_rate)?;
        let meter = EbuR128Meter::new(channels, sample_rate)?;
        Self::with_meter(meter, sample_rate, settings)
    }
}

fn validate_format(channels: usize, sample_rate: u32) -> Result<()> {
    if !(8000..=384000).contains(&sample_rate) {
        return Err(NormalizeError::InvalidSampleRate(sample_rate));
    }
    if !(1..=8).contains(&channels) {
        return Err(NormalizeError::InvalidChannelCount(channels));
    }
    Ok(())
}

impl<M: LoudnessMeter> NormalizationEngine<M> {
    /// Create an engine around an existing meter
    ///
    /// The channel count is taken from the meter.
    pub fn with_meter(
        mut meter: M,
        sample_rate: u32,
        settings: &NormalizationSettings,
    ) -> Result<Self> {
        let channels = meter.channels();
        validate_format(channels, sample_rate)?;
        settings.validate()?;

        meter.set_history_window(settings.window_ms())?;
        let buffer = LookaheadBuffer::new(channels, settings.lookahead_frames(sample_rate))?;

        debug!(
            channels,
            sample_rate,
            lookahead_frames = buffer.capacity(),
            "Created normalization engine"
        );

        Ok(Self {
            channels,
            sample_rate,
            state: Mutex::new(EngineState {
                meter,
                buffer,
                policy: GainPolicy::new(settings.target_db, settings.gain_cap_db),
                settings: *settings,
                last_gain_db: 0.0,
                length_mismatch_reported: false,
            }),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, EngineState<M>>> {
        self.state.lock().map_err(|_| NormalizeError::StatePoisoned)
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Apply new settings
    ///
    /// When the lookahead length changes, buffered audio is dropped and the
    /// buffer fills up again from scratch. Nothing is changed if the settings
    /// are invalid or the new buffer cannot be allocated.
    pub fn update(&self, settings: &NormalizationSettings) -> Result<()> {
        settings.validate()?;
        let mut state = self.lock()?;

        let capacity = settings.lookahead_frames(self.sample_rate);
        if capacity != state.buffer.capacity() {
            let buffer = LookaheadBuffer::new(self.channels, capacity)?;
            state.meter.set_history_window(settings.window_ms())?;
            debug!(
                old_frames = state.buffer.capacity(),
                new_frames = capacity,
                window_ms = settings.window_ms(),
                "Resized lookahead buffer, buffered audio dropped"
            );
            state.buffer = buffer;
        }

        state.policy = GainPolicy::new(settings.target_db, settings.gain_cap_db);
        state.settings = *settings;
        Ok(())
    }

    /// Normalize one block in place
    ///
    /// `block` holds one plane per channel. A missing plane (or a block with
    /// the wrong number of planes) bypasses the engine entirely: nothing is
    /// measured or buffered and the block is returned untouched.
    ///
    /// On [`BlockOutcome::Buffering`] the planes hold no usable audio.
    pub fn process(&self, block: &mut [Option<&mut [f32]>]) -> BlockOutcome {
        if block.len() != self.channels || block.iter().any(Option::is_none) {
            return BlockOutcome::Bypassed;
        }

        let Ok(mut guard) = self.state.lock() else {
            warn!("Normalizer state poisoned, passing audio through");
            return BlockOutcome::Bypassed;
        };
        let state = &mut *guard;

        let frames = block.iter().flatten().map(|plane| plane.len()).min().unwrap_or(0);
        if !state.length_mismatch_reported
            && block.iter().flatten().any(|plane| plane.len() != frames)
        {
            warn!(frames, "Planes differ in length, truncating blocks");
            state.length_mismatch_reported = true;
        }

        for (channel, plane) in block.iter().flatten().enumerate() {
            if let Err(err) = state.meter.feed(channel, &plane[..frames]) {
                warn!(channel, error = %err, "Failed to meter block");
            }
        }

        let gain_db = state.policy.gain_db(state.meter.query_integrated());
        state.last_gain_db = gain_db;
        let multiplier = db_to_linear(gain_db) as f32;

        let planes = block.iter_mut().flatten().map(|plane| &mut plane[..frames]);
        if state.buffer.push_and_pull(planes, frames, multiplier) {
            BlockOutcome::Emit
        } else {
            BlockOutcome::Buffering
        }
    }

    /// Drop buffered audio and loudness history
    ///
    /// The buffer fills up again before the next block is emitted.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.buffer.clear();
        state.meter.reset();
        state.last_gain_db = 0.0;
        Ok(())
    }

    /// Current settings
    pub fn settings(&self) -> Result<NormalizationSettings> {
        Ok(self.lock()?.settings)
    }

    /// Lookahead buffer capacity in frames
    pub fn capacity(&self) -> Result<usize> {
        Ok(self.lock()?.buffer.capacity())
    }

    /// Frames currently held back by the lookahead
    pub fn latency_frames(&self) -> Result<usize> {
        Ok(self.lock()?.buffer.len())
    }

    /// Gain in dB applied to the most recently processed block
    pub fn last_gain_db(&self) -> Result<f64> {
        Ok(self.lock()?.last_gain_db)
    }
}
