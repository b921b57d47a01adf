//! Loudness metering for the normalizer
//!
//! The engine only needs three things from a meter: feed it planar samples,
//! ask for the integrated loudness over the rolling window, and change the
//! length of that window. [`EbuR128Meter`] provides them on top of the
//! `ebur128` crate; tests substitute scripted meters.

use crate::error::{NormalizeError, Result};
use ebur128::{EbuR128, Mode};

/// Multichannel loudness meter consumed by the normalization engine
pub trait LoudnessMeter: Send {
    /// Number of channels this meter measures
    fn channels(&self) -> usize;

    /// Feed the next chunk of samples for one channel
    ///
    /// Every channel must be fed the same number of frames before
    /// [`query_integrated`](Self::query_integrated) is called.
    fn feed(&mut self, channel: usize, samples: &[f32]) -> Result<()>;

    /// Integrated loudness in LUFS across all channels
    ///
    /// Returns NaN or negative infinity while the loudness is undetermined
    /// (silence, or not enough history yet). That is a valid state, not an
    /// error.
    fn query_integrated(&self) -> f64;

    /// Change the retained history window (milliseconds)
    fn set_history_window(&mut self, window_ms: u32) -> Result<()>;

    /// Drop all measurement history, keeping the history window
    fn reset(&mut self);
}

/// EBU R128 meter with one analyzer state per channel
///
/// Channels are measured independently and combined by
/// [`EbuR128::loudness_global_multiple`], so planar host buffers can be fed
/// without interleaving.
pub struct EbuR128Meter {
    states: Vec<EbuR128>,
    window_ms: Option<u32>,
}

impl EbuR128Meter {
    /// Create a meter for `channels` channels at `sample_rate`
    pub fn new(channels: usize, sample_rate: u32) -> Result<Self> {
        let states = (0..channels)
            .map(|_| EbuR128::new(1, sample_rate, Mode::I).map_err(NormalizeError::from))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            states,
            window_ms: None,
        })
    }

    /// Currently configured history window, if one was set
    pub fn history_window_ms(&self) -> Option<u32> {
        self.window_ms
    }
}

impl LoudnessMeter for EbuR128Meter {
    fn channels(&self) -> usize {
        self.states.len()
    }

    fn feed(&mut self, channel: usize, samples: &[f32]) -> Result<()> {
        let state = self
            .states
            .get_mut(channel)
            .ok_or_else(|| NormalizeError::Meter(format!("No meter for channel {}", channel)))?;
        state.add_frames_f32(samples)?;
        Ok(())
    }

    fn query_integrated(&self) -> f64 {
        EbuR128::loudness_global_multiple(self.states.iter()).unwrap_or(f64::NAN)
    }

    fn set_history_window(&mut self, window_ms: u32) -> Result<()> {
        for state in &mut self.states {
            state.set_max_history(window_ms)?;
        }
        self.window_ms = Some(window_ms);
        Ok(())
    }

    fn reset(&mut self) {
        for state in &mut self.states {
            state.reset();
        }
    }
}
