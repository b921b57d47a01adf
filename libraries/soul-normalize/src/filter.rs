//! Host-facing audio filter contract
//!
//! Hosts register filters through their own plugin tables; this trait is
//! what such an adapter calls into. Creation is the constructor and
//! destruction is `Drop`, everything in between goes through here.

use crate::engine::{BlockOutcome, NormalizationEngine};
use crate::error::Result;
use crate::meter::LoudnessMeter;
use crate::settings::{NormalizationSettings, SettingDescriptor, SETTINGS_SCHEMA};

/// Information about a filter for host introspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterInfo {
    /// Unique type identifier
    pub type_id: &'static str,
    /// Human-readable name
    pub display_name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Audio filter driven synchronously by a host, one block at a time
///
/// Methods take `&self` so a host may deliver settings updates from a
/// different thread than the audio callback.
pub trait AudioFilter: Send + Sync {
    /// Filter metadata
    fn info(&self) -> FilterInfo;

    /// Declarative settings schema for host-rendered UI
    fn settings_schema(&self) -> &'static [SettingDescriptor];

    /// Apply new settings
    fn update(&self, settings: &NormalizationSettings) -> Result<()>;

    /// Process one planar block in place
    fn process(&self, block: &mut [Option<&mut [f32]>]) -> BlockOutcome;

    /// Clear internal state (e.g. when the source restarts)
    fn reset(&self) -> Result<()>;
}

impl<M: LoudnessMeter> AudioFilter for NormalizationEngine<M> {
    fn info(&self) -> FilterInfo {
        FilterInfo {
            type_id: "loudness_normalization",
            display_name: "Normalization",
            description: "Lookahead normalization to a target integrated loudness",
        }
    }

    fn settings_schema(&self) -> &'static [SettingDescriptor] {
        SETTINGS_SCHEMA
    }

    fn update(&self, settings: &NormalizationSettings) -> Result<()> {
        NormalizationEngine::update(self, settings)
    }

    fn process(&self, block: &mut [Option<&mut [f32]>]) -> BlockOutcome {
        NormalizationEngine::process(self, block)
    }

    fn reset(&self) -> Result<()> {
        NormalizationEngine::reset(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_as_trait_object() {
        let engine = NormalizationEngine::new(2, 48000, &NormalizationSettings::default()).unwrap();
        let filter: Box<dyn AudioFilter> = Box::new(engine);

        assert_eq!(filter.info().display_name, "Normalization");
        assert_eq!(filter.info().type_id, "loudness_normalization");
        assert_eq!(filter.settings_schema().len(), 4);
    }

    #[test]
    fn test_filter_update_and_process() {
        let engine = NormalizationEngine::new(1, 48000, &NormalizationSettings::default()).unwrap();
        let filter: &dyn AudioFilter = &engine;

        filter
            .update(&NormalizationSettings {
                lookahead_percent: 0,
                ..Default::default()
            })
            .unwrap();

        // Silence leaves the meter undetermined, so gain stays at unity
        let mut samples = vec![0.0_f32; 480];
        let outcome = filter.process(&mut [Some(&mut samples[..])]);
        assert_eq!(outcome, BlockOutcome::Emit);
        assert!(samples.iter().all(|&s| s == 0.0));
        filter.reset().unwrap();
    }
}
