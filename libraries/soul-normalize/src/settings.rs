//! User-facing normalization settings and their declarative schema
//!
//! Hosts render their own UI from [`SETTINGS_SCHEMA`] and hand the edited
//! values back as [`NormalizationSettings`] (usually as JSON).

use crate::error::{NormalizeError, Result};
use serde::{Deserialize, Serialize};

/// Default target loudness (EBU R128 broadcast level)
pub const DEFAULT_TARGET_DB: f64 = -23.0;

/// Default maximum boost in dB
pub const DEFAULT_GAIN_CAP_DB: f64 = 20.0;

/// Default meter history window in seconds
pub const DEFAULT_WINDOW_SECONDS: u32 = 10;

/// Default lookahead as a percentage of the window
pub const DEFAULT_LOOKAHEAD_PERCENT: u32 = 50;

const TARGET_RANGE: (f64, f64) = (-60.0, 0.0);
const GAIN_CAP_RANGE: (f64, f64) = (0.0, 30.0);
const WINDOW_RANGE: (u32, u32) = (3, 30);
const LOOKAHEAD_RANGE: (u32, u32) = (0, 100);

/// Normalization settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizationSettings {
    /// Target integrated loudness in dB (LUFS)
    pub target_db: f64,
    /// Maximum boost in dB. Attenuation is never capped.
    pub gain_cap_db: f64,
    /// Loudness meter history window in seconds
    pub window_seconds: u32,
    /// Lookahead length as a percentage of the window
    pub lookahead_percent: u32,
}

impl Default for NormalizationSettings {
    fn default() -> Self {
        Self {
            target_db: DEFAULT_TARGET_DB,
            gain_cap_db: DEFAULT_GAIN_CAP_DB,
            window_seconds: DEFAULT_WINDOW_SECONDS,
            lookahead_percent: DEFAULT_LOOKAHEAD_PERCENT,
        }
    }
}

impl NormalizationSettings {
    /// Parse settings from a host configuration blob
    ///
    /// Missing keys fall back to their defaults. The result is validated.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings against the schema ranges
    pub fn validate(&self) -> Result<()> {
        if !self.target_db.is_finite()
            || !(TARGET_RANGE.0..=TARGET_RANGE.1).contains(&self.target_db)
        {
            return Err(NormalizeError::InvalidSettings(format!(
                "target {} dB outside [{}, {}]",
                self.target_db, TARGET_RANGE.0, TARGET_RANGE.1
            )));
        }
        if !self.gain_cap_db.is_finite()
            || !(GAIN_CAP_RANGE.0..=GAIN_CAP_RANGE.1).contains(&self.gain_cap_db)
        {
            return Err(NormalizeError::InvalidSettings(format!(
                "gain cap {} dB outside [{}, {}]",
                self.gain_cap_db, GAIN_CAP_RANGE.0, GAIN_CAP_RANGE.1
            )));
        }
        if !(WINDOW_RANGE.0..=WINDOW_RANGE.1).contains(&self.window_seconds) {
            return Err(NormalizeError::InvalidSettings(format!(
                "window {} s outside [{}, {}]",
                self.window_seconds, WINDOW_RANGE.0, WINDOW_RANGE.1
            )));
        }
        if !(LOOKAHEAD_RANGE.0..=LOOKAHEAD_RANGE.1).contains(&self.lookahead_percent) {
            return Err(NormalizeError::InvalidSettings(format!(
                "lookahead {}% outside [{}, {}]",
                self.lookahead_percent, LOOKAHEAD_RANGE.0, LOOKAHEAD_RANGE.1
            )));
        }
        Ok(())
    }

    /// Meter history window in milliseconds
    pub fn window_ms(&self) -> u32 {
        self.window_seconds.saturating_mul(1000)
    }

    /// Lookahead buffer capacity in frames for the given sample rate
    ///
    /// `window_ms * lookahead/100 * sample_rate/1000`, computed without
    /// intermediate rounding.
    pub fn lookahead_frames(&self, sample_rate: u32) -> usize {
        let frames = u64::from(self.window_seconds)
            * u64::from(self.lookahead_percent)
            * u64::from(sample_rate)
            / 100;
        frames as usize
    }
}

/// Value type and bounds of a single setting
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SettingKind {
    /// Floating point slider
    Float {
        min: f64,
        max: f64,
        step: f64,
        default: f64,
    },
    /// Integer spinner
    Int {
        min: i64,
        max: i64,
        step: i64,
        default: i64,
    },
}

/// Declarative description of one setting, for host-rendered UI
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingDescriptor {
    /// Key as used in the serialized settings
    pub key: &'static str,
    /// Human-readable label
    pub label: &'static str,
    #[serde(flatten)]
    pub kind: SettingKind,
}

/// Schema of [`NormalizationSettings`]
pub const SETTINGS_SCHEMA: &[SettingDescriptor] = &[
    SettingDescriptor {
        key: "targetDb",
        label: "Target (dB)",
        kind: SettingKind::Float {
            min: TARGET_RANGE.0,
            max: TARGET_RANGE.1,
            step: 0.1,
            default: DEFAULT_TARGET_DB,
        },
    },
    SettingDescriptor {
        key: "gainCapDb",
        label: "Gain cap (dB)",
        kind: SettingKind::Float {
            min: GAIN_CAP_RANGE.0,
            max: GAIN_CAP_RANGE.1,
            step: 0.1,
            default: DEFAULT_GAIN_CAP_DB,
        },
    },
    SettingDescriptor {
        key: "windowSeconds",
        label: "Window (seconds)",
        kind: SettingKind::Int {
            min: WINDOW_RANGE.0 as i64,
            max: WINDOW_RANGE.1 as i64,
            step: 1,
            default: DEFAULT_WINDOW_SECONDS as i64,
        },
    },
    SettingDescriptor {
        key: "lookaheadPercent",
        label: "Lookahead (percent)",
        kind: SettingKind::Int {
            min: LOOKAHEAD_RANGE.0 as i64,
            max: LOOKAHEAD_RANGE.1 as i64,
            step: 1,
            default: DEFAULT_LOOKAHEAD_PERCENT as i64,
        },
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = NormalizationSettings::default();
        assert_eq!(settings.target_db, -23.0);
        assert_eq!(settings.gain_cap_db, 20.0);
        assert_eq!(settings.window_seconds, 10);
        assert_eq!(settings.lookahead_percent, 50);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_lookahead_frames() {
        let settings = NormalizationSettings::default();
        assert_eq!(settings.lookahead_frames(48000), 240_000);
        assert_eq!(settings.lookahead_frames(44100), 220_500);
        // No truncation of sample_rate / 100
        assert_eq!(settings.lookahead_frames(22050), 110_250);

        let disabled = NormalizationSettings {
            lookahead_percent: 0,
            ..Default::default()
        };
        assert_eq!(disabled.lookahead_frames(48000), 0);
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let base = NormalizationSettings::default();

        assert!(NormalizationSettings { target_db: 1.0, ..base }.validate().is_err());
        assert!(NormalizationSettings { target_db: f64::NAN, ..base }.validate().is_err());
        assert!(NormalizationSettings { gain_cap_db: -1.0, ..base }.validate().is_err());
        assert!(NormalizationSettings { window_seconds: 2, ..base }.validate().is_err());
        assert!(NormalizationSettings { window_seconds: 31, ..base }.validate().is_err());
        assert!(NormalizationSettings { lookahead_percent: 101, ..base }.validate().is_err());

        assert!(NormalizationSettings { window_seconds: 3, lookahead_percent: 100, ..base }
            .validate()
            .is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let settings = NormalizationSettings::from_json(r#"{"targetDb": -16.0}"#).unwrap();
        assert_eq!(settings.target_db, -16.0);
        assert_eq!(settings.gain_cap_db, DEFAULT_GAIN_CAP_DB);
        assert_eq!(settings.window_seconds, DEFAULT_WINDOW_SECONDS);
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(
            NormalizationSettings::from_json("not json"),
            Err(NormalizeError::Config(_))
        ));
        assert!(matches!(
            NormalizationSettings::from_json(r#"{"windowSeconds": 60}"#),
            Err(NormalizeError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_schema_matches_settings_keys() {
        let json = serde_json::to_value(NormalizationSettings::default()).unwrap();
        for descriptor in SETTINGS_SCHEMA {
            assert!(
                json.get(descriptor.key).is_some(),
                "schema key {} missing from serialized settings",
                descriptor.key
            );
        }
        assert_eq!(SETTINGS_SCHEMA.len(), json.as_object().unwrap().len());
    }

    #[test]
    fn test_schema_serializes() {
        let json = serde_json::to_value(SETTINGS_SCHEMA).unwrap();
        assert_eq!(json[0]["type"], "float");
        assert_eq!(json[2]["type"], "int");
        assert_eq!(json[2]["min"], 3);
        assert_eq!(json[3]["default"], 50);
    }
}
