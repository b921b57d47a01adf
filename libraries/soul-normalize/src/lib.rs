//! Real-time loudness normalization for Soul Player
//!
//! This crate provides:
//! - A lookahead normalizer that steers live audio towards a target
//!   integrated loudness (EBU R128) without audible gain steps
//! - The lookahead ring buffer and loudness-to-gain policy it is built from
//! - A host-facing filter contract with a declarative settings schema
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Audio Block │ ──► │ LoudnessMeter│ ──► │  GainPolicy  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//!        │                                        │ gain
//!        ▼                                        ▼
//!        └──────────────────────────────► ┌───────────────┐     ┌──────────────┐
//!                                         │LookaheadBuffer│ ──► │ Delayed Block│
//!                                         └───────────────┘     └──────────────┘
//! ```
//!
//! The gain is computed from the newest audio but applied to audio that
//! entered the buffer up to one lookahead length earlier. While the buffer
//! fills, blocks are absorbed and the host forwards nothing.
//!
//! # Example
//!
//! ```ignore
//! use soul_normalize::{NormalizationEngine, NormalizationSettings};
//!
//! let settings = NormalizationSettings::from_json(r#"{"targetDb": -16.0}"#)?;
//! let engine = NormalizationEngine::new(2, 48000, &settings)?;
//!
//! let mut block = [Some(&mut left[..]), Some(&mut right[..])];
//! if engine.process(&mut block).should_emit() {
//!     output.write(&left, &right);
//! }
//! ```

#![deny(unsafe_code)]

mod engine;
mod error;
mod filter;
mod gain;
mod lookahead;
mod meter;
mod settings;

pub use engine::{BlockOutcome, NormalizationEngine};
pub use error::{NormalizeError, Result};
pub use filter::{AudioFilter, FilterInfo};
pub use gain::{db_to_linear, linear_to_db, GainPolicy};
pub use lookahead::LookaheadBuffer;
pub use meter::{EbuR128Meter, LoudnessMeter};
pub use settings::{
    NormalizationSettings, SettingDescriptor, SettingKind, DEFAULT_GAIN_CAP_DB,
    DEFAULT_LOOKAHEAD_PERCENT, DEFAULT_TARGET_DB, DEFAULT_WINDOW_SECONDS, SETTINGS_SCHEMA,
};
