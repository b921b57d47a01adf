//! Loudness-to-gain control policy

/// Convert a gain in dB to a linear multiplier
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert a linear multiplier to dB
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    if linear > 0.0 {
        20.0 * linear.log10()
    } else {
        f64::NEG_INFINITY
    }
}

/// Turns a measured loudness into the gain needed to reach the target
///
/// Only boosting is capped. A signal louder than the target is attenuated
/// by the full difference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainPolicy {
    /// Target loudness in LUFS
    pub target_db: f64,
    /// Maximum boost in dB
    pub cap_db: f64,
}

impl GainPolicy {
    pub fn new(target_db: f64, cap_db: f64) -> Self {
        Self { target_db, cap_db }
    }

    /// Gain in dB for a measured integrated loudness
    ///
    /// NaN and negative infinity mean the meter has no answer yet; the
    /// policy then leaves the signal alone (0 dB).
    pub fn gain_db(&self, measured_db: f64) -> f64 {
        if measured_db.is_nan() || measured_db == f64::NEG_INFINITY {
            return 0.0;
        }
        let raw = self.target_db - measured_db;
        raw.min(self.cap_db)
    }

    /// Linear multiplier for a measured integrated loudness
    pub fn multiplier(&self, measured_db: f64) -> f64 {
        db_to_linear(self.gain_db(measured_db))
    }
}
