use serde::{Deserialize, Serialize};

use crate::IndexError;

/// Banding parameters for the LSH index.
///
/// A signature of length `num_bands * rows_per_band` is split into
/// `num_bands` contiguous bands. Two documents become candidates when at
/// least one band hashes identically, which for shingle similarity `s`
/// happens with probability `1 - (1 - s^R)^B`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LshConfig {
    /// Number of bands (B).
    pub num_bands: usize,
    /// Signature values per band (R).
    pub rows_per_band: usize,
    /// Seed for band hashing.
    pub seed: u64,
}

impl LshConfig {
    pub fn new(num_bands: usize, rows_per_band: usize) -> Self {
        Self {
            num_bands,
            rows_per_band,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Expected signature length, `B * R`.
    pub fn signature_len(&self) -> Option<usize> {
        self.num_bands.checked_mul(self.rows_per_band)
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.num_bands == 0 {
            return Err(IndexError::InvalidConfig(
                "num_bands must be >= 1".into(),
            ));
        }
        if self.rows_per_band == 0 {
            return Err(IndexError::InvalidConfig(
                "rows_per_band must be >= 1".into(),
            ));
        }
        if self.num_bands > u16::MAX as usize {
            return Err(IndexError::InvalidConfig(format!(
                "num_bands must be <= {} (got {})",
                u16::MAX,
                self.num_bands
            )));
        }
        if self.signature_len().is_none() {
            return Err(IndexError::InvalidConfig(
                "num_bands * rows_per_band overflows".into(),
            ));
        }
        Ok(())
    }

    /// Validate and also require that banding covers exactly `permutations`
    /// signature slots.
    pub fn validate_for(&self, permutations: usize) -> Result<(), IndexError> {
        self.validate()?;
        match self.signature_len() {
            Some(len) if len == permutations => Ok(()),
            _ => Err(IndexError::InvalidConfig(format!(
                "num_bands ({}) * rows_per_band ({}) must equal num_permutations ({permutations})",
                self.num_bands, self.rows_per_band
            ))),
        }
    }

    /// Probability that a pair with shingle similarity `s` shares at least
    /// one bucket under this banding.
    pub fn candidate_probability(&self, s: f64) -> f64 {
        candidate_probability(s, self.num_bands, self.rows_per_band)
    }
}

impl Default for LshConfig {
    fn default() -> Self {
        Self {
            num_bands: 16,
            rows_per_band: 8,
            seed: 0x5EED_BA4D_0F15_5EED,
        }
    }
}

/// `1 - (1 - s^R)^B`.
pub fn candidate_probability(s: f64, bands: usize, rows: usize) -> f64 {
    let s = s.clamp(0.0, 1.0);
    let band_hit = s.powi(rows as i32);
    1.0 - (1.0 - band_hit).powi(bands as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bands_cover_128_permutations() {
        let cfg = LshConfig::default();
        assert_eq!(cfg.signature_len(), Some(128));
        assert!(cfg.validate_for(128).is_ok());
    }

    #[test]
    fn mismatched_signature_length_is_rejected() {
        let cfg = LshConfig::new(16, 8);
        assert!(matches!(
            cfg.validate_for(100),
            Err(IndexError::InvalidConfig(msg)) if msg.contains("must equal")
        ));
    }

    #[test]
    fn zero_bands_or_rows_are_rejected() {
        assert!(LshConfig::new(0, 8).validate().is_err());
        assert!(LshConfig::new(16, 0).validate().is_err());
    }

    #[test]
    fn candidate_probability_matches_closed_form() {
        let cfg = LshConfig::default();
        assert_eq!(cfg.candidate_probability(0.0), 0.0);
        assert_eq!(cfg.candidate_probability(1.0), 1.0);
        // s = 0.8, R = 8, B = 16 -> about 0.947
        let p = cfg.candidate_probability(0.8);
        assert!((p - 0.9470).abs() < 1e-3, "p = {p}");
        assert!(cfg.candidate_probability(0.3) < 0.01);
    }
}
