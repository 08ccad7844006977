//! Configuration surface: the constants of a replay, not CLI flags.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::policy::PolicyKind;

/// Constants governing a replay run.
///
/// A replay is a pure function of the event log and this struct; keep the
/// value around (it serializes) to make a run reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Probability weight applied to a contact's shared risk on every
    /// diffusion update.
    pub transmission_probability: f64,
    /// Bit-width of the shared risk quantization (`1..=8`).
    pub risk_quantization_bits: u8,
    /// Daily-swing threshold that triggers backward gossip. Strict: a swing
    /// of exactly this much does not fire.
    pub significance_threshold: f64,
    /// Backward-gossip lookback window, in days. Also the retention horizon
    /// for per-human message history and cluster entries.
    pub gossip_lookback_days: i64,
    /// Days of assumed infectiousness before symptom onset; the same offset
    /// gates the plausible-transmission check on gossip.
    pub symptom_plausibility_days: i64,
    /// Active diffusion policy.
    pub policy: PolicyKind,
    /// Seed for the per-human pseudonym-rotation streams. The diffusion
    /// logic itself is deterministic and takes no randomness.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            transmission_probability: 0.05,
            risk_quantization_bits: 4,
            significance_threshold: 0.1,
            gossip_lookback_days: 14,
            symptom_plausibility_days: 3,
            policy: PolicyKind::default(),
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Range-check every field. Called by [`crate::Engine::new`], so a
    /// misconfiguration is fatal at startup and never surfaces mid-replay.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.transmission_probability.is_finite()
            || !(0.0..=1.0).contains(&self.transmission_probability)
        {
            return Err(EngineError::InvalidConfig {
                reason: format!(
                    "transmission_probability {} outside [0, 1]",
                    self.transmission_probability
                ),
            });
        }
        if !(1..=8).contains(&self.risk_quantization_bits) {
            return Err(EngineError::InvalidConfig {
                reason: format!(
                    "risk_quantization_bits {} outside 1..=8",
                    self.risk_quantization_bits
                ),
            });
        }
        if !self.significance_threshold.is_finite() || self.significance_threshold < 0.0 {
            return Err(EngineError::InvalidConfig {
                reason: format!(
                    "significance_threshold {} must be finite and non-negative",
                    self.significance_threshold
                ),
            });
        }
        if self.gossip_lookback_days < 0 {
            return Err(EngineError::InvalidConfig {
                reason: format!("gossip_lookback_days {} is negative", self.gossip_lookback_days),
            });
        }
        if self.symptom_plausibility_days < 0 {
            return Err(EngineError::InvalidConfig {
                reason: format!(
                    "symptom_plausibility_days {} is negative",
                    self.symptom_plausibility_days
                ),
            });
        }
        Ok(())
    }
}
