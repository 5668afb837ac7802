//! Consensus parameters of an expertise ledger.
//!
//! Fixed at genesis and stored with the ledger. Changing any field on a live
//! chain changes replay results, so there is no update path.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BLOCKS_PER_WEEK, CONTENT_ACTIVITY_WINDOW_SECONDS, ECI_CURVE_EXPERTISE_FACTOR, ECI_SCALE,
    PERCENT_100, REQUIRED_POWER_PERCENT, REVERSE_AUCTION_WINDOW_SECONDS,
    VOTE_REGENERATION_SECONDS,
};
use crate::error::EciError;
use crate::types::Percent;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    // ── Voting power ─────────────────────────────────────────────────────
    /// Seconds for voting power to regenerate from 0% to 100%.
    pub regeneration_seconds: i64,

    /// Power cost of a 100%-weight review or vote.
    pub required_power_percent: Percent,

    /// Linear discount window for review votes.
    pub reverse_auction_window_seconds: i64,

    // ── Usage statistics ─────────────────────────────────────────────────
    /// Ring buffer size of the weekly usage window, in blocks.
    pub blocks_per_week: usize,

    // ── ECI curve ────────────────────────────────────────────────────────
    /// Upper bound of a per-discipline ECI value.
    pub eci_scale: i64,

    /// Weight of the discipline's total expertise in the curve denominator.
    pub eci_expertise_factor: i64,

    // ── Content ──────────────────────────────────────────────────────────
    pub content_activity_window_seconds: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            regeneration_seconds: VOTE_REGENERATION_SECONDS,
            required_power_percent: REQUIRED_POWER_PERCENT,
            reverse_auction_window_seconds: REVERSE_AUCTION_WINDOW_SECONDS,
            blocks_per_week: BLOCKS_PER_WEEK,
            eci_scale: ECI_SCALE,
            eci_expertise_factor: ECI_CURVE_EXPERTISE_FACTOR,
            content_activity_window_seconds: CONTENT_ACTIVITY_WINDOW_SECONDS,
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), EciError> {
        if self.regeneration_seconds <= 0 {
            return Err(EciError::InvalidConfig("regeneration_seconds must be positive".into()));
        }
        if self.required_power_percent > PERCENT_100 {
            return Err(EciError::InvalidConfig("required_power_percent exceeds 100%".into()));
        }
        if self.reverse_auction_window_seconds <= 0 {
            return Err(EciError::InvalidConfig(
                "reverse_auction_window_seconds must be positive".into(),
            ));
        }
        if self.blocks_per_week == 0 {
            return Err(EciError::InvalidConfig("blocks_per_week must be positive".into()));
        }
        if self.eci_scale <= 0 || self.eci_expertise_factor < 0 {
            return Err(EciError::InvalidConfig("ECI curve parameters out of range".into()));
        }
        if self.content_activity_window_seconds < 0 {
            return Err(EciError::InvalidConfig(
                "content_activity_window_seconds must not be negative".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        LedgerConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_window_rejected() {
        let cfg = LedgerConfig { reverse_auction_window_seconds: 0, ..LedgerConfig::default() };
        assert!(matches!(cfg.validate(), Err(EciError::InvalidConfig(_))));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: LedgerConfig = serde_json::from_str(r#"{"blocks_per_week": 10}"#).unwrap();
        assert_eq!(cfg.blocks_per_week, 10);
        assert_eq!(cfg.regeneration_seconds, VOTE_REGENERATION_SECONDS);
    }
}
