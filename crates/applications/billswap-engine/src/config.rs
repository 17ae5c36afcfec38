use billswap_core::{Amount, ScoreDeltas};
use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Engine configuration
///
/// Durations are stored in hours so the config stays serde-friendly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Global eligibility band for bill amounts
    pub eligibility_min: Amount,
    pub eligibility_max: Amount,
    /// Per-party connection fee, fixed at offer time
    pub swap_fee: Amount,
    /// How long an offer stays open for acceptance
    pub accept_window_hours: i64,
    /// Response clock reset by each counter-offer
    pub counter_response_hours: i64,
    /// Proof submission window starting at lock
    pub proof_window_hours: i64,
    /// Review window before an unreviewed proof auto-accepts
    pub proof_review_hours: i64,
    /// Response window on extension requests
    pub extension_response_hours: i64,
    /// Cumulative extension cap per swap, in days
    pub max_extension_days: i64,
    /// Resubmission cap per proof chain
    pub max_proof_resubmissions: u8,
    /// Free connection tokens granted per month
    pub free_tokens_per_month: u32,
    /// Score movement per trust event
    pub score_deltas: ScoreDeltas,
    /// Bounded retries on optimistic-concurrency conflicts
    pub max_commit_retries: u8,
    /// Default activity feed page size
    pub feed_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            eligibility_min: Amount::new(Decimal::new(20_00, 2)).expect("band minimum"),
            eligibility_max: Amount::new(Decimal::new(200_00, 2)).expect("band maximum"),
            swap_fee: Amount::new(Decimal::new(99, 2)).expect("fee"),
            accept_window_hours: 48,
            counter_response_hours: 12,
            proof_window_hours: 72,
            proof_review_hours: 24,
            extension_response_hours: 24,
            max_extension_days: 7,
            max_proof_resubmissions: 3,
            free_tokens_per_month: 3,
            score_deltas: ScoreDeltas::default(),
            max_commit_retries: 3,
            feed_limit: 20,
        }
    }
}

impl EngineConfig {
    pub fn accept_window(&self) -> Duration {
        Duration::hours(self.accept_window_hours)
    }

    pub fn counter_response_window(&self) -> Duration {
        Duration::hours(self.counter_response_hours)
    }

    pub fn proof_window(&self) -> Duration {
        Duration::hours(self.proof_window_hours)
    }

    pub fn proof_review_window(&self) -> Duration {
        Duration::hours(self.proof_review_hours)
    }

    pub fn extension_response_window(&self) -> Duration {
        Duration::hours(self.extension_response_hours)
    }

    pub fn max_extension(&self) -> Duration {
        Duration::days(self.max_extension_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_band() {
        let config = EngineConfig::default();
        assert_eq!(config.eligibility_min.value(), dec!(20.00));
        assert_eq!(config.eligibility_max.value(), dec!(200.00));
        assert_eq!(config.swap_fee.value(), dec!(0.99));
        assert_eq!(config.max_extension(), Duration::days(7));
    }
}
