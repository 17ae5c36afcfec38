use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Amount;

/// Trust tiers, ordered from least to most established
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Provisional,
    Established,
    Power,
    Elite,
}

/// Threshold table: a profile qualifies for the highest tier whose minimum
/// completed-swap count AND minimum score it meets.
const TIER_THRESHOLDS: [(Tier, u32, u8); 4] = [
    (Tier::Provisional, 0, 0),
    (Tier::Established, 5, 55),
    (Tier::Power, 15, 70),
    (Tier::Elite, 40, 85),
];

impl Tier {
    /// Pure tier lookup from swap history
    pub fn for_history(completed_swap_count: u32, billix_score: u8) -> Tier {
        let mut tier = Tier::Provisional;
        for (candidate, min_count, min_score) in TIER_THRESHOLDS {
            if completed_swap_count >= min_count && billix_score >= min_score {
                tier = candidate;
            }
        }
        tier
    }

    /// Maximum bill amount this tier may put into a swap
    pub fn max_bill(&self) -> Amount {
        let cents = match self {
            Tier::Provisional => 50_00,
            Tier::Established => 100_00,
            Tier::Power => 150_00,
            Tier::Elite => 200_00,
        };
        Amount::new(Decimal::new(cents, 2)).expect("tier ceiling table is non-negative")
    }

    /// Monthly connection quota for this tier
    pub fn monthly_connection_limit(&self) -> u32 {
        match self {
            Tier::Provisional => 3,
            Tier::Established => 10,
            Tier::Power => 25,
            Tier::Elite => 60,
        }
    }

    /// Tiers from Power upward require a verified identity before a profile
    /// may advance into them.
    pub fn requires_identity_verification(&self) -> bool {
        *self >= Tier::Power
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Events that move a profile's score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreEvent {
    /// A swap the user participated in completed
    SwapCompleted,
    /// The user lost a dispute
    DisputeLost,
    /// The user filed a dispute resolved as unfounded
    FalseDisputeFiled,
}

/// Configurable score deltas per event
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreDeltas {
    pub completion: i32,
    pub dispute_lost: i32,
    pub false_filing: i32,
}

impl Default for ScoreDeltas {
    fn default() -> Self {
        Self {
            completion: 2,
            dispute_lost: -10,
            false_filing: -5,
        }
    }
}

impl ScoreDeltas {
    /// Delta for a score event
    pub fn delta(&self, event: ScoreEvent) -> i32 {
        match event {
            ScoreEvent::SwapCompleted => self.completion,
            ScoreEvent::DisputeLost => self.dispute_lost,
            ScoreEvent::FalseDisputeFiled => self.false_filing,
        }
    }
}

/// Emitted when a score event pushes a profile into a higher tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierAdvancement {
    pub previous_tier: Tier,
    pub new_tier: Tier,
    pub swaps_completed: u32,
    pub new_score: u8,
}

/// A user's trust standing
///
/// Mutated only by swap completion, dispute outcomes, and the monthly
/// connection-counter reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustProfile {
    pub user_id: String,
    pub tier: Tier,
    pub billix_score: u8,
    pub completed_swap_count: u32,
    pub monthly_connections_used: u32,
    /// Start of the current monthly window
    pub period_start: DateTime<Utc>,
}

impl TrustProfile {
    /// Create a fresh provisional profile with the starting score
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            tier: Tier::Provisional,
            billix_score: 50,
            completed_swap_count: 0,
            monthly_connections_used: 0,
            period_start: Utc::now(),
        }
    }

    /// Apply a score event
    ///
    /// Recomputes the tier from the threshold table. Advancement into a tier
    /// that requires identity verification is withheld when
    /// `identity_verified` is false; score and counts still accrue so the
    /// advancement lands as soon as verification passes. Returns the
    /// advancement when the stored tier increased.
    pub fn apply(
        &mut self,
        event: ScoreEvent,
        deltas: &ScoreDeltas,
        identity_verified: bool,
    ) -> Option<TierAdvancement> {
        let previous_tier = self.tier;

        if event == ScoreEvent::SwapCompleted {
            self.completed_swap_count += 1;
        }
        let raw = self.billix_score as i32 + deltas.delta(event);
        self.billix_score = raw.clamp(0, 100) as u8;

        let mut earned = Tier::for_history(self.completed_swap_count, self.billix_score);
        if earned.requires_identity_verification() && !identity_verified {
            earned = earned.min(Tier::Established);
        }
        self.tier = earned;

        if self.tier > previous_tier {
            Some(TierAdvancement {
                previous_tier,
                new_tier: self.tier,
                swaps_completed: self.completed_swap_count,
                new_score: self.billix_score,
            })
        } else {
            None
        }
    }

    /// Roll the monthly window forward, resetting the connection counter
    /// when the calendar month changed.
    pub fn roll_period(&mut self, now: DateTime<Utc>) {
        if now.year() != self.period_start.year() || now.month() != self.period_start.month() {
            self.monthly_connections_used = 0;
            self.period_start = now;
        }
    }

    /// Record a consumed connection for the current window
    pub fn record_connection(&mut self) {
        self.monthly_connections_used += 1;
    }

    /// Remaining connections this month under the tier quota
    pub fn connections_remaining(&self) -> u32 {
        self.tier
            .monthly_connection_limit()
            .saturating_sub(self.monthly_connections_used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case(0, 50, Tier::Provisional; "fresh profile")]
    #[test_case(5, 55, Tier::Established; "exactly at established")]
    #[test_case(5, 54, Tier::Provisional; "count met but score short")]
    #[test_case(14, 90, Tier::Established; "score met but count short")]
    #[test_case(15, 70, Tier::Power)]
    #[test_case(40, 85, Tier::Elite)]
    #[test_case(200, 100, Tier::Elite; "well past elite")]
    fn test_tier_table(count: u32, score: u8, expected: Tier) {
        assert_eq!(Tier::for_history(count, score), expected);
    }

    #[test]
    fn test_tier_ordering_and_ceilings() {
        assert!(Tier::Provisional < Tier::Established);
        assert!(Tier::Power < Tier::Elite);
        assert!(Tier::Provisional.max_bill() < Tier::Elite.max_bill());
        assert_eq!(Tier::Provisional.monthly_connection_limit(), 3);
        assert_eq!(Tier::Elite.monthly_connection_limit(), 60);
    }

    #[test]
    fn test_completion_advances_tier() {
        let mut profile = TrustProfile::new("user_1");
        let deltas = ScoreDeltas::default();
        profile.completed_swap_count = 4;
        profile.billix_score = 54;

        let advancement = profile.apply(ScoreEvent::SwapCompleted, &deltas, false);
        let advancement = advancement.expect("fifth completion should advance");
        assert_eq!(advancement.previous_tier, Tier::Provisional);
        assert_eq!(advancement.new_tier, Tier::Established);
        assert_eq!(advancement.swaps_completed, 5);
        assert_eq!(advancement.new_score, 56);
        assert_eq!(profile.tier, Tier::Established);
    }

    #[test]
    fn test_advancement_withheld_without_identity() {
        let mut profile = TrustProfile::new("user_1");
        let deltas = ScoreDeltas::default();
        profile.tier = Tier::Established;
        profile.completed_swap_count = 14;
        profile.billix_score = 70;

        // Qualifies for Power, but identity is unverified.
        assert!(profile
            .apply(ScoreEvent::SwapCompleted, &deltas, false)
            .is_none());
        assert_eq!(profile.tier, Tier::Established);

        // Next event with a verified identity lands the withheld advancement.
        let advancement = profile
            .apply(ScoreEvent::SwapCompleted, &deltas, true)
            .expect("verified profile should advance");
        assert_eq!(advancement.new_tier, Tier::Power);
    }

    #[test]
    fn test_dispute_loss_can_demote() {
        let mut profile = TrustProfile::new("user_1");
        let deltas = ScoreDeltas::default();
        profile.tier = Tier::Established;
        profile.completed_swap_count = 8;
        profile.billix_score = 60;

        assert!(profile.apply(ScoreEvent::DisputeLost, &deltas, true).is_none());
        assert_eq!(profile.billix_score, 50);
        assert_eq!(profile.tier, Tier::Provisional);
    }

    #[test]
    fn test_score_clamped() {
        let mut profile = TrustProfile::new("user_1");
        let deltas = ScoreDeltas::default();
        profile.billix_score = 3;
        profile.apply(ScoreEvent::DisputeLost, &deltas, true);
        assert_eq!(profile.billix_score, 0);

        profile.billix_score = 100;
        profile.apply(ScoreEvent::SwapCompleted, &deltas, true);
        assert_eq!(profile.billix_score, 100);
    }

    #[test]
    fn test_roll_period_resets_on_month_change() {
        let mut profile = TrustProfile::new("user_1");
        profile.period_start = Utc.with_ymd_and_hms(2026, 7, 14, 0, 0, 0).unwrap();
        profile.monthly_connections_used = 3;

        profile.roll_period(Utc.with_ymd_and_hms(2026, 7, 30, 0, 0, 0).unwrap());
        assert_eq!(profile.monthly_connections_used, 3);

        profile.roll_period(Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
        assert_eq!(profile.monthly_connections_used, 0);
    }

    proptest! {
        /// Tier never decreases as completions accrue with the default
        /// per-completion score gain, and the lookup is deterministic.
        #[test]
        fn tier_monotonic_in_completions(start_score in 0u8..=100, completions in 0u32..200) {
            let deltas = ScoreDeltas::default();
            let mut score = start_score as i32;
            let mut last = Tier::for_history(0, score.clamp(0, 100) as u8);
            for n in 1..=completions {
                score = (score + deltas.completion).clamp(0, 100);
                let tier = Tier::for_history(n, score as u8);
                prop_assert!(tier >= last);
                prop_assert_eq!(tier, Tier::for_history(n, score as u8));
                last = tier;
            }
        }
    }
}
