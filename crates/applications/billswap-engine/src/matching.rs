use billswap_core::{Amount, Bill, Tier, TrustProfile};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{SwapError, SwapResult};
use crate::storage::SwapStore;
use crate::traits::BillSource;
use crate::types::SwapType;

/// A ranked candidate bill for a swap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub bill: Bill,
    pub owner_tier: Tier,
    /// Distance from the caller's bill amount; the primary ranking key
    pub amount_difference: Amount,
}

/// Advisory matching pass over other users' bills
///
/// Matching never mutates state; accepting a proposed match is what creates
/// a swap. Every call is a fresh, independent query with no persisted
/// cursor.
pub struct MatchingEngine {
    store: Arc<dyn SwapStore>,
    bills: Arc<dyn BillSource>,
    config: EngineConfig,
}

impl MatchingEngine {
    pub fn new(store: Arc<dyn SwapStore>, bills: Arc<dyn BillSource>, config: EngineConfig) -> Self {
        Self {
            store,
            bills,
            config,
        }
    }

    /// Find compatible candidate bills for the caller's bill
    pub async fn find_matches(
        &self,
        user_id: &str,
        bill_id: Uuid,
        swap_type: SwapType,
        limit: usize,
    ) -> SwapResult<Vec<MatchCandidate>> {
        let bill = self.bills.get_bill(bill_id).await?;
        if bill.owner_id != user_id {
            return Err(SwapError::validation("bill", "caller does not own this bill"));
        }

        let profile = self.store.get_profile(user_id).await?;
        self.check_caller_eligibility(&bill, &profile)?;

        let active_bills = self.store.active_bill_ids().await?;
        if active_bills.contains(&bill.id) {
            return Err(SwapError::validation(
                "bill",
                "bill is already linked to an active swap",
            ));
        }

        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut candidates = Vec::new();
        for candidate in self.bills.bills_excluding(user_id).await? {
            if !seen.insert(candidate.id) || active_bills.contains(&candidate.id) {
                continue;
            }
            if !candidate.within_band(&self.config.eligibility_min, &self.config.eligibility_max) {
                continue;
            }
            if !category_compatible(swap_type, &bill, &candidate) {
                continue;
            }

            // Owners without a trust profile have never connected; skip them.
            let owner_profile = match self.store.get_profile(&candidate.owner_id).await {
                Ok(p) => p,
                Err(SwapError::ProfileNotFound { .. }) => continue,
                Err(e) => return Err(e),
            };

            // Both bills must sit under both parties' tier ceilings.
            let ceiling = profile.tier.max_bill().min(owner_profile.tier.max_bill());
            if candidate.amount > ceiling || bill.amount > ceiling {
                continue;
            }

            if self
                .store
                .has_open_dispute_between(&candidate.owner_id, user_id)
                .await?
            {
                continue;
            }

            candidates.push(MatchCandidate {
                amount_difference: candidate.amount.abs_diff(&bill.amount),
                owner_tier: owner_profile.tier,
                bill: candidate,
            });
        }

        // Closest amount first, freshest upload breaking ties.
        candidates.sort_by(|a, b| {
            a.amount_difference
                .cmp(&b.amount_difference)
                .then(b.bill.created_at.cmp(&a.bill.created_at))
        });
        candidates.truncate(limit);

        debug!(
            user_id,
            bill_id = %bill_id,
            count = candidates.len(),
            "Matching pass complete"
        );
        Ok(candidates)
    }

    fn check_caller_eligibility(&self, bill: &Bill, profile: &TrustProfile) -> SwapResult<()> {
        if !bill.within_band(&self.config.eligibility_min, &self.config.eligibility_max) {
            return Err(SwapError::validation(
                "amount",
                format!(
                    "bill amount {} outside the {}-{} eligibility band",
                    bill.amount, self.config.eligibility_min, self.config.eligibility_max
                ),
            ));
        }
        if bill.amount > profile.tier.max_bill() {
            return Err(SwapError::validation(
                "amount",
                format!(
                    "bill amount {} exceeds the {} tier ceiling of {}",
                    bill.amount,
                    profile.tier,
                    profile.tier.max_bill()
                ),
            ));
        }
        Ok(())
    }
}

/// Category compatibility per swap type: two-sided swaps pair bills of
/// different categories; one-sided swaps carry no category constraint.
fn category_compatible(swap_type: SwapType, own: &Bill, candidate: &Bill) -> bool {
    match swap_type {
        SwapType::TwoSided => own.category != candidate.category,
        SwapType::OneSided => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySwapStore;
    use crate::traits::MemoryBillSource;
    use billswap_core::BillCategory;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn bill(owner: &str, category: BillCategory, amount: rust_decimal::Decimal) -> Bill {
        Bill::new(
            owner,
            "Provider",
            category,
            Amount::new(amount).unwrap(),
            NaiveDate::from_ymd_opt(2026, 9, 15).unwrap(),
            "acct",
        )
    }

    async fn setup() -> (MatchingEngine, Arc<MemoryBillSource>, Arc<MemorySwapStore>) {
        let store = Arc::new(MemorySwapStore::new());
        let bills = Arc::new(MemoryBillSource::new());
        let engine = MatchingEngine::new(store.clone(), bills.clone(), EngineConfig::default());
        (engine, bills, store)
    }

    #[tokio::test]
    async fn test_ranking_closest_amount_first() {
        let (engine, bills, store) = setup().await;
        store.upsert_profile(&TrustProfile::new("alice")).await.unwrap();
        store.upsert_profile(&TrustProfile::new("bob")).await.unwrap();
        store.upsert_profile(&TrustProfile::new("carol")).await.unwrap();

        let own = bill("alice", BillCategory::Utilities, dec!(40.00));
        let own_id = own.id;
        bills.add_bill(own).await;

        let close = bill("bob", BillCategory::Internet, dec!(42.00));
        let far = bill("carol", BillCategory::Phone, dec!(49.00));
        let close_id = close.id;
        bills.add_bill(far).await;
        bills.add_bill(close).await;

        let matches = engine
            .find_matches("alice", own_id, SwapType::TwoSided, 10)
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].bill.id, close_id);
        assert_eq!(matches[0].amount_difference.value(), dec!(2.00));
    }

    #[tokio::test]
    async fn test_two_sided_requires_different_category() {
        let (engine, bills, store) = setup().await;
        store.upsert_profile(&TrustProfile::new("alice")).await.unwrap();
        store.upsert_profile(&TrustProfile::new("bob")).await.unwrap();

        let own = bill("alice", BillCategory::Utilities, dec!(40.00));
        let own_id = own.id;
        bills.add_bill(own).await;
        bills.add_bill(bill("bob", BillCategory::Utilities, dec!(41.00))).await;

        let matches = engine
            .find_matches("alice", own_id, SwapType::TwoSided, 10)
            .await
            .unwrap();
        assert!(matches.is_empty());

        let matches = engine
            .find_matches("alice", own_id, SwapType::OneSided, 10)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn test_tier_ceiling_filters_candidates() {
        let (engine, bills, store) = setup().await;
        // Provisional ceiling is $50.
        store.upsert_profile(&TrustProfile::new("alice")).await.unwrap();
        store.upsert_profile(&TrustProfile::new("bob")).await.unwrap();

        let own = bill("alice", BillCategory::Utilities, dec!(40.00));
        let own_id = own.id;
        bills.add_bill(own).await;
        bills.add_bill(bill("bob", BillCategory::Internet, dec!(75.00))).await;

        let matches = engine
            .find_matches("alice", own_id, SwapType::TwoSided, 10)
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_caller_bill_outside_band_rejected() {
        let (engine, bills, store) = setup().await;
        store.upsert_profile(&TrustProfile::new("alice")).await.unwrap();

        let own = bill("alice", BillCategory::Utilities, dec!(9.99));
        let own_id = own.id;
        bills.add_bill(own).await;

        let result = engine
            .find_matches("alice", own_id, SwapType::TwoSided, 10)
            .await;
        assert!(matches!(result, Err(SwapError::ValidationFailed { .. })));
    }

    #[tokio::test]
    async fn test_unprofiled_owner_skipped() {
        let (engine, bills, store) = setup().await;
        store.upsert_profile(&TrustProfile::new("alice")).await.unwrap();

        let own = bill("alice", BillCategory::Utilities, dec!(40.00));
        let own_id = own.id;
        bills.add_bill(own).await;
        bills.add_bill(bill("stranger", BillCategory::Internet, dec!(41.00))).await;

        let matches = engine
            .find_matches("alice", own_id, SwapType::TwoSided, 10)
            .await
            .unwrap();
        assert!(matches.is_empty());
    }
}
