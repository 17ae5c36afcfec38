use async_trait::async_trait;
use billswap_core::TrustProfile;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{SwapError, SwapResult};
use crate::types::Swap;

/// Storage abstraction for swap aggregates and trust profiles
///
/// `update_swap` is a compare-and-set on the aggregate version: the caller
/// pre-bumps `swap.version` and passes the version it loaded; the store
/// rejects the write with `VersionConflict` when the stored version no
/// longer matches. That check is the per-swap serialization boundary.
#[async_trait]
pub trait SwapStore: Send + Sync {
    async fn insert_swap(&self, swap: &Swap) -> SwapResult<()>;

    async fn get_swap(&self, swap_id: Uuid) -> SwapResult<Swap>;

    /// Compare-and-set write of the whole aggregate
    async fn update_swap(&self, swap: &Swap, expected_version: u64) -> SwapResult<()>;

    async fn list_swaps_for_user(&self, user_id: &str) -> SwapResult<Vec<Swap>>;

    /// Non-terminal swaps, for the deadline sweep
    async fn list_open_swaps(&self) -> SwapResult<Vec<Swap>>;

    /// Most recently updated swaps first
    async fn list_recent_swaps(&self, limit: usize) -> SwapResult<Vec<Swap>>;

    /// Bills currently linked to a non-terminal swap
    async fn active_bill_ids(&self) -> SwapResult<HashSet<Uuid>>;

    /// Whether `filer` has an unresolved dispute on a swap shared with
    /// `against`
    async fn has_open_dispute_between(&self, filer: &str, against: &str) -> SwapResult<bool>;

    async fn get_profile(&self, user_id: &str) -> SwapResult<TrustProfile>;

    async fn upsert_profile(&self, profile: &TrustProfile) -> SwapResult<()>;
}

/// In-memory store for development and testing
#[derive(Debug, Default)]
pub struct MemorySwapStore {
    swaps: Arc<RwLock<HashMap<Uuid, Swap>>>,
    profiles: Arc<RwLock<HashMap<String, TrustProfile>>>,
}

impl MemorySwapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn swap_count(&self) -> usize {
        self.swaps.read().await.len()
    }
}

#[async_trait]
impl SwapStore for MemorySwapStore {
    async fn insert_swap(&self, swap: &Swap) -> SwapResult<()> {
        let mut swaps = self.swaps.write().await;
        swaps.insert(swap.id, swap.clone());
        Ok(())
    }

    async fn get_swap(&self, swap_id: Uuid) -> SwapResult<Swap> {
        let swaps = self.swaps.read().await;
        swaps
            .get(&swap_id)
            .cloned()
            .ok_or(SwapError::SwapNotFound { swap_id })
    }

    async fn update_swap(&self, swap: &Swap, expected_version: u64) -> SwapResult<()> {
        let mut swaps = self.swaps.write().await;
        let current = swaps
            .get(&swap.id)
            .ok_or(SwapError::SwapNotFound { swap_id: swap.id })?;
        if current.version != expected_version {
            return Err(SwapError::VersionConflict { swap_id: swap.id });
        }
        swaps.insert(swap.id, swap.clone());
        Ok(())
    }

    async fn list_swaps_for_user(&self, user_id: &str) -> SwapResult<Vec<Swap>> {
        let swaps = self.swaps.read().await;
        Ok(swaps
            .values()
            .filter(|s| s.is_participant(user_id))
            .cloned()
            .collect())
    }

    async fn list_open_swaps(&self) -> SwapResult<Vec<Swap>> {
        let swaps = self.swaps.read().await;
        Ok(swaps
            .values()
            .filter(|s| !s.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn list_recent_swaps(&self, limit: usize) -> SwapResult<Vec<Swap>> {
        let swaps = self.swaps.read().await;
        let mut recent: Vec<Swap> = swaps.values().cloned().collect();
        recent.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        recent.truncate(limit);
        Ok(recent)
    }

    async fn active_bill_ids(&self) -> SwapResult<HashSet<Uuid>> {
        let swaps = self.swaps.read().await;
        let mut ids = HashSet::new();
        for swap in swaps.values().filter(|s| !s.status.is_terminal()) {
            ids.insert(swap.bill_a);
            if let Some(bill_b) = swap.bill_b {
                ids.insert(bill_b);
            }
        }
        Ok(ids)
    }

    async fn has_open_dispute_between(&self, filer: &str, against: &str) -> SwapResult<bool> {
        let swaps = self.swaps.read().await;
        Ok(swaps.values().any(|s| {
            s.is_participant(filer)
                && s.is_participant(against)
                && s.open_dispute().is_some_and(|d| d.filer_id == filer)
        }))
    }

    async fn get_profile(&self, user_id: &str) -> SwapResult<TrustProfile> {
        let profiles = self.profiles.read().await;
        profiles
            .get(user_id)
            .cloned()
            .ok_or_else(|| SwapError::ProfileNotFound {
                user_id: user_id.to_string(),
            })
    }

    async fn upsert_profile(&self, profile: &TrustProfile) -> SwapResult<()> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SwapType;
    use billswap_core::Amount;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sample_swap() -> Swap {
        Swap::new_offer(
            SwapType::TwoSided,
            "alice",
            "bob",
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            Amount::new(dec!(85.00)).unwrap(),
            Amount::new(dec!(0.99)).unwrap(),
            Utc::now() + chrono::Duration::hours(48),
        )
    }

    #[tokio::test]
    async fn test_cas_rejects_stale_writes() {
        let store = MemorySwapStore::new();
        let mut swap = sample_swap();
        store.insert_swap(&swap).await.unwrap();

        // First writer wins.
        swap.version += 1;
        store.update_swap(&swap, swap.version - 1).await.unwrap();

        // A writer still holding version 0 must conflict.
        let mut stale = store.get_swap(swap.id).await.unwrap();
        stale.version = 1;
        let result = store.update_swap(&stale, 0).await;
        assert!(matches!(result, Err(SwapError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn test_active_bill_tracking() {
        let store = MemorySwapStore::new();
        let mut swap = sample_swap();
        store.insert_swap(&swap).await.unwrap();

        let active = store.active_bill_ids().await.unwrap();
        assert!(active.contains(&swap.bill_a));
        assert!(active.contains(&swap.bill_b.unwrap()));

        swap.status = crate::types::SwapStatus::Cancelled;
        swap.version += 1;
        store.update_swap(&swap, 0).await.unwrap();
        assert!(store.active_bill_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_profile_roundtrip() {
        let store = MemorySwapStore::new();
        assert!(matches!(
            store.get_profile("alice").await,
            Err(SwapError::ProfileNotFound { .. })
        ));

        let profile = TrustProfile::new("alice");
        store.upsert_profile(&profile).await.unwrap();
        let loaded = store.get_profile("alice").await.unwrap();
        assert_eq!(loaded, profile);
    }
}
