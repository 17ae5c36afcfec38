use billswap_core::TrustProfile;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{SwapError, SwapResult};
use crate::traits::{BillingProvider, TokenPack};

/// Which pool a consumed token came from; needed to re-credit on
/// compensation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenSource {
    Free,
    Purchased,
    Unlimited,
}

/// Per-user token balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub free_remaining: u32,
    pub purchased: u32,
    pub unlimited: bool,
    pub period_start: DateTime<Utc>,
    /// Swaps this user has already spent a token on; repeat charges are
    /// no-ops
    pub consumed_swaps: HashMap<Uuid, TokenSource>,
}

impl TokenBalance {
    fn new(free_per_month: u32) -> Self {
        Self {
            free_remaining: free_per_month,
            purchased: 0,
            unlimited: false,
            period_start: Utc::now(),
            consumed_swaps: HashMap::new(),
        }
    }

    fn roll_period(&mut self, now: DateTime<Utc>, free_per_month: u32) {
        if now.year() != self.period_start.year() || now.month() != self.period_start.month() {
            self.free_remaining = free_per_month;
            self.period_start = now;
        }
    }
}

/// Token and connection ledger
///
/// Tokens gate chat unlock on a match; velocity checks gate new connection
/// requests against the tier's monthly quota. All balance mutations for a
/// user happen under one write lock, so concurrent connection attempts
/// across different swaps cannot double-spend.
pub struct TokenLedger {
    balances: Arc<RwLock<HashMap<String, TokenBalance>>>,
    billing: Arc<dyn BillingProvider>,
    free_per_month: u32,
}

impl TokenLedger {
    pub fn new(billing: Arc<dyn BillingProvider>, free_per_month: u32) -> Self {
        Self {
            balances: Arc::new(RwLock::new(HashMap::new())),
            billing,
            free_per_month,
        }
    }

    /// Current balance snapshot for a user
    pub async fn balance(&self, user_id: &str) -> TokenBalance {
        let mut balances = self.balances.write().await;
        let balance = balances
            .entry(user_id.to_string())
            .or_insert_with(|| TokenBalance::new(self.free_per_month));
        balance.roll_period(Utc::now(), self.free_per_month);
        balance.clone()
    }

    /// Spend one token to unlock chat on a swap
    ///
    /// Idempotent per swap: a repeat call for the same swap id is a no-op
    /// success. Free balance drains before purchased. Fails with
    /// `InsufficientTokens` leaving balances untouched when both pools are
    /// empty and the user has no unlimited subscription.
    pub async fn use_token(&self, user_id: &str, swap_id: Uuid) -> SwapResult<()> {
        // The subscription lookup happens outside the balance lock; the
        // unlimited flag is only ever flipped on, so a stale read is safe.
        let unlimited = self
            .billing
            .has_active_subscription(user_id)
            .await
            .map_err(|e| SwapError::collaborator("billing", e.to_string()))?;

        let mut balances = self.balances.write().await;
        let balance = balances
            .entry(user_id.to_string())
            .or_insert_with(|| TokenBalance::new(self.free_per_month));
        balance.roll_period(Utc::now(), self.free_per_month);
        balance.unlimited = balance.unlimited || unlimited;

        if balance.consumed_swaps.contains_key(&swap_id) {
            debug!(user_id, swap_id = %swap_id, "Token already charged for swap");
            return Ok(());
        }

        let source = if balance.unlimited {
            TokenSource::Unlimited
        } else if balance.free_remaining > 0 {
            balance.free_remaining -= 1;
            TokenSource::Free
        } else if balance.purchased > 0 {
            balance.purchased -= 1;
            TokenSource::Purchased
        } else {
            return Err(SwapError::InsufficientTokens {
                user_id: user_id.to_string(),
            });
        };
        balance.consumed_swaps.insert(swap_id, source);

        info!(
            user_id,
            swap_id = %swap_id,
            free_remaining = balance.free_remaining,
            purchased = balance.purchased,
            "Token consumed"
        );
        Ok(())
    }

    /// Compensate a charge whose swap transition failed to commit,
    /// re-crediting the pool the token came from
    pub async fn release_token(&self, user_id: &str, swap_id: Uuid) {
        let mut balances = self.balances.write().await;
        let Some(balance) = balances.get_mut(user_id) else {
            return;
        };
        match balance.consumed_swaps.remove(&swap_id) {
            Some(TokenSource::Free) => balance.free_remaining += 1,
            Some(TokenSource::Purchased) => balance.purchased += 1,
            Some(TokenSource::Unlimited) | None => {}
        }
        debug!(user_id, swap_id = %swap_id, "Token charge compensated");
    }

    /// Advisory velocity gate, evaluated before a new connection request
    ///
    /// Distinct from token spend; mutates nothing.
    pub async fn check_velocity(&self, profile: &TrustProfile) -> SwapResult<()> {
        let balance = self.balance(&profile.user_id).await;
        if balance.unlimited {
            return Ok(());
        }
        let unlimited = self
            .billing
            .has_active_subscription(&profile.user_id)
            .await
            .map_err(|e| SwapError::collaborator("billing", e.to_string()))?;
        if unlimited {
            return Ok(());
        }

        let limit = profile.tier.monthly_connection_limit();
        if profile.monthly_connections_used >= limit {
            return Err(SwapError::VelocityLimitReached {
                limit,
                tier: profile.tier,
            });
        }
        Ok(())
    }

    /// Buy a token pack; tokens are credited only after the billing charge
    /// confirms
    pub async fn purchase_pack(&self, user_id: &str, pack: TokenPack) -> SwapResult<TokenBalance> {
        self.billing
            .charge_token_pack(user_id, pack)
            .await
            .map_err(|e| SwapError::collaborator("billing", e.to_string()))?;

        let mut balances = self.balances.write().await;
        let balance = balances
            .entry(user_id.to_string())
            .or_insert_with(|| TokenBalance::new(self.free_per_month));
        balance.purchased += pack.token_count();

        info!(
            user_id,
            pack = ?pack,
            purchased = balance.purchased,
            "Token pack credited"
        );
        Ok(balance.clone())
    }

    /// Flip the unlimited flag, e.g. after a subscription webhook
    pub async fn set_unlimited(&self, user_id: &str, unlimited: bool) {
        let mut balances = self.balances.write().await;
        let balance = balances
            .entry(user_id.to_string())
            .or_insert_with(|| TokenBalance::new(self.free_per_month));
        balance.unlimited = unlimited;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockBillingProvider;
    use billswap_core::Tier;

    fn ledger_with(free: u32) -> (TokenLedger, Arc<MockBillingProvider>) {
        let billing = Arc::new(MockBillingProvider::new());
        (TokenLedger::new(billing.clone(), free), billing)
    }

    #[tokio::test]
    async fn test_use_token_drains_free_then_purchased() {
        let (ledger, _) = ledger_with(1);
        ledger.purchase_pack("alice", TokenPack::Small).await.unwrap();

        ledger.use_token("alice", Uuid::new_v4()).await.unwrap();
        let balance = ledger.balance("alice").await;
        assert_eq!(balance.free_remaining, 0);
        assert_eq!(balance.purchased, 5);

        ledger.use_token("alice", Uuid::new_v4()).await.unwrap();
        let balance = ledger.balance("alice").await;
        assert_eq!(balance.purchased, 4);
    }

    #[tokio::test]
    async fn test_use_token_idempotent_per_swap() {
        let (ledger, _) = ledger_with(2);
        let swap_id = Uuid::new_v4();

        ledger.use_token("alice", swap_id).await.unwrap();
        ledger.use_token("alice", swap_id).await.unwrap();

        let balance = ledger.balance("alice").await;
        assert_eq!(balance.free_remaining, 1);
    }

    #[tokio::test]
    async fn test_insufficient_tokens_leaves_balance_unchanged() {
        let (ledger, _) = ledger_with(0);

        let result = ledger.use_token("alice", Uuid::new_v4()).await;
        assert!(matches!(result, Err(SwapError::InsufficientTokens { .. })));

        let balance = ledger.balance("alice").await;
        assert_eq!(balance.free_remaining, 0);
        assert_eq!(balance.purchased, 0);
        assert!(balance.consumed_swaps.is_empty());
    }

    #[tokio::test]
    async fn test_release_recredits_original_pool() {
        let (ledger, _) = ledger_with(1);
        let swap_id = Uuid::new_v4();

        ledger.use_token("alice", swap_id).await.unwrap();
        assert_eq!(ledger.balance("alice").await.free_remaining, 0);

        ledger.release_token("alice", swap_id).await;
        let balance = ledger.balance("alice").await;
        assert_eq!(balance.free_remaining, 1);
        assert!(balance.consumed_swaps.is_empty());

        // The swap may be charged again after compensation.
        ledger.use_token("alice", swap_id).await.unwrap();
        assert_eq!(ledger.balance("alice").await.free_remaining, 0);
    }

    #[tokio::test]
    async fn test_unlimited_subscription_bypasses_balances() {
        let (ledger, billing) = ledger_with(0);
        billing.add_subscriber("alice").await;

        ledger.use_token("alice", Uuid::new_v4()).await.unwrap();
        let balance = ledger.balance("alice").await;
        assert_eq!(balance.free_remaining, 0);
        assert_eq!(balance.purchased, 0);
    }

    #[tokio::test]
    async fn test_check_velocity() {
        let (ledger, billing) = ledger_with(3);
        let mut profile = TrustProfile::new("alice");
        assert_eq!(profile.tier, Tier::Provisional);

        assert!(ledger.check_velocity(&profile).await.is_ok());

        profile.monthly_connections_used = 3;
        let result = ledger.check_velocity(&profile).await;
        assert!(matches!(
            result,
            Err(SwapError::VelocityLimitReached { limit: 3, .. })
        ));

        // An unlimited subscription overrides the quota.
        billing.add_subscriber("alice").await;
        assert!(ledger.check_velocity(&profile).await.is_ok());
    }

    #[tokio::test]
    async fn test_purchase_credits_after_charge() {
        let (ledger, billing) = ledger_with(0);
        let balance = ledger.purchase_pack("alice", TokenPack::Medium).await.unwrap();
        assert_eq!(balance.purchased, 15);
        assert_eq!(billing.charge_count().await, 1);
    }
}
