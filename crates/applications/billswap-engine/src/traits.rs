use async_trait::async_trait;
use billswap_core::Bill;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{SwapError, SwapResult};
use crate::events::SwapEvent;

/// Source of swappable bills (ingestion/OCR happens upstream)
#[async_trait]
pub trait BillSource: Send + Sync {
    /// Bills a user has put up for swapping
    async fn eligible_bills(&self, user_id: &str) -> SwapResult<Vec<Bill>>;

    /// Look up a single bill
    async fn get_bill(&self, bill_id: Uuid) -> SwapResult<Bill>;

    /// Bills from every user except the given one, for matching passes
    async fn bills_excluding(&self, user_id: &str) -> SwapResult<Vec<Bill>>;
}

/// Identity verification collaborator
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn is_verified(&self, user_id: &str) -> SwapResult<bool>;
}

/// Token packs the billing collaborator can charge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPack {
    Small,
    Medium,
    Large,
}

impl TokenPack {
    /// Tokens credited per pack
    pub fn token_count(&self) -> u32 {
        match self {
            TokenPack::Small => 5,
            TokenPack::Medium => 15,
            TokenPack::Large => 40,
        }
    }
}

/// Payment/subscription billing collaborator
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Charge a token pack; the ledger credits tokens only after this
    /// confirms
    async fn charge_token_pack(&self, user_id: &str, pack: TokenPack) -> SwapResult<()>;

    /// Whether the user holds an unlimited-connections subscription
    async fn has_active_subscription(&self, user_id: &str) -> SwapResult<bool>;
}

/// Sink for transition events; delivery guarantees live downstream
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: SwapEvent) -> SwapResult<()>;
}

/// In-memory bill source for development and tests
#[derive(Debug, Default)]
pub struct MemoryBillSource {
    bills: Arc<RwLock<HashMap<Uuid, Bill>>>,
}

impl MemoryBillSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a bill
    pub async fn add_bill(&self, bill: Bill) {
        let mut bills = self.bills.write().await;
        bills.insert(bill.id, bill);
    }

    pub async fn remove_bill(&self, bill_id: Uuid) {
        let mut bills = self.bills.write().await;
        bills.remove(&bill_id);
    }
}

#[async_trait]
impl BillSource for MemoryBillSource {
    async fn eligible_bills(&self, user_id: &str) -> SwapResult<Vec<Bill>> {
        let bills = self.bills.read().await;
        Ok(bills
            .values()
            .filter(|b| b.owner_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_bill(&self, bill_id: Uuid) -> SwapResult<Bill> {
        let bills = self.bills.read().await;
        bills
            .get(&bill_id)
            .cloned()
            .ok_or(SwapError::BillNotFound { bill_id })
    }

    async fn bills_excluding(&self, user_id: &str) -> SwapResult<Vec<Bill>> {
        let bills = self.bills.read().await;
        Ok(bills
            .values()
            .filter(|b| b.owner_id != user_id)
            .cloned()
            .collect())
    }
}

/// Identity verifier backed by an allow-set; development profile marks
/// everyone verified
#[derive(Debug, Default)]
pub struct StaticIdentityVerifier {
    verified: Arc<RwLock<HashSet<String>>>,
    allow_all: bool,
}

impl StaticIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_all() -> Self {
        Self {
            verified: Arc::new(RwLock::new(HashSet::new())),
            allow_all: true,
        }
    }

    pub async fn mark_verified(&self, user_id: impl Into<String>) {
        let mut verified = self.verified.write().await;
        verified.insert(user_id.into());
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn is_verified(&self, user_id: &str) -> SwapResult<bool> {
        if self.allow_all {
            return Ok(true);
        }
        let verified = self.verified.read().await;
        Ok(verified.contains(user_id))
    }
}

/// Billing provider stub: charges always succeed, subscriptions come from a
/// seeded set
#[derive(Debug, Default)]
pub struct MockBillingProvider {
    subscribers: Arc<RwLock<HashSet<String>>>,
    charges: Arc<RwLock<Vec<(String, TokenPack)>>>,
}

impl MockBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_subscriber(&self, user_id: impl Into<String>) {
        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(user_id.into());
    }

    /// Charges recorded so far, for assertions
    pub async fn charge_count(&self) -> usize {
        self.charges.read().await.len()
    }
}

#[async_trait]
impl BillingProvider for MockBillingProvider {
    async fn charge_token_pack(&self, user_id: &str, pack: TokenPack) -> SwapResult<()> {
        let mut charges = self.charges.write().await;
        charges.push((user_id.to_string(), pack));
        Ok(())
    }

    async fn has_active_subscription(&self, user_id: &str) -> SwapResult<bool> {
        let subscribers = self.subscribers.read().await;
        Ok(subscribers.contains(user_id))
    }
}

/// Event sink that retains published events for inspection
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Arc<RwLock<Vec<SwapEvent>>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<SwapEvent> {
        self.events.read().await.clone()
    }

    pub async fn events_for(&self, swap_id: Uuid) -> Vec<SwapEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.swap_id == swap_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn publish(&self, event: SwapEvent) -> SwapResult<()> {
        let mut events = self.events.write().await;
        events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billswap_core::{Amount, BillCategory};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_memory_bill_source() {
        let source = MemoryBillSource::new();
        let bill = Bill::new(
            "alice",
            "ConEd",
            BillCategory::Utilities,
            Amount::new(dec!(85.00)).unwrap(),
            NaiveDate::from_ymd_opt(2026, 9, 15).unwrap(),
            "acct-1",
        );
        let bill_id = bill.id;
        source.add_bill(bill).await;

        assert_eq!(source.eligible_bills("alice").await.unwrap().len(), 1);
        assert!(source.bills_excluding("alice").await.unwrap().is_empty());
        assert!(source.get_bill(bill_id).await.is_ok());
        assert!(matches!(
            source.get_bill(Uuid::new_v4()).await,
            Err(SwapError::BillNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_static_verifier() {
        let verifier = StaticIdentityVerifier::new();
        assert!(!verifier.is_verified("alice").await.unwrap());
        verifier.mark_verified("alice").await;
        assert!(verifier.is_verified("alice").await.unwrap());

        let open = StaticIdentityVerifier::allow_all();
        assert!(open.is_verified("anyone").await.unwrap());
    }
}
