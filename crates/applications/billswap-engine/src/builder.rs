use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::SwapEngine;
use crate::error::{SwapError, SwapResult};
use crate::ledger::TokenLedger;
use crate::storage::{MemorySwapStore, SwapStore};
use crate::traits::{
    BillSource, BillingProvider, EventSink, IdentityVerifier, MemoryBillSource, MemoryEventSink,
    MockBillingProvider, StaticIdentityVerifier,
};

/// Builder for creating a complete SwapEngine instance
pub struct SwapEngineBuilder {
    config: Option<EngineConfig>,
    store: Option<Arc<dyn SwapStore>>,
    bills: Option<Arc<dyn BillSource>>,
    identity: Option<Arc<dyn IdentityVerifier>>,
    billing: Option<Arc<dyn BillingProvider>>,
    events: Option<Arc<dyn EventSink>>,
}

impl SwapEngineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: None,
            store: None,
            bills: None,
            identity: None,
            billing: None,
            events: None,
        }
    }

    /// Set the engine configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set custom swap storage
    pub fn with_store(mut self, store: Arc<dyn SwapStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the bill source
    pub fn with_bill_source(mut self, bills: Arc<dyn BillSource>) -> Self {
        self.bills = Some(bills);
        self
    }

    /// Set the identity verifier
    pub fn with_identity_verifier(mut self, identity: Arc<dyn IdentityVerifier>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Set the billing provider backing token purchases
    pub fn with_billing_provider(mut self, billing: Arc<dyn BillingProvider>) -> Self {
        self.billing = Some(billing);
        self
    }

    /// Set the event sink
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Create a development configuration with in-memory collaborators
    ///
    /// Every user passes identity verification and token purchases always
    /// succeed, so full lifecycles run without external services.
    pub fn development() -> Self {
        Self::new()
            .with_config(EngineConfig::default())
            .with_store(Arc::new(MemorySwapStore::new()))
            .with_bill_source(Arc::new(MemoryBillSource::new()))
            .with_identity_verifier(Arc::new(StaticIdentityVerifier::allow_all()))
            .with_billing_provider(Arc::new(MockBillingProvider::new()))
            .with_event_sink(Arc::new(MemoryEventSink::new()))
    }

    /// Build the SwapEngine
    pub fn build(self) -> SwapResult<SwapEngine> {
        let config = self.config.unwrap_or_default();
        let store = self
            .store
            .ok_or_else(|| SwapError::validation("store", "swap storage is required"))?;
        let bills = self
            .bills
            .ok_or_else(|| SwapError::validation("bills", "a bill source is required"))?;
        let identity = self
            .identity
            .ok_or_else(|| SwapError::validation("identity", "an identity verifier is required"))?;
        let billing = self
            .billing
            .ok_or_else(|| SwapError::validation("billing", "a billing provider is required"))?;
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(MemoryEventSink::new()));

        let ledger = Arc::new(TokenLedger::new(billing, config.free_tokens_per_month));
        Ok(SwapEngine::new(config, store, ledger, bills, identity, events))
    }
}

impl Default for SwapEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_builds() {
        assert!(SwapEngineBuilder::development().build().is_ok());
    }

    #[test]
    fn test_missing_required_collaborator_fails() {
        let result = SwapEngineBuilder::new()
            .with_config(EngineConfig::default())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_overriding_store_keeps_other_defaults() {
        let engine = SwapEngineBuilder::development()
            .with_store(Arc::new(MemorySwapStore::new()))
            .build();
        assert!(engine.is_ok());
    }
}
