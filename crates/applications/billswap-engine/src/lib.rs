//! # Billswap Engine
//!
//! The swap lifecycle and negotiation engine for the billswap platform,
//! featuring:
//!
//! - **Matching**: Tier- and band-aware candidate ranking for one-sided and
//!   two-sided bill swaps
//! - **Lifecycle State Machine**: Offer, counter, accept, fee lock, proof,
//!   completion, with lazy deadline evaluation on every load
//! - **Token Ledger**: Free, purchased, and subscription connection tokens
//!   with monthly velocity limits per trust tier
//! - **Negotiation**: Counter-offers, renegotiated deals, and deadline
//!   extensions with cumulative caps
//! - **Disputes**: Filing freezes automatic transitions until an explicit
//!   resolution settles the swap
//! - **Pluggable Collaborators**: Bill source, identity verification,
//!   billing, and event delivery behind async traits with in-memory
//!   implementations for development and testing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use billswap_engine::{SwapEngineBuilder, SwapType};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create an engine with development defaults
//!     let engine = SwapEngineBuilder::development().build()?;
//!
//!     let matches = engine
//!         .find_matches("alice", Uuid::new_v4(), SwapType::TwoSided, 10)
//!         .await?;
//!
//!     println!("Found {} candidates", matches.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - [`types`]: The swap aggregate and its sub-records
//! - [`error`]: Error handling and result types
//! - [`engine`]: The lifecycle state machine and commit loop
//! - [`matching`]: Candidate discovery and ranking
//! - [`ledger`]: Connection token accounting
//! - [`builder`]: Builder pattern for easy configuration
//! - [`storage`]: Aggregate persistence with optimistic concurrency
//! - [`sweep`]: Background deadline sweep

pub mod builder;
pub mod config;
pub mod deal;
pub mod dispute;
pub mod engine;
pub mod error;
pub mod events;
pub mod extension;
pub mod ledger;
pub mod matching;
pub mod proof;
pub mod storage;
pub mod sweep;
pub mod traits;
pub mod types;

pub use builder::SwapEngineBuilder;
pub use config::EngineConfig;
pub use deal::DealTerms;
pub use dispute::{DisputeFiling, DisputeResolution};
pub use engine::SwapEngine;
pub use error::{SwapError, SwapResult};
pub use events::{SwapEvent, SwapEventKind};
pub use extension::ExtensionAsk;
pub use ledger::{TokenBalance, TokenLedger, TokenSource};
pub use matching::{MatchCandidate, MatchingEngine};
pub use proof::{ProofDecision, ProofSubmission};
pub use storage::{MemorySwapStore, SwapStore};
pub use sweep::{DeadlineSweeper, SweepReport};
pub use traits::{
    BillSource, BillingProvider, EventSink, IdentityVerifier, MemoryBillSource, MemoryEventSink,
    MockBillingProvider, StaticIdentityVerifier, TokenPack,
};
pub use types::{
    ActivityFeedItem, CounterOffer, Deal, DealStatus, Dispute, DisputeDisposition, DisputeOutcome,
    DisputeReason, DisputeStatus, ExtensionReason, ExtensionRequest, ExtensionStatus, Party,
    PartyFee, Proof, ProofStatus, ProofType, Swap, SwapStatus, SwapType,
};

// Re-export the core domain types alongside the engine surface.
pub use billswap_core::{
    Amount, Bill, BillCategory, ScoreDeltas, ScoreEvent, Tier, TierAdvancement, TrustProfile,
};

/// Commonly used types for quick imports
pub mod prelude {
    pub use crate::builder::SwapEngineBuilder;
    pub use crate::config::EngineConfig;
    pub use crate::engine::SwapEngine;
    pub use crate::error::{SwapError, SwapResult};
    pub use crate::types::{Swap, SwapStatus, SwapType};
    pub use billswap_core::{Amount, Bill, BillCategory, Tier, TrustProfile};
}
