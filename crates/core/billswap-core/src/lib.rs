//! # Billswap Core
//!
//! Domain foundation for the billswap workspace:
//!
//! - **Money**: construction-validated [`Amount`] backed by `rust_decimal`
//! - **Bills**: the [`Bill`] record users put up for swapping
//! - **Trust**: the [`Tier`] threshold table, [`TrustProfile`] scoring, and
//!   [`TierAdvancement`] events
//!
//! Everything here is pure and synchronous. Stateful behavior (the swap
//! state machine, token ledger, matching) lives in `billswap-engine`.

pub mod error;
pub mod tier;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use tier::{ScoreDeltas, ScoreEvent, Tier, TierAdvancement, TrustProfile};
pub use types::{Amount, Bill, BillCategory};
