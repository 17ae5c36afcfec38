use billswap_core::TierAdvancement;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{DisputeOutcome, SwapStatus};

/// What happened on a swap
///
/// Exactly one event is raised per committed transition; delivery is the
/// notifier's concern, not the engine's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapEventKind {
    SwapProposed,
    OfferCountered { by: String },
    SwapAccepted,
    FeePaid { by: String },
    SwapLocked,
    SwapCancelled { by: String },
    SwapExpired,
    SwapCompleted,
    ProofSubmitted { proof_id: Uuid, by: String },
    ProofAccepted { proof_id: Uuid, auto: bool },
    ProofRejected { proof_id: Uuid, reason: String },
    DealProposed { deal_id: Uuid, by: String },
    DealAccepted { deal_id: Uuid },
    DealRejected { deal_id: Uuid },
    ExtensionRequested { request_id: Uuid, by: String },
    ExtensionApproved { request_id: Uuid },
    ExtensionDenied { request_id: Uuid, reason: String },
    ExtensionExpired { request_id: Uuid },
    DisputeFiled { dispute_id: Uuid, by: String },
    DisputeResolved {
        dispute_id: Uuid,
        outcome: DisputeOutcome,
        final_status: SwapStatus,
    },
    TierAdvanced {
        user_id: String,
        advancement: TierAdvancement,
    },
}

/// An event raised by the engine for external notification dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapEvent {
    pub id: Uuid,
    pub swap_id: Uuid,
    pub kind: SwapEventKind,
    pub occurred_at: DateTime<Utc>,
}

impl SwapEvent {
    pub fn new(swap_id: Uuid, kind: SwapEventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            swap_id,
            kind,
            occurred_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Event sinks hand these to external notification services, so the
    // wire shape has to stay stable.
    #[test]
    fn test_event_serializes_with_kind_payload() {
        let swap_id = Uuid::new_v4();
        let proof_id = Uuid::new_v4();
        let event = SwapEvent::new(
            swap_id,
            SwapEventKind::ProofAccepted {
                proof_id,
                auto: true,
            },
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["swap_id"], swap_id.to_string());
        assert_eq!(json["kind"]["ProofAccepted"]["auto"], true);

        let back: SwapEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
