use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::engine::SwapEngine;
use crate::error::{SwapError, SwapResult};
use crate::events::SwapEventKind;
use crate::types::{
    Dispute, DisputeDisposition, DisputeOutcome, DisputeReason, DisputeStatus, ProofStatus, Swap,
    SwapStatus,
};

/// A dispute filing
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DisputeFiling {
    pub reason: DisputeReason,
    /// What went wrong, in the filer's words
    #[validate(length(min = 20, message = "description must be at least 20 characters"))]
    pub description: String,
    /// Opaque evidence references
    #[validate(length(max = 3, message = "at most three evidence attachments"))]
    pub evidence: Vec<String>,
}

/// How a resolved dispute settles the swap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeResolution {
    pub outcome: DisputeOutcome,
    pub disposition: DisputeDisposition,
    pub notes: Option<String>,
}

impl SwapEngine {
    /// File a dispute, freezing every automatic transition on the swap
    ///
    /// Auto-accepts that committed before the filing stand; the freeze is
    /// forward-looking only.
    pub async fn file_dispute(
        &self,
        actor: &str,
        swap_id: Uuid,
        filing: DisputeFiling,
    ) -> SwapResult<Swap> {
        filing.validate()?;
        let actor = actor.to_string();
        self.mutate(swap_id, Some(&actor.clone()), "file dispute", move |swap, now, _config| {
            if !swap.status.allows_dispute() {
                return Err(SwapError::invalid_transition(swap.id, swap.status, "file dispute"));
            }
            if swap.open_dispute().is_some() {
                return Err(SwapError::DuplicatePendingRequest {
                    swap_id: swap.id,
                    kind: "dispute",
                });
            }

            let dispute = Dispute {
                id: Uuid::new_v4(),
                swap_id: swap.id,
                filer_id: actor.clone(),
                reason: filing.reason.clone(),
                description: filing.description.clone(),
                evidence: filing.evidence.clone(),
                status: DisputeStatus::Open,
                outcome: None,
                resolution: None,
                created_at: now,
                resolved_at: None,
            };
            let dispute_id = dispute.id;
            swap.disputes.push(dispute);
            swap.pre_dispute_status = Some(swap.status);
            swap.status = SwapStatus::Disputed;
            Ok(vec![SwapEventKind::DisputeFiled {
                dispute_id,
                by: actor.clone(),
            }])
        })
        .await
    }

    /// Move an open dispute into active review
    pub async fn begin_dispute_review(&self, swap_id: Uuid) -> SwapResult<Swap> {
        self.mutate(swap_id, None, "begin dispute review", |swap, _now, _config| {
            let dispute = swap
                .disputes
                .iter_mut()
                .find(|d| d.status == DisputeStatus::Open)
                .ok_or(SwapError::NoOpenDispute { swap_id: swap.id })?;
            dispute.status = DisputeStatus::UnderReview;
            // Review state is internal bookkeeping, not a notification.
            Ok(vec![])
        })
        .await
        .map(|swap| {
            info!(swap_id = %swap.id, "Dispute review started");
            swap
        })
    }

    /// Resolve the open dispute and settle the swap per the disposition
    ///
    /// A resumed swap gets the frozen span credited back onto its live
    /// deadlines so the dispute itself never costs either party time.
    pub async fn resolve_dispute(
        &self,
        swap_id: Uuid,
        resolution: DisputeResolution,
    ) -> SwapResult<Swap> {
        self.mutate(swap_id, None, "resolve dispute", move |swap, now, _config| {
            if swap.status != SwapStatus::Disputed {
                return Err(SwapError::invalid_transition(swap.id, swap.status, "resolve dispute"));
            }
            let (dispute_id, frozen) = {
                let dispute = swap
                    .disputes
                    .iter_mut()
                    .find(|d| d.status != DisputeStatus::Resolved)
                    .ok_or(SwapError::NoOpenDispute { swap_id: swap.id })?;
                dispute.status = DisputeStatus::Resolved;
                dispute.outcome = Some(resolution.outcome);
                dispute.resolution = resolution.notes.clone();
                dispute.resolved_at = Some(now);
                (dispute.id, now - dispute.created_at)
            };

            let final_status = match resolution.disposition {
                DisputeDisposition::Resume => {
                    let resumed = swap.pre_dispute_status.take().unwrap_or(SwapStatus::AwaitingProof);
                    credit_frozen_time(swap, frozen);
                    swap.status = resumed;
                    resumed
                }
                DisputeDisposition::Complete => {
                    swap.status = SwapStatus::Completed;
                    swap.completed_at = Some(now);
                    SwapStatus::Completed
                }
                DisputeDisposition::Cancel => {
                    // A swap killed by the respondent's fault records a
                    // failure, not a mutual cancellation.
                    swap.status = if resolution.outcome == DisputeOutcome::AgainstRespondent {
                        SwapStatus::Failed
                    } else {
                        SwapStatus::Cancelled
                    };
                    swap.status
                }
            };
            Ok(vec![SwapEventKind::DisputeResolved {
                dispute_id,
                outcome: resolution.outcome,
                final_status,
            }])
        })
        .await
    }
}

/// Push every live deadline out by the time the swap spent frozen
fn credit_frozen_time(swap: &mut Swap, frozen: Duration) {
    if let Some(due) = swap.proof_due {
        swap.proof_due = Some(due + frozen);
    }
    for deal in swap
        .deals
        .iter_mut()
        .filter(|d| d.status == crate::types::DealStatus::Accepted)
    {
        deal.deadline_a = deal.deadline_a + frozen;
        deal.deadline_b = deal.deadline_b + frozen;
    }
    for proof in swap
        .proofs
        .iter_mut()
        .filter(|p| p.status == ProofStatus::Pending)
    {
        proof.review_deadline = proof.review_deadline + frozen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filing_validation() {
        let short = DisputeFiling {
            reason: DisputeReason::PaymentNotMade,
            description: "too short".to_string(),
            evidence: vec![],
        };
        assert!(short.validate().is_err());

        let overloaded = DisputeFiling {
            reason: DisputeReason::ProofInvalid,
            description: "the screenshot shows a different account entirely".to_string(),
            evidence: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        };
        assert!(overloaded.validate().is_err());

        let ok = DisputeFiling {
            reason: DisputeReason::ProofInvalid,
            description: "the screenshot shows a different account entirely".to_string(),
            evidence: vec!["s3://evidence/1.png".into()],
        };
        assert!(ok.validate().is_ok());
    }
}
