use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{require_locked_in, SwapEngine};
use crate::error::{SwapError, SwapResult};
use crate::events::SwapEventKind;
use crate::types::{Proof, ProofStatus, ProofType, Swap, SwapStatus};

/// A new proof submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofSubmission {
    pub proof_type: ProofType,
    /// Opaque reference to the uploaded artifact
    pub file_ref: String,
    pub notes: Option<String>,
}

/// Reviewer verdict on a pending proof
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProofDecision {
    Accept,
    Reject { reason: String },
}

impl SwapEngine {
    /// Submit payment proof for the caller's side of a locked swap
    ///
    /// A rejected proof may be replaced up to the resubmission cap; the
    /// replacement continues the chain of the proof it supersedes.
    pub async fn submit_proof(
        &self,
        actor: &str,
        swap_id: Uuid,
        submission: ProofSubmission,
    ) -> SwapResult<Swap> {
        if submission.file_ref.trim().is_empty() {
            return Err(SwapError::validation("file_ref", "proof artifact reference is required"));
        }
        let actor = actor.to_string();
        self.mutate(swap_id, Some(&actor.clone()), "submit proof", move |swap, now, config| {
            require_locked_in(swap, "submit proof")?;
            let party = swap
                .party_of(&actor)
                .filter(|p| swap.proof_parties().contains(p))
                .ok_or(SwapError::invalid_transition(swap.id, swap.status, "submit proof"))?;

            if let Some(deadline) = swap.effective_proof_deadline(party) {
                if now > deadline {
                    return Err(SwapError::DeadlineExpired {
                        swap_id: swap.id,
                        deadline,
                    });
                }
            }

            let mut resubmission_count = 0u8;
            let mut replaces_proof_id = None;
            if let Some(prior) = swap.current_proof_of(party) {
                match prior.status {
                    ProofStatus::Rejected => {
                        if prior.resubmission_count >= config.max_proof_resubmissions {
                            return Err(SwapError::ResubmissionLimitExceeded {
                                swap_id: swap.id,
                                max: config.max_proof_resubmissions,
                            });
                        }
                        resubmission_count = prior.resubmission_count + 1;
                        replaces_proof_id = Some(prior.id);
                    }
                    _ => {
                        return Err(SwapError::DuplicatePendingRequest {
                            swap_id: swap.id,
                            kind: "proof",
                        })
                    }
                }
            }

            let bill_id = swap
                .bill_paid_by(party)
                .ok_or(SwapError::validation("bill", "this side has no bill to pay"))?;
            let prior_id = swap
                .current_proof_of(party)
                .map(|p| p.id);

            let proof = Proof {
                id: Uuid::new_v4(),
                swap_id: swap.id,
                user_id: actor.clone(),
                bill_id,
                proof_type: submission.proof_type.clone(),
                file_ref: submission.file_ref.clone(),
                submitter_notes: submission.notes.clone(),
                status: ProofStatus::Pending,
                review_deadline: now + config.proof_review_window(),
                resubmission_count,
                replaces_proof_id,
                rejection_reason: None,
                submitted_at: now,
                reviewed_at: None,
            };
            let proof_id = proof.id;

            if let Some(prior_id) = prior_id {
                if let Some(prior) = swap.proofs.iter_mut().find(|p| p.id == prior_id) {
                    prior.status = ProofStatus::Resubmitted;
                }
            }
            swap.proofs.push(proof);
            Ok(vec![SwapEventKind::ProofSubmitted {
                proof_id,
                by: actor.clone(),
            }])
        })
        .await
    }

    /// Review the other side's pending proof
    ///
    /// Only the non-submitting participant may review, and only while the
    /// proof is pending; past the review window the auto-accept wins.
    pub async fn review_proof(
        &self,
        actor: &str,
        swap_id: Uuid,
        proof_id: Uuid,
        decision: ProofDecision,
    ) -> SwapResult<Swap> {
        if let ProofDecision::Reject { reason } = &decision {
            if reason.trim().is_empty() {
                return Err(SwapError::validation("reason", "a rejection reason is required"));
            }
        }
        let actor = actor.to_string();
        self.mutate(swap_id, Some(&actor.clone()), "review proof", move |swap, now, _config| {
            require_locked_in(swap, "review proof")?;
            let proof = swap
                .proofs
                .iter_mut()
                .find(|p| p.id == proof_id)
                .ok_or(SwapError::ProofNotFound { proof_id })?;
            if proof.user_id == actor {
                return Err(SwapError::validation("reviewer", "cannot review your own proof"));
            }
            if proof.status != ProofStatus::Pending {
                return Err(SwapError::invalid_transition(swap.id, swap.status, "review proof"));
            }

            proof.reviewed_at = Some(now);
            let mut kinds = Vec::new();
            match &decision {
                ProofDecision::Accept => {
                    proof.status = ProofStatus::Accepted;
                    kinds.push(SwapEventKind::ProofAccepted {
                        proof_id,
                        auto: false,
                    });
                    if swap.all_proofs_satisfied() {
                        swap.status = SwapStatus::Completed;
                        swap.completed_at = Some(now);
                        kinds.push(SwapEventKind::SwapCompleted);
                    }
                }
                ProofDecision::Reject { reason } => {
                    proof.status = ProofStatus::Rejected;
                    proof.rejection_reason = Some(reason.clone());
                    kinds.push(SwapEventKind::ProofRejected {
                        proof_id,
                        reason: reason.clone(),
                    });
                }
            }
            Ok(kinds)
        })
        .await
    }
}
