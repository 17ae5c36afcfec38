use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{require_locked_in, SwapEngine};
use crate::error::{SwapError, SwapResult};
use crate::events::SwapEventKind;
use crate::types::{Deal, DealStatus, ProofType, Swap};

/// Proposed renegotiated terms for a locked swap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealTerms {
    pub amount_a: Option<billswap_core::Amount>,
    pub amount_b: Option<billswap_core::Amount>,
    pub deadline_a: DateTime<Utc>,
    pub deadline_b: DateTime<Utc>,
    pub required_proof: Option<ProofType>,
}

impl SwapEngine {
    /// Propose renegotiated terms, optionally countering a rejected proposal
    ///
    /// Deal deadlines may not land past the swap's extension ceiling, and
    /// only one proposal can be pending at a time.
    pub async fn propose_deal(
        &self,
        actor: &str,
        swap_id: Uuid,
        terms: DealTerms,
        counter_of: Option<Uuid>,
    ) -> SwapResult<Swap> {
        let actor = actor.to_string();
        self.mutate(swap_id, Some(&actor.clone()), "propose deal", move |swap, now, config| {
            require_locked_in(swap, "propose deal")?;

            let ceiling = swap
                .locked_at
                .map(|locked| locked + config.proof_window() + config.max_extension());
            for deadline in [terms.deadline_a, terms.deadline_b] {
                if deadline <= now {
                    return Err(SwapError::validation("deadline", "deal deadlines must be in the future"));
                }
                if ceiling.is_some_and(|c| deadline > c) {
                    return Err(SwapError::validation(
                        "deadline",
                        "deal deadlines cannot outrun the extension ceiling",
                    ));
                }
            }
            for amount in [&terms.amount_a, &terms.amount_b].into_iter().flatten() {
                if *amount < config.eligibility_min || *amount > config.eligibility_max {
                    return Err(SwapError::validation(
                        "amount",
                        format!("deal amount {amount} outside the eligibility band"),
                    ));
                }
            }

            if swap.deals.iter().any(|d| d.status == DealStatus::Proposed) {
                return Err(SwapError::DuplicatePendingRequest {
                    swap_id: swap.id,
                    kind: "deal",
                });
            }
            if let Some(countered_id) = counter_of {
                let countered = swap
                    .deals
                    .iter_mut()
                    .find(|d| d.id == countered_id)
                    .ok_or(SwapError::DealNotFound { deal_id: countered_id })?;
                if countered.status != DealStatus::Rejected {
                    return Err(SwapError::validation("counter_of", "only a rejected deal can be countered"));
                }
                countered.status = DealStatus::Countered;
                countered.updated_at = now;
            }

            let deal = Deal {
                id: Uuid::new_v4(),
                swap_id: swap.id,
                proposer_id: actor.clone(),
                amount_a: terms.amount_a,
                amount_b: terms.amount_b,
                deadline_a: terms.deadline_a,
                deadline_b: terms.deadline_b,
                required_proof: terms.required_proof.clone(),
                status: DealStatus::Proposed,
                counter_of,
                created_at: now,
                updated_at: now,
            };
            let deal_id = deal.id;
            swap.deals.push(deal);
            Ok(vec![SwapEventKind::DealProposed {
                deal_id,
                by: actor.clone(),
            }])
        })
        .await
    }

    /// Accept a proposed deal; its terms come into force immediately
    ///
    /// Any previously accepted deal is superseded, so exactly one set of
    /// terms governs the swap at a time.
    pub async fn accept_deal(&self, actor: &str, swap_id: Uuid, deal_id: Uuid) -> SwapResult<Swap> {
        let actor = actor.to_string();
        self.mutate(swap_id, Some(&actor.clone()), "accept deal", move |swap, now, _config| {
            require_locked_in(swap, "accept deal")?;
            let proposer = {
                let deal = swap
                    .deals
                    .iter()
                    .find(|d| d.id == deal_id)
                    .ok_or(SwapError::DealNotFound { deal_id })?;
                if deal.status != DealStatus::Proposed {
                    return Err(SwapError::invalid_transition(swap.id, swap.status, "accept deal"));
                }
                deal.proposer_id.clone()
            };
            if proposer == actor {
                return Err(SwapError::validation("deal", "the proposer cannot accept their own deal"));
            }

            for deal in swap.deals.iter_mut() {
                if deal.status == DealStatus::Accepted {
                    deal.status = DealStatus::Superseded;
                    deal.updated_at = now;
                }
            }
            let deal = swap
                .deals
                .iter_mut()
                .find(|d| d.id == deal_id)
                .ok_or(SwapError::DealNotFound { deal_id })?;
            deal.status = DealStatus::Accepted;
            deal.updated_at = now;
            Ok(vec![SwapEventKind::DealAccepted { deal_id }])
        })
        .await
    }

    /// Reject a proposed deal; the rejecting party may answer with a counter
    pub async fn reject_deal(&self, actor: &str, swap_id: Uuid, deal_id: Uuid) -> SwapResult<Swap> {
        let actor = actor.to_string();
        self.mutate(swap_id, Some(&actor.clone()), "reject deal", move |swap, now, _config| {
            require_locked_in(swap, "reject deal")?;
            let deal = swap
                .deals
                .iter_mut()
                .find(|d| d.id == deal_id)
                .ok_or(SwapError::DealNotFound { deal_id })?;
            if deal.status != DealStatus::Proposed {
                return Err(SwapError::invalid_transition(swap.id, swap.status, "reject deal"));
            }
            if deal.proposer_id == actor {
                return Err(SwapError::validation("deal", "withdraw is not supported; let the proposal lapse"));
            }
            deal.status = DealStatus::Rejected;
            deal.updated_at = now;
            Ok(vec![SwapEventKind::DealRejected { deal_id }])
        })
        .await
    }
}
