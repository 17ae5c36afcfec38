use billswap_core::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{require_locked_in, SwapEngine};
use crate::error::{SwapError, SwapResult};
use crate::events::SwapEventKind;
use crate::types::{ExtensionReason, ExtensionRequest, ExtensionStatus, Party, Swap};

/// A request to push the caller's proof deadline out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionAsk {
    pub reason: ExtensionReason,
    pub custom_note: Option<String>,
    pub requested_deadline: DateTime<Utc>,
    /// Good-faith partial payment offered with the request
    pub partial_payment: Option<Amount>,
}

impl SwapEngine {
    /// Ask the other party for more time on the caller's proof deadline
    ///
    /// Extensions are cumulative per swap and capped; an unanswered request
    /// lapses at the end of its response window and the original deadline
    /// stands.
    pub async fn request_extension(
        &self,
        actor: &str,
        swap_id: Uuid,
        ask: ExtensionAsk,
    ) -> SwapResult<Swap> {
        if ask.reason == ExtensionReason::Other
            && ask.custom_note.as_deref().map_or(true, |n| n.trim().is_empty())
        {
            return Err(SwapError::validation("custom_note", "a note is required when the reason is Other"));
        }
        let actor = actor.to_string();
        self.mutate(swap_id, Some(&actor.clone()), "request extension", move |swap, now, config| {
            require_locked_in(swap, "request extension")?;
            let party = swap
                .party_of(&actor)
                .filter(|p| swap.proof_parties().contains(p))
                .ok_or(SwapError::invalid_transition(swap.id, swap.status, "request extension"))?;

            if swap.pending_extension().is_some() {
                return Err(SwapError::DuplicatePendingRequest {
                    swap_id: swap.id,
                    kind: "extension",
                });
            }
            let current = swap
                .effective_proof_deadline(party)
                .ok_or(SwapError::invalid_transition(swap.id, swap.status, "request extension"))?;
            if ask.requested_deadline <= current {
                return Err(SwapError::validation(
                    "requested_deadline",
                    "an extension must move the deadline forward",
                ));
            }
            let added_hours = (ask.requested_deadline - current).num_hours();
            let max_hours = config.max_extension().num_hours();
            if swap.extension_hours_used + added_hours > max_hours {
                return Err(SwapError::ExtensionLimitExceeded {
                    requested_hours: swap.extension_hours_used + added_hours,
                    max_hours,
                });
            }

            let request = ExtensionRequest {
                id: Uuid::new_v4(),
                swap_id: swap.id,
                requester_id: actor.clone(),
                reason: ask.reason.clone(),
                custom_note: ask.custom_note.clone(),
                original_deadline: current,
                requested_deadline: ask.requested_deadline,
                partial_payment: ask.partial_payment,
                status: ExtensionStatus::Pending,
                respond_by: now + config.extension_response_window(),
                denial_reason: None,
                created_at: now,
                responded_at: None,
            };
            let request_id = request.id;
            swap.extensions.push(request);
            Ok(vec![SwapEventKind::ExtensionRequested {
                request_id,
                by: actor.clone(),
            }])
        })
        .await
    }

    /// Approve a pending extension; the requester's deadline moves at once
    pub async fn approve_extension(
        &self,
        actor: &str,
        swap_id: Uuid,
        request_id: Uuid,
    ) -> SwapResult<Swap> {
        let actor = actor.to_string();
        self.mutate(swap_id, Some(&actor.clone()), "approve extension", move |swap, now, _config| {
            require_locked_in(swap, "approve extension")?;
            let (requester, requested_deadline, added_hours) = {
                let request = swap
                    .extensions
                    .iter()
                    .find(|e| e.id == request_id)
                    .ok_or(SwapError::ExtensionNotFound { request_id })?;
                if request.status != ExtensionStatus::Pending {
                    return Err(SwapError::invalid_transition(swap.id, swap.status, "approve extension"));
                }
                if request.requester_id == actor {
                    return Err(SwapError::validation("request", "cannot approve your own extension"));
                }
                (
                    request.requester_id.clone(),
                    request.requested_deadline,
                    (request.requested_deadline - request.original_deadline).num_hours(),
                )
            };

            let party = swap
                .party_of(&requester)
                .ok_or(SwapError::NotParticipant {
                    user_id: requester.clone(),
                    swap_id: swap.id,
                })?;
            apply_new_deadline(swap, party, requested_deadline);
            swap.extension_hours_used += added_hours;

            let request = swap
                .extensions
                .iter_mut()
                .find(|e| e.id == request_id)
                .ok_or(SwapError::ExtensionNotFound { request_id })?;
            request.status = ExtensionStatus::Approved;
            request.responded_at = Some(now);
            Ok(vec![SwapEventKind::ExtensionApproved { request_id }])
        })
        .await
    }

    /// Deny a pending extension; the original deadline stands
    pub async fn deny_extension(
        &self,
        actor: &str,
        swap_id: Uuid,
        request_id: Uuid,
        reason: String,
    ) -> SwapResult<Swap> {
        if reason.trim().is_empty() {
            return Err(SwapError::validation("reason", "a denial reason is required"));
        }
        let actor = actor.to_string();
        self.mutate(swap_id, Some(&actor.clone()), "deny extension", move |swap, now, _config| {
            require_locked_in(swap, "deny extension")?;
            let request = swap
                .extensions
                .iter_mut()
                .find(|e| e.id == request_id)
                .ok_or(SwapError::ExtensionNotFound { request_id })?;
            if request.status != ExtensionStatus::Pending {
                return Err(SwapError::invalid_transition(swap.id, swap.status, "deny extension"));
            }
            if request.requester_id == actor {
                return Err(SwapError::validation("request", "cannot deny your own extension"));
            }
            request.status = ExtensionStatus::Denied;
            request.denial_reason = Some(reason.clone());
            request.responded_at = Some(now);
            Ok(vec![SwapEventKind::ExtensionDenied {
                request_id,
                reason: reason.clone(),
            }])
        })
        .await
    }
}

/// Move one side's effective deadline to the approved date
///
/// With an accepted deal in force the per-side deal deadline moves;
/// otherwise the shared proof window does.
fn apply_new_deadline(swap: &mut Swap, party: Party, new_deadline: DateTime<Utc>) {
    let active_id = swap
        .deals
        .iter()
        .find(|d| d.status == crate::types::DealStatus::Accepted)
        .map(|d| d.id);
    if let Some(deal_id) = active_id {
        if let Some(deal) = swap.deals.iter_mut().find(|d| d.id == deal_id) {
            match party {
                Party::Initiator => deal.deadline_a = new_deadline,
                Party::Counterparty => deal.deadline_b = new_deadline,
            }
            return;
        }
    }
    swap.proof_due = Some(new_deadline);
}
