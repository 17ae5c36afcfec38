use billswap_core::{Amount, ScoreEvent, Tier, TrustProfile};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{SwapError, SwapResult};
use crate::events::{SwapEvent, SwapEventKind};
use crate::ledger::TokenLedger;
use crate::matching::{MatchCandidate, MatchingEngine};
use crate::storage::SwapStore;
use crate::traits::{BillSource, EventSink, IdentityVerifier};
use crate::types::{
    ActivityFeedItem, CounterOffer, DisputeOutcome, ExtensionStatus, ProofStatus, Swap, SwapStatus,
    SwapType,
};

/// The swap lifecycle engine
///
/// All state-mutating operations against one swap are serialized through an
/// optimistic version check on the aggregate, retried a bounded number of
/// times. Deadlines are evaluated lazily on every load, so correctness never
/// depends on the background sweep.
pub struct SwapEngine {
    pub(crate) config: EngineConfig,
    pub(crate) store: Arc<dyn SwapStore>,
    pub(crate) ledger: Arc<TokenLedger>,
    pub(crate) bills: Arc<dyn BillSource>,
    pub(crate) identity: Arc<dyn IdentityVerifier>,
    pub(crate) events: Arc<dyn EventSink>,
    matching: MatchingEngine,
}

impl SwapEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn SwapStore>,
        ledger: Arc<TokenLedger>,
        bills: Arc<dyn BillSource>,
        identity: Arc<dyn IdentityVerifier>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let matching = MatchingEngine::new(store.clone(), bills.clone(), config.clone());
        Self {
            config,
            store,
            ledger,
            bills,
            identity,
            events,
            matching,
        }
    }

    /// The token ledger behind acceptance charges
    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    /// Effective engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Advisory matching pass; never mutates state
    pub async fn find_matches(
        &self,
        user_id: &str,
        bill_id: Uuid,
        swap_type: SwapType,
        limit: usize,
    ) -> SwapResult<Vec<MatchCandidate>> {
        self.matching
            .find_matches(user_id, bill_id, swap_type, limit)
            .await
    }

    /// Propose a swap between the caller's bill and a matched candidate bill
    ///
    /// Velocity gating happens here; the token charge happens at acceptance,
    /// when chat unlocks.
    pub async fn propose_match(
        &self,
        actor: &str,
        own_bill_id: Uuid,
        candidate_bill_id: Uuid,
        swap_type: SwapType,
    ) -> SwapResult<Swap> {
        let own_bill = self.bills.get_bill(own_bill_id).await?;
        if own_bill.owner_id != actor {
            return Err(SwapError::validation("bill", "caller does not own this bill"));
        }
        let candidate = self.bills.get_bill(candidate_bill_id).await?;
        if candidate.owner_id == actor {
            return Err(SwapError::validation("bill", "cannot swap with yourself"));
        }

        let now = Utc::now();
        let mut profile = self.profile_or_new(actor).await?;
        profile.roll_period(now);
        self.ledger.check_velocity(&profile).await?;

        let counterparty_profile = self.profile_or_new(&candidate.owner_id).await?;
        let ceiling = profile
            .tier
            .max_bill()
            .min(counterparty_profile.tier.max_bill());
        for bill in [&own_bill, &candidate] {
            if !bill.within_band(&self.config.eligibility_min, &self.config.eligibility_max) {
                return Err(SwapError::validation(
                    "amount",
                    format!("bill amount {} outside the eligibility band", bill.amount),
                ));
            }
            if bill.amount > ceiling {
                // When the caller's earned tier would cover this amount but
                // the advancement is being withheld, say so.
                let earned = Tier::for_history(profile.completed_swap_count, profile.billix_score);
                if earned > profile.tier
                    && bill.amount <= earned.max_bill().min(counterparty_profile.tier.max_bill())
                {
                    return Err(SwapError::IdentityVerificationRequired {
                        user_id: actor.to_string(),
                    });
                }
                return Err(SwapError::validation(
                    "amount",
                    format!("bill amount {} exceeds a party's tier ceiling", bill.amount),
                ));
            }
        }
        if swap_type == SwapType::TwoSided && own_bill.category == candidate.category {
            return Err(SwapError::validation(
                "category",
                "two-sided swaps pair bills of different categories",
            ));
        }

        let active = self.store.active_bill_ids().await?;
        if active.contains(&own_bill.id) || active.contains(&candidate.id) {
            return Err(SwapError::validation(
                "bill",
                "a bill is already linked to an active swap",
            ));
        }

        let bill_b = match swap_type {
            SwapType::TwoSided => Some(candidate.id),
            SwapType::OneSided => None,
        };
        let swap = Swap::new_offer(
            swap_type,
            actor,
            &candidate.owner_id,
            own_bill.id,
            bill_b,
            own_bill.amount,
            self.config.swap_fee,
            now + self.config.accept_window(),
        );
        self.store.insert_swap(&swap).await?;

        profile.record_connection();
        self.store.upsert_profile(&profile).await?;

        info!(
            swap_id = %swap.id,
            initiator = actor,
            counterparty = %swap.counterparty_id,
            amount = %swap.amount,
            "Swap proposed"
        );
        self.publish(swap.id, vec![SwapEventKind::SwapProposed]).await;
        Ok(swap)
    }

    /// Accept an offer or a pending counter-offer
    ///
    /// The initiator's connection token is charged before the acceptance
    /// commits; a commit failure compensates the charge.
    pub async fn accept_match(&self, actor: &str, swap_id: Uuid) -> SwapResult<Swap> {
        let mut attempts = 0u8;
        loop {
            let mut swap = self.store.get_swap(swap_id).await?;
            if !swap.is_participant(actor) {
                return Err(SwapError::NotParticipant {
                    user_id: actor.to_string(),
                    swap_id,
                });
            }
            let now = Utc::now();
            let loaded_version = swap.version;
            let mut kinds = apply_elapsed(&mut swap, now, &self.config);

            if swap.status == SwapStatus::Expired {
                let deadline = swap.response_deadline();
                self.commit_elapsed(&mut swap, loaded_version, now, kinds).await;
                return Err(SwapError::DeadlineExpired { swap_id, deadline });
            }
            match swap.status {
                SwapStatus::Offered => {
                    if actor != swap.counterparty_id {
                        return Err(SwapError::invalid_transition(swap_id, swap.status, "accept"));
                    }
                }
                SwapStatus::Countered => match swap.counter.as_ref() {
                    Some(counter) if actor != counter.proposed_by => {}
                    _ => {
                        return Err(SwapError::invalid_transition(swap_id, swap.status, "accept"))
                    }
                },
                status => {
                    self.commit_elapsed(&mut swap, loaded_version, now, kinds).await;
                    return Err(SwapError::invalid_transition(swap_id, status, "accept"));
                }
            }

            // Chat unlocks at acceptance; the charge is idempotent per swap,
            // so a CAS retry does not double-spend.
            self.ledger.use_token(&swap.initiator_id, swap.id).await?;

            if let Some(counter) = swap.counter.take() {
                swap.amount = counter.amount;
            }
            swap.status = SwapStatus::AcceptedPendingFee;
            swap.accepted_at = Some(now);
            kinds.push(SwapEventKind::SwapAccepted);

            swap.updated_at = now;
            swap.version = loaded_version + 1;
            match self.store.update_swap(&swap, loaded_version).await {
                Ok(()) => {
                    info!(swap_id = %swap.id, by = actor, "Swap accepted");
                    self.publish(swap.id, kinds).await;
                    return Ok(swap);
                }
                Err(SwapError::VersionConflict { .. }) if attempts < self.config.max_commit_retries => {
                    attempts += 1;
                    continue;
                }
                Err(e) => {
                    self.ledger.release_token(&swap.initiator_id, swap.id).await;
                    return Err(e);
                }
            }
        }
    }

    /// Counter the current offer with a different amount
    pub async fn counter_offer(&self, actor: &str, swap_id: Uuid, amount: Amount) -> SwapResult<Swap> {
        if amount < self.config.eligibility_min || amount > self.config.eligibility_max {
            return Err(SwapError::validation(
                "amount",
                format!("counter amount {} outside the eligibility band", amount),
            ));
        }
        let actor = actor.to_string();
        self.mutate(swap_id, Some(&actor.clone()), "counter", move |swap, now, config| {
            match swap.status {
                SwapStatus::Offered => {}
                SwapStatus::Countered => {
                    // Only one counter pending at a time; the other party
                    // answers it with a counter of their own.
                    if swap.counter.as_ref().is_some_and(|c| c.proposed_by == actor) {
                        return Err(SwapError::DuplicatePendingRequest {
                            swap_id: swap.id,
                            kind: "counter-offer",
                        });
                    }
                }
                SwapStatus::Expired => {
                    return Err(SwapError::DeadlineExpired {
                        swap_id: swap.id,
                        deadline: swap.response_deadline(),
                    })
                }
                status => return Err(SwapError::invalid_transition(swap.id, status, "counter")),
            }
            swap.counter = Some(CounterOffer {
                amount,
                proposed_by: actor.clone(),
                proposed_at: now,
                responds_by: now + config.counter_response_window(),
            });
            swap.status = SwapStatus::Countered;
            Ok(vec![SwapEventKind::OfferCountered { by: actor.clone() }])
        })
        .await
    }

    /// Withdraw an unaccepted swap
    pub async fn cancel_swap(&self, actor: &str, swap_id: Uuid) -> SwapResult<Swap> {
        let actor = actor.to_string();
        self.mutate(swap_id, Some(&actor.clone()), "cancel", move |swap, _now, _config| {
            match swap.status {
                SwapStatus::Offered | SwapStatus::Countered => {
                    swap.status = SwapStatus::Cancelled;
                    Ok(vec![SwapEventKind::SwapCancelled { by: actor.clone() }])
                }
                status => Err(SwapError::invalid_transition(swap.id, status, "cancel")),
            }
        })
        .await
    }

    /// Pay the caller's side of the connection fee
    ///
    /// Fees are fixed at offer time. When the second side settles, the swap
    /// locks; the next evaluation opens the proof window.
    pub async fn pay_swap_fee(&self, actor: &str, swap_id: Uuid) -> SwapResult<Swap> {
        let actor = actor.to_string();
        self.mutate(swap_id, Some(&actor.clone()), "pay fee", move |swap, now, _config| {
            if swap.status != SwapStatus::AcceptedPendingFee {
                return Err(SwapError::invalid_transition(swap.id, swap.status, "pay fee"));
            }
            let party = swap.party_of(&actor).ok_or(SwapError::NotParticipant {
                user_id: actor.clone(),
                swap_id: swap.id,
            })?;
            if swap.fee_of(party).is_settled() {
                // Repeat payment is a no-op.
                return Ok(vec![]);
            }
            swap.fee_of_mut(party).paid = true;
            let mut kinds = vec![SwapEventKind::FeePaid { by: actor.clone() }];

            if swap.both_fees_settled() {
                swap.status = SwapStatus::Locked;
                swap.locked_at = Some(now);
                kinds.push(SwapEventKind::SwapLocked);
            }
            Ok(kinds)
        })
        .await
    }

    /// Load a swap, applying any elapsed-deadline transitions first
    pub async fn get_swap(&self, actor: &str, swap_id: Uuid) -> SwapResult<Swap> {
        let actor = actor.to_string();
        self.mutate(swap_id, Some(&actor), "read", |_swap, _now, _config| Ok(vec![]))
            .await
    }

    /// Recently active swaps projected for social proof
    pub async fn list_activity_feed(&self, limit: Option<usize>) -> SwapResult<Vec<ActivityFeedItem>> {
        let limit = limit.unwrap_or(self.config.feed_limit);
        let recent = self.store.list_recent_swaps(limit * 2).await?;
        Ok(recent
            .iter()
            .filter(|s| s.status == SwapStatus::Completed || s.status.is_locked_in())
            .take(limit)
            .map(ActivityFeedItem::from_swap)
            .collect())
    }

    /// Apply elapsed deadlines to a swap without a user action; used by the
    /// background sweep
    pub(crate) async fn sweep_swap(&self, swap_id: Uuid) -> SwapResult<Swap> {
        self.mutate(swap_id, None, "sweep", |_swap, _now, _config| Ok(vec![]))
            .await
    }

    /// Load-mutate-commit loop with lazy deadline evaluation
    ///
    /// `f` runs against the freshly loaded aggregate after elapsed-deadline
    /// transitions are applied; the commit is a version check-and-set, and
    /// conflicts retry the whole loop a bounded number of times. Elapsed
    /// transitions discovered on the way to a failed operation are still
    /// committed so reads surface them.
    pub(crate) async fn mutate<F>(
        &self,
        swap_id: Uuid,
        actor: Option<&str>,
        action: &'static str,
        f: F,
    ) -> SwapResult<Swap>
    where
        F: Fn(&mut Swap, DateTime<Utc>, &EngineConfig) -> SwapResult<Vec<SwapEventKind>>,
    {
        let mut attempts = 0u8;
        loop {
            let mut swap = self.store.get_swap(swap_id).await?;
            if let Some(user) = actor {
                if !swap.is_participant(user) {
                    return Err(SwapError::NotParticipant {
                        user_id: user.to_string(),
                        swap_id,
                    });
                }
            }
            let now = Utc::now();
            let loaded_version = swap.version;
            let baseline = swap.clone();
            let mut kinds = apply_elapsed(&mut swap, now, &self.config);

            match f(&mut swap, now, &self.config) {
                Ok(mut op_kinds) => kinds.append(&mut op_kinds),
                Err(e) => {
                    self.commit_elapsed(&mut swap, loaded_version, now, kinds).await;
                    return Err(e);
                }
            }

            // Bookkeeping-only mutations commit without raising an event.
            if kinds.is_empty() && swap == baseline {
                // Nothing changed; plain read.
                return Ok(swap);
            }

            swap.updated_at = now;
            swap.version = loaded_version + 1;
            match self.store.update_swap(&swap, loaded_version).await {
                Ok(()) => {
                    info!(swap_id = %swap.id, action, status = %swap.status, "Swap transition committed");
                    self.publish(swap.id, kinds.clone()).await;
                    self.post_commit(&swap, &kinds).await;
                    return Ok(swap);
                }
                Err(SwapError::VersionConflict { .. }) if attempts < self.config.max_commit_retries => {
                    attempts += 1;
                    warn!(swap_id = %swap.id, action, attempts, "Commit conflict, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Best-effort commit of elapsed-deadline transitions discovered while
    /// an operation was failing; a conflict here means someone else already
    /// made progress.
    async fn commit_elapsed(
        &self,
        swap: &mut Swap,
        loaded_version: u64,
        now: DateTime<Utc>,
        kinds: Vec<SwapEventKind>,
    ) {
        if kinds.is_empty() {
            return;
        }
        swap.updated_at = now;
        swap.version = loaded_version + 1;
        match self.store.update_swap(swap, loaded_version).await {
            Ok(()) => {
                self.publish(swap.id, kinds.clone()).await;
                self.post_commit(swap, &kinds).await;
            }
            Err(e) => warn!(swap_id = %swap.id, error = %e, "Skipped elapsed-transition commit"),
        }
    }

    /// Raise events; delivery problems are logged, never failed back into
    /// the committed transition
    pub(crate) async fn publish(&self, swap_id: Uuid, kinds: Vec<SwapEventKind>) {
        for kind in kinds {
            let event = SwapEvent::new(swap_id, kind);
            if let Err(e) = self.events.publish(event).await {
                error!(swap_id = %swap_id, error = %e, "Event publish failed");
            }
        }
    }

    /// Trust-profile side effects of committed transitions
    async fn post_commit(&self, swap: &Swap, kinds: &[SwapEventKind]) {
        for kind in kinds {
            match kind {
                SwapEventKind::SwapCompleted => {
                    for user in [&swap.initiator_id, &swap.counterparty_id] {
                        self.apply_score_event(swap, user, ScoreEvent::SwapCompleted).await;
                    }
                }
                SwapEventKind::DisputeResolved { outcome, .. } => {
                    let Some(dispute) = swap.disputes.iter().rev().find(|d| d.outcome.is_some())
                    else {
                        continue;
                    };
                    let filer = dispute.filer_id.clone();
                    let respondent = swap
                        .party_of(&filer)
                        .map(|p| swap.user_of(p.other()).to_string());
                    match outcome {
                        DisputeOutcome::AgainstRespondent => {
                            if let Some(respondent) = respondent {
                                self.apply_score_event(swap, &respondent, ScoreEvent::DisputeLost)
                                    .await;
                            }
                        }
                        DisputeOutcome::AgainstFiler => {
                            self.apply_score_event(swap, &filer, ScoreEvent::FalseDisputeFiled)
                                .await;
                        }
                        DisputeOutcome::NoFault => {}
                    }
                }
                _ => {}
            }
        }
    }

    async fn apply_score_event(&self, swap: &Swap, user_id: &str, event: ScoreEvent) {
        let verified = match self.identity.is_verified(user_id).await {
            Ok(v) => v,
            Err(e) => {
                // Withhold advancement rather than fail a committed swap.
                warn!(user_id, error = %e, "Identity check failed, treating as unverified");
                false
            }
        };
        let mut profile = match self.profile_or_new(user_id).await {
            Ok(p) => p,
            Err(e) => {
                error!(user_id, error = %e, "Profile load failed, score event dropped");
                return;
            }
        };
        let advancement = profile.apply(event, &self.config.score_deltas, verified);
        if let Err(e) = self.store.upsert_profile(&profile).await {
            error!(user_id, error = %e, "Profile store failed");
            return;
        }
        if let Some(advancement) = advancement {
            info!(
                user_id,
                from = %advancement.previous_tier,
                to = %advancement.new_tier,
                "Tier advanced"
            );
            self.publish(
                swap.id,
                vec![SwapEventKind::TierAdvanced {
                    user_id: user_id.to_string(),
                    advancement,
                }],
            )
            .await;
        }
    }

    pub(crate) async fn profile_or_new(&self, user_id: &str) -> SwapResult<TrustProfile> {
        match self.store.get_profile(user_id).await {
            Ok(profile) => Ok(profile),
            Err(SwapError::ProfileNotFound { .. }) => {
                let profile = TrustProfile::new(user_id);
                self.store.upsert_profile(&profile).await?;
                Ok(profile)
            }
            Err(e) => Err(e),
        }
    }
}

/// Apply every elapsed-deadline transition to the aggregate
///
/// Pure over (`swap`, `now`, `config`); both user-triggered loads and the
/// background sweep run this, so the guard is always "still in the expected
/// pre-state" and a double apply is impossible.
pub(crate) fn apply_elapsed(swap: &mut Swap, now: DateTime<Utc>, config: &EngineConfig) -> Vec<SwapEventKind> {
    let mut kinds = Vec::new();
    if swap.status.is_terminal() {
        return kinds;
    }

    // An open dispute freezes every automatic transition.
    if swap.status == SwapStatus::Disputed {
        return kinds;
    }

    match swap.status {
        SwapStatus::Offered | SwapStatus::Countered => {
            if now > swap.response_deadline() {
                swap.status = SwapStatus::Expired;
                kinds.push(SwapEventKind::SwapExpired);
            }
        }
        SwapStatus::Locked | SwapStatus::AwaitingProof => {
            // The lock is momentary; the proof clock starts at locked_at.
            if swap.status == SwapStatus::Locked {
                swap.status = SwapStatus::AwaitingProof;
                if swap.proof_due.is_none() {
                    swap.proof_due = Some(swap.locked_at.unwrap_or(now) + config.proof_window());
                }
            }

            // Unanswered extension requests lapse; the original deadline
            // stands.
            for ext in swap
                .extensions
                .iter_mut()
                .filter(|e| e.status == ExtensionStatus::Pending && now > e.respond_by)
            {
                ext.status = ExtensionStatus::Expired;
                ext.responded_at = Some(now);
                kinds.push(SwapEventKind::ExtensionExpired { request_id: ext.id });
            }

            // Unreviewed proofs auto-accept once the review window closes.
            for proof in swap
                .proofs
                .iter_mut()
                .filter(|p| p.status == ProofStatus::Pending && now > p.review_deadline)
            {
                proof.status = ProofStatus::AutoAccepted;
                proof.reviewed_at = Some(now);
                kinds.push(SwapEventKind::ProofAccepted {
                    proof_id: proof.id,
                    auto: true,
                });
            }

            if swap.all_proofs_satisfied() {
                swap.status = SwapStatus::Completed;
                swap.completed_at = Some(now);
                kinds.push(SwapEventKind::SwapCompleted);
            } else {
                // A side with no live proof past its effective deadline
                // expires the swap.
                let overdue = swap.proof_parties().into_iter().any(|party| {
                    let deadline = match swap.effective_proof_deadline(party) {
                        Some(d) => d,
                        None => return false,
                    };
                    if now <= deadline {
                        return false;
                    }
                    !matches!(
                        swap.current_proof_of(party).map(|p| p.status),
                        Some(ProofStatus::Pending)
                            | Some(ProofStatus::Accepted)
                            | Some(ProofStatus::AutoAccepted)
                    )
                });
                if overdue {
                    swap.status = SwapStatus::Expired;
                    kinds.push(SwapEventKind::SwapExpired);
                }
            }
        }
        // Fee payment carries no deadline of its own.
        SwapStatus::AcceptedPendingFee => {}
        _ => {}
    }
    kinds
}

/// Helper for sub-engine impls: require a status for an action
pub(crate) fn require_locked_in(swap: &Swap, action: &'static str) -> SwapResult<()> {
    if !swap.status.is_locked_in() {
        return Err(SwapError::invalid_transition(swap.id, swap.status, action));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Proof, ProofType};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn amount(v: rust_decimal::Decimal) -> Amount {
        Amount::new(v).unwrap()
    }

    fn locked_swap(now: DateTime<Utc>) -> Swap {
        let mut swap = Swap::new_offer(
            SwapType::TwoSided,
            "alice",
            "bob",
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            amount(dec!(85.00)),
            amount(dec!(0.99)),
            now + Duration::hours(48),
        );
        swap.status = SwapStatus::AwaitingProof;
        swap.locked_at = Some(now);
        swap.proof_due = Some(now + Duration::hours(72));
        swap
    }

    fn pending_proof(swap: &Swap, user: &str, review_deadline: DateTime<Utc>) -> Proof {
        Proof {
            id: Uuid::new_v4(),
            swap_id: swap.id,
            user_id: user.to_string(),
            bill_id: swap.bill_a,
            proof_type: ProofType::Screenshot,
            file_ref: "s3://proofs/1.png".to_string(),
            submitter_notes: None,
            status: ProofStatus::Pending,
            review_deadline,
            resubmission_count: 0,
            replaces_proof_id: None,
            rejection_reason: None,
            submitted_at: Utc::now(),
            reviewed_at: None,
        }
    }

    #[test]
    fn test_offer_expires_after_accept_deadline() {
        let now = Utc::now();
        let mut swap = Swap::new_offer(
            SwapType::TwoSided,
            "alice",
            "bob",
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            amount(dec!(85.00)),
            amount(dec!(0.99)),
            now - Duration::hours(1),
        );
        let kinds = apply_elapsed(&mut swap, now, &EngineConfig::default());
        assert_eq!(swap.status, SwapStatus::Expired);
        assert_eq!(kinds, vec![SwapEventKind::SwapExpired]);

        // Terminal states never move again.
        let kinds = apply_elapsed(&mut swap, now, &EngineConfig::default());
        assert!(kinds.is_empty());
    }

    #[test]
    fn test_locked_swap_advances_to_awaiting_proof() {
        let now = Utc::now();
        let config = EngineConfig::default();
        let mut swap = locked_swap(now);
        swap.status = SwapStatus::Locked;
        swap.proof_due = None;

        let kinds = apply_elapsed(&mut swap, now, &config);
        assert_eq!(swap.status, SwapStatus::AwaitingProof);
        assert_eq!(swap.proof_due, Some(now + config.proof_window()));
        // A silent bookkeeping transition; the lock event already fired.
        assert!(kinds.is_empty());
    }

    #[test]
    fn test_proof_auto_accepts_and_completes() {
        let now = Utc::now();
        let mut swap = locked_swap(now - Duration::hours(30));
        swap.proofs
            .push(pending_proof(&swap, "alice", now - Duration::hours(1)));
        swap.proofs
            .push(pending_proof(&swap, "bob", now - Duration::hours(2)));

        let kinds = apply_elapsed(&mut swap, now, &EngineConfig::default());
        assert_eq!(swap.status, SwapStatus::Completed);
        assert_eq!(
            kinds
                .iter()
                .filter(|k| matches!(k, SwapEventKind::ProofAccepted { auto: true, .. }))
                .count(),
            2
        );
        assert!(kinds.contains(&SwapEventKind::SwapCompleted));
    }

    #[test]
    fn test_dispute_freezes_auto_accept() {
        let now = Utc::now();
        let mut swap = locked_swap(now - Duration::hours(30));
        swap.proofs
            .push(pending_proof(&swap, "alice", now - Duration::hours(1)));
        swap.pre_dispute_status = Some(swap.status);
        swap.status = SwapStatus::Disputed;

        let kinds = apply_elapsed(&mut swap, now, &EngineConfig::default());
        assert!(kinds.is_empty());
        assert_eq!(swap.proofs[0].status, ProofStatus::Pending);
    }

    #[test]
    fn test_missing_proof_past_deadline_expires_swap() {
        let now = Utc::now();
        let mut swap = locked_swap(now - Duration::hours(100));
        swap.proof_due = Some(now - Duration::hours(1));

        let kinds = apply_elapsed(&mut swap, now, &EngineConfig::default());
        assert_eq!(swap.status, SwapStatus::Expired);
        assert_eq!(kinds, vec![SwapEventKind::SwapExpired]);
    }

    #[test]
    fn test_pending_proof_holds_off_expiry() {
        let now = Utc::now();
        let mut swap = locked_swap(now - Duration::hours(100));
        swap.proof_due = Some(now - Duration::hours(1));
        // Both sides submitted before the deadline; reviews still open.
        swap.proofs
            .push(pending_proof(&swap, "alice", now + Duration::hours(20)));
        swap.proofs
            .push(pending_proof(&swap, "bob", now + Duration::hours(20)));

        let kinds = apply_elapsed(&mut swap, now, &EngineConfig::default());
        assert!(kinds.is_empty());
        assert_eq!(swap.status, SwapStatus::AwaitingProof);
    }
}
