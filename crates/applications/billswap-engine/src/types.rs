use billswap_core::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One-sided swaps pay a single bill; two-sided swaps pair two bills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapType {
    OneSided,
    TwoSided,
}

/// Swap lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapStatus {
    /// Initial offer awaiting the counterparty
    Offered,
    /// A counter-offer is pending a response
    Countered,
    /// Accepted; waiting on both connection fees
    AcceptedPendingFee,
    /// Both fees paid; terms locked
    Locked,
    /// Proof submission window is open
    AwaitingProof,
    /// Both required proofs accepted
    Completed,
    /// Withdrawn before acceptance
    Cancelled,
    /// A deadline elapsed without the required action
    Expired,
    /// Failed by dispute resolution or compensation
    Failed,
    /// A dispute is open; automatic transitions frozen
    Disputed,
}

impl SwapStatus {
    /// Check if status is terminal (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SwapStatus::Completed | SwapStatus::Cancelled | SwapStatus::Expired | SwapStatus::Failed
        )
    }

    /// Check if the swap is locked-in (fee lock happened)
    pub fn is_locked_in(&self) -> bool {
        matches!(self, SwapStatus::Locked | SwapStatus::AwaitingProof)
    }

    /// Check if a dispute may be filed from this status
    pub fn allows_dispute(&self) -> bool {
        matches!(
            self,
            SwapStatus::AcceptedPendingFee | SwapStatus::Locked | SwapStatus::AwaitingProof
        )
    }
}

impl std::fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The two sides of a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Party {
    /// The initiating user; owns bill A
    Initiator,
    /// The matched user; owns bill B on two-sided swaps
    Counterparty,
}

impl Party {
    /// The opposite side
    pub fn other(&self) -> Party {
        match self {
            Party::Initiator => Party::Counterparty,
            Party::Counterparty => Party::Initiator,
        }
    }
}

/// Per-party connection fee, fixed at offer time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyFee {
    pub amount: Amount,
    pub paid: bool,
    /// Fee waived by points redemption
    pub points_waived: bool,
}

impl PartyFee {
    pub fn new(amount: Amount) -> Self {
        Self {
            amount,
            paid: false,
            points_waived: false,
        }
    }

    /// A waived fee counts as settled for the lock condition
    pub fn is_settled(&self) -> bool {
        self.paid || self.points_waived
    }
}

/// A pending counter-offer on an unaccepted swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterOffer {
    pub amount: Amount,
    pub proposed_by: String,
    pub proposed_at: DateTime<Utc>,
    /// Short response clock; reset by each counter
    pub responds_by: DateTime<Utc>,
}

/// Proof evidence formats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofType {
    Screenshot,
    Receipt,
    BankStatement,
    Other(String),
}

/// Proof review status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofStatus {
    /// Awaiting counterpart review
    Pending,
    /// Accepted by the counterpart
    Accepted,
    /// Review deadline passed with no action
    AutoAccepted,
    /// Rejected; submitter may resubmit up to the cap
    Rejected,
    /// Replaced by a resubmission
    Resubmitted,
}

impl ProofStatus {
    /// Check if the proof counts toward completion
    pub fn is_accepted(&self) -> bool {
        matches!(self, ProofStatus::Accepted | ProofStatus::AutoAccepted)
    }
}

/// Payment proof submitted by one party for the counterpart's bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub id: Uuid,
    pub swap_id: Uuid,
    /// Submitting user
    pub user_id: String,
    /// The bill this proof claims payment of
    pub bill_id: Uuid,
    pub proof_type: ProofType,
    /// Opaque storage reference; content is never parsed here
    pub file_ref: String,
    pub submitter_notes: Option<String>,
    pub status: ProofStatus,
    /// Unreviewed proofs auto-accept at this time
    pub review_deadline: DateTime<Utc>,
    /// How many times this chain has been resubmitted
    pub resubmission_count: u8,
    /// The immediately replaced proof, when resubmitted
    pub replaces_proof_id: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Deal negotiation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealStatus {
    Proposed,
    Accepted,
    Rejected,
    /// Rejected and answered by a counter-deal
    Countered,
    /// Replaced by a later accepted deal
    Superseded,
}

/// Renegotiable terms layered on a locked swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub id: Uuid,
    pub swap_id: Uuid,
    pub proposer_id: String,
    /// Amount owed toward bill A / bill B under these terms
    pub amount_a: Option<Amount>,
    pub amount_b: Option<Amount>,
    /// Per-side proof deadlines these terms impose
    pub deadline_a: DateTime<Utc>,
    pub deadline_b: DateTime<Utc>,
    /// Proof format the terms require, if any
    pub required_proof: Option<ProofType>,
    pub status: DealStatus,
    /// The rejected deal this one counters
    pub counter_of: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Why an extension is being requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtensionReason {
    PaycheckTiming,
    UnexpectedExpense,
    Emergency,
    Other,
}

/// Extension request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtensionStatus {
    Pending,
    Approved,
    Denied,
    /// Response window closed without an answer
    Expired,
}

/// A request to move a proof deadline forward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRequest {
    pub id: Uuid,
    pub swap_id: Uuid,
    pub requester_id: String,
    pub reason: ExtensionReason,
    pub custom_note: Option<String>,
    pub original_deadline: DateTime<Utc>,
    pub requested_deadline: DateTime<Utc>,
    /// Good-faith partial payment offered alongside the request
    pub partial_payment: Option<Amount>,
    pub status: ExtensionStatus,
    /// Fixed response window from creation
    pub respond_by: DateTime<Utc>,
    pub denial_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

/// Dispute status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Resolved,
}

/// Who a dispute resolution faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeOutcome {
    /// The respondent is at fault; they take the score penalty
    AgainstRespondent,
    /// The filing was unfounded; the filer takes the penalty
    AgainstFiler,
    /// Nobody penalised
    NoFault,
}

/// Where the swap lands after a dispute resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeDisposition {
    /// Resume at the status the swap held when the dispute was filed
    Resume,
    /// Close the swap as completed
    Complete,
    /// Close the swap as cancelled
    Cancel,
}

/// Why a dispute was filed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeReason {
    PaymentNotMade,
    ProofInvalid,
    WrongAmount,
    Harassment,
    Other,
}

/// A formal complaint freezing automatic swap progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: Uuid,
    pub swap_id: Uuid,
    pub filer_id: String,
    pub reason: DisputeReason,
    pub description: String,
    /// Opaque evidence references, at most three
    pub evidence: Vec<String>,
    pub status: DisputeStatus,
    pub outcome: Option<DisputeOutcome>,
    pub resolution: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// The swap aggregate
///
/// The unit of serialization: proofs, deals, extensions, and disputes ride
/// inside the aggregate so one optimistic version check covers every
/// state-mutating operation against the swap. Terminal swaps are retained
/// for audit, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swap {
    pub id: Uuid,
    pub swap_type: SwapType,
    pub status: SwapStatus,
    pub initiator_id: String,
    pub counterparty_id: String,
    /// The initiator's bill
    pub bill_a: Uuid,
    /// The counterparty's bill on two-sided swaps
    pub bill_b: Option<Uuid>,
    /// Nominal swap value; replaced when a counter-offer is accepted
    pub amount: Amount,
    pub counter: Option<CounterOffer>,
    pub fee_initiator: PartyFee,
    pub fee_counterparty: PartyFee,
    pub accept_deadline: DateTime<Utc>,
    /// Base proof deadline ceiling, set at lock and moved by approved
    /// extensions
    pub proof_due: Option<DateTime<Utc>>,
    /// Hours of extension already approved, toward the configured cap
    pub extension_hours_used: i64,
    /// Status held before the open dispute, for Resume resolutions
    pub pre_dispute_status: Option<SwapStatus>,
    pub proofs: Vec<Proof>,
    pub deals: Vec<Deal>,
    pub extensions: Vec<ExtensionRequest>,
    pub disputes: Vec<Dispute>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub locked_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency version, bumped on every committed write
    pub version: u64,
}

impl Swap {
    /// Create a new offer between two users
    #[allow(clippy::too_many_arguments)]
    pub fn new_offer(
        swap_type: SwapType,
        initiator_id: impl Into<String>,
        counterparty_id: impl Into<String>,
        bill_a: Uuid,
        bill_b: Option<Uuid>,
        amount: Amount,
        fee: Amount,
        accept_deadline: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            swap_type,
            status: SwapStatus::Offered,
            initiator_id: initiator_id.into(),
            counterparty_id: counterparty_id.into(),
            bill_a,
            bill_b,
            amount,
            counter: None,
            fee_initiator: PartyFee::new(fee),
            fee_counterparty: PartyFee::new(fee),
            accept_deadline,
            proof_due: None,
            extension_hours_used: 0,
            pre_dispute_status: None,
            proofs: Vec::new(),
            deals: Vec::new(),
            extensions: Vec::new(),
            disputes: Vec::new(),
            created_at: now,
            updated_at: now,
            accepted_at: None,
            locked_at: None,
            completed_at: None,
            version: 0,
        }
    }

    /// The clock governing an unaccepted swap: a pending counter's response
    /// window when one exists, otherwise the original accept deadline
    pub fn response_deadline(&self) -> DateTime<Utc> {
        self.counter
            .as_ref()
            .map(|c| c.responds_by)
            .unwrap_or(self.accept_deadline)
    }

    /// Which side a user is on, if any
    pub fn party_of(&self, user_id: &str) -> Option<Party> {
        if self.initiator_id == user_id {
            Some(Party::Initiator)
        } else if self.counterparty_id == user_id {
            Some(Party::Counterparty)
        } else {
            None
        }
    }

    /// Check if a user is a participant
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.party_of(user_id).is_some()
    }

    /// The user on a given side
    pub fn user_of(&self, party: Party) -> &str {
        match party {
            Party::Initiator => &self.initiator_id,
            Party::Counterparty => &self.counterparty_id,
        }
    }

    /// Fee record for a side
    pub fn fee_of(&self, party: Party) -> &PartyFee {
        match party {
            Party::Initiator => &self.fee_initiator,
            Party::Counterparty => &self.fee_counterparty,
        }
    }

    pub fn fee_of_mut(&mut self, party: Party) -> &mut PartyFee {
        match party {
            Party::Initiator => &mut self.fee_initiator,
            Party::Counterparty => &mut self.fee_counterparty,
        }
    }

    /// Lock condition: both sides settled
    pub fn both_fees_settled(&self) -> bool {
        self.fee_initiator.is_settled() && self.fee_counterparty.is_settled()
    }

    /// Which sides must produce an accepted proof for completion
    ///
    /// On a one-sided swap only the counterparty pays (bill A); two-sided
    /// swaps need proof from both sides.
    pub fn proof_parties(&self) -> Vec<Party> {
        match self.swap_type {
            SwapType::OneSided => vec![Party::Counterparty],
            SwapType::TwoSided => vec![Party::Initiator, Party::Counterparty],
        }
    }

    /// The bill a party is responsible for paying
    pub fn bill_paid_by(&self, party: Party) -> Option<Uuid> {
        match party {
            // The counterparty pays the initiator's bill.
            Party::Counterparty => Some(self.bill_a),
            Party::Initiator => self.bill_b,
        }
    }

    /// The single accepted deal currently in force
    pub fn active_deal(&self) -> Option<&Deal> {
        self.deals.iter().find(|d| d.status == DealStatus::Accepted)
    }

    /// The latest live proof a party has submitted (ignores replaced ones)
    pub fn current_proof_of(&self, party: Party) -> Option<&Proof> {
        let user = self.user_of(party);
        self.proofs
            .iter()
            .filter(|p| p.user_id == user && p.status != ProofStatus::Resubmitted)
            .max_by_key(|p| p.submitted_at)
    }

    /// Check if a party's proof obligation is satisfied
    pub fn proof_satisfied(&self, party: Party) -> bool {
        self.current_proof_of(party)
            .is_some_and(|p| p.status.is_accepted())
    }

    /// Completion condition: every required side satisfied
    pub fn all_proofs_satisfied(&self) -> bool {
        self.proof_parties().iter().all(|p| self.proof_satisfied(*p))
    }

    /// Effective proof deadline for a side: the active deal's per-side
    /// deadline overrides the swap's own ceiling.
    pub fn effective_proof_deadline(&self, party: Party) -> Option<DateTime<Utc>> {
        if let Some(deal) = self.active_deal() {
            return Some(match party {
                Party::Initiator => deal.deadline_a,
                Party::Counterparty => deal.deadline_b,
            });
        }
        self.proof_due
    }

    /// The pending extension request, if any
    pub fn pending_extension(&self) -> Option<&ExtensionRequest> {
        self.extensions
            .iter()
            .find(|e| e.status == ExtensionStatus::Pending)
    }

    /// The open (unresolved) dispute, if any
    pub fn open_dispute(&self) -> Option<&Dispute> {
        self.disputes
            .iter()
            .find(|d| d.status != DisputeStatus::Resolved)
    }
}

/// Read-only social-proof projection of a swap; never authoritative
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityFeedItem {
    pub swap_id: Uuid,
    pub swap_type: SwapType,
    pub status: SwapStatus,
    pub amount: Amount,
    pub updated_at: DateTime<Utc>,
}

impl ActivityFeedItem {
    /// Project a swap into a feed item
    pub fn from_swap(swap: &Swap) -> Self {
        Self {
            swap_id: swap.id,
            swap_type: swap.swap_type,
            status: swap.status,
            amount: swap.amount,
            updated_at: swap.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amount(v: rust_decimal::Decimal) -> Amount {
        Amount::new(v).unwrap()
    }

    fn sample_swap() -> Swap {
        Swap::new_offer(
            SwapType::TwoSided,
            "alice",
            "bob",
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            amount(dec!(85.00)),
            amount(dec!(0.99)),
            Utc::now() + chrono::Duration::hours(48),
        )
    }

    #[test]
    fn test_terminality() {
        assert!(SwapStatus::Completed.is_terminal());
        assert!(SwapStatus::Cancelled.is_terminal());
        assert!(SwapStatus::Expired.is_terminal());
        assert!(SwapStatus::Failed.is_terminal());
        assert!(!SwapStatus::Disputed.is_terminal());
        assert!(!SwapStatus::AwaitingProof.is_terminal());
    }

    #[test]
    fn test_participants() {
        let swap = sample_swap();
        assert_eq!(swap.party_of("alice"), Some(Party::Initiator));
        assert_eq!(swap.party_of("bob"), Some(Party::Counterparty));
        assert_eq!(swap.party_of("mallory"), None);
        assert_eq!(swap.user_of(Party::Counterparty), "bob");
    }

    #[test]
    fn test_fee_lock_condition() {
        let mut swap = sample_swap();
        assert!(!swap.both_fees_settled());

        swap.fee_of_mut(Party::Initiator).paid = true;
        assert!(!swap.both_fees_settled());

        swap.fee_of_mut(Party::Counterparty).points_waived = true;
        assert!(swap.both_fees_settled());
    }

    #[test]
    fn test_proof_parties_by_swap_type() {
        let mut swap = sample_swap();
        assert_eq!(swap.proof_parties().len(), 2);

        swap.swap_type = SwapType::OneSided;
        assert_eq!(swap.proof_parties(), vec![Party::Counterparty]);
    }

    #[test]
    fn test_effective_deadline_prefers_active_deal() {
        let mut swap = sample_swap();
        let base = Utc::now() + chrono::Duration::hours(72);
        swap.proof_due = Some(base);
        assert_eq!(swap.effective_proof_deadline(Party::Initiator), Some(base));

        let deal_deadline = base - chrono::Duration::hours(10);
        swap.deals.push(Deal {
            id: Uuid::new_v4(),
            swap_id: swap.id,
            proposer_id: "alice".to_string(),
            amount_a: None,
            amount_b: None,
            deadline_a: deal_deadline,
            deadline_b: base,
            required_proof: None,
            status: DealStatus::Accepted,
            counter_of: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        assert_eq!(
            swap.effective_proof_deadline(Party::Initiator),
            Some(deal_deadline)
        );
        assert_eq!(swap.effective_proof_deadline(Party::Counterparty), Some(base));
    }
}
