use billswap_core::{CoreError, Tier};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Main error type for the swap engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SwapError {
    /// Actor is not a party to the swap
    #[error("User {user_id} is not a participant of swap {swap_id}")]
    NotParticipant { user_id: String, swap_id: Uuid },

    /// Action not legal from the swap's current status
    #[error("Cannot {action} swap {swap_id} in status {status}")]
    InvalidStateTransition {
        swap_id: Uuid,
        status: String,
        action: &'static str,
    },

    /// The relevant deadline has already elapsed
    #[error("Deadline {deadline} for swap {swap_id} has expired")]
    DeadlineExpired {
        swap_id: Uuid,
        deadline: DateTime<Utc>,
    },

    /// No free or purchased tokens and no unlimited subscription
    #[error("User {user_id} has no connection tokens remaining")]
    InsufficientTokens { user_id: String },

    /// Monthly connection quota for the tier is exhausted
    #[error("Monthly connection limit of {limit} reached for {tier} tier")]
    VelocityLimitReached { limit: u32, tier: Tier },

    /// Operation requires a verified identity
    #[error("Identity verification required for user {user_id}")]
    IdentityVerificationRequired { user_id: String },

    /// Cumulative extension would exceed the configured maximum
    #[error("Extension of {requested_hours}h exceeds the {max_hours}h maximum")]
    ExtensionLimitExceeded {
        requested_hours: i64,
        max_hours: i64,
    },

    /// A request of this kind is already pending on the swap
    #[error("Swap {swap_id} already has a pending {kind} request")]
    DuplicatePendingRequest { swap_id: Uuid, kind: &'static str },

    /// Proof resubmission cap reached
    #[error("Proof resubmission limit of {max} reached for swap {swap_id}")]
    ResubmissionLimitExceeded { swap_id: Uuid, max: u8 },

    /// Domain validation errors
    #[error("Validation failed: {field} - {message}")]
    ValidationFailed { field: String, message: String },

    /// Swap not found
    #[error("Swap not found: {swap_id}")]
    SwapNotFound { swap_id: Uuid },

    /// Proof not found on the swap
    #[error("Proof not found: {proof_id}")]
    ProofNotFound { proof_id: Uuid },

    /// Deal not found on the swap
    #[error("Deal not found: {deal_id}")]
    DealNotFound { deal_id: Uuid },

    /// Extension request not found on the swap
    #[error("Extension request not found: {request_id}")]
    ExtensionNotFound { request_id: Uuid },

    /// No open dispute to resolve
    #[error("No open dispute on swap {swap_id}")]
    NoOpenDispute { swap_id: Uuid },

    /// Bill not found at the bill source
    #[error("Bill not found: {bill_id}")]
    BillNotFound { bill_id: Uuid },

    /// Trust profile not found
    #[error("Trust profile not found for user {user_id}")]
    ProfileNotFound { user_id: String },

    /// Optimistic concurrency conflict on the swap record
    #[error("Concurrent modification of swap {swap_id}")]
    VersionConflict { swap_id: Uuid },

    /// External collaborator failure (billing, identity, bill source)
    #[error("Collaborator {collaborator} failed: {message}")]
    CollaboratorError {
        collaborator: &'static str,
        message: String,
    },

    /// Storage backend failure
    #[error("Storage error: {message}")]
    StorageError { message: String },
}

/// Result type alias for swap operations
pub type SwapResult<T> = Result<T, SwapError>;

impl SwapError {
    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid state transition error
    pub fn invalid_transition(swap_id: Uuid, status: impl ToString, action: &'static str) -> Self {
        Self::InvalidStateTransition {
            swap_id,
            status: status.to_string(),
            action,
        }
    }

    /// Create a collaborator error
    pub fn collaborator(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self::CollaboratorError {
            collaborator,
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageError {
            message: message.into(),
        }
    }

    /// Check if the caller may retry the operation as-is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SwapError::VersionConflict { .. }
                | SwapError::CollaboratorError { .. }
                | SwapError::StorageError { .. }
        )
    }

    /// Check if the failure is permanent for the given input
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            SwapError::NotParticipant { .. }
                | SwapError::InvalidStateTransition { .. }
                | SwapError::DeadlineExpired { .. }
                | SwapError::ExtensionLimitExceeded { .. }
                | SwapError::ResubmissionLimitExceeded { .. }
                | SwapError::ValidationFailed { .. }
        )
    }

    /// Get error code for external systems
    pub fn code(&self) -> &'static str {
        match self {
            SwapError::NotParticipant { .. } => "NOT_PARTICIPANT",
            SwapError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            SwapError::DeadlineExpired { .. } => "DEADLINE_EXPIRED",
            SwapError::InsufficientTokens { .. } => "INSUFFICIENT_TOKENS",
            SwapError::VelocityLimitReached { .. } => "VELOCITY_LIMIT_REACHED",
            SwapError::IdentityVerificationRequired { .. } => "IDENTITY_VERIFICATION_REQUIRED",
            SwapError::ExtensionLimitExceeded { .. } => "EXTENSION_LIMIT_EXCEEDED",
            SwapError::DuplicatePendingRequest { .. } => "DUPLICATE_PENDING_REQUEST",
            SwapError::ResubmissionLimitExceeded { .. } => "RESUBMISSION_LIMIT_EXCEEDED",
            SwapError::ValidationFailed { .. } => "VALIDATION_FAILED",
            SwapError::SwapNotFound { .. } => "SWAP_NOT_FOUND",
            SwapError::ProofNotFound { .. } => "PROOF_NOT_FOUND",
            SwapError::DealNotFound { .. } => "DEAL_NOT_FOUND",
            SwapError::ExtensionNotFound { .. } => "EXTENSION_NOT_FOUND",
            SwapError::NoOpenDispute { .. } => "NO_OPEN_DISPUTE",
            SwapError::BillNotFound { .. } => "BILL_NOT_FOUND",
            SwapError::ProfileNotFound { .. } => "PROFILE_NOT_FOUND",
            SwapError::VersionConflict { .. } => "VERSION_CONFLICT",
            SwapError::CollaboratorError { .. } => "COLLABORATOR_ERROR",
            SwapError::StorageError { .. } => "STORAGE_ERROR",
        }
    }
}

impl From<CoreError> for SwapError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidAmount { message } => SwapError::validation("amount", message),
            CoreError::ValidationError { field, message } => SwapError::ValidationFailed { field, message },
            CoreError::InvalidScore { value } => {
                SwapError::validation("score", format!("out of range: {}", value))
            }
        }
    }
}

impl From<validator::ValidationErrors> for SwapError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationFailed {
            field: "multiple".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let conflict = SwapError::VersionConflict {
            swap_id: Uuid::new_v4(),
        };
        assert!(conflict.is_retryable());
        assert!(!conflict.is_permanent());

        let validation = SwapError::validation("description", "too short");
        assert!(!validation.is_retryable());
        assert!(validation.is_permanent());
        assert_eq!(validation.code(), "VALIDATION_FAILED");
    }

    #[test]
    fn test_core_error_conversion() {
        let err: SwapError = CoreError::invalid_amount("negative").into();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }
}
