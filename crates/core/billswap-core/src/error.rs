use thiserror::Error;

/// Error type for the domain foundation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Amount validation errors
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    /// Field-level validation errors
    #[error("Validation failed: {field} - {message}")]
    ValidationError { field: String, message: String },

    /// Score outside the 0-100 band
    #[error("Invalid score: {value}")]
    InvalidScore { value: i64 },
}

/// Result type alias for domain operations
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create an invalid amount error
    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::InvalidAmount {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Get error code for external systems
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidAmount { .. } => "INVALID_AMOUNT",
            CoreError::ValidationError { .. } => "VALIDATION_ERROR",
            CoreError::InvalidScore { .. } => "INVALID_SCORE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let error = CoreError::invalid_amount("negative");
        assert_eq!(error.code(), "INVALID_AMOUNT");

        let error = CoreError::validation_error("score", "out of range");
        assert_eq!(error.code(), "VALIDATION_ERROR");
    }
}
