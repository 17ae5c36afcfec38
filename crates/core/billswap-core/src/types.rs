use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Monetary amount in USD
///
/// Bill-swap amounts are always dollars; precision is handled with `Decimal`
/// so fee and partial-payment arithmetic never loses cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount {
    value: Decimal,
}

impl Amount {
    /// Create a new amount
    pub fn new(value: Decimal) -> CoreResult<Self> {
        if value < Decimal::ZERO {
            return Err(CoreError::InvalidAmount {
                message: format!("Amount cannot be negative: {}", value),
            });
        }
        Ok(Self { value })
    }

    /// Create an amount from whole cents
    pub fn from_cents(cents: i64) -> CoreResult<Self> {
        Self::new(Decimal::new(cents, 2))
    }

    /// Zero dollars
    pub fn zero() -> Self {
        Self {
            value: Decimal::ZERO,
        }
    }

    /// Underlying decimal value
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Check if amount is zero
    pub fn is_zero(&self) -> bool {
        self.value == Decimal::ZERO
    }

    /// Check if amount is positive
    pub fn is_positive(&self) -> bool {
        self.value > Decimal::ZERO
    }

    /// Add two amounts
    pub fn add(&self, other: &Amount) -> CoreResult<Amount> {
        Self::new(self.value + other.value)
    }

    /// Subtract an amount, failing rather than going negative
    pub fn subtract(&self, other: &Amount) -> CoreResult<Amount> {
        Self::new(self.value - other.value)
    }

    /// Absolute difference between two amounts
    pub fn abs_diff(&self, other: &Amount) -> Amount {
        Amount {
            value: (self.value - other.value).abs(),
        }
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.value)
    }
}

/// Bill categories recognised by the matching rules
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillCategory {
    Utilities,
    Internet,
    Phone,
    Insurance,
    Rent,
    Subscription,
    Medical,
    Other(String),
}

impl std::fmt::Display for BillCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillCategory::Other(name) => write!(f, "{}", name),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A bill a user has put up for swapping
///
/// Immutable once referenced by an active swap; owner edits happen only
/// before that point and are the bill source's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    /// Unique bill identifier
    pub id: Uuid,
    /// Owner of the bill
    pub owner_id: String,
    /// Billing provider name (e.g. "ConEd", "Verizon")
    pub provider: String,
    /// Bill category
    pub category: BillCategory,
    /// Amount due
    pub amount: Amount,
    /// Due date
    pub due_date: NaiveDate,
    /// Opaque account reference at the provider
    pub account_ref: String,
    /// When the bill was uploaded
    pub created_at: DateTime<Utc>,
}

impl Bill {
    /// Create a new bill owned by `owner_id`
    pub fn new(
        owner_id: impl Into<String>,
        provider: impl Into<String>,
        category: BillCategory,
        amount: Amount,
        due_date: NaiveDate,
        account_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            provider: provider.into(),
            category,
            amount,
            due_date,
            account_ref: account_ref.into(),
            created_at: Utc::now(),
        }
    }

    /// Check whether the amount falls inside a global eligibility band
    pub fn within_band(&self, min: &Amount, max: &Amount) -> bool {
        self.amount >= *min && self.amount <= *max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_creation() {
        let amount = Amount::new(dec!(100.50)).unwrap();
        assert_eq!(amount.value(), dec!(100.50));
        assert!(amount.is_positive());
    }

    #[test]
    fn test_amount_negative_rejected() {
        let result = Amount::new(dec!(-10.00));
        assert!(matches!(result, Err(CoreError::InvalidAmount { .. })));
    }

    #[test]
    fn test_amount_from_cents() {
        let amount = Amount::from_cents(8500).unwrap();
        assert_eq!(amount.value(), dec!(85.00));
    }

    #[test]
    fn test_amount_subtract_underflow() {
        let a = Amount::new(dec!(5.00)).unwrap();
        let b = Amount::new(dec!(10.00)).unwrap();
        assert!(a.subtract(&b).is_err());
    }

    #[test]
    fn test_amount_abs_diff() {
        let a = Amount::new(dec!(85.00)).unwrap();
        let b = Amount::new(dec!(79.99)).unwrap();
        assert_eq!(a.abs_diff(&b).value(), dec!(5.01));
        assert_eq!(b.abs_diff(&a).value(), dec!(5.01));
    }

    #[test]
    fn test_bill_within_band() {
        let min = Amount::new(dec!(20.00)).unwrap();
        let max = Amount::new(dec!(200.00)).unwrap();
        let bill = Bill::new(
            "user_1",
            "ConEd",
            BillCategory::Utilities,
            Amount::new(dec!(85.00)).unwrap(),
            NaiveDate::from_ymd_opt(2026, 9, 15).unwrap(),
            "acct-42",
        );
        assert!(bill.within_band(&min, &max));

        let small = Bill::new(
            "user_1",
            "Spotify",
            BillCategory::Subscription,
            Amount::new(dec!(9.99)).unwrap(),
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            "acct-43",
        );
        assert!(!small.within_band(&min, &max));
    }
}
