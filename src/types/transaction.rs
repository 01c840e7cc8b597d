//! Payment transaction as seen by the scoring pipeline

use rust_decimal::Decimal;
use serde::Serialize;

/// Structured view of a payment event payload.
///
/// Every field is optional on the wire; fields that are missing or of the
/// wrong type are `None`, and a missing or malformed amount is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transaction {
    /// Unique transaction identifier, also used as the partition key
    pub transaction_id: Option<String>,

    /// Card number, redacted upstream (`****-****-****-1234`)
    pub card_number_masked: Option<String>,

    /// Non-negative payment amount
    pub amount: Decimal,

    /// ISO currency code
    pub currency: Option<String>,

    /// Merchant identifier
    pub merchant_id: Option<String>,

    /// Epoch-based event time
    pub timestamp: Option<i64>,

    /// Payment status, informational only
    pub status: Option<String>,

    /// Geographic region code (`US-EAST`, `AP-SOUTH`, ...)
    pub region: Option<String>,
}

impl Transaction {
    /// Create a transaction with an id and amount
    pub fn new(transaction_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            transaction_id: Some(transaction_id.into()),
            amount,
            ..Self::default()
        }
    }

    /// Set the region code
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}
