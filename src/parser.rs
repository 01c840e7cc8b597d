//! Record parser: raw payment payloads into [`Transaction`] values.
//!
//! Parsing is total. A payload that is not a JSON object yields an empty
//! transaction, and each field that is missing or has the wrong type falls
//! back to its neutral default (`None`, or zero for the amount) without
//! affecting the others.

use crate::types::transaction::Transaction;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::debug;

/// Decodes payment payloads into structured transactions.
pub struct RecordParser;

impl RecordParser {
    /// Create a new record parser.
    pub fn new() -> Self {
        Self
    }

    /// Decode a payload. Never fails.
    pub fn parse(&self, payload: &[u8]) -> Transaction {
        let fields = match serde_json::from_slice::<Map<String, Value>>(payload) {
            Ok(fields) => fields,
            Err(e) => {
                debug!(error = %e, "Payload is not a JSON object, using defaults");
                return Transaction::default();
            }
        };

        Transaction {
            transaction_id: text_field(&fields, "transaction_id"),
            card_number_masked: text_field(&fields, "card_number_masked"),
            amount: amount_field(&fields),
            currency: text_field(&fields, "currency"),
            merchant_id: text_field(&fields, "merchant_id"),
            timestamp: fields.get("timestamp").and_then(Value::as_i64),
            status: text_field(&fields, "status"),
            region: text_field(&fields, "region"),
        }
    }

    /// Extract only the amount, zero when missing or malformed.
    pub fn extract_amount(&self, payload: &[u8]) -> Decimal {
        self.parse(payload).amount
    }
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new()
    }
}

fn text_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields.get(name).and_then(Value::as_str).map(str::to_string)
}

/// Numbers and numeric strings are accepted. Anything negative, unparsable
/// or outside the decimal range is zero.
fn amount_field(fields: &Map<String, Value>) -> Decimal {
    let parsed = match fields.get("amount") {
        Some(Value::Number(n)) => decimal_from_text(&n.to_string()),
        Some(Value::String(s)) => decimal_from_text(s.trim()),
        _ => None,
    };

    match parsed {
        Some(amount) if !amount.is_sign_negative() => amount,
        Some(amount) => {
            debug!(amount = %amount, "Negative amount, using zero");
            Decimal::ZERO
        }
        None => {
            debug!("Amount missing or malformed, using zero");
            Decimal::ZERO
        }
    }
}

// Large and tiny JSON floats print in exponent form.
fn decimal_from_text(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOW: &str = r#"{"transaction_id":"txn-low","card_number_masked":"****-****-****-1234","amount":50.00,"currency":"USD","merchant_id":"MERCH-001","timestamp":1700000000000,"status":"PENDING","region":"US-EAST"}"#;

    #[test]
    fn test_parse_full_payload() {
        let tx = RecordParser::new().parse(LOW.as_bytes());

        assert_eq!(tx.transaction_id.as_deref(), Some("txn-low"));
        assert_eq!(tx.card_number_masked.as_deref(), Some("****-****-****-1234"));
        assert_eq!(tx.amount, Decimal::from(50));
        assert_eq!(tx.currency.as_deref(), Some("USD"));
        assert_eq!(tx.merchant_id.as_deref(), Some("MERCH-001"));
        assert_eq!(tx.timestamp, Some(1_700_000_000_000));
        assert_eq!(tx.status.as_deref(), Some("PENDING"));
        assert_eq!(tx.region.as_deref(), Some("US-EAST"));
    }

    #[test]
    fn test_extract_amount() {
        let parser = RecordParser::new();
        let amount = parser.extract_amount(br#"{"amount":1234.56,"other":"field"}"#);
        assert_eq!(amount, Decimal::new(123456, 2));
    }

    #[test]
    fn test_missing_amount_is_zero() {
        let parser = RecordParser::new();
        assert_eq!(parser.extract_amount(br#"{"other":"field"}"#), Decimal::ZERO);
    }

    #[test]
    fn test_malformed_amount_is_zero() {
        let parser = RecordParser::new();
        assert_eq!(parser.extract_amount(br#"{"amount":"abc"}"#), Decimal::ZERO);
        assert_eq!(parser.extract_amount(br#"{"amount":null}"#), Decimal::ZERO);
        assert_eq!(parser.extract_amount(br#"{"amount":[1]}"#), Decimal::ZERO);
        assert_eq!(parser.extract_amount(br#"{"amount":-20.5}"#), Decimal::ZERO);
    }

    #[test]
    fn test_numeric_string_amount() {
        let parser = RecordParser::new();
        assert_eq!(
            parser.extract_amount(br#"{"amount":" 750.25 "}"#),
            Decimal::new(75025, 2)
        );
    }

    #[test]
    fn test_malformed_payload_yields_defaults() {
        let parser = RecordParser::new();
        assert_eq!(parser.parse(b"not json"), Transaction::default());
        assert_eq!(parser.parse(br#"{"amount":7500.00"#), Transaction::default());
        assert_eq!(parser.parse(b"[1,2,3]"), Transaction::default());
        assert_eq!(parser.parse(&[0xff, 0xfe]), Transaction::default());
    }

    #[test]
    fn test_wrong_typed_field_does_not_affect_others() {
        let tx = RecordParser::new().parse(br#"{"region":42,"amount":"oops","currency":"EUR"}"#);
        assert!(tx.region.is_none());
        assert_eq!(tx.amount, Decimal::ZERO);
        assert_eq!(tx.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn test_exponent_amount() {
        let parser = RecordParser::new();
        assert_eq!(parser.extract_amount(br#"{"amount":1.5e3}"#), Decimal::from(1500));
        assert_eq!(parser.extract_amount(br#"{"amount":2e16}"#), Decimal::from(20_000_000_000_000_000u64));
    }

    #[test]
    fn test_fractional_precision_survives() {
        let tx = RecordParser::new().parse(br#"{"amount":500.0000000001}"#);
        assert!(!tx.amount.fract().is_zero());
    }
}
