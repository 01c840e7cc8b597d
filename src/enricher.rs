//! Append-only enrichment of payloads with their risk score

use crate::error::{PipelineError, Result};
use crate::scorer::RiskScore;
use serde_json::{Map, Value};

/// Field added to every enriched payload
pub const RISK_SCORE_FIELD: &str = "risk_score";

/// Attaches `risk_score` to a JSON object payload.
///
/// The original text is kept byte for byte up to its closing brace and the
/// score is appended as the last member, so no existing field is reordered,
/// dropped or reformatted.
pub struct Enricher;

impl Enricher {
    pub fn new() -> Self {
        Self
    }

    /// Return the payload with `"risk_score":<score>` appended, two decimals.
    ///
    /// Fails with [`PipelineError::MalformedPayload`] when the payload is not
    /// a UTF-8 JSON object.
    pub fn enrich(&self, payload: &[u8], score: RiskScore) -> Result<String> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| PipelineError::malformed(format!("payload is not UTF-8: {}", e)))?;

        let fields: Map<String, Value> = serde_json::from_str(text)
            .map_err(|e| PipelineError::malformed(format!("payload is not a JSON object: {}", e)))?;

        // A parsed object always ends with '}' once trailing whitespace is gone.
        let body = text.trim_end();
        let head = body
            .strip_suffix('}')
            .ok_or_else(|| PipelineError::malformed("payload has no closing brace"))?;
        let separator = if fields.is_empty() { "" } else { "," };

        Ok(format!(
            "{}{}\"{}\":{}}}",
            head, separator, RISK_SCORE_FIELD, score
        ))
    }
}

impl Default for Enricher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    const FRAUD: &str = r#"{"transaction_id":"txn-fraud","card_number_masked":"****-****-****-9999","amount":7500.00,"currency":"USD","merchant_id":"MERCH-002","timestamp":1700000000000,"status":"PENDING","region":"AP-SOUTH"}"#;

    fn score(tenths: i64) -> RiskScore {
        RiskScore::new(Decimal::new(tenths, 1))
    }

    #[test]
    fn test_appends_score_as_last_field() {
        let enriched = Enricher::new().enrich(FRAUD.as_bytes(), score(9)).unwrap();

        assert!(enriched.starts_with(&FRAUD[..FRAUD.len() - 1]));
        assert!(enriched.ends_with(r#","risk_score":0.90}"#));
    }

    #[test]
    fn test_original_fields_survive_unchanged() {
        let enriched = Enricher::new().enrich(FRAUD.as_bytes(), score(9)).unwrap();

        let before: Map<String, Value> = serde_json::from_str(FRAUD).unwrap();
        let after: Map<String, Value> = serde_json::from_str(&enriched).unwrap();

        assert_eq!(after.len(), before.len() + 1);
        for (key, value) in &before {
            assert_eq!(after.get(key), Some(value), "field {}", key);
        }
        // The amount keeps its original text, trailing zeros included.
        assert!(enriched.contains(r#""amount":7500.00,"#));
    }

    #[test]
    fn test_empty_object() {
        let enriched = Enricher::new().enrich(b"{}", RiskScore::ZERO).unwrap();
        assert_eq!(enriched, r#"{"risk_score":0.00}"#);
    }

    #[test]
    fn test_whitespace_and_nesting_preserved() {
        let payload = "{ \"meta\": {\"tags\": [\"a\", \"b\"]},\n  \"amount\": 12.5\n}\n";
        let enriched = Enricher::new().enrich(payload.as_bytes(), RiskScore::MAX).unwrap();

        assert!(enriched.starts_with("{ \"meta\": {\"tags\": [\"a\", \"b\"]},\n  \"amount\": 12.5\n"));
        let after: Map<String, Value> = serde_json::from_str(&enriched).unwrap();
        assert_eq!(after["risk_score"].to_string(), "1.00");
    }

    #[test]
    fn test_rejects_non_object_payloads() {
        let enricher = Enricher::new();
        let payloads: [&[u8]; 6] = [b"[1,2]", b"\"text\"", b"42", b"not json", b"{\"amount\":1", b""];
        for payload in payloads {
            assert!(matches!(
                enricher.enrich(payload, RiskScore::ZERO),
                Err(PipelineError::MalformedPayload { .. })
            ));
        }
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let result = Enricher::new().enrich(&[b'{', 0xff, b'}'], RiskScore::ZERO);
        assert!(matches!(result, Err(PipelineError::MalformedPayload { .. })));
    }
}
