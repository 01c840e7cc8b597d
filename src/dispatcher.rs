//! Threshold classification of enriched records

use crate::config::ScoringConfig;
use crate::enricher::RISK_SCORE_FIELD;
use crate::types::decision::BranchDecision;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::warn;

/// Result of classifying one enriched record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub decision: BranchDecision,
    /// Score read back from the payload; `None` marks a routing anomaly
    pub score: Option<Decimal>,
}

impl Classification {
    /// The payload carried no valid score and was approved by default
    pub fn is_anomaly(&self) -> bool {
        self.score.is_none()
    }
}

/// Routes enriched records to flagged or approved.
///
/// A record is flagged only when it carries a valid score strictly above the
/// alert threshold. Anything else, including a record whose score cannot be
/// read, is approved.
#[derive(Debug, Clone)]
pub struct BranchDispatcher {
    alert_threshold: Decimal,
}

impl BranchDispatcher {
    pub fn new(alert_threshold: Decimal) -> Self {
        Self { alert_threshold }
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self::new(config.alert_threshold)
    }

    /// Pure decision on a known score
    pub fn decide(&self, score: Decimal) -> BranchDecision {
        if score > self.alert_threshold {
            BranchDecision::Flagged
        } else {
            BranchDecision::Approved
        }
    }

    /// Classify an enriched payload by the score it carries
    pub fn classify(&self, key: &str, enriched: &str) -> Classification {
        match extract_score(enriched) {
            Ok(score) => Classification {
                decision: self.decide(score),
                score: Some(score),
            },
            Err(reason) => {
                warn!(
                    transaction_id = %key,
                    reason = %reason,
                    "Routing anomaly: no valid risk score, approving by default"
                );
                Classification {
                    decision: BranchDecision::Approved,
                    score: None,
                }
            }
        }
    }
}

fn extract_score(enriched: &str) -> Result<Decimal, String> {
    let fields: Map<String, Value> =
        serde_json::from_str(enriched).map_err(|e| format!("unreadable payload: {}", e))?;

    let score = match fields.get(RISK_SCORE_FIELD) {
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .map_err(|e| format!("unreadable {}: {}", RISK_SCORE_FIELD, e))?,
        Some(other) => return Err(format!("{} is not a number: {}", RISK_SCORE_FIELD, other)),
        None => return Err(format!("{} is missing", RISK_SCORE_FIELD)),
    };

    if score < Decimal::ZERO || score > Decimal::ONE {
        return Err(format!("{} {} is outside [0, 1]", RISK_SCORE_FIELD, score));
    }
    Ok(score)
}
