//! Routing outcomes for enriched records

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of classifying an enriched record against the alert threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchDecision {
    Flagged,
    Approved,
}

impl BranchDecision {
    /// Output destination for this decision
    pub fn destination(self) -> Destination {
        match self {
            BranchDecision::Flagged => Destination::Flagged,
            BranchDecision::Approved => Destination::Approved,
        }
    }
}

impl fmt::Display for BranchDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchDecision::Flagged => write!(f, "flagged"),
            BranchDecision::Approved => write!(f, "approved"),
        }
    }
}

/// Named output channel a record is delivered to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Flagged,
    Approved,
    /// Malformed records under the dead-letter policy
    DeadLetter,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Flagged => write!(f, "flagged"),
            Destination::Approved => write!(f, "approved"),
            Destination::DeadLetter => write!(f, "dead_letter"),
        }
    }
}

/// Key/value pair ready for delivery, keyed exactly as it arrived
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedRecord {
    pub key: String,
    pub destination: Destination,
    pub payload: Bytes,
}

impl RoutedRecord {
    pub fn new(key: impl Into<String>, destination: Destination, payload: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            destination,
            payload: payload.into(),
        }
    }

    /// Payload as text, if it is UTF-8
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_destination() {
        assert_eq!(BranchDecision::Flagged.destination(), Destination::Flagged);
        assert_eq!(BranchDecision::Approved.destination(), Destination::Approved);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(BranchDecision::Flagged.to_string(), "flagged");
        assert_eq!(Destination::DeadLetter.to_string(), "dead_letter");
    }

    #[test]
    fn test_routed_record_payload_str() {
        let record = RoutedRecord::new("txn-1", Destination::Approved, "{\"a\":1}");
        assert_eq!(record.payload_str(), Some("{\"a\":1}"));
    }
}
