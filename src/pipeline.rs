//! Per-record pipeline: parse, score, enrich, dispatch.
//!
//! Every stage is a pure function of the record, so one `FraudPipeline` can
//! be shared by all workers without locking.

use crate::config::{AppConfig, MalformedPolicy, ScoringConfig};
use crate::dispatcher::{BranchDispatcher, Classification};
use crate::enricher::Enricher;
use crate::error::{PipelineError, Result};
use crate::parser::RecordParser;
use crate::scorer::{Assessment, RiskScorer};
use crate::types::decision::{Destination, RoutedRecord};
use crate::types::transaction::Transaction;
use bytes::Bytes;
use tracing::{debug, warn};

/// A record that went through all four stages
#[derive(Debug, Clone)]
pub struct Processed {
    pub transaction: Transaction,
    pub assessment: Assessment,
    pub classification: Classification,
    pub record: RoutedRecord,
}

/// What became of one input record
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Scored, enriched and routed to flagged or approved
    Routed(Processed),
    /// Rejected by the enricher; `record` is set unless the policy drops it
    Malformed {
        key: String,
        reason: String,
        record: Option<RoutedRecord>,
    },
}

impl Outcome {
    /// Record to deliver, if any
    pub fn record(&self) -> Option<&RoutedRecord> {
        match self {
            Outcome::Routed(processed) => Some(&processed.record),
            Outcome::Malformed { record, .. } => record.as_ref(),
        }
    }
}

/// The four pipeline stages with their configuration fixed at construction
pub struct FraudPipeline {
    parser: RecordParser,
    scorer: RiskScorer,
    enricher: Enricher,
    dispatcher: BranchDispatcher,
    malformed_policy: MalformedPolicy,
}

impl FraudPipeline {
    pub fn new(scoring: ScoringConfig, malformed_policy: MalformedPolicy) -> Self {
        Self {
            parser: RecordParser::new(),
            dispatcher: BranchDispatcher::from_config(&scoring),
            scorer: RiskScorer::new(scoring),
            enricher: Enricher::new(),
            malformed_policy,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.scoring.clone(), config.pipeline.malformed_policy)
    }

    pub fn malformed_policy(&self) -> MalformedPolicy {
        self.malformed_policy
    }

    /// Run the four stages. `MalformedPayload` is the only error returned.
    pub fn process(&self, key: &str, payload: &[u8]) -> Result<Processed> {
        let transaction = self.parser.parse(payload);
        let assessment = self.scorer.assess(&transaction);

        if self.scorer.exceeds_alert_threshold(assessment.score) {
            warn!(
                transaction_id = %key,
                amount = %transaction.amount,
                risk_score = %assessment.score,
                rules = ?assessment.triggered_names(),
                "High risk transaction"
            );
        }

        let enriched = self.enricher.enrich(payload, assessment.score)?;
        let classification = self.dispatcher.classify(key, &enriched);

        debug!(
            transaction_id = %key,
            risk_score = %assessment.score,
            decision = %classification.decision,
            "Record classified"
        );

        let record = RoutedRecord::new(key, classification.decision.destination(), enriched);
        Ok(Processed {
            transaction,
            assessment,
            classification,
            record,
        })
    }

    /// Run the stages and apply the malformed-payload policy
    pub fn handle(&self, key: &str, payload: &Bytes) -> Outcome {
        match self.process(key, payload) {
            Ok(processed) => Outcome::Routed(processed),
            Err(PipelineError::MalformedPayload { reason }) => {
                let record = match self.malformed_policy {
                    MalformedPolicy::Drop => None,
                    MalformedPolicy::DeadLetter => Some(RoutedRecord::new(
                        key,
                        Destination::DeadLetter,
                        payload.clone(),
                    )),
                    MalformedPolicy::PassThrough => Some(RoutedRecord::new(
                        key,
                        Destination::Approved,
                        payload.clone(),
                    )),
                };
                warn!(
                    transaction_id = %key,
                    reason = %reason,
                    policy = ?self.malformed_policy,
                    "Malformed payload"
                );
                Outcome::Malformed {
                    key: key.to_string(),
                    reason,
                    record,
                }
            }
            Err(e) => {
                // Stages only fail with MalformedPayload; treat anything else the same way.
                warn!(transaction_id = %key, error = %e, "Unexpected stage error, dropping record");
                Outcome::Malformed {
                    key: key.to_string(),
                    reason: e.to_string(),
                    record: None,
                }
            }
        }
    }
}
