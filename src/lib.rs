//! Payment Fraud Streams
//!
//! Real-time risk scoring and routing for payment events. Each record is
//! parsed, scored with an additive rule heuristic, enriched with its
//! `risk_score` and routed to a flagged or approved subject.

pub mod config;
pub mod consumer;
pub mod dispatcher;
pub mod enricher;
pub mod error;
pub mod metrics;
pub mod parser;
pub mod pipeline;
pub mod producer;
pub mod router;
pub mod scorer;
pub mod types;
pub mod worker;

pub use config::{AppConfig, MalformedPolicy, ScoringConfig};
pub use consumer::PaymentConsumer;
pub use dispatcher::{BranchDispatcher, Classification};
pub use enricher::Enricher;
pub use error::{PipelineError, Result};
pub use parser::RecordParser;
pub use pipeline::{FraudPipeline, Outcome};
pub use producer::{NatsSinks, SubjectProducer};
pub use router::{MemorySink, RecordSink, RouteTable};
pub use scorer::{RiskScore, RiskScorer};
pub use types::{BranchDecision, Destination, RoutedRecord, Transaction};
pub use worker::PartitionedWorkers;
