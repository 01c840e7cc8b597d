//! End-to-end tests: payloads through the pipeline and partition workers
//! into an in-memory sink.

use bytes::Bytes;
use payment_fraud_streams::{
    config::{AppConfig, MalformedPolicy, ScoringConfig},
    metrics::PipelineMetrics,
    BranchDecision, Destination, FraudPipeline, MemorySink, PartitionedWorkers, RecordParser,
    RiskScorer,
};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;

fn payment(id: &str, amount: &str, region: &str) -> String {
    format!(
        "{{\"transaction_id\":\"{id}\",\
         \"card_number_masked\":\"****-****-****-1234\",\
         \"amount\":{amount},\
         \"currency\":\"USD\",\
         \"merchant_id\":\"MERCH-001\",\
         \"timestamp\":1700000000000,\
         \"status\":\"PENDING\",\
         \"region\":\"{region}\"}}"
    )
}

fn object(text: &str) -> Map<String, Value> {
    serde_json::from_str(text).unwrap()
}

async fn route_all(
    records: Vec<(String, String)>,
    policy: MalformedPolicy,
) -> (Arc<MemorySink>, Arc<PipelineMetrics>) {
    let pipeline = Arc::new(FraudPipeline::new(ScoringConfig::default(), policy));
    let sink = Arc::new(MemorySink::new());
    let metrics = Arc::new(PipelineMetrics::new());
    let (fatal_tx, _fatal_rx) = mpsc::unbounded_channel();
    let workers = PartitionedWorkers::spawn(4, 16, pipeline, sink.clone(), metrics.clone(), fatal_tx);

    for (key, payload) in records {
        workers.submit(key, Bytes::from(payload)).await.unwrap();
    }
    workers.shutdown().await;
    (sink, metrics)
}

#[tokio::test]
async fn test_high_value_high_risk_region_is_flagged() {
    let input = payment("txn-fraud", "7500.00", "AP-SOUTH");
    let (sink, _) = route_all(
        vec![("txn-fraud".to_string(), input.clone())],
        MalformedPolicy::DeadLetter,
    )
    .await;

    assert!(sink.delivered_to(Destination::Approved).is_empty());
    let flagged = sink.delivered_to(Destination::Flagged);
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].key, "txn-fraud");

    let enriched = flagged[0].payload_str().unwrap();
    assert!(enriched.contains("\"risk_score\":0.90"));
    assert_eq!(object(enriched)["risk_score"].to_string(), "0.90");
}

#[tokio::test]
async fn test_low_value_is_approved() {
    let input = payment("txn-low", "50.00", "US-EAST");
    let (sink, metrics) = route_all(
        vec![("txn-low".to_string(), input)],
        MalformedPolicy::DeadLetter,
    )
    .await;

    assert!(sink.delivered_to(Destination::Flagged).is_empty());
    let approved = sink.delivered_to(Destination::Approved);
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].key, "txn-low");

    let fields = object(approved[0].payload_str().unwrap());
    let score = Decimal::from_str(&fields["risk_score"].to_string()).unwrap();
    assert!(score < Decimal::new(7, 1));
    assert_eq!(metrics.approved.load(Ordering::Relaxed), 1);
}

#[test]
fn test_enrichment_round_trip() {
    let pipeline = FraudPipeline::new(ScoringConfig::default(), MalformedPolicy::Drop);
    let inputs = [
        payment("txn-1", "50.00", "US-EAST"),
        payment("txn-2", "7500.00", "AP-SOUTH"),
        payment("txn-3", "999.99", "EU-WEST"),
        r#"{"nested":{"a":[1,2,{"b":null}]},"flag":true,"amount":"12.00"}"#.to_string(),
        "{}".to_string(),
    ];

    for input in inputs {
        let processed = pipeline.process("k", input.as_bytes()).unwrap();
        let before = object(&input);
        let after = object(processed.record.payload_str().unwrap());

        assert_eq!(after.len(), before.len() + 1, "input {}", input);
        for (key, value) in &before {
            assert_eq!(after.get(key), Some(value), "field {} of {}", key, input);
        }
        assert!(after.contains_key("risk_score"));
    }
}

#[test]
fn test_scoring_is_idempotent() {
    let parser = RecordParser::new();
    let scorer = RiskScorer::default();
    let input = payment("txn-1", "6000", "AP-SOUTH");

    let first = scorer.score(&parser.parse(input.as_bytes()));
    let second = scorer.score(&parser.parse(input.as_bytes()));
    assert_eq!(first, second);
}

#[test]
fn test_non_round_amounts_up_to_high_value_are_approved() {
    let pipeline = FraudPipeline::new(ScoringConfig::default(), MalformedPolicy::Drop);
    for cents in (1..=100_000i64).step_by(997) {
        let amount = Decimal::new(cents, 2);
        let input = payment("txn", &amount.to_string(), "US-WEST");
        let processed = pipeline.process("txn", input.as_bytes()).unwrap();
        assert_eq!(
            processed.classification.decision,
            BranchDecision::Approved,
            "amount {}",
            amount
        );
    }
}

#[test]
fn test_score_of_exactly_threshold_is_approved() {
    // 0.4 + 0.3 with an ordinary region and a fractional amount
    let pipeline = FraudPipeline::new(ScoringConfig::default(), MalformedPolicy::Drop);
    let processed = pipeline
        .process("txn", payment("txn", "6000.50", "US-EAST").as_bytes())
        .unwrap();

    assert_eq!(processed.assessment.score.value(), Decimal::new(7, 1));
    assert!(processed.record.payload_str().unwrap().contains("\"risk_score\":0.70"));
    assert_eq!(processed.classification.decision, BranchDecision::Approved);
}

#[test]
fn test_missing_amount_contributes_nothing() {
    let pipeline = FraudPipeline::new(ScoringConfig::default(), MalformedPolicy::Drop);
    let processed = pipeline
        .process("txn", br#"{"transaction_id":"txn","region":"US-EAST"}"#)
        .unwrap();

    assert_eq!(processed.transaction.amount, Decimal::ZERO);
    assert!(processed.assessment.triggered.is_empty());
    assert_eq!(processed.record.destination, Destination::Approved);
}

#[tokio::test]
async fn test_mixed_stream_with_malformed_records() {
    let records = vec![
        ("txn-1".to_string(), payment("txn-1", "7500.00", "AP-SOUTH")),
        ("txn-2".to_string(), "{\"amount\":".to_string()),
        ("txn-3".to_string(), payment("txn-3", "20.00", "EU-WEST")),
        ("txn-4".to_string(), "[]".to_string()),
    ];

    let (sink, metrics) = route_all(records.clone(), MalformedPolicy::DeadLetter).await;
    assert_eq!(sink.delivered_to(Destination::Flagged).len(), 1);
    assert_eq!(sink.delivered_to(Destination::Approved).len(), 1);
    let dead = sink.delivered_to(Destination::DeadLetter);
    assert_eq!(dead.len(), 2);
    assert!(dead.iter().any(|r| r.key == "txn-2" && r.payload_str() == Some("{\"amount\":")));
    assert_eq!(metrics.malformed.load(Ordering::Relaxed), 2);

    let (sink, _) = route_all(records.clone(), MalformedPolicy::Drop).await;
    assert_eq!(sink.records().len(), 2);

    let (sink, _) = route_all(records, MalformedPolicy::PassThrough).await;
    assert_eq!(sink.delivered_to(Destination::Approved).len(), 3);
    assert!(sink.delivered_to(Destination::DeadLetter).is_empty());
}

#[test]
fn test_pipeline_from_shipped_config() {
    let config = AppConfig::load_from_path("config/default.toml").unwrap();
    assert_eq!(config.scoring, ScoringConfig::default());

    let pipeline = FraudPipeline::from_config(&config);
    assert_eq!(pipeline.malformed_policy(), MalformedPolicy::DeadLetter);
    let processed = pipeline
        .process("txn-fraud", payment("txn-fraud", "7500.00", "AP-SOUTH").as_bytes())
        .unwrap();
    assert_eq!(processed.record.destination, Destination::Flagged);
}

#[test]
fn test_round_rule_follows_written_amount() {
    let pipeline = FraudPipeline::new(ScoringConfig::default(), MalformedPolicy::Drop);
    let score_of = |amount: &str| {
        let processed = pipeline
            .process("txn", payment("txn", amount, "AP-SOUTH").as_bytes())
            .unwrap();
        object(processed.record.payload_str().unwrap())["risk_score"].to_string()
    };

    assert_eq!(score_of("7500.00"), "0.90");
    assert_eq!(score_of("7500"), "1.00");
    assert_eq!(score_of("600.00"), "0.20");
    assert_eq!(score_of("600"), "0.35");
}
