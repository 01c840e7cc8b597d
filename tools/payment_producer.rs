//! Demo Payment Producer
//!
//! Generates masked payment events and publishes them to NATS, keyed by
//! transaction id, for exercising the fraud routing pipeline.
//!
//! Usage: payment-producer [nats_url] [subject] [count] [fraud_rate] [delay_ms]

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_MAX_RECORDS: u64 = 250;
const KEY_HEADER: &str = "Transaction-Id";
const REGIONS: [&str; 4] = ["US-EAST", "US-WEST", "EU-WEST", "AP-SOUTH"];
const MERCHANTS: [&str; 4] = ["MERCH-001", "MERCH-002", "MERCH-003", "MERCH-004"];

/// Payment event in the pipeline's input format
#[derive(Debug, Clone, Serialize)]
struct PaymentEvent {
    transaction_id: String,
    card_number_masked: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    amount: Decimal,
    currency: String,
    merchant_id: String,
    timestamp: i64,
    status: String,
    region: String,
}

/// Payment generator for demo traffic
struct PaymentGenerator {
    rng: rand::rngs::ThreadRng,
    sequence: u64,
}

impl PaymentGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            sequence: 0,
        }
    }

    /// Regular payment: amount and region cycle with the sequence number
    fn generate_regular(&mut self) -> PaymentEvent {
        let seq = self.next_sequence();
        // 10.00 + (seq % 500) * 1.37, two places
        let amount = (Decimal::new(1000, 2) + Decimal::from(seq % 500) * Decimal::new(137, 2))
            .round_dp(2);

        self.event(seq, amount, REGIONS[(seq % REGIONS.len() as u64) as usize])
    }

    /// Suspicious payment: large whole amount from the high-risk region
    fn generate_suspicious(&mut self) -> PaymentEvent {
        let seq = self.next_sequence();
        let amount = Decimal::from(self.rng.gen_range(5_001..10_000u32));

        self.event(seq, amount, "AP-SOUTH")
    }

    fn next_sequence(&mut self) -> u64 {
        let seq = self.sequence;
        self.sequence += 1;
        seq
    }

    fn event(&mut self, seq: u64, amount: Decimal, region: &str) -> PaymentEvent {
        PaymentEvent {
            transaction_id: uuid::Uuid::new_v4().to_string(),
            card_number_masked: format!("****-****-****-{:04}", (seq % 9999) + 1),
            amount,
            currency: "USD".to_string(),
            merchant_id: MERCHANTS[(seq % MERCHANTS.len() as u64) as usize].to_string(),
            timestamp: Utc::now().timestamp(),
            status: "PENDING".to_string(),
            region: region.to_string(),
        }
    }
}

fn resolve_max_records() -> u64 {
    std::env::var("DEMO_MAX_RECORDS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_MAX_RECORDS)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("payment_producer=info".parse()?),
        )
        .init();

    info!("Starting Demo Payment Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("payments");
    let count: u64 = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(resolve_max_records);
    let fraud_rate: f64 = args
        .get(4)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.1_f64)
        .clamp(0.0, 1.0);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(500);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms).await;
        }
    };

    let mut generator = PaymentGenerator::new();
    let mut rng = rand::thread_rng();
    let mut regular_count = 0;
    let mut suspicious_count = 0;

    info!("Starting to publish {} payments...", count);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    for i in 0..count {
        let payment = if rng.gen_bool(fraud_rate) {
            suspicious_count += 1;
            generator.generate_suspicious()
        } else {
            regular_count += 1;
            generator.generate_regular()
        };

        let payload = serde_json::to_vec(&payment)?;
        let mut headers = async_nats::HeaderMap::new();
        headers.insert(KEY_HEADER, payment.transaction_id.as_str());

        client
            .publish_with_headers(subject.to_string(), headers, payload.into())
            .await?;

        info!(
            transaction_id = %payment.transaction_id,
            amount = %payment.amount,
            region = %payment.region,
            "Sent payment {}/{}",
            i + 1,
            count
        );

        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
        }
    }

    client.flush().await?;

    info!(
        "Completed! Published {} payments ({} regular, {} suspicious)",
        regular_count + suspicious_count,
        regular_count,
        suspicious_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, fraud_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = PaymentGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let payment = if rng.gen_bool(fraud_rate) {
            generator.generate_suspicious()
        } else {
            generator.generate_regular()
        };

        let json = serde_json::to_string_pretty(&payment)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample payment {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
