//! Payment Fraud Streams - Main Entry Point
//!
//! Consumes payment events from NATS, scores them, and routes each enriched
//! record to the flagged or approved subject. Records are spread over
//! partition workers by key; Ctrl-C or SIGTERM drains in-flight work before
//! exit.

use anyhow::{Context, Result};
use futures::StreamExt;
use payment_fraud_streams::{
    config::{app_env, AppConfig, LoggingConfig},
    consumer::PaymentConsumer,
    metrics::{MetricsReporter, PipelineMetrics},
    pipeline::FraudPipeline,
    producer::NatsSinks,
    router::RouteTable,
    worker::{run_until_shutdown, PartitionedWorkers, Stopped},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_tracing(&config.logging)?;

    info!("Starting Payment Fraud Streams");
    info!(
        environment = %app_env(),
        nats_url = %config.nats.url,
        input_subject = %config.nats.input_subject,
        "Configuration resolved"
    );
    info!(
        "Scoring: high_value>{} very_high_value>{} region={} round_floor>{} alert>{}",
        config.scoring.high_value_threshold,
        config.scoring.very_high_value_threshold,
        config.scoring.high_risk_region,
        config.scoring.round_amount_floor,
        config.scoring.alert_threshold
    );

    let routes = RouteTable::from_config(&config.nats);
    info!("Topology:\n{}", routes.describe(&config.nats.input_subject));

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = PaymentConsumer::new(client.clone(), &config.nats);
    let sinks = Arc::new(NatsSinks::new(client.clone(), &config.nats));
    let pipeline = Arc::new(FraudPipeline::from_config(&config));

    info!(
        workers = config.pipeline.workers,
        malformed_policy = ?config.pipeline.malformed_policy,
        "Starting partition workers"
    );
    let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();
    let workers = PartitionedWorkers::spawn(
        config.pipeline.workers,
        config.pipeline.queue_capacity,
        pipeline,
        sinks,
        metrics.clone(),
        fatal_tx,
    );

    // Start metrics reporter
    let reporter = tokio::spawn(
        MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs).start(),
    );

    let mut subscription = consumer.subscribe().await?;
    let input = subscription
        .by_ref()
        .map(|message| (consumer.record_key(&message), message.payload));

    let stopped = run_until_shutdown(input, &workers, shutdown_signal(), &mut fatal_rx).await;

    // Stop admitting, then let queued records finish
    info!("Pipeline shutting down...");
    if let Err(e) = subscription.unsubscribe().await {
        warn!(error = %e, "Failed to unsubscribe");
    }
    workers.shutdown().await;
    if let Err(e) = client.flush().await {
        warn!(error = %e, "Failed to flush NATS client");
    }
    reporter.abort();
    metrics.print_summary();

    match stopped {
        Stopped::Fatal(e) => {
            error!(error = %e, "Pipeline stopped on fatal error");
            Err(e.into())
        }
        Stopped::Signal | Stopped::InputClosed => {
            info!("Payment Fraud Streams stopped");
            Ok(())
        }
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("payment_fraud_streams={}", logging.level)))
        .context("Invalid log level")?;

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received"),
        _ = terminate => info!("SIGTERM received"),
    }
}
