//! Configuration management for the fraud routing pipeline
//!
//! Values are resolved once at startup from layered sources and then
//! shared read-only for the lifetime of the process.

use crate::error::PipelineError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directory holding `default.toml` and the per-environment overlays
pub const CONFIG_DIR: &str = "config";

/// Prefix for structured environment overrides (`FRAUD__SCORING__ALERT_THRESHOLD`)
pub const ENV_PREFIX: &str = "FRAUD";

/// What to do with a record whose payload cannot be enriched
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Log, count and discard the record
    Drop,
    /// Forward the original bytes to the dead-letter subject
    #[default]
    DeadLetter,
    /// Forward the original bytes unchanged to the approved subject
    PassThrough,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub scoring: ScoringConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming payment events
    pub input_subject: String,
    /// Subject for records routed as flagged
    pub flagged_subject: String,
    /// Subject for records routed as approved
    pub approved_subject: String,
    /// Subject for malformed records under the dead-letter policy
    pub dead_letter_subject: String,
    /// Header carrying the record key
    #[serde(default = "default_key_header")]
    pub key_header: String,
}

fn default_key_header() -> String {
    "Transaction-Id".to_string()
}

/// Rule weights of the additive risk heuristic
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuleWeights {
    pub high_value: Decimal,
    pub very_high_value: Decimal,
    pub high_risk_region: Decimal,
    pub round_amount: Decimal,
}

impl Default for RuleWeights {
    fn default() -> Self {
        Self {
            high_value: Decimal::new(4, 1),
            very_high_value: Decimal::new(3, 1),
            high_risk_region: Decimal::new(2, 1),
            round_amount: Decimal::new(15, 2),
        }
    }
}

/// Thresholds and weights shared by the scorer and the dispatcher
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoringConfig {
    /// Amounts strictly above this accrue the high-value weight
    pub high_value_threshold: Decimal,
    /// Amounts strictly above this also accrue the very-high-value weight
    pub very_high_value_threshold: Decimal,
    /// Region code that accrues the region weight
    pub high_risk_region: String,
    /// Whole amounts strictly above this accrue the round-amount weight
    pub round_amount_floor: Decimal,
    /// Scores strictly above this are flagged
    pub alert_threshold: Decimal,
    #[serde(default)]
    pub weights: RuleWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            high_value_threshold: Decimal::new(100_000, 2),
            very_high_value_threshold: Decimal::new(500_000, 2),
            high_risk_region: "AP-SOUTH".to_string(),
            round_amount_floor: Decimal::from(500),
            alert_threshold: Decimal::new(7, 1),
            weights: RuleWeights::default(),
        }
    }
}

impl ScoringConfig {
    /// Reject values the heuristic cannot work with.
    pub fn validate(&self) -> crate::error::Result<()> {
        let weights = [
            ("high_value", self.weights.high_value),
            ("very_high_value", self.weights.very_high_value),
            ("high_risk_region", self.weights.high_risk_region),
            ("round_amount", self.weights.round_amount),
        ];
        if let Some((name, _)) = weights.iter().find(|(_, w)| w.is_sign_negative()) {
            return Err(PipelineError::InvalidConfig(format!(
                "weight {} must not be negative",
                name
            )));
        }

        if self.high_value_threshold.is_sign_negative()
            || self.round_amount_floor.is_sign_negative()
        {
            return Err(PipelineError::InvalidConfig(
                "amount thresholds must not be negative".to_string(),
            ));
        }

        if self.very_high_value_threshold < self.high_value_threshold {
            return Err(PipelineError::InvalidConfig(format!(
                "very_high_value_threshold ({}) is below high_value_threshold ({})",
                self.very_high_value_threshold, self.high_value_threshold
            )));
        }

        if self.alert_threshold < Decimal::ZERO || self.alert_threshold > Decimal::ONE {
            return Err(PipelineError::InvalidConfig(format!(
                "alert_threshold {} is outside [0, 1]",
                self.alert_threshold
            )));
        }

        Ok(())
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of partition workers
    pub workers: usize,
    /// Bounded queue length per worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Handling of payloads the enricher rejects
    #[serde(default)]
    pub malformed_policy: MalformedPolicy,
    /// Interval between metrics summaries
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_metrics_interval() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

/// Deployment environment selecting the `{APP_ENV}.toml` overlay
pub fn app_env() -> String {
    std::env::var("APP_ENV")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "dev".to_string())
}

impl AppConfig {
    /// Resolve configuration from `config/`, `APP_ENV`, `CONFIG_FILE` and the process environment
    pub fn load() -> Result<Self> {
        let external = std::env::var("CONFIG_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self::load_layered(Path::new(CONFIG_DIR), &app_env(), external.as_deref(), None)
    }

    /// Load configuration from a single file
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        Self::finish(config)
    }

    /// Layer `default.toml`, `{app_env}.toml`, an external file and environment overrides.
    ///
    /// `vars` replaces the process environment when given.
    pub fn load_layered(
        dir: &Path,
        app_env: &str,
        external: Option<&Path>,
        vars: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let lookup = |name: &str| {
            let value = match &vars {
                Some(map) => map.get(name).cloned(),
                None => std::env::var(name).ok(),
            };
            value.filter(|v| !v.trim().is_empty())
        };

        let nats_url = lookup("NATS_URL");
        let workers = lookup("PIPELINE_WORKERS");

        let mut builder = Config::builder()
            .add_source(File::from(dir.join("default.toml")))
            .add_source(File::from(dir.join(format!("{}.toml", app_env))).required(false));

        if let Some(path) = external {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .source(vars),
        );

        let config = builder
            .set_override_option("nats.url", nats_url)
            .context("Failed to apply NATS_URL")?
            .set_override_option("pipeline.workers", workers)
            .context("Failed to apply PIPELINE_WORKERS")?
            .build()
            .context("Failed to build configuration")?;

        Self::finish(config)
    }

    fn finish(config: Config) -> Result<Self> {
        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        if self.pipeline.workers == 0 {
            anyhow::bail!(PipelineError::InvalidConfig(
                "pipeline.workers must be at least 1".to_string()
            ));
        }
        if self.pipeline.queue_capacity == 0 {
            anyhow::bail!(PipelineError::InvalidConfig(
                "pipeline.queue_capacity must be at least 1".to_string()
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                input_subject: "payments".to_string(),
                flagged_subject: "fraud-alerts".to_string(),
                approved_subject: "approved-payments".to_string(),
                dead_letter_subject: "payments-dlq".to_string(),
                key_header: default_key_header(),
            },
            scoring: ScoringConfig::default(),
            pipeline: PipelineConfig {
                workers: 4,
                queue_capacity: default_queue_capacity(),
                malformed_policy: MalformedPolicy::DeadLetter,
                metrics_interval_secs: default_metrics_interval(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
