//! Additive rule-based risk scoring

use crate::config::ScoringConfig;
use crate::types::transaction::Transaction;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

/// Risk score clamped to `[0.0, 1.0]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct RiskScore(Decimal);

impl RiskScore {
    /// Decimal places carried on the wire
    pub const WIRE_SCALE: u32 = 2;

    pub const ZERO: Self = RiskScore(Decimal::ZERO);
    pub const MAX: Self = RiskScore(Decimal::ONE);

    /// Create a score, clamping into `[0, 1]`
    pub fn new(value: Decimal) -> Self {
        RiskScore(value.clamp(Decimal::ZERO, Decimal::ONE))
    }

    /// Unrounded score
    pub fn value(self) -> Decimal {
        self.0
    }

    /// Score rounded to two places, the form written into enriched payloads
    pub fn rounded(self) -> Decimal {
        let mut rounded = self
            .0
            .round_dp_with_strategy(Self::WIRE_SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(Self::WIRE_SCALE);
        rounded
    }

    /// Lossy conversion for metrics
    pub fn as_f64(self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rounded())
    }
}

/// Individual rules of the heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskRule {
    HighValue,
    VeryHighValue,
    HighRiskRegion,
    RoundAmount,
}

impl RiskRule {
    pub fn name(self) -> &'static str {
        match self {
            RiskRule::HighValue => "high_value",
            RiskRule::VeryHighValue => "very_high_value",
            RiskRule::HighRiskRegion => "high_risk_region",
            RiskRule::RoundAmount => "round_amount",
        }
    }
}

/// Score plus the rules that contributed to it
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub score: RiskScore,
    pub triggered: Vec<RiskRule>,
}

impl Assessment {
    /// Names of the triggered rules, for logging
    pub fn triggered_names(&self) -> Vec<&'static str> {
        self.triggered.iter().map(|r| r.name()).collect()
    }
}

/// Computes bounded risk scores from transaction attributes.
///
/// Rules are evaluated independently; their weights are summed and the sum
/// is capped at 1.0. Scoring is a pure function of the transaction and the
/// configuration fixed at construction.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    config: ScoringConfig,
}

impl RiskScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Score a transaction
    pub fn score(&self, tx: &Transaction) -> RiskScore {
        self.assess(tx).score
    }

    /// Score a transaction and report which rules fired
    pub fn assess(&self, tx: &Transaction) -> Assessment {
        let weights = &self.config.weights;
        let amount = tx.amount;

        let rules = [
            (
                RiskRule::HighValue,
                amount > self.config.high_value_threshold,
                weights.high_value,
            ),
            (
                RiskRule::VeryHighValue,
                amount > self.config.very_high_value_threshold,
                weights.very_high_value,
            ),
            (
                RiskRule::HighRiskRegion,
                tx.region.as_deref() == Some(self.config.high_risk_region.as_str()),
                weights.high_risk_region,
            ),
            (
                RiskRule::RoundAmount,
                is_round(amount) && amount > self.config.round_amount_floor,
                weights.round_amount,
            ),
        ];

        let mut sum = Decimal::ZERO;
        let mut triggered = Vec::new();
        for (rule, applies, weight) in rules {
            if !applies || weight.is_sign_negative() {
                continue;
            }
            // An overflowing contribution counts as zero.
            if let Some(next) = sum.checked_add(weight) {
                sum = next;
                triggered.push(rule);
            }
        }

        Assessment {
            score: RiskScore::new(sum.min(Decimal::ONE)),
            triggered,
        }
    }

    /// True when the score as written on the wire crosses the alert
    /// threshold (strictly above), matching the dispatcher's decision.
    pub fn exceeds_alert_threshold(&self, score: RiskScore) -> bool {
        score.rounded() > self.config.alert_threshold
    }
}

/// A whole amount written without fractional digits (`7500`, not `7500.00`).
///
/// Decimal scale is taken from the payload text, so the check needs no
/// floating-point comparison.
fn is_round(amount: Decimal) -> bool {
    amount.scale() == 0 && amount.fract().is_zero()
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}
