//! Runtime configuration for the orchestrator, the fraud engine and the
//! processor backends.
//!
//! Every knob has a default matching production calibration; the CLI
//! overrides a subset of them.

use crate::domain::payment_method::ProcessorKind;
use clap::ValueEnum;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happens to the original payment once refunds cover its full amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RefundPolicy {
    /// The payment stays `completed`; refunds live on their own records.
    #[default]
    KeepOriginal,
    /// A fully refunded payment moves to `refunded`.
    MarkRefunded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub max_payment_amount: Decimal,
    pub minimum_fee: Decimal,
    pub processor_timeout: Duration,
    pub refund_policy: RefundPolicy,
    pub fee_rates: FeeRates,
    pub fraud: FraudConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_payment_amount: dec!(5000),
            minimum_fee: dec!(0.30),
            processor_timeout: Duration::from_secs(5),
            refund_policy: RefundPolicy::default(),
            fee_rates: FeeRates::default(),
            fraud: FraudConfig::default(),
        }
    }
}

/// Percentage of the amount charged by each backend, as a fraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeRates {
    pub card: Decimal,
    pub wallet: Decimal,
    pub bank: Decimal,
    pub cash: Decimal,
}

impl FeeRates {
    pub fn rate(&self, kind: ProcessorKind) -> Decimal {
        match kind {
            ProcessorKind::Card => self.card,
            ProcessorKind::Wallet => self.wallet,
            ProcessorKind::Bank => self.bank,
            ProcessorKind::Cash => self.cash,
        }
    }
}

impl Default for FeeRates {
    fn default() -> Self {
        Self {
            card: ProcessorProfile::for_kind(ProcessorKind::Card).fee_rate,
            wallet: ProcessorProfile::for_kind(ProcessorKind::Wallet).fee_rate,
            bank: ProcessorProfile::for_kind(ProcessorKind::Bank).fee_rate,
            cash: ProcessorProfile::for_kind(ProcessorKind::Cash).fee_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorWeights {
    pub amount: f64,
    pub time: f64,
    pub velocity: f64,
    pub location: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            amount: 0.3,
            time: 0.2,
            velocity: 0.3,
            location: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FraudConfig {
    pub weights: FactorWeights,
    /// Scores at or above this are `high`.
    pub high_threshold: f64,
    /// Scores at or above this are `medium`.
    pub medium_threshold: f64,
    /// A factor above this contributes a human-readable reason.
    pub reason_threshold: f64,
    /// Ceiling on the velocity factor's contribution.
    pub max_velocity_score: f64,
    /// Ceiling on the location factor's contribution.
    pub max_location_score: f64,
    /// Look-back window for counting recent payments.
    pub velocity_window: Duration,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            weights: FactorWeights::default(),
            high_threshold: 0.8,
            medium_threshold: 0.5,
            reason_threshold: 0.7,
            max_velocity_score: 0.6,
            max_location_score: 0.5,
            velocity_window: Duration::from_secs(60 * 60),
        }
    }
}

/// Latency, failure and fee calibration of one simulated backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessorProfile {
    pub latency: Duration,
    /// Probability that a payment is declined.
    pub decline_rate: f64,
    /// Probability that a refund is rejected.
    pub refund_failure_rate: f64,
    /// Probability that an otherwise valid method fails verification.
    pub verification_failure_rate: f64,
    pub fee_rate: Decimal,
}

impl ProcessorProfile {
    pub fn for_kind(kind: ProcessorKind) -> Self {
        match kind {
            ProcessorKind::Card => Self {
                latency: Duration::from_millis(200),
                decline_rate: 0.10,
                refund_failure_rate: 0.05,
                verification_failure_rate: 0.02,
                fee_rate: dec!(0.029),
            },
            ProcessorKind::Wallet => Self {
                latency: Duration::from_millis(150),
                decline_rate: 0.05,
                refund_failure_rate: 0.01,
                verification_failure_rate: 0.0,
                fee_rate: dec!(0.025),
            },
            ProcessorKind::Bank => Self {
                latency: Duration::from_millis(500),
                decline_rate: 0.15,
                refund_failure_rate: 0.08,
                verification_failure_rate: 0.0,
                fee_rate: dec!(0.010),
            },
            ProcessorKind::Cash => Self {
                latency: Duration::from_millis(50),
                decline_rate: 0.02,
                refund_failure_rate: 0.0,
                verification_failure_rate: 0.0,
                fee_rate: Decimal::ZERO,
            },
        }
    }

    /// Same fees, but no latency and no random declines.
    pub fn deterministic(self) -> Self {
        Self {
            latency: Duration::ZERO,
            decline_rate: 0.0,
            refund_failure_rate: 0.0,
            verification_failure_rate: 0.0,
            ..self
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_decline_rate(mut self, rate: f64) -> Self {
        self.decline_rate = rate;
        self
    }

    pub fn with_refund_failure_rate(mut self, rate: f64) -> Self {
        self.refund_failure_rate = rate;
        self
    }

    pub fn with_verification_failure_rate(mut self, rate: f64) -> Self {
        self.verification_failure_rate = rate;
        self
    }
}
