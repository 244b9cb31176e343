//! Simulated processor backends.
//!
//! Each backend stands in for a real network integration: it sleeps for its
//! configured latency, declines a configured fraction of requests and charges
//! its fee rate. Swapping one for a real client means implementing
//! [`PaymentProcessor`](crate::domain::ports::PaymentProcessor) and registering it.

pub mod bank;
pub mod card;
pub mod cash;
pub mod wallet;

pub use bank::BankTransferProcessor;
pub use card::CardProcessor;
pub use cash::CashProcessor;
pub use wallet::DigitalWalletProcessor;

use crate::config::ProcessorProfile;
use crate::domain::payment::Amount;
use crate::domain::processor::ProcessorResponse;
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

/// Shared behaviour of the simulated backends.
#[derive(Debug, Clone)]
pub(crate) struct Simulation {
    processor_id: &'static str,
    profile: ProcessorProfile,
}

impl Simulation {
    pub(crate) fn new(processor_id: &'static str, profile: ProcessorProfile) -> Self {
        Self {
            processor_id,
            profile,
        }
    }

    pub(crate) fn profile(&self) -> &ProcessorProfile {
        &self.profile
    }

    pub(crate) async fn network_delay(&self) {
        if !self.profile.latency.is_zero() {
            tokio::time::sleep(self.profile.latency).await;
        }
    }

    /// Returns true with probability `rate`.
    pub(crate) fn roll(rate: f64) -> bool {
        rate > 0.0 && rand::thread_rng().gen_bool(rate.min(1.0))
    }

    pub(crate) fn fee(&self, amount: Amount) -> Decimal {
        (amount.value() * self.profile.fee_rate)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    pub(crate) fn approved(&self, amount: Amount, message: &str) -> ProcessorResponse {
        ProcessorResponse {
            success: true,
            transaction_id: self.transaction_id(),
            processor_id: self.processor_id.to_string(),
            response_code: "00".to_string(),
            response_message: message.to_string(),
            processing_fee: self.fee(amount),
            authorization_code: Some(authorization_code()),
        }
    }

    pub(crate) fn declined(&self, code: &str, message: &str) -> ProcessorResponse {
        ProcessorResponse {
            success: false,
            transaction_id: self.transaction_id(),
            processor_id: self.processor_id.to_string(),
            response_code: code.to_string(),
            response_message: message.to_string(),
            processing_fee: Decimal::ZERO,
            authorization_code: None,
        }
    }

    fn transaction_id(&self) -> String {
        format!("{}_{}", self.processor_id, Uuid::new_v4().simple())
    }
}

fn authorization_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

/// Digits of a detail value, with spaces and dashes stripped. `None` when the
/// value holds anything else.
pub(crate) fn digits(value: &str) -> Option<String> {
    let cleaned: String = value.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    if !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit()) {
        Some(cleaned)
    } else {
        None
    }
}
