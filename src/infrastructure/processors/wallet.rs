use super::Simulation;
use crate::config::ProcessorProfile;
use crate::domain::payment::{Amount, Payment};
use crate::domain::payment_method::{PaymentMethod, ProcessorKind};
use crate::domain::ports::PaymentProcessor;
use crate::domain::processor::ProcessorResponse;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use validator::ValidateEmail;

/// Digital wallet backend (PayPal, Apple Pay and the like).
#[derive(Debug, Clone)]
pub struct DigitalWalletProcessor {
    sim: Simulation,
}

impl DigitalWalletProcessor {
    pub fn new(profile: ProcessorProfile) -> Self {
        Self {
            sim: Simulation::new("wallet", profile),
        }
    }
}

impl Default for DigitalWalletProcessor {
    fn default() -> Self {
        Self::new(ProcessorProfile::for_kind(ProcessorKind::Wallet))
    }
}

#[async_trait]
impl PaymentProcessor for DigitalWalletProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Wallet
    }

    async fn process_payment(&self, payment: &Payment) -> Result<ProcessorResponse> {
        self.sim.network_delay().await;
        if Simulation::roll(self.sim.profile().decline_rate) {
            return Ok(self
                .sim
                .declined("W51", "Wallet payment declined"));
        }
        Ok(self.sim.approved(payment.amount, "Approved"))
    }

    async fn process_refund(&self, _payment: &Payment, amount: Amount) -> Result<ProcessorResponse> {
        self.sim.network_delay().await;
        if Simulation::roll(self.sim.profile().refund_failure_rate) {
            return Ok(self.sim.declined("W91", "Wallet refund failed"));
        }
        Ok(self.sim.approved(amount, "Refund approved"))
    }

    async fn verify_payment_method(&self, method: &PaymentMethod) -> Result<()> {
        match method.detail("email") {
            Some(email) if email.validate_email() => {}
            Some(_) => {
                return Err(PaymentError::ValidationError(
                    "Invalid wallet email address".to_string(),
                ));
            }
            None => {
                return Err(PaymentError::ValidationError(
                    "Wallet email is required".to_string(),
                ));
            }
        }

        if Simulation::roll(self.sim.profile().verification_failure_rate) {
            return Err(PaymentError::ProcessorError(
                "Wallet verification failed".to_string(),
            ));
        }
        Ok(())
    }
}
