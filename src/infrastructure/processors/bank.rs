use super::{Simulation, digits};
use crate::config::ProcessorProfile;
use crate::domain::payment::{Amount, Payment};
use crate::domain::payment_method::{PaymentMethod, ProcessorKind};
use crate::domain::ports::PaymentProcessor;
use crate::domain::processor::ProcessorResponse;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rand::Rng;

const DECLINE_MESSAGES: [(&str, &str); 2] = [
    ("R01", "Insufficient funds"),
    ("R16", "Account blocked"),
];

/// ACH-style bank transfer backend. Slowest of the four.
#[derive(Debug, Clone)]
pub struct BankTransferProcessor {
    sim: Simulation,
}

impl BankTransferProcessor {
    pub fn new(profile: ProcessorProfile) -> Self {
        Self {
            sim: Simulation::new("bank", profile),
        }
    }
}

impl Default for BankTransferProcessor {
    fn default() -> Self {
        Self::new(ProcessorProfile::for_kind(ProcessorKind::Bank))
    }
}

#[async_trait]
impl PaymentProcessor for BankTransferProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Bank
    }

    async fn process_payment(&self, payment: &Payment) -> Result<ProcessorResponse> {
        self.sim.network_delay().await;
        if Simulation::roll(self.sim.profile().decline_rate) {
            let (code, message) =
                DECLINE_MESSAGES[rand::thread_rng().gen_range(0..DECLINE_MESSAGES.len())];
            return Ok(self.sim.declined(code, message));
        }
        Ok(self.sim.approved(payment.amount, "Transfer accepted"))
    }

    async fn process_refund(&self, _payment: &Payment, amount: Amount) -> Result<ProcessorResponse> {
        self.sim.network_delay().await;
        if Simulation::roll(self.sim.profile().refund_failure_rate) {
            return Ok(self.sim.declined("R02", "Refund transfer returned"));
        }
        Ok(self.sim.approved(amount, "Refund transfer accepted"))
    }

    async fn verify_payment_method(&self, method: &PaymentMethod) -> Result<()> {
        let account = method
            .detail("account_number")
            .and_then(digits)
            .ok_or_else(|| invalid("Account number is required"))?;
        if !(8..=17).contains(&account.len()) {
            return Err(invalid("Invalid account number length"));
        }

        let routing = method
            .detail("routing_number")
            .and_then(digits)
            .ok_or_else(|| invalid("Routing number is required"))?;
        if routing.len() != 9 {
            return Err(invalid("Routing number must be 9 digits"));
        }

        if Simulation::roll(self.sim.profile().verification_failure_rate) {
            return Err(PaymentError::ProcessorError(
                "Bank account verification failed".to_string(),
            ));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> PaymentError {
    PaymentError::ValidationError(message.to_string())
}
