use super::{Simulation, digits};
use crate::config::ProcessorProfile;
use crate::domain::payment::{Amount, Payment};
use crate::domain::payment_method::{PaymentMethod, ProcessorKind};
use crate::domain::ports::PaymentProcessor;
use crate::domain::processor::ProcessorResponse;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use tracing::debug;

/// Credit and debit card backend.
#[derive(Debug, Clone)]
pub struct CardProcessor {
    sim: Simulation,
}

impl CardProcessor {
    pub fn new(profile: ProcessorProfile) -> Self {
        Self {
            sim: Simulation::new("card", profile),
        }
    }
}

impl Default for CardProcessor {
    fn default() -> Self {
        Self::new(ProcessorProfile::for_kind(ProcessorKind::Card))
    }
}

#[async_trait]
impl PaymentProcessor for CardProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Card
    }

    async fn process_payment(&self, payment: &Payment) -> Result<ProcessorResponse> {
        self.sim.network_delay().await;
        if Simulation::roll(self.sim.profile().decline_rate) {
            debug!(payment_id = %payment.id, "card payment declined");
            return Ok(self.sim.declined("05", "Card declined"));
        }
        Ok(self.sim.approved(payment.amount, "Approved"))
    }

    async fn process_refund(&self, payment: &Payment, amount: Amount) -> Result<ProcessorResponse> {
        self.sim.network_delay().await;
        if Simulation::roll(self.sim.profile().refund_failure_rate) {
            debug!(payment_id = %payment.id, "card refund rejected");
            return Ok(self.sim.declined("RF05", "Refund rejected by issuer"));
        }
        Ok(self.sim.approved(amount, "Refund approved"))
    }

    async fn verify_payment_method(&self, method: &PaymentMethod) -> Result<()> {
        let number = method
            .detail("card_number")
            .ok_or_else(|| invalid("Card number is required"))?;
        let number = digits(number).ok_or_else(|| invalid("Card number must contain only digits"))?;
        if !(13..=19).contains(&number.len()) {
            return Err(invalid("Invalid card number length"));
        }

        let cvv = method
            .detail("cvv")
            .ok_or_else(|| invalid("CVV is required"))?;
        if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("Invalid CVV"));
        }

        if let (Some(month), Some(year)) = (method.detail("expiry_month"), method.detail("expiry_year")) {
            check_expiry(month, year)?;
        }

        if Simulation::roll(self.sim.profile().verification_failure_rate) {
            return Err(PaymentError::ProcessorError(
                "Card verification failed".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_expiry(month: &str, year: &str) -> Result<()> {
    let month: u32 = month
        .trim()
        .parse()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| invalid("Invalid expiry month"))?;
    let mut year: i32 = year
        .trim()
        .parse()
        .map_err(|_| invalid("Invalid expiry year"))?;
    if year < 100 {
        year += 2000;
    }

    let today = Utc::now().date_naive();
    if (year, month) < (today.year(), today.month()) {
        return Err(invalid("Card has expired"));
    }
    Ok(())
}

fn invalid(message: &str) -> PaymentError {
    PaymentError::ValidationError(message.to_string())
}
