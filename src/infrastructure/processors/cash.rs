use super::Simulation;
use crate::config::ProcessorProfile;
use crate::domain::payment::{Amount, Payment};
use crate::domain::payment_method::{PaymentMethod, ProcessorKind};
use crate::domain::ports::PaymentProcessor;
use crate::domain::processor::ProcessorResponse;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Cash handed to the driver. The only "network" step is the driver
/// confirming receipt.
#[derive(Debug, Clone)]
pub struct CashProcessor {
    sim: Simulation,
}

impl CashProcessor {
    pub fn new(profile: ProcessorProfile) -> Self {
        Self {
            sim: Simulation::new("cash", profile),
        }
    }
}

impl Default for CashProcessor {
    fn default() -> Self {
        Self::new(ProcessorProfile::for_kind(ProcessorKind::Cash))
    }
}

#[async_trait]
impl PaymentProcessor for CashProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Cash
    }

    async fn process_payment(&self, payment: &Payment) -> Result<ProcessorResponse> {
        self.sim.network_delay().await;
        if Simulation::roll(self.sim.profile().decline_rate) {
            return Ok(self
                .sim
                .declined("C01", "Payment not confirmed by driver"));
        }
        Ok(self.sim.approved(payment.amount, "Cash received by driver"))
    }

    /// Always accepted; the money moves outside the system.
    async fn process_refund(&self, payment: &Payment, amount: Amount) -> Result<ProcessorResponse> {
        self.sim.network_delay().await;
        info!(payment_id = %payment.id, %amount, "cash refund flagged for manual handling");
        let mut response = self.sim.approved(amount, "Cash refund requires manual processing");
        response.response_code = "MANUAL".to_string();
        Ok(response)
    }

    async fn verify_payment_method(&self, _method: &PaymentMethod) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment_method::PaymentMethodType;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_cash_refund_is_manual_and_free() {
        let p = CashProcessor::new(
            ProcessorProfile::for_kind(ProcessorKind::Cash).with_latency(std::time::Duration::ZERO),
        );
        let payment = Payment::new(
            "trip-1".to_string(),
            "rider-1".to_string(),
            "driver-1".to_string(),
            Amount::new(dec!(25.50)).unwrap(),
            "USD".to_string(),
            Uuid::new_v4(),
            PaymentMethodType::Cash,
        );
        let response = p
            .process_refund(&payment, Amount::new(dec!(5)).unwrap())
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.response_code, "MANUAL");
        assert_eq!(response.processing_fee, Decimal::ZERO);
    }
}
