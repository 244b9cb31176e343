use super::fraud::{FraudDetectionResult, UserActivity};
use super::payment::{Amount, Payment, PaymentStatusUpdate};
use super::payment_method::{PaymentMethod, ProcessorKind};
use super::processor::ProcessorResponse;
use super::refund::{RefundRequest, RefundStatusUpdate};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait PaymentMethodRepository: Send + Sync {
    async fn create_payment_method(&self, method: PaymentMethod) -> Result<()>;
    async fn get_payment_method(&self, id: Uuid) -> Result<Option<PaymentMethod>>;
    async fn get_user_payment_methods(&self, user_id: &str) -> Result<Vec<PaymentMethod>>;
    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<PaymentMethod>>;
    /// Marks `method_id` as the user's default and clears the flag on the others.
    async fn set_default_payment_method(&self, user_id: &str, method_id: Uuid) -> Result<()>;
}

/// Payment records. Implementations must apply status updates atomically per
/// id and reject transitions [`Payment::apply`] refuses.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create_payment(&self, payment: Payment) -> Result<()>;
    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>>;
    async fn update_payment_status(&self, id: Uuid, update: PaymentStatusUpdate)
    -> Result<Payment>;
    async fn get_payments_by_user(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Payment>>;
    async fn get_payments_by_trip(&self, trip_id: &str) -> Result<Vec<Payment>>;
    /// Idempotency keys are scoped to the payer.
    async fn find_by_idempotency_key(&self, payer_id: &str, key: &str)
    -> Result<Option<Payment>>;
    async fn get_payments_by_idempotency_key(&self, key: &str) -> Result<Vec<Payment>>;
}

#[async_trait]
pub trait RefundRepository: Send + Sync {
    async fn create_refund(&self, refund: RefundRequest) -> Result<()>;
    async fn get_refund(&self, id: Uuid) -> Result<Option<RefundRequest>>;
    async fn update_refund_status(
        &self,
        id: Uuid,
        update: RefundStatusUpdate,
    ) -> Result<RefundRequest>;
    async fn get_refunds_by_payment(&self, payment_id: Uuid) -> Result<Vec<RefundRequest>>;
}

/// Scores a pending transaction for fraud risk.
#[async_trait]
pub trait FraudDetector: Send + Sync {
    async fn analyze_transaction(&self, payment: &Payment) -> Result<FraudDetectionResult>;
}

/// Read-only view of a payer's recent behaviour, used by the velocity and
/// location factors.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn recent_activity(&self, payment: &Payment) -> Result<UserActivity>;
}

/// A backend that executes payments for one [`ProcessorKind`].
///
/// Declines are reported through [`ProcessorResponse::success`]; `Err` is
/// reserved for the backend itself failing.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    fn kind(&self) -> ProcessorKind;
    async fn process_payment(&self, payment: &Payment) -> Result<ProcessorResponse>;
    async fn process_refund(&self, payment: &Payment, amount: Amount)
    -> Result<ProcessorResponse>;
    async fn verify_payment_method(&self, method: &PaymentMethod) -> Result<()>;
}

pub type PaymentMethodRepositoryRef = Arc<dyn PaymentMethodRepository>;
pub type PaymentRepositoryRef = Arc<dyn PaymentRepository>;
pub type RefundRepositoryRef = Arc<dyn RefundRepository>;
pub type FraudDetectorRef = Arc<dyn FraudDetector>;
pub type HistoryProviderRef = Arc<dyn HistoryProvider>;
pub type PaymentProcessorRef = Arc<dyn PaymentProcessor>;
