use crate::application::locks::KeyedLocks;
use crate::application::registry::ProcessorRegistry;
use crate::config::{OrchestratorConfig, RefundPolicy};
use crate::domain::fraud::RiskLevel;
use crate::domain::payment::{Amount, Payment, PaymentStatus, PaymentStatusUpdate};
use crate::domain::payment_method::{PaymentMethod, PaymentMethodType};
use crate::domain::ports::{
    FraudDetectorRef, PaymentMethodRepositoryRef, PaymentProcessorRef, PaymentRepositoryRef,
    RefundRepositoryRef,
};
use crate::domain::processor::ProcessorResponse;
use crate::domain::refund::{RefundRequest, RefundStatus, RefundStatusUpdate};
use crate::error::{PaymentError, Result};
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const REASON_HIGH_RISK: &str = "blocked due to high fraud risk";
pub const REASON_UNSUPPORTED: &str = "unsupported payment method";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessPaymentRequest {
    pub trip_id: String,
    pub payer_id: String,
    pub driver_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method_id: Uuid,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Caller-chosen key; a repeated key returns the first attempt's record.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl ProcessPaymentRequest {
    /// Whether `payment` was created from an equivalent request.
    fn matches(&self, payment: &Payment) -> bool {
        payment.payer_id == self.payer_id
            && payment.trip_id == self.trip_id
            && payment.amount.value() == self.amount
            && payment.currency.eq_ignore_ascii_case(&self.currency)
            && payment.payment_method_id == self.payment_method_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRefundRequest {
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub reason: String,
    pub requested_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddPaymentMethodRequest {
    pub user_id: String,
    pub method_type: PaymentMethodType,
    #[serde(default)]
    pub details: HashMap<String, String>,
    #[serde(default)]
    pub set_default: bool,
}

/// Result of a payment attempt. `payment` is `None` only when the request was
/// rejected before a record was created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentResponse {
    pub payment: Option<Payment>,
    pub success: bool,
    pub message: String,
    pub errors: Vec<String>,
}

impl PaymentResponse {
    fn rejected(message: &str, errors: Vec<String>) -> Self {
        Self {
            payment: None,
            success: false,
            message: message.to_string(),
            errors,
        }
    }

    fn completed(payment: Payment, message: &str) -> Self {
        Self {
            payment: Some(payment),
            success: true,
            message: message.to_string(),
            errors: Vec::new(),
        }
    }

    fn failed(payment: Payment, message: &str, errors: Vec<String>) -> Self {
        Self {
            payment: Some(payment),
            success: false,
            message: message.to_string(),
            errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefundResponse {
    pub refund: Option<RefundRequest>,
    /// The original payment, as stored after the refund attempt.
    pub payment: Option<Payment>,
    pub success: bool,
    pub message: String,
    pub errors: Vec<String>,
}

impl RefundResponse {
    fn rejected(payment: Option<Payment>, message: &str, errors: Vec<String>) -> Self {
        Self {
            refund: None,
            payment,
            success: false,
            message: message.to_string(),
            errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentMethodResponse {
    pub method: Option<PaymentMethod>,
    pub success: bool,
    pub message: String,
    pub errors: Vec<String>,
}

impl PaymentMethodResponse {
    fn rejected(message: &str, errors: Vec<String>) -> Self {
        Self {
            method: None,
            success: false,
            message: message.to_string(),
            errors,
        }
    }
}

/// Coordinates payments and refunds across the stores, the fraud engine and
/// the processor backends.
///
/// Business outcomes (declines, validation failures, fraud blocks) come back
/// as unsuccessful responses. `Err` means a collaborator such as a store
/// failed; even then a created payment is driven to `failed` when possible.
pub struct PaymentOrchestrator {
    methods: PaymentMethodRepositoryRef,
    payments: PaymentRepositoryRef,
    refunds: RefundRepositoryRef,
    fraud: FraudDetectorRef,
    processors: ProcessorRegistry,
    config: OrchestratorConfig,
    payment_locks: KeyedLocks<Uuid>,
    idempotency_locks: KeyedLocks<(String, String)>,
}

impl PaymentOrchestrator {
    pub fn new(
        methods: PaymentMethodRepositoryRef,
        payments: PaymentRepositoryRef,
        refunds: RefundRepositoryRef,
        fraud: FraudDetectorRef,
        processors: ProcessorRegistry,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            methods,
            payments,
            refunds,
            fraud,
            processors,
            config,
            payment_locks: KeyedLocks::new(),
            idempotency_locks: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs one payment attempt from validation to a terminal status.
    pub async fn process_payment(&self, request: ProcessPaymentRequest) -> Result<PaymentResponse> {
        if let Err(e) = self.validate_payment_amount(request.amount, &request.currency) {
            return Ok(PaymentResponse::rejected(
                "Invalid payment request",
                vec![e.to_string()],
            ));
        }

        let _key_guard = match &request.idempotency_key {
            Some(key) => Some(
                self.idempotency_locks
                    .lock(&(request.payer_id.clone(), key.clone()))
                    .await,
            ),
            None => None,
        };
        if let Some(key) = &request.idempotency_key
            && let Some(existing) = self
                .payments
                .find_by_idempotency_key(&request.payer_id, key)
                .await?
        {
            if !request.matches(&existing) {
                warn!(
                    payment_id = %existing.id,
                    idempotency_key = %key,
                    "idempotency key reused with different parameters"
                );
                return Ok(PaymentResponse::rejected(
                    "Idempotency key reused with different parameters",
                    vec![format!("key {key} already used for payment {}", existing.id)],
                ));
            }
            info!(payment_id = %existing.id, idempotency_key = %key, "duplicate payment request");
            let success = existing.status == PaymentStatus::Completed;
            return Ok(PaymentResponse {
                success,
                message: "Duplicate request; returning existing payment".to_string(),
                errors: Vec::new(),
                payment: Some(existing),
            });
        }

        let method = match self.methods.get_payment_method(request.payment_method_id).await? {
            Some(method) if method.user_id == request.payer_id => method,
            Some(_) => {
                return Ok(PaymentResponse::rejected(
                    "Payment method does not belong to payer",
                    Vec::new(),
                ));
            }
            None => {
                return Ok(PaymentResponse::rejected(
                    "Payment method not found",
                    vec![format!("no payment method {}", request.payment_method_id)],
                ));
            }
        };

        let mut payment = Payment::new(
            request.trip_id,
            request.payer_id,
            request.driver_id,
            Amount::new(request.amount)?,
            request.currency,
            method.id,
            method.method_type,
        );
        payment.metadata = request.metadata;
        payment.idempotency_key = request.idempotency_key;

        let payment_id = payment.id;
        self.payments.create_payment(payment.clone()).await?;
        info!(
            %payment_id,
            trip_id = %payment.trip_id,
            amount = %payment.amount,
            method = %payment.method_type,
            "payment record created"
        );

        match self.run_payment(payment).await {
            Ok(response) => Ok(response),
            Err(e) => {
                error!(%payment_id, error = %e, "payment processing aborted");
                self.abandon_payment(payment_id, &e).await;
                Err(e)
            }
        }
    }

    async fn run_payment(&self, mut payment: Payment) -> Result<PaymentResponse> {
        let payment_id = payment.id;

        match self.fraud.analyze_transaction(&payment).await {
            Ok(result) => {
                payment = self
                    .payments
                    .update_payment_status(
                        payment_id,
                        PaymentStatusUpdate::new(PaymentStatus::Pending).with_fraud((&result).into()),
                    )
                    .await?;
                if result.risk_level == RiskLevel::High {
                    warn!(
                        %payment_id,
                        risk_score = result.risk_score,
                        reasons = ?result.reasons,
                        "payment blocked by fraud screening"
                    );
                    let payment = self.fail_payment(payment_id, REASON_HIGH_RISK).await?;
                    return Ok(PaymentResponse::failed(
                        payment,
                        "Payment blocked due to high fraud risk",
                        result.reasons,
                    ));
                }
            }
            Err(e) => {
                warn!(%payment_id, error = %e, "fraud analysis failed; continuing unscored");
            }
        }

        let Some(processor) = self.processors.get(payment.method_type) else {
            warn!(%payment_id, method = %payment.method_type, "no processor registered");
            let payment = self.fail_payment(payment_id, REASON_UNSUPPORTED).await?;
            return Ok(PaymentResponse::failed(
                payment,
                "Unsupported payment method",
                Vec::new(),
            ));
        };

        let payment = self
            .payments
            .update_payment_status(payment_id, PaymentStatusUpdate::new(PaymentStatus::Processing))
            .await?;

        let response = match self
            .call_processor(&processor, processor.process_payment(&payment))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(%payment_id, processor = %processor.kind(), error = %e, "processor error");
                let payment = self.fail_payment(payment_id, e.to_string()).await?;
                return Ok(PaymentResponse::failed(
                    payment,
                    "Payment processing failed",
                    vec![e.to_string()],
                ));
            }
        };

        if response.success {
            let payment = self
                .payments
                .update_payment_status(
                    payment_id,
                    PaymentStatusUpdate::new(PaymentStatus::Completed)
                        .with_processor_response(response.summary())
                        .with_processing_fee(response.processing_fee)
                        .with_processed_at(Utc::now()),
                )
                .await?;
            info!(%payment_id, fee = %response.processing_fee, "payment completed");
            Ok(PaymentResponse::completed(
                payment,
                "Payment processed successfully",
            ))
        } else {
            let payment = self
                .payments
                .update_payment_status(
                    payment_id,
                    PaymentStatusUpdate::failed(response.response_message.clone())
                        .with_processor_response(response.summary()),
                )
                .await?;
            info!(%payment_id, code = %response.response_code, "payment declined");
            Ok(PaymentResponse::failed(
                payment,
                &response.response_message,
                Vec::new(),
            ))
        }
    }

    /// Refunds part or all of a completed payment.
    pub async fn process_refund(&self, request: ProcessRefundRequest) -> Result<RefundResponse> {
        let _payment_guard = self.payment_locks.lock(&request.payment_id).await;

        let Some(payment) = self.payments.get_payment(request.payment_id).await? else {
            return Ok(RefundResponse::rejected(None, "Payment not found", Vec::new()));
        };

        let Ok(amount) = Amount::new(request.amount) else {
            return Ok(RefundResponse::rejected(
                Some(payment),
                "Refund amount must be greater than zero",
                Vec::new(),
            ));
        };

        let already_refunded = self.refunded_total(payment.id).await?;
        if already_refunded + amount.value() > payment.amount.value() {
            return Ok(RefundResponse::rejected(
                Some(payment),
                "Refund amount exceeds original payment amount",
                vec![format!("{} already refunded", already_refunded)],
            ));
        }

        if payment.status != PaymentStatus::Completed {
            return Ok(RefundResponse::rejected(
                Some(payment),
                "Only completed payments can be refunded",
                Vec::new(),
            ));
        }

        let refund = RefundRequest::new(payment.id, amount, request.reason, request.requested_by);
        let refund_id = refund.id;
        self.refunds.create_refund(refund).await?;
        info!(%refund_id, payment_id = %payment.id, %amount, "refund record created");

        match self.run_refund(refund_id, &payment, amount, already_refunded).await {
            Ok(response) => Ok(response),
            Err(e) => {
                error!(%refund_id, error = %e, "refund processing aborted");
                if let Err(inner) = self
                    .refunds
                    .update_refund_status(refund_id, RefundStatusUpdate::failed(e.to_string()))
                    .await
                {
                    error!(%refund_id, error = %inner, "could not mark refund failed");
                }
                Err(e)
            }
        }
    }

    async fn run_refund(
        &self,
        refund_id: Uuid,
        payment: &Payment,
        amount: Amount,
        already_refunded: Decimal,
    ) -> Result<RefundResponse> {
        let Some(processor) = self.processors.get(payment.method_type) else {
            let refund = self
                .refunds
                .update_refund_status(refund_id, RefundStatusUpdate::failed(REASON_UNSUPPORTED))
                .await?;
            return Ok(RefundResponse {
                refund: Some(refund),
                payment: Some(payment.clone()),
                success: false,
                message: "Unsupported payment method".to_string(),
                errors: Vec::new(),
            });
        };

        let outcome = self
            .call_processor(&processor, processor.process_refund(payment, amount))
            .await;

        let (update, message, errors) = match outcome {
            Ok(response) if response.success => (
                RefundStatusUpdate::completed(response.summary()),
                "Refund processed successfully".to_string(),
                Vec::new(),
            ),
            Ok(response) => (
                RefundStatusUpdate::failed(response.response_message.clone())
                    .with_processor_response(response.summary()),
                response.response_message,
                Vec::new(),
            ),
            Err(e) => {
                error!(%refund_id, processor = %processor.kind(), error = %e, "processor error");
                (
                    RefundStatusUpdate::failed(e.to_string()),
                    "Refund processing failed".to_string(),
                    vec![e.to_string()],
                )
            }
        };

        let refund = self.refunds.update_refund_status(refund_id, update).await?;
        let success = refund.status == RefundStatus::Completed;
        info!(%refund_id, status = %refund.status, "refund finished");

        let mut payment = payment.clone();
        if success
            && self.config.refund_policy == RefundPolicy::MarkRefunded
            && already_refunded + amount.value() == payment.amount.value()
        {
            match self
                .payments
                .update_payment_status(payment.id, PaymentStatusUpdate::new(PaymentStatus::Refunded))
                .await
            {
                Ok(updated) => {
                    payment = updated;
                    info!(payment_id = %payment.id, "payment fully refunded");
                }
                // The refund already went through; only the payment status lags.
                Err(e) => warn!(
                    payment_id = %payment.id,
                    %refund_id,
                    error = %e,
                    "could not mark payment refunded"
                ),
            }
        }

        Ok(RefundResponse {
            refund: Some(refund),
            payment: Some(payment),
            success,
            message,
            errors,
        })
    }

    /// Registers a new payment method after the matching backend verifies it.
    pub async fn add_payment_method(
        &self,
        request: AddPaymentMethodRequest,
    ) -> Result<PaymentMethodResponse> {
        if request.user_id.trim().is_empty() {
            return Ok(PaymentMethodResponse::rejected(
                "User id is required",
                Vec::new(),
            ));
        }

        let mut method = PaymentMethod::new(request.user_id, request.method_type, request.details);

        if self
            .methods
            .find_by_fingerprint(&method.fingerprint)
            .await?
            .is_some()
        {
            return Ok(PaymentMethodResponse::rejected(
                "Payment method already exists",
                Vec::new(),
            ));
        }

        let Some(processor) = self.processors.get(method.method_type) else {
            return Ok(PaymentMethodResponse::rejected(
                "Unsupported payment method type",
                Vec::new(),
            ));
        };

        if let Err(e) = processor.verify_payment_method(&method).await {
            info!(user_id = %method.user_id, method = %method.method_type, error = %e, "payment method rejected");
            return Ok(PaymentMethodResponse::rejected(
                "Payment method verification failed",
                vec![e.to_string()],
            ));
        }

        let first_for_user = self
            .methods
            .get_user_payment_methods(&method.user_id)
            .await?
            .is_empty();

        self.methods.create_payment_method(method.clone()).await?;
        if request.set_default || first_for_user {
            self.methods
                .set_default_payment_method(&method.user_id, method.id)
                .await?;
            method.is_default = true;
        }
        info!(method_id = %method.id, user_id = %method.user_id, method = %method.method_type, "payment method added");

        Ok(PaymentMethodResponse {
            method: Some(method),
            success: true,
            message: "Payment method added successfully".to_string(),
            errors: Vec::new(),
        })
    }

    pub async fn set_default_payment_method(&self, user_id: &str, method_id: Uuid) -> Result<()> {
        self.methods
            .set_default_payment_method(user_id, method_id)
            .await
    }

    pub async fn get_user_payment_methods(&self, user_id: &str) -> Result<Vec<PaymentMethod>> {
        self.methods.get_user_payment_methods(user_id).await
    }

    pub async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>> {
        self.payments.get_payment(id).await
    }

    /// Every payment created under `key`, across payers.
    pub async fn get_payments_by_idempotency_key(&self, key: &str) -> Result<Vec<Payment>> {
        self.payments.get_payments_by_idempotency_key(key).await
    }

    pub async fn get_user_payments(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Payment>> {
        self.payments
            .get_payments_by_user(user_id, limit, offset)
            .await
    }

    pub async fn get_trip_payments(&self, trip_id: &str) -> Result<Vec<Payment>> {
        self.payments.get_payments_by_trip(trip_id).await
    }

    pub async fn get_payment_refunds(&self, payment_id: Uuid) -> Result<Vec<RefundRequest>> {
        self.refunds.get_refunds_by_payment(payment_id).await
    }

    /// Estimated fee for charging `amount` with `method_type`: the backend's
    /// rate, rounded to cents, never below the configured minimum. Methods
    /// with a zero rate are free.
    pub fn calculate_processing_fee(&self, amount: Decimal, method_type: PaymentMethodType) -> Decimal {
        let rate = self.config.fee_rates.rate(method_type.processor_kind());
        if rate.is_zero() {
            return Decimal::ZERO;
        }
        let fee = (amount * rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        fee.max(self.config.minimum_fee)
    }

    pub fn validate_payment_amount(&self, amount: Decimal, currency: &str) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::ValidationError(
                "Payment amount must be greater than zero".to_string(),
            ));
        }
        if amount > self.config.max_payment_amount {
            return Err(PaymentError::ValidationError(format!(
                "Payment amount exceeds maximum limit of {}",
                self.config.max_payment_amount
            )));
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PaymentError::ValidationError(format!(
                "Invalid currency code: {:?}",
                currency
            )));
        }
        Ok(())
    }

    async fn call_processor(
        &self,
        processor: &PaymentProcessorRef,
        call: impl Future<Output = Result<ProcessorResponse>>,
    ) -> Result<ProcessorResponse> {
        let timeout = self.config.processor_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(processor = %processor.kind(), ?timeout, "processor call timed out");
                Err(PaymentError::ProcessorTimeout(timeout.as_millis()))
            }
        }
    }

    async fn refunded_total(&self, payment_id: Uuid) -> Result<Decimal> {
        Ok(self
            .refunds
            .get_refunds_by_payment(payment_id)
            .await?
            .iter()
            .filter(|r| r.status == RefundStatus::Completed)
            .map(|r| r.amount.value())
            .sum())
    }

    async fn fail_payment(&self, id: Uuid, reason: impl Into<String>) -> Result<Payment> {
        self.payments
            .update_payment_status(id, PaymentStatusUpdate::failed(reason))
            .await
    }

    /// Best effort: drive a record to `failed` after an infrastructure error.
    async fn abandon_payment(&self, id: Uuid, cause: &PaymentError) {
        match self.payments.get_payment(id).await {
            Ok(Some(payment)) if !payment.status.is_terminal() => {
                if let Err(e) = self.fail_payment(id, format!("internal error: {}", cause)).await {
                    error!(payment_id = %id, error = %e, "could not mark payment failed");
                }
            }
            Ok(_) => {}
            Err(e) => error!(payment_id = %id, error = %e, "could not reload payment"),
        }
    }
}
