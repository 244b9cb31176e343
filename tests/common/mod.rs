#![allow(dead_code)]

use async_trait::async_trait;
use ridepay::application::orchestrator::{
    AddPaymentMethodRequest, PaymentOrchestrator, ProcessPaymentRequest,
};
use ridepay::application::registry::ProcessorRegistry;
use ridepay::config::OrchestratorConfig;
use ridepay::domain::fraud::{FraudDetectionResult, RiskLevel, UserActivity};
use ridepay::domain::payment::{Amount, Payment};
use ridepay::domain::payment_method::{PaymentMethod, PaymentMethodType, ProcessorKind};
use ridepay::domain::ports::{
    FraudDetector, FraudDetectorRef, HistoryProvider, PaymentProcessor,
};
use ridepay::domain::processor::ProcessorResponse;
use ridepay::error::{PaymentError, Result};
use ridepay::infrastructure::in_memory::{
    InMemoryPaymentMethodStore, InMemoryPaymentStore, InMemoryRefundStore,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// How a [`SpyProcessor`] answers.
#[derive(Debug, Clone, Copy)]
pub enum SpyBehaviour {
    Approve,
    Decline,
    Fail,
    Hang(Duration),
}

/// Processor double that counts calls and answers per [`SpyBehaviour`].
pub struct SpyProcessor {
    kind: ProcessorKind,
    behaviour: SpyBehaviour,
    pub payment_calls: AtomicUsize,
    pub refund_calls: AtomicUsize,
}

impl SpyProcessor {
    pub fn new(kind: ProcessorKind, behaviour: SpyBehaviour) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behaviour,
            payment_calls: AtomicUsize::new(0),
            refund_calls: AtomicUsize::new(0),
        })
    }

    pub fn payments(&self) -> usize {
        self.payment_calls.load(Ordering::SeqCst)
    }

    pub fn refunds(&self) -> usize {
        self.refund_calls.load(Ordering::SeqCst)
    }

    async fn answer(&self, amount: Amount) -> Result<ProcessorResponse> {
        match self.behaviour {
            SpyBehaviour::Approve => Ok(ProcessorResponse {
                success: true,
                transaction_id: format!("spy_{}", Uuid::new_v4().simple()),
                processor_id: "spy".to_string(),
                response_code: "00".to_string(),
                response_message: "Approved".to_string(),
                processing_fee: (amount.value() * Decimal::new(2, 2)).round_dp(2),
                authorization_code: Some("SPY001".to_string()),
            }),
            SpyBehaviour::Decline => Ok(ProcessorResponse {
                success: false,
                transaction_id: format!("spy_{}", Uuid::new_v4().simple()),
                processor_id: "spy".to_string(),
                response_code: "05".to_string(),
                response_message: "Do not honor".to_string(),
                processing_fee: Decimal::ZERO,
                authorization_code: None,
            }),
            SpyBehaviour::Fail => Err(PaymentError::ProcessorError(
                "gateway unreachable".to_string(),
            )),
            SpyBehaviour::Hang(delay) => {
                tokio::time::sleep(delay).await;
                Err(PaymentError::ProcessorError("woke up too late".to_string()))
            }
        }
    }
}

#[async_trait]
impl PaymentProcessor for SpyProcessor {
    fn kind(&self) -> ProcessorKind {
        self.kind
    }

    async fn process_payment(&self, payment: &Payment) -> Result<ProcessorResponse> {
        self.payment_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(payment.amount).await
    }

    async fn process_refund(&self, _payment: &Payment, amount: Amount) -> Result<ProcessorResponse> {
        self.refund_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(amount).await
    }

    async fn verify_payment_method(&self, _method: &PaymentMethod) -> Result<()> {
        Ok(())
    }
}

/// Fraud detector returning a fixed level, or failing.
pub struct StubFraud(pub Option<RiskLevel>);

#[async_trait]
impl FraudDetector for StubFraud {
    async fn analyze_transaction(&self, payment: &Payment) -> Result<FraudDetectionResult> {
        let Some(risk_level) = self.0 else {
            return Err(PaymentError::FraudError("scoring service down".to_string()));
        };
        let risk_score = match risk_level {
            RiskLevel::Low => 0.1,
            RiskLevel::Medium => 0.6,
            RiskLevel::High => 0.95,
        };
        Ok(FraudDetectionResult {
            transaction_id: payment.id,
            risk_score,
            risk_level,
            factors: BTreeMap::from([("amount".to_string(), risk_score)]),
            reasons: vec!["High transaction amount".to_string()],
            requires_manual_review: risk_level != RiskLevel::Low,
        })
    }
}

pub fn stub_fraud(level: Option<RiskLevel>) -> FraudDetectorRef {
    Arc::new(StubFraud(level))
}

/// History provider with a constant answer.
pub struct FixedHistory(pub UserActivity);

#[async_trait]
impl HistoryProvider for FixedHistory {
    async fn recent_activity(&self, _payment: &Payment) -> Result<UserActivity> {
        Ok(self.0)
    }
}

/// An orchestrator over in-memory stores the test can also inspect directly.
pub struct Harness {
    pub methods: InMemoryPaymentMethodStore,
    pub payments: InMemoryPaymentStore,
    pub refunds: InMemoryRefundStore,
    pub orchestrator: PaymentOrchestrator,
}

pub fn harness(
    processors: ProcessorRegistry,
    fraud: FraudDetectorRef,
    config: OrchestratorConfig,
) -> Harness {
    let methods = InMemoryPaymentMethodStore::new();
    let payments = InMemoryPaymentStore::new();
    let refunds = InMemoryRefundStore::new();
    let orchestrator = PaymentOrchestrator::new(
        Arc::new(methods.clone()),
        Arc::new(payments.clone()),
        Arc::new(refunds.clone()),
        fraud,
        processors,
        config,
    );
    Harness {
        methods,
        payments,
        refunds,
        orchestrator,
    }
}

pub fn orchestrator(
    processors: ProcessorRegistry,
    fraud: FraudDetectorRef,
    config: OrchestratorConfig,
) -> PaymentOrchestrator {
    harness(processors, fraud, config).orchestrator
}

/// Registers a cash method for `user` and returns its id.
pub async fn add_cash(orchestrator: &PaymentOrchestrator, user: &str) -> Uuid {
    add_method(orchestrator, user, PaymentMethodType::Cash, HashMap::new()).await
}

pub async fn add_card(orchestrator: &PaymentOrchestrator, user: &str) -> Uuid {
    add_method(
        orchestrator,
        user,
        PaymentMethodType::CreditCard,
        HashMap::from([
            ("card_number".to_string(), "4111 1111 1111 1111".to_string()),
            ("cvv".to_string(), "123".to_string()),
        ]),
    )
    .await
}

pub async fn add_method(
    orchestrator: &PaymentOrchestrator,
    user: &str,
    method_type: PaymentMethodType,
    details: HashMap<String, String>,
) -> Uuid {
    let response = orchestrator
        .add_payment_method(AddPaymentMethodRequest {
            user_id: user.to_string(),
            method_type,
            details,
            set_default: false,
        })
        .await
        .unwrap();
    assert!(response.success, "method rejected: {:?}", response.errors);
    response.method.unwrap().id
}

pub fn payment_request(user: &str, method: Uuid, amount: Decimal) -> ProcessPaymentRequest {
    ProcessPaymentRequest {
        trip_id: format!("trip-{}", Uuid::new_v4().simple()),
        payer_id: user.to_string(),
        driver_id: "driver-1".to_string(),
        amount,
        currency: "USD".to_string(),
        payment_method_id: method,
        metadata: HashMap::new(),
        idempotency_key: None,
    }
}

pub const REQUEST_HEADER: [&str; 9] = [
    "type",
    "reference",
    "user",
    "trip",
    "driver",
    "amount",
    "currency",
    "method",
    "reason",
];

/// Writes `rows` cash payments for one rider, each with its own reference.
pub fn generate_requests_csv(path: &Path, rows: usize) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(REQUEST_HEADER)?;

    for i in 1..=rows {
        wtr.write_record([
            "payment",
            &format!("ride-{i}"),
            "rider-1",
            &format!("trip-{i}"),
            "driver-1",
            "12.50",
            "USD",
            "rider-cash",
            "",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Methods file registering one cash method for `rider-1` labelled `rider-cash`.
pub fn write_cash_methods(path: &Path) -> std::io::Result<()> {
    std::fs::write(
        path,
        r#"[{"label": "rider-cash", "user_id": "rider-1", "method_type": "cash"}]"#,
    )
}
