use crate::domain::fraud::{FraudDetectionResult, RiskLevel};
use crate::domain::payment_method::PaymentMethodType;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use uuid::Uuid;

/// Represents a positive monetary amount for payments and refunds.
///
/// Deserialization goes through the same check as [`Amount::new`], so a
/// stored record can never carry a zero or negative amount.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a [`Payment`].
///
/// `pending -> processing -> {completed | failed}`, with `pending -> failed`
/// for records stopped before a processor is called. `refunded` is only
/// reachable from `completed` when the refund policy asks for it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Refunded)
    }

    /// Whether a record in this status may move to `next`.
    ///
    /// A non-terminal status may be re-applied to itself so enrichment
    /// (fraud scores) can be persisted without advancing the record.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        match (self, next) {
            (Pending, Pending | Processing | Failed) => true,
            (Processing, Processing | Completed | Failed) => true,
            (Completed, Refunded) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Payment,
    Refund,
}

/// A single charge for a trip, from the payer to the driver.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub trip_id: String,
    pub payer_id: String,
    pub driver_id: String,
    pub amount: Amount,
    pub currency: String,
    pub payment_method_id: Uuid,
    pub method_type: PaymentMethodType,
    pub status: PaymentStatus,
    pub transaction_type: TransactionType,
    pub risk_level: Option<RiskLevel>,
    pub fraud_scores: BTreeMap<String, f64>,
    /// Opaque `transaction id / response code / message` summary.
    pub processor_response: Option<String>,
    pub processing_fee: Option<Decimal>,
    pub failure_reason: Option<String>,
    pub idempotency_key: Option<String>,
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn new(
        trip_id: String,
        payer_id: String,
        driver_id: String,
        amount: Amount,
        currency: String,
        payment_method_id: Uuid,
        method_type: PaymentMethodType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            trip_id,
            payer_id,
            driver_id,
            amount,
            currency,
            payment_method_id,
            method_type,
            status: PaymentStatus::Pending,
            transaction_type: TransactionType::Payment,
            risk_level: None,
            fraud_scores: BTreeMap::new(),
            processor_response: None,
            processing_fee: None,
            failure_reason: None,
            idempotency_key: None,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
            processed_at: None,
        }
    }

    /// Applies a status update, rejecting any transition the lifecycle forbids.
    pub fn apply(&mut self, update: PaymentStatusUpdate) -> Result<(), PaymentError> {
        if !self.status.can_transition_to(update.status) {
            return Err(PaymentError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: update.status,
            });
        }

        self.status = update.status;
        if let Some(reason) = update.failure_reason {
            self.failure_reason = Some(reason);
        }
        if let Some(summary) = update.processor_response {
            self.processor_response = Some(summary);
        }
        if let Some(fee) = update.processing_fee {
            self.processing_fee = Some(fee);
        }
        if let Some(fraud) = update.fraud {
            self.risk_level = Some(fraud.risk_level);
            self.fraud_scores = fraud.factors;
        }
        if let Some(at) = update.processed_at {
            self.processed_at = Some(at);
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Risk snapshot persisted on a payment record.
#[derive(Debug, Clone, PartialEq)]
pub struct FraudSnapshot {
    pub risk_level: RiskLevel,
    pub factors: BTreeMap<String, f64>,
}

impl From<&FraudDetectionResult> for FraudSnapshot {
    fn from(result: &FraudDetectionResult) -> Self {
        Self {
            risk_level: result.risk_level,
            factors: result.factors.clone(),
        }
    }
}

/// The detail carried by `PaymentRepository::update_payment_status`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentStatusUpdate {
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub processor_response: Option<String>,
    pub processing_fee: Option<Decimal>,
    pub fraud: Option<FraudSnapshot>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl PaymentStatusUpdate {
    pub fn new(status: PaymentStatus) -> Self {
        Self {
            status,
            failure_reason: None,
            processor_response: None,
            processing_fee: None,
            fraud: None,
            processed_at: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::new(PaymentStatus::Failed).with_failure_reason(reason)
    }

    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }

    pub fn with_processor_response(mut self, summary: impl Into<String>) -> Self {
        self.processor_response = Some(summary.into());
        self
    }

    pub fn with_processing_fee(mut self, fee: Decimal) -> Self {
        self.processing_fee = Some(fee);
        self
    }

    pub fn with_fraud(mut self, fraud: FraudSnapshot) -> Self {
        self.fraud = Some(fraud);
        self
    }

    pub fn with_processed_at(mut self, at: DateTime<Utc>) -> Self {
        self.processed_at = Some(at);
        self
    }
}
