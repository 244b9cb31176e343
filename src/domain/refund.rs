use crate::domain::payment::Amount;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle of a [`RefundRequest`], independent of the payment's own.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Pending,
    Completed,
    Failed,
}

impl RefundStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RefundRequest {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub amount: Amount,
    pub reason: String,
    pub requested_by: String,
    pub status: RefundStatus,
    pub failure_reason: Option<String>,
    pub processor_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefundRequest {
    pub fn new(payment_id: Uuid, amount: Amount, reason: String, requested_by: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            payment_id,
            amount,
            reason,
            requested_by,
            status: RefundStatus::Pending,
            failure_reason: None,
            processor_response: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves a pending refund to a terminal status. Terminal refunds are final.
    pub fn finish(&mut self, update: RefundStatusUpdate) -> Result<(), PaymentError> {
        if self.status.is_terminal() || !update.status.is_terminal() {
            return Err(PaymentError::ValidationError(format!(
                "Refund {} cannot move from {} to {}",
                self.id, self.status, update.status
            )));
        }
        self.status = update.status;
        self.failure_reason = update.failure_reason;
        self.processor_response = update.processor_response;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefundStatusUpdate {
    pub status: RefundStatus,
    pub failure_reason: Option<String>,
    pub processor_response: Option<String>,
}

impl RefundStatusUpdate {
    pub fn completed(processor_response: impl Into<String>) -> Self {
        Self {
            status: RefundStatus::Completed,
            failure_reason: None,
            processor_response: Some(processor_response.into()),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: RefundStatus::Failed,
            failure_reason: Some(reason.into()),
            processor_response: None,
        }
    }

    pub fn with_processor_response(mut self, summary: impl Into<String>) -> Self {
        self.processor_response = Some(summary.into());
        self
    }
}
