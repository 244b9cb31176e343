use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What a processor backend reports for one payment or refund attempt.
///
/// `success = false` is a business decline, not an error.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ProcessorResponse {
    pub success: bool,
    pub transaction_id: String,
    pub processor_id: String,
    pub response_code: String,
    pub response_message: String,
    pub processing_fee: Decimal,
    pub authorization_code: Option<String>,
}

impl ProcessorResponse {
    /// Opaque summary stored on the payment record.
    pub fn summary(&self) -> String {
        format!(
            "{}/{}/{}",
            self.transaction_id, self.response_code, self.response_message
        )
    }
}
