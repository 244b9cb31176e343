use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// Outcome of scoring one transaction. Only a snapshot of it is persisted,
/// on the payment record.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct FraudDetectionResult {
    pub transaction_id: Uuid,
    /// Weighted score in `[0.0, 1.0]`.
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub factors: BTreeMap<String, f64>,
    pub reasons: Vec<String>,
    pub requires_manual_review: bool,
}

/// What a history source knows about the payer around one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UserActivity {
    /// Payments by the same payer inside the velocity window.
    pub recent_transactions: u32,
    /// Geographic anomaly in `[0.0, 1.0]`; 0 means the usual place.
    pub location_anomaly: f64,
}
