use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodType {
    CreditCard,
    DebitCard,
    DigitalWallet,
    BankTransfer,
    Cash,
}

impl PaymentMethodType {
    /// The processor backend family that executes payments for this type.
    pub fn processor_kind(&self) -> ProcessorKind {
        match self {
            Self::CreditCard | Self::DebitCard => ProcessorKind::Card,
            Self::DigitalWallet => ProcessorKind::Wallet,
            Self::BankTransfer => ProcessorKind::Bank,
            Self::Cash => ProcessorKind::Cash,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::DebitCard => "debit_card",
            Self::DigitalWallet => "digital_wallet",
            Self::BankTransfer => "bank_transfer",
            Self::Cash => "cash",
        }
    }
}

impl fmt::Display for PaymentMethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named processor backends. Registries are keyed by this, not by method type.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    Card,
    Wallet,
    Bank,
    Cash,
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Card => "card",
            Self::Wallet => "wallet",
            Self::Bank => "bank",
            Self::Cash => "cash",
        };
        f.write_str(s)
    }
}

/// A stored means of payment belonging to one user.
///
/// Immutable after creation except for the `is_default` flag.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentMethod {
    pub id: Uuid,
    pub user_id: String,
    pub method_type: PaymentMethodType,
    pub details: HashMap<String, String>,
    pub last_four: Option<String>,
    pub bank_name: Option<String>,
    pub wallet_provider: Option<String>,
    pub fingerprint: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentMethod {
    /// Builds a method record, deriving display fields and the fingerprint
    /// from `details`.
    pub fn new(
        user_id: String,
        method_type: PaymentMethodType,
        details: HashMap<String, String>,
    ) -> Self {
        let now = Utc::now();
        let fingerprint = fingerprint(method_type, &user_id, &details);
        let mut method = Self {
            id: Uuid::new_v4(),
            user_id,
            method_type,
            details,
            last_four: None,
            bank_name: None,
            wallet_provider: None,
            fingerprint,
            is_default: false,
            created_at: now,
            updated_at: now,
        };
        method.extract_display_fields();
        method
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }

    fn extract_display_fields(&mut self) {
        match self.method_type {
            PaymentMethodType::CreditCard | PaymentMethodType::DebitCard => {
                self.last_four = self.detail("card_number").map(last_four);
            }
            PaymentMethodType::BankTransfer => {
                self.bank_name = self.detail("bank_name").map(str::to_string);
                self.last_four = self.detail("account_number").map(last_four);
            }
            PaymentMethodType::DigitalWallet => {
                self.wallet_provider = self.detail("provider").map(str::to_string);
            }
            PaymentMethodType::Cash => {}
        }
    }
}

/// Deterministic fingerprint of a method: `sha256(type:user:partial)`.
///
/// `partial` is the last four digits for cards and bank accounts and the
/// account email for wallets, so two registrations of the same instrument by
/// the same user collide while different users never do.
pub fn fingerprint(
    method_type: PaymentMethodType,
    user_id: &str,
    details: &HashMap<String, String>,
) -> String {
    let get = |key: &str| details.get(key).map(String::as_str).unwrap_or_default();
    let partial = match method_type {
        PaymentMethodType::CreditCard | PaymentMethodType::DebitCard => {
            last_four(get("card_number"))
        }
        PaymentMethodType::BankTransfer => last_four(get("account_number")),
        PaymentMethodType::DigitalWallet => get("email").trim().to_lowercase(),
        PaymentMethodType::Cash => String::new(),
    };

    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}:{}", method_type, user_id, partial));
    hex::encode(hasher.finalize())
}

/// Last four digits of a card or account number, ignoring separators.
fn last_four(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(char::is_ascii_digit).collect();
    digits[digits.len().saturating_sub(4)..].iter().collect()
}
