use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

use super::catalog::{Currency, PaymentMethod};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Accepted,
    Success,
    Declined,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Accepted => "ACCEPTED",
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Declined => "DECLINED",
        }
    }

    /// SUCCESS and DECLINED never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Accepted)
    }

    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (
                TransactionStatus::Accepted,
                TransactionStatus::Success | TransactionStatus::Declined
            )
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how the payer has to send money.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PaymentData {
    pub payment_holder: String,
    /// Descriptor such as `[60] KZT-P2P_CIS-CARD`.
    pub payment_method: String,
    pub payment_system: String,
    /// Card or account number.
    pub payment_requisite: String,
    pub payment_expires_at: String,
    /// Base64 PNG, QR methods only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code_encoded: Option<String>,
    /// Deep link into the payer's banking app, QR methods only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_link: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Transaction {
    pub tracker_id: String,
    pub status: TransactionStatus,
    pub payment_data: PaymentData,
    pub amount: f64,
    pub currency: String,
    pub amount_to_pay: f64,
}

/// Body of a create request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct TransactionData {
    pub currency: Currency,
    pub sub_method: PaymentMethod,
    #[validate(length(min = 1, message = "bank_token must not be empty"))]
    pub bank_token: String,
    #[validate(
        custom(function = "validate_finite", message = "amount must be a finite number"),
        range(min = 1.0, message = "amount must be at least 1")
    )]
    pub amount: f64,
}

/// NaN passes range checks and both NaN and infinity serialize as `null`.
fn validate_finite(amount: f64) -> Result<(), ValidationError> {
    if amount.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("finite"))
    }
}

/// A transaction as remembered locally, with client-side timing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TransactionRecord {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Round trip of the create call in milliseconds.
    pub response_time: u64,
}

impl TransactionRecord {
    pub fn new(transaction: Transaction, observed_at: DateTime<Utc>, response_time: u64) -> Self {
        Self {
            transaction,
            created_at: observed_at,
            updated_at: observed_at,
            response_time,
        }
    }

    pub fn tracker_id(&self) -> &str {
        &self.transaction.tracker_id
    }

    pub fn status(&self) -> TransactionStatus {
        self.transaction.status
    }
}
