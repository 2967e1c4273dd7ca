//! Transaction domain model

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::parsed::ParsedTransaction;

/// Where a committed transaction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
    Manual,
    Statement,
}

impl fmt::Display for TransactionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionSource::Manual => write!(f, "manual"),
            TransactionSource::Statement => write!(f, "statement"),
        }
    }
}

impl FromStr for TransactionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(TransactionSource::Manual),
            "statement" => Ok(TransactionSource::Statement),
            other => Err(format!("unknown transaction source '{}'", other)),
        }
    }
}

/// A transaction committed to the user's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// Card the transaction is booked against, if any
    pub card_id: Option<Uuid>,
    pub title: String,
    /// Absolute amount; direction lives in `is_expense`
    pub amount: Decimal,
    pub is_expense: bool,
    pub category: String,
    pub transaction_date: NaiveDate,
    pub bank: Option<String>,
    pub details: Option<String>,
    pub currency: Option<String>,
    pub source: TransactionSource,
    /// Hash used to skip duplicates when a statement is imported twice
    pub fingerprint: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new manual transaction with required fields
    pub fn new(
        title: impl Into<String>,
        amount: Decimal,
        is_expense: bool,
        category: impl Into<String>,
        transaction_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id: None,
            title: title.into(),
            amount: amount.abs(),
            is_expense,
            category: category.into(),
            transaction_date,
            bank: None,
            details: None,
            currency: None,
            source: TransactionSource::Manual,
            fingerprint: None,
            created_at: Utc::now(),
        }
    }

    /// Build a committed transaction from a reviewed statement row
    pub fn from_parsed(parsed: &ParsedTransaction, card_id: Option<Uuid>) -> Self {
        let mut tx = Self {
            id: Uuid::new_v4(),
            card_id,
            title: parsed.title.clone(),
            amount: parsed.amount,
            is_expense: parsed.is_expense,
            category: parsed.category.clone(),
            transaction_date: parsed.date,
            bank: parsed.bank.clone(),
            details: parsed.details.clone(),
            currency: parsed.currency.clone(),
            source: TransactionSource::Statement,
            fingerprint: None,
            created_at: Utc::now(),
        };
        tx.ensure_fingerprint();
        tx
    }

    /// Signed amount: negative for expenses
    pub fn signed_amount(&self) -> Decimal {
        if self.is_expense {
            -self.amount
        } else {
            self.amount
        }
    }

    /// Ensure fingerprint is set
    pub fn ensure_fingerprint(&mut self) {
        if self.fingerprint.is_none() {
            self.fingerprint = Some(self.calculate_fingerprint());
        }
    }

    /// Calculate fingerprint hash for deduplication
    ///
    /// Uses: transaction_date, signed amount, and normalized title.
    /// The card is deliberately left out so the same statement row is
    /// recognised no matter which card it was booked against.
    pub fn calculate_fingerprint(&self) -> String {
        let tx_date = self.transaction_date.format("%Y-%m-%d").to_string();

        // Normalize amount: treat -0 as 0
        let amount = if self.amount == Decimal::ZERO {
            Decimal::ZERO
        } else {
            self.signed_amount()
        };
        let amount_normalized = format!("{:.2}", amount);

        let title_normalized = Self::normalize_title(&self.title);

        let fingerprint_str = format!("{}|{}|{}", tx_date, amount_normalized, title_normalized);

        // SHA256 hash, truncated to 16 chars
        let mut hasher = Sha256::new();
        hasher.update(fingerprint_str.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }

    /// Normalize a title for fingerprint comparison
    ///
    /// Lower-cases, drops whitespace and punctuation. Letters of any script
    /// are kept since statements mix Cyrillic and Latin merchant names.
    fn normalize_title(title: &str) -> String {
        static NON_WORD: OnceLock<Regex> = OnceLock::new();
        let re = NON_WORD.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid regex"));
        re.replace_all(&title.to_lowercase(), "").to_string()
    }
}
