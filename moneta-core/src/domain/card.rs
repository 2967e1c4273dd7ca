//! Card domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

/// Currency used when none is given
pub const DEFAULT_CURRENCY: &str = "KZT";

/// A payment card or account the user tracks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub name: String,
    pub bank: Option<String>,
    /// Last four digits of the card number
    pub last_four: Option<String>,
    pub balance: Decimal,
    /// ISO 4217 currency code, normalized to uppercase
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    /// Create a new card with a zero balance
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            bank: None,
            last_four: None,
            balance: Decimal::ZERO,
            currency: DEFAULT_CURRENCY.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check field constraints before the card is stored
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("Card name cannot be empty"));
        }
        if let Some(last_four) = &self.last_four {
            if last_four.len() != 4 || !last_four.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::validation(format!(
                    "Last four digits must be exactly 4 digits, got '{}'",
                    last_four
                )));
            }
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(Error::validation(format!(
                "Currency must be a 3-letter code, got '{}'",
                self.currency
            )));
        }
        Ok(())
    }

    /// Display label such as `Kaspi Gold •• 4821`
    pub fn label(&self) -> String {
        match &self.last_four {
            Some(digits) => format!("{} •• {}", self.name, digits),
            None => self.name.clone(),
        }
    }
}

/// Normalize a user-entered currency code
pub fn normalize_currency(code: &str) -> String {
    code.trim().to_uppercase()
}
