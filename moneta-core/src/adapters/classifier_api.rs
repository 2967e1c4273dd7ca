//! Statement classification API client
//!
//! Uploads a bank statement PDF to the remote classifier and decodes the
//! categorized transactions it returns.
//!
//! Contract: `POST {base_url}/classify`, `multipart/form-data` with a single
//! `file` part. A successful reply is HTTP 200 with
//! `{ bank?, transactions: [...], summary?, error? }`.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use url::Url;
use uuid::Uuid;

use crate::domain::result::{Error as DomainError, ImportError, Result as DomainResult};
use crate::domain::{normalize_category, ClassifiedStatement, ParsedTransaction, StatementSummary};
use crate::ports::StatementClassifier;

/// Request timeout for a single classification call
pub const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum length of a display title, in characters
pub const MAX_TITLE_CHARS: usize = 60;

/// Title used when the record names neither merchant nor details
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Date layouts the classifier is known to emit, tried in order.
/// Each layout is paired with the exact length of a matching input so that
/// `05.01.24` is never read as the year 24 by the four-digit pattern.
const DATE_FORMATS: &[(&str, usize)] = &[("%Y-%m-%d", 10), ("%d.%m.%Y", 10), ("%d.%m.%y", 8)];

// =============================================================================
// API Response Models
// =============================================================================

/// Body of a classification reply
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifyResponse {
    #[serde(default)]
    pub bank: Option<String>,
    /// `null` and a missing field both mean no rows
    #[serde(default)]
    pub transactions: Option<Vec<ApiTransaction>>,
    #[serde(default)]
    pub summary: Option<ApiSummary>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Summary block of a classification reply
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSummary {
    #[serde(default)]
    pub total_transactions: usize,
    #[serde(default)]
    pub by_category: BTreeMap<String, usize>,
}

/// One transaction as the classifier reports it. Every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiTransaction {
    #[serde(default)]
    pub date: Option<String>,
    /// Signed amount; negative means money left the account
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub amount_raw: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub bank: Option<String>,
}

/// Deserialize an amount that can be a number or a numeric string.
///
/// Anything that does not read as a decimal becomes `None`, which drops the
/// record later instead of failing the whole response.
fn deserialize_optional_amount<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    let text = match value {
        Some(JsonValue::Number(n)) => n.to_string(),
        Some(JsonValue::String(s)) => s.trim().replace(' ', "").replace(',', "."),
        _ => return Ok(None),
    };
    Ok(text
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&text))
        .ok())
}

impl ApiTransaction {
    /// Convert to a reviewable row, or `None` when date or amount is missing
    pub fn to_parsed(&self, statement_bank: Option<&str>) -> Option<ParsedTransaction> {
        let date = self.date.as_deref().and_then(parse_statement_date)?;
        let amount = self.amount?;

        Some(ParsedTransaction {
            id: Uuid::new_v4(),
            is_included: true,
            date,
            title: select_title(self.merchant.as_deref(), self.details.as_deref()),
            amount: amount.abs(),
            is_expense: amount.is_sign_negative() && !amount.is_zero(),
            category: normalize_category(self.category.as_deref()).to_string(),
            bank: non_blank(self.bank.as_deref())
                .or_else(|| non_blank(statement_bank))
                .map(str::to_string),
            details: non_blank(self.details.as_deref()).map(str::to_string),
            currency: non_blank(self.currency.as_deref()).map(str::to_string),
        })
    }
}

impl ClassifyResponse {
    /// Turn a decoded reply into a statement, honouring an embedded error
    pub fn into_statement(self) -> Result<ClassifiedStatement, ImportError> {
        if let Some(message) = self.error {
            return Err(ImportError::ParseError(message));
        }

        let bank = self.bank;
        let records = self.transactions.unwrap_or_default();
        let total = records.len();
        let mut transactions: Vec<ParsedTransaction> = records
            .iter()
            .filter_map(|tx| tx.to_parsed(bank.as_deref()))
            .collect();

        // Stable sort: rows on the same day keep the classifier's order
        transactions.sort_by(|a, b| b.date.cmp(&a.date));

        Ok(ClassifiedStatement {
            bank,
            dropped: total - transactions.len(),
            transactions,
            summary: self.summary.map(|s| StatementSummary {
                total_transactions: s.total_transactions,
                by_category: s.by_category,
            }),
        })
    }
}

/// Parse a statement date using the known layouts, first match wins
pub fn parse_statement_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .filter(|(_, len)| raw.len() == *len)
        .find_map(|(fmt, _)| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Merchant, then details, then `Unknown`; hard-cut to 60 characters
pub fn select_title(merchant: Option<&str>, details: Option<&str>) -> String {
    let title = non_blank(merchant)
        .or_else(|| non_blank(details))
        .unwrap_or(UNKNOWN_TITLE);
    title.chars().take(MAX_TITLE_CHARS).collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Multipart request body
// =============================================================================

/// A `multipart/form-data` body carrying one PDF under the `file` field
#[derive(Debug)]
pub struct MultipartBody {
    boundary: String,
    bytes: Vec<u8>,
}

impl MultipartBody {
    /// Build a body with a fresh random boundary
    pub fn pdf(file_bytes: &[u8], filename: &str) -> Self {
        Self::pdf_with_boundary(file_bytes, filename, &Uuid::new_v4().to_string())
    }

    /// Build a body with a caller-chosen boundary
    pub fn pdf_with_boundary(file_bytes: &[u8], filename: &str, boundary: &str) -> Self {
        let filename: String = filename
            .chars()
            .filter(|c| *c != '\r' && *c != '\n')
            .collect::<String>()
            .replace('"', "%22");

        let mut bytes = Vec::with_capacity(file_bytes.len() + 256);
        bytes.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        bytes.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        bytes.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
        bytes.extend_from_slice(file_bytes);
        bytes.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        Self {
            boundary: boundary.to_string(),
            bytes,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

// =============================================================================
// Classification HTTP Client
// =============================================================================

/// Statement classification API client
#[derive(Debug)]
pub struct ClassifierClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ClassifierClient {
    /// Create a client for `base_url` with the standard 60 second timeout
    pub fn new(base_url: &str) -> DomainResult<Self> {
        Self::with_timeout(base_url, CLASSIFY_TIMEOUT)
    }

    /// Create a client with a custom timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> DomainResult<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| DomainError::Config(format!("Invalid classifier URL '{}': {}", base_url, e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(DomainError::Config(format!(
                "Classifier URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload a statement and decode the classifier's reply
    ///
    /// One attempt only; the caller decides whether to retry.
    pub fn classify(&self, file_bytes: &[u8], filename: &str) -> Result<ClassifiedStatement, ImportError> {
        let url = format!("{}/classify", self.base_url);
        let body = MultipartBody::pdf(file_bytes, filename);

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, body.content_type())
            .body(body.into_bytes())
            .send()
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(ImportError::ParseError(format!("Server error: {}", status)));
        }

        let payload = response
            .bytes()
            .map_err(|_| ImportError::parse("Invalid response"))?;

        let decoded: ClassifyResponse = serde_json::from_slice(&payload)?;
        decoded.into_statement()
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> ImportError {
        if error.is_timeout() {
            ImportError::network(format!(
                "Connection timed out after {} seconds",
                self.timeout.as_secs()
            ))
        } else if error.is_connect() {
            ImportError::network("Unable to connect to the classification server")
        } else {
            ImportError::network(format!("Classification request failed: {}", error))
        }
    }
}

impl StatementClassifier for ClassifierClient {
    fn name(&self) -> &str {
        "classify-api"
    }

    fn classify(&self, file_bytes: &[u8], filename: &str) -> Result<ClassifiedStatement, ImportError> {
        ClassifierClient::classify(self, file_bytes, filename)
    }
}

// =============================================================================
// Tests
// =============================================================================
