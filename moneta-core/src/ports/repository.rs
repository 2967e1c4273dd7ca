//! Repository port - database abstraction

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Card, Category, Transaction};

/// Filter for listing committed transactions
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Inclusive lower bound
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound
    pub to: Option<NaiveDate>,
    pub card_id: Option<Uuid>,
    pub category: Option<String>,
    pub limit: Option<usize>,
}

/// Outcome of [`Repository::commit_transactions`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchCommit {
    pub inserted: usize,
    /// Rows whose fingerprint was already stored
    pub skipped_duplicates: usize,
    /// Net balance movement, when a card was given
    pub balance_change: Option<Decimal>,
}

/// Database repository abstraction
///
/// Services depend on this trait; the DuckDB adapter provides the
/// actual storage.
pub trait Repository: Send + Sync {
    // === Cards ===

    /// Insert or replace a card
    fn upsert_card(&self, card: &Card) -> Result<()>;

    /// All cards, oldest first
    fn get_cards(&self) -> Result<Vec<Card>>;

    fn get_card(&self, id: Uuid) -> Result<Option<Card>>;

    /// Delete a card; its transactions stay but lose the card reference
    fn delete_card(&self, id: Uuid) -> Result<bool>;

    // === Categories ===

    /// Insert or replace a category
    fn upsert_category(&self, category: &Category) -> Result<()>;

    /// All categories ordered by name
    fn get_categories(&self) -> Result<Vec<Category>>;

    fn delete_category(&self, id: Uuid) -> Result<bool>;

    /// Re-label every transaction in `from` as `to`, returning the count
    fn relabel_transactions(&self, from: &str, to: &str) -> Result<usize>;

    // === Transactions ===

    /// Insert transactions in a single batch
    fn insert_transactions(&self, txs: &[Transaction]) -> Result<()>;

    /// Transactions matching the filter, newest first
    fn get_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>>;

    fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>>;

    fn delete_transaction(&self, id: Uuid) -> Result<bool>;

    /// Insert the rows whose fingerprint is not stored yet and move the
    /// card balance by their signed amounts, all in one database transaction.
    ///
    /// Fails with `NotFound` and writes nothing when `card_id` names no card.
    fn commit_transactions(&self, txs: &[Transaction], card_id: Option<Uuid>) -> Result<BatchCommit>;
}
