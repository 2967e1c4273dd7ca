//! DuckDB repository implementation

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use duckdb::types::Type;
use duckdb::{params, params_from_iter, Connection};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error as DomainError, Result as DomainResult};
use crate::domain::{Card, Category, CategoryKind, Transaction, TransactionSource};
use crate::migrations::MIGRATIONS;
use crate::ports::{BatchCommit, Repository, TransactionFilter};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const TRANSACTION_COLUMNS: &str = "transaction_id, card_id, title, amount, is_expense, category,
     transaction_date, bank, details, currency, source, fingerprint, created_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the ledger database
    ///
    /// Retries with exponential backoff when another process holds the file.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[moneta] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Run pending ledger migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn, MIGRATIONS).run_pending()
    }

    /// Ensure the schema exists and seed default categories on first run
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        if self.category_count()? == 0 {
            for category in Category::defaults() {
                self.save_category(&category)?;
            }
        }
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // === Card operations ===

    pub fn save_card(&self, card: &Card) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO cards (card_id, name, bank, last_four, balance, currency, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (card_id) DO UPDATE SET
                name = EXCLUDED.name,
                bank = EXCLUDED.bank,
                last_four = EXCLUDED.last_four,
                balance = EXCLUDED.balance,
                currency = EXCLUDED.currency,
                updated_at = EXCLUDED.updated_at",
            params![
                card.id.to_string(),
                card.name,
                card.bank,
                card.last_four,
                card.balance.to_string(),
                card.currency,
                card.created_at.to_rfc3339(),
                card.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_cards(&self) -> Result<Vec<Card>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT card_id, name, bank, last_four, balance, currency, created_at, updated_at
             FROM cards ORDER BY created_at",
        )?;

        let cards = stmt
            .query_map([], row_to_card)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(cards)
    }

    pub fn find_card(&self, id: Uuid) -> Result<Option<Card>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT card_id, name, bank, last_four, balance, currency, created_at, updated_at
             FROM cards WHERE card_id = ?",
        )?;
        match stmt.query_row([id.to_string()], row_to_card) {
            Ok(card) => Ok(Some(card)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a card and detach its transactions
    ///
    /// Each statement auto-commits; transactions are detached first so no
    /// row ever points at a missing card.
    pub fn remove_card(&self, id: Uuid) -> Result<bool> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE transactions SET card_id = NULL WHERE card_id = ?",
            [id.to_string()],
        )?;
        let deleted = conn.execute("DELETE FROM cards WHERE card_id = ?", [id.to_string()])?;
        Ok(deleted > 0)
    }

    // === Category operations ===

    pub fn save_category(&self, category: &Category) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO categories (category_id, name, kind, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (category_id) DO UPDATE SET
                name = EXCLUDED.name,
                kind = EXCLUDED.kind",
            params![
                category.id.to_string(),
                category.name,
                category.kind.to_string(),
                category.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT category_id, name, kind, created_at FROM categories ORDER BY name")?;

        let categories = stmt
            .query_map([], |row| {
                let kind_str: String = row.get(2)?;
                let created_str: String = row.get(3)?;
                Ok(Category {
                    id: uuid_column(row, 0)?,
                    name: row.get(1)?,
                    kind: kind_str.parse().unwrap_or(CategoryKind::Expense),
                    created_at: parse_timestamp(&created_str),
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(categories)
    }

    fn category_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn remove_category(&self, id: Uuid) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM categories WHERE category_id = ?",
            [id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    pub fn relabel(&self, from: &str, to: &str) -> Result<usize> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE transactions SET category = ? WHERE category = ?",
            params![to, from],
        )?;
        Ok(updated)
    }

    // === Transaction operations ===

    /// Insert a batch of transactions atomically
    pub fn save_transactions(&self, txs: &[Transaction]) -> Result<()> {
        if txs.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let db_tx = conn.transaction()?;
        insert_rows(&db_tx, txs)?;
        db_tx.commit()?;
        Ok(())
    }

    /// Fingerprint dedupe, inserts and the card balance update under one lock
    /// and one database transaction.
    ///
    /// Returns `None` without writing anything when the card does not exist.
    pub fn commit_batch(
        &self,
        txs: &[Transaction],
        card_id: Option<Uuid>,
    ) -> Result<Option<BatchCommit>> {
        let mut conn = self.lock()?;
        let db_tx = conn.transaction()?;

        let balance = match card_id {
            Some(id) => {
                let found = db_tx.query_row(
                    "SELECT balance FROM cards WHERE card_id = ?",
                    [id.to_string()],
                    |row| decimal_column(row, 0),
                );
                match found {
                    Ok(balance) => Some((id, balance)),
                    Err(duckdb::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                }
            }
            None => None,
        };

        let candidates: Vec<String> = txs.iter().filter_map(|t| t.fingerprint.clone()).collect();
        let existing = fingerprints_in(&db_tx, &candidates)?;
        let fresh: Vec<Transaction> = txs
            .iter()
            .filter(|t| match &t.fingerprint {
                Some(fp) => !existing.contains(fp),
                None => true,
            })
            .cloned()
            .collect();

        insert_rows(&db_tx, &fresh)?;

        let balance_change = match balance {
            Some((id, current)) => {
                let delta: Decimal = fresh.iter().map(Transaction::signed_amount).sum();
                db_tx.execute(
                    "UPDATE cards SET balance = ?, updated_at = ? WHERE card_id = ?",
                    params![
                        (current + delta).to_string(),
                        Utc::now().to_rfc3339(),
                        id.to_string()
                    ],
                )?;
                Some(delta)
            }
            None => None,
        };

        db_tx.commit()?;
        Ok(Some(BatchCommit {
            inserted: fresh.len(),
            skipped_duplicates: txs.len() - fresh.len(),
            balance_change,
        }))
    }

    /// Transactions matching the filter, newest first
    pub fn query_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let mut conditions = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(from) = filter.from {
            conditions.push("transaction_date >= ?");
            values.push(from.format("%Y-%m-%d").to_string());
        }
        if let Some(to) = filter.to {
            conditions.push("transaction_date <= ?");
            values.push(to.format("%Y-%m-%d").to_string());
        }
        if let Some(card_id) = filter.card_id {
            conditions.push("card_id = ?");
            values.push(card_id.to_string());
        }
        if let Some(category) = &filter.category {
            conditions.push("lower(category) = lower(?)");
            values.push(category.clone());
        }

        let mut sql = format!("SELECT {} FROM transactions", TRANSACTION_COLUMNS);
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY transaction_date DESC, created_at DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params_from_iter(values.iter()), row_to_transaction)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(transactions)
    }

    pub fn find_transaction(&self, id: Uuid) -> Result<Option<Transaction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE transaction_id = ?",
            TRANSACTION_COLUMNS
        ))?;
        match stmt.query_row([id.to_string()], row_to_transaction) {
            Ok(tx) => Ok(Some(tx)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn remove_transaction(&self, id: Uuid) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM transactions WHERE transaction_id = ?",
            [id.to_string()],
        )?;
        Ok(deleted > 0)
    }
}

impl Repository for DuckDbRepository {
    fn upsert_card(&self, card: &Card) -> DomainResult<()> {
        Ok(self.save_card(card)?)
    }

    fn get_cards(&self) -> DomainResult<Vec<Card>> {
        Ok(self.list_cards()?)
    }

    fn get_card(&self, id: Uuid) -> DomainResult<Option<Card>> {
        Ok(self.find_card(id)?)
    }

    fn delete_card(&self, id: Uuid) -> DomainResult<bool> {
        Ok(self.remove_card(id)?)
    }

    fn upsert_category(&self, category: &Category) -> DomainResult<()> {
        Ok(self.save_category(category)?)
    }

    fn get_categories(&self) -> DomainResult<Vec<Category>> {
        Ok(self.list_categories()?)
    }

    fn delete_category(&self, id: Uuid) -> DomainResult<bool> {
        Ok(self.remove_category(id)?)
    }

    fn relabel_transactions(&self, from: &str, to: &str) -> DomainResult<usize> {
        Ok(self.relabel(from, to)?)
    }

    fn insert_transactions(&self, txs: &[Transaction]) -> DomainResult<()> {
        Ok(self.save_transactions(txs)?)
    }

    fn get_transactions(&self, filter: &TransactionFilter) -> DomainResult<Vec<Transaction>> {
        Ok(self.query_transactions(filter)?)
    }

    fn get_transaction(&self, id: Uuid) -> DomainResult<Option<Transaction>> {
        Ok(self.find_transaction(id)?)
    }

    fn delete_transaction(&self, id: Uuid) -> DomainResult<bool> {
        Ok(self.remove_transaction(id)?)
    }

    fn commit_transactions(
        &self,
        txs: &[Transaction],
        card_id: Option<Uuid>,
    ) -> DomainResult<BatchCommit> {
        match (self.commit_batch(txs, card_id)?, card_id) {
            (Some(commit), _) => Ok(commit),
            (None, Some(id)) => Err(DomainError::not_found(format!("Card {}", id))),
            (None, None) => Ok(BatchCommit::default()),
        }
    }
}

// Helper functions

fn insert_rows(conn: &Connection, txs: &[Transaction]) -> Result<()> {
    if txs.is_empty() {
        return Ok(());
    }

    let mut stmt = conn.prepare(&format!(
        "INSERT INTO transactions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        TRANSACTION_COLUMNS
    ))?;
    for tx in txs {
        stmt.execute(params![
            tx.id.to_string(),
            tx.card_id.map(|id| id.to_string()),
            tx.title,
            tx.amount.to_string(),
            tx.is_expense,
            tx.category,
            tx.transaction_date.format("%Y-%m-%d").to_string(),
            tx.bank,
            tx.details,
            tx.currency,
            tx.source.to_string(),
            tx.fingerprint,
            tx.created_at.to_rfc3339(),
        ])?;
    }
    Ok(())
}

fn fingerprints_in(conn: &Connection, fingerprints: &[String]) -> Result<HashSet<String>> {
    if fingerprints.is_empty() {
        return Ok(HashSet::new());
    }

    let placeholders = vec!["?"; fingerprints.len()].join(", ");
    let sql = format!(
        "SELECT DISTINCT fingerprint FROM transactions WHERE fingerprint IN ({})",
        placeholders
    );
    let mut stmt = conn.prepare(&sql)?;
    let found = stmt
        .query_map(params_from_iter(fingerprints.iter()), |row| row.get::<_, String>(0))?
        .collect::<duckdb::Result<HashSet<_>>>()?;
    Ok(found)
}

fn uuid_column(row: &duckdb::Row, idx: usize) -> duckdb::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn decimal_column(row: &duckdb::Row, idx: usize) -> duckdb::Result<Decimal> {
    let raw: String = row.get(idx)?;
    raw.trim()
        .parse::<Decimal>()
        .map_err(|e| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_card(row: &duckdb::Row) -> duckdb::Result<Card> {
    let created_str: String = row.get(6).unwrap_or_default();
    let updated_str: String = row.get(7).unwrap_or_default();

    Ok(Card {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        bank: row.get::<_, Option<String>>(2).ok().flatten(),
        last_four: row.get::<_, Option<String>>(3).ok().flatten(),
        balance: decimal_column(row, 4)?,
        currency: row.get(5).unwrap_or_else(|_| crate::domain::DEFAULT_CURRENCY.to_string()),
        created_at: parse_timestamp(&created_str),
        updated_at: parse_timestamp(&updated_str),
    })
}

fn row_to_transaction(row: &duckdb::Row) -> duckdb::Result<Transaction> {
    // Column order follows TRANSACTION_COLUMNS
    let card_id: Option<String> = row.get::<_, Option<String>>(1).ok().flatten();
    let date_str: String = row.get(6).unwrap_or_default();
    let source_str: String = row.get(10).unwrap_or_default();
    let created_str: String = row.get(12).unwrap_or_default();

    Ok(Transaction {
        id: uuid_column(row, 0)?,
        card_id: card_id.and_then(|s| Uuid::parse_str(&s).ok()),
        title: row.get(2)?,
        amount: decimal_column(row, 3)?,
        is_expense: row.get(4).unwrap_or(true),
        category: row.get(5).unwrap_or_default(),
        transaction_date: parse_date(&date_str),
        bank: row.get::<_, Option<String>>(7).ok().flatten(),
        details: row.get::<_, Option<String>>(8).ok().flatten(),
        currency: row.get::<_, Option<String>>(9).ok().flatten(),
        source: source_str.parse().unwrap_or(TransactionSource::Manual),
        fingerprint: row.get::<_, Option<String>>(11).ok().flatten(),
        created_at: parse_timestamp(&created_str),
    })
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|_| Utc::now().date_naive())
}
