//! Transaction service - manual entries, listing and category totals

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::Transaction;
use crate::ports::{Repository, TransactionFilter};

/// Fields for a manually entered transaction
#[derive(Debug, Clone)]
pub struct ManualEntry {
    pub title: String,
    /// Sign is ignored; direction comes from `is_expense`
    pub amount: Decimal,
    pub is_expense: bool,
    pub category: String,
    pub date: NaiveDate,
    pub card_id: Option<Uuid>,
    pub details: Option<String>,
}

/// Expense and income sums for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub expenses: Decimal,
    pub incomes: Decimal,
    pub count: usize,
}

pub struct TransactionService {
    repository: Arc<dyn Repository>,
}

impl TransactionService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Record a transaction by hand, moving the card balance if one is given
    ///
    /// The insert and the balance update commit together.
    pub fn add_manual(&self, entry: ManualEntry) -> Result<Transaction> {
        let title = entry.title.trim();
        if title.is_empty() {
            return Err(Error::validation("Title cannot be empty"));
        }
        if entry.amount.is_zero() {
            return Err(Error::validation("Amount cannot be zero"));
        }

        let category = self.resolve_category(&entry.category)?;
        let mut tx = Transaction::new(title, entry.amount, entry.is_expense, category, entry.date);
        tx.details = entry.details.filter(|d| !d.trim().is_empty());

        if let Some(card_id) = entry.card_id {
            let card = self
                .repository
                .get_card(card_id)?
                .ok_or_else(|| Error::not_found(format!("Card {}", card_id)))?;
            tx.card_id = Some(card_id);
            tx.currency = Some(card.currency);
        }

        self.repository
            .commit_transactions(std::slice::from_ref(&tx), entry.card_id)?;
        Ok(tx)
    }

    pub fn list(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        self.repository.get_transactions(filter)
    }

    /// Delete a transaction; card balances are left as they are
    pub fn remove(&self, id: Uuid) -> Result<()> {
        if !self.repository.delete_transaction(id)? {
            return Err(Error::not_found(format!("Transaction {}", id)));
        }
        Ok(())
    }

    /// Per-category sums over an inclusive date range, largest spend first
    pub fn category_totals(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<CategoryTotal>> {
        let transactions = self.repository.get_transactions(&TransactionFilter {
            from,
            to,
            ..Default::default()
        })?;

        let mut by_category: HashMap<String, CategoryTotal> = HashMap::new();
        for tx in transactions {
            let total = by_category
                .entry(tx.category.clone())
                .or_insert_with(|| CategoryTotal {
                    category: tx.category.clone(),
                    expenses: Decimal::ZERO,
                    incomes: Decimal::ZERO,
                    count: 0,
                });
            if tx.is_expense {
                total.expenses += tx.amount;
            } else {
                total.incomes += tx.amount;
            }
            total.count += 1;
        }

        let mut totals: Vec<CategoryTotal> = by_category.into_values().collect();
        totals.sort_by(|a, b| {
            b.expenses
                .cmp(&a.expenses)
                .then_with(|| b.incomes.cmp(&a.incomes))
                .then_with(|| a.category.cmp(&b.category))
        });
        Ok(totals)
    }

    /// Use the stored spelling of a known category name
    fn resolve_category(&self, name: &str) -> Result<String> {
        let wanted = name.trim().to_lowercase();
        self.repository
            .get_categories()?
            .into_iter()
            .find(|c| c.name.to_lowercase() == wanted)
            .map(|c| c.name)
            .ok_or_else(|| Error::validation(format!("Unknown category '{}'", name.trim())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::Card;
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> (Arc<DuckDbRepository>, TransactionService) {
        let repo = Arc::new(DuckDbRepository::new(&dir.path().join("test.duckdb")).unwrap());
        repo.ensure_schema().unwrap();
        let service = TransactionService::new(repo.clone());
        (repo, service)
    }

    fn entry(title: &str, amount: i64, is_expense: bool, category: &str, day: u32) -> ManualEntry {
        ManualEntry {
            title: title.to_string(),
            amount: Decimal::new(amount, 0),
            is_expense,
            category: category.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            card_id: None,
            details: None,
        }
    }

    #[test]
    fn test_add_manual_resolves_category_spelling() {
        let dir = TempDir::new().unwrap();
        let (_, txs) = setup(&dir);

        let tx = txs.add_manual(entry("Groceries", -4500, true, "food", 3)).unwrap();
        assert_eq!(tx.category, "Food");
        assert_eq!(tx.amount, Decimal::new(4500, 0));

        let err = txs.add_manual(entry("Gift", 100, true, "Gifts", 3)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_add_manual_moves_card_balance() {
        let dir = TempDir::new().unwrap();
        let (repo, txs) = setup(&dir);
        let card = Card::new("Visa");
        repo.upsert_card(&card).unwrap();

        let mut salary = entry("Salary", 300000, false, "Income", 1);
        salary.card_id = Some(card.id);
        txs.add_manual(salary).unwrap();

        let stored = repo.get_card(card.id).unwrap().unwrap();
        assert_eq!(stored.balance, Decimal::new(300000, 0));
    }

    #[test]
    fn test_category_totals_sorted_by_spend() {
        let dir = TempDir::new().unwrap();
        let (_, txs) = setup(&dir);

        txs.add_manual(entry("Lunch", 3000, true, "Food", 2)).unwrap();
        txs.add_manual(entry("Dinner", 7000, true, "Food", 9)).unwrap();
        txs.add_manual(entry("Taxi", 15000, true, "Transport", 10)).unwrap();
        txs.add_manual(entry("Salary", 500000, false, "Income", 1)).unwrap();
        txs.add_manual(entry("Old bus", 99999, true, "Transport", 30)).unwrap();

        let totals = txs
            .category_totals(
                NaiveDate::from_ymd_opt(2024, 4, 1),
                NaiveDate::from_ymd_opt(2024, 4, 20),
            )
            .unwrap();

        let names: Vec<&str> = totals.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(names, vec!["Transport", "Food", "Income"]);
        assert_eq!(totals[1].expenses, Decimal::new(10000, 0));
        assert_eq!(totals[1].count, 2);
        assert_eq!(totals[2].incomes, Decimal::new(500000, 0));
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let (_, txs) = setup(&dir);
        let tx = txs.add_manual(entry("Coffee", 900, true, "Food", 4)).unwrap();

        txs.remove(tx.id).unwrap();
        assert!(txs.list(&TransactionFilter::default()).unwrap().is_empty());
        assert!(matches!(txs.remove(tx.id), Err(Error::NotFound(_))));
    }
}
