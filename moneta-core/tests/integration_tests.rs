//! Integration tests for moneta-core services
//!
//! These tests run the import -> review -> commit flow against a real DuckDB
//! ledger. The classification server is replaced at the trait level.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

use moneta_core::config::Config;
use moneta_core::domain::{ClassifiedStatement, ParsedTransaction, StatementSummary};
use moneta_core::ports::{StatementClassifier, TransactionFilter};
use moneta_core::services::NewCard;
use moneta_core::{ImportError, MonetaContext};

// ============================================================================
// Test Helpers
// ============================================================================

/// Classifier that answers every call with the same statement
struct CannedClassifier {
    statement: ClassifiedStatement,
    calls: AtomicUsize,
}

impl StatementClassifier for CannedClassifier {
    fn name(&self) -> &str {
        "canned"
    }

    fn classify(&self, _file_bytes: &[u8], _filename: &str) -> Result<ClassifiedStatement, ImportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.statement.clone())
    }
}

fn parsed(title: &str, amount: i64, is_expense: bool, category: &str, date: (i32, u32, u32)) -> ParsedTransaction {
    ParsedTransaction {
        id: Uuid::new_v4(),
        is_included: true,
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        title: title.to_string(),
        amount: Decimal::new(amount, 0),
        is_expense,
        category: category.to_string(),
        bank: Some("Kaspi".to_string()),
        details: None,
        currency: Some("KZT".to_string()),
    }
}

fn march_statement() -> ClassifiedStatement {
    ClassifiedStatement {
        bank: Some("Kaspi".to_string()),
        transactions: vec![
            parsed("Salary", 450000, false, "Income", (2024, 3, 25)),
            parsed("Magnum", 12500, true, "Food", (2024, 3, 12)),
            parsed("Yandex Go", 2300, true, "Transport", (2024, 3, 12)),
            parsed("Kino.kz", 4000, true, "Entertainment", (2024, 3, 2)),
        ],
        summary: Some(StatementSummary {
            total_transactions: 5,
            ..Default::default()
        }),
        dropped: 1,
    }
}

fn create_context(temp_dir: &TempDir) -> (MonetaContext, Arc<CannedClassifier>) {
    let classifier = Arc::new(CannedClassifier {
        statement: march_statement(),
        calls: AtomicUsize::new(0),
    });
    let ctx = MonetaContext::with_classifier(temp_dir.path(), Config::default(), classifier.clone())
        .expect("Failed to create context");
    (ctx, classifier)
}

fn write_statement(temp_dir: &TempDir, name: &str) -> PathBuf {
    let path = temp_dir.path().join(name);
    std::fs::write(&path, b"%PDF-1.4 statement").unwrap();
    path
}

// ============================================================================
// Import Flow Tests
// ============================================================================

#[test]
fn test_import_review_commit_flow() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, classifier) = create_context(&temp_dir);

    let card = ctx
        .card_service
        .add(NewCard {
            name: "Kaspi Gold".to_string(),
            balance: Some(Decimal::new(100000, 0)),
            ..Default::default()
        })
        .unwrap();

    let path = write_statement(&temp_dir, "march.pdf");
    let statement = ctx.import_service.import_statement_detailed(&path).unwrap();
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    assert_eq!(statement.dropped, 1);

    // The user unticks the cinema row during review
    let mut rows = statement.transactions;
    rows.iter_mut()
        .filter(|r| r.title == "Kino.kz")
        .for_each(|r| r.is_included = false);

    let result = ctx.import_service.commit(&rows, Some(card.id)).unwrap();
    assert_eq!(result.imported, 3);
    assert_eq!(result.excluded, 1);
    assert_eq!(result.skipped_duplicates, 0);

    // 100000 + 450000 - 12500 - 2300
    let card = ctx.card_service.get(card.id).unwrap();
    assert_eq!(card.balance, Decimal::new(535200, 0));

    let listed = ctx
        .transaction_service
        .list(&TransactionFilter {
            card_id: Some(card.id),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].title, "Salary");
}

#[test]
fn test_reimporting_same_statement_skips_everything() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    let path = write_statement(&temp_dir, "march.pdf");

    let first = ctx.import_service.import_statement(&path).unwrap();
    ctx.import_service.commit(&first, None).unwrap();

    let second = ctx.import_service.import_statement(&path).unwrap();
    let result = ctx.import_service.commit(&second, None).unwrap();
    assert_eq!(result.imported, 0);
    assert_eq!(result.skipped_duplicates, 4);

    let all = ctx
        .transaction_service
        .list(&TransactionFilter::default())
        .unwrap();
    assert_eq!(all.len(), 4);
}

#[test]
fn test_rejected_file_leaves_ledger_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, classifier) = create_context(&temp_dir);
    let path = write_statement(&temp_dir, "march.docx");

    let err = ctx.import_service.import_statement(&path).unwrap_err();
    assert!(matches!(err, ImportError::UnsupportedFormat));
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_summary_after_import() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    let path = write_statement(&temp_dir, "march.pdf");

    let rows = ctx.import_service.import_statement(&path).unwrap();
    ctx.import_service.commit(&rows, None).unwrap();

    let totals = ctx
        .transaction_service
        .category_totals(NaiveDate::from_ymd_opt(2024, 3, 1), NaiveDate::from_ymd_opt(2024, 3, 31))
        .unwrap();
    let names: Vec<&str> = totals.iter().map(|t| t.category.as_str()).collect();
    assert_eq!(names, vec!["Food", "Entertainment", "Transport", "Income"]);
}

#[test]
fn test_removing_category_after_import() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    let path = write_statement(&temp_dir, "march.pdf");

    let rows = ctx.import_service.import_statement(&path).unwrap();
    ctx.import_service.commit(&rows, None).unwrap();

    let food = ctx.category_service.find("Food").unwrap().unwrap();
    let removal = ctx.category_service.remove(food.id).unwrap();
    assert_eq!(removal.relabeled, 1);

    let other = ctx
        .transaction_service
        .list(&TransactionFilter {
            category: Some("Other".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(other.len(), 1);
    assert_eq!(other[0].title, "Magnum");
}

// ============================================================================
// Shared Repository Tests
// ============================================================================

/// Commits racing on one card keep dedupe and the balance consistent
#[test]
fn test_concurrent_commits_share_one_ledger() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    let ctx = Arc::new(ctx);

    let card = ctx
        .card_service
        .add(NewCard {
            name: "Kaspi Gold".to_string(),
            balance: Some(Decimal::new(10000, 0)),
            ..Default::default()
        })
        .unwrap();
    let card_id = card.id;
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut rows: Vec<ParsedTransaction> = (1..=5)
                    .map(|d| parsed(&format!("Shop {} {}", i, d), 100 * d as i64, true, "Shopping", (2024, 5, d)))
                    .collect();
                // Every thread carries the same statement row
                rows.push(parsed("Same coffee", 50, true, "Food", (2024, 5, 10)));
                barrier.wait();
                ctx.import_service.commit(&rows, Some(card_id)).unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let imported: usize = results.iter().map(|r| r.imported).sum();
    let skipped: usize = results.iter().map(|r| r.skipped_duplicates).sum();
    assert_eq!(imported, 21);
    assert_eq!(skipped, 3);

    let stored = ctx
        .transaction_service
        .list(&TransactionFilter::default())
        .unwrap();
    assert_eq!(stored.len(), 21);
    assert_eq!(stored.iter().filter(|t| t.title == "Same coffee").count(), 1);

    let ledger_total: Decimal = stored.iter().map(|t| t.signed_amount()).sum();
    let balance = ctx.card_service.get(card_id).unwrap().balance;
    assert_eq!(ledger_total, Decimal::new(-6050, 0));
    assert_eq!(balance, Decimal::new(10000, 0) + ledger_total);
}

#[test]
fn test_context_reopens_existing_ledger() {
    let temp_dir = TempDir::new().unwrap();
    {
        let (ctx, _) = create_context(&temp_dir);
        ctx.card_service
            .add(NewCard {
                name: "Visa".to_string(),
                ..Default::default()
            })
            .unwrap();
    }

    let (ctx, _) = create_context(&temp_dir);
    assert_eq!(ctx.card_service.list().unwrap().len(), 1);
    // Seeded categories are not duplicated on reopen
    assert_eq!(ctx.category_service.list().unwrap().len(), 9);
}
