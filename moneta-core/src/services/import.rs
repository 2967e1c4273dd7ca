//! Import service - bank statement import and review commit

use std::path::Path;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::{ImportError, Result};
use crate::domain::{Category, ClassifiedStatement, ParsedTransaction, Transaction, OTHER_CATEGORY};
use crate::ports::{FileAccess, Repository, ScopedAccess, StatementClassifier};

/// Only PDF statements are accepted
const SUPPORTED_EXTENSION: &str = "pdf";

/// Outcome of committing reviewed rows
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommitResult {
    pub imported: usize,
    /// Rows whose fingerprint was already in the ledger
    pub skipped_duplicates: usize,
    /// Rows the user unticked during review
    pub excluded: usize,
    /// Net change applied to the card balance, if a card was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_change: Option<Decimal>,
}

/// Statement import: file -> classifier -> reviewable rows -> ledger
pub struct ImportService {
    classifier: Arc<dyn StatementClassifier>,
    files: Arc<dyn FileAccess>,
    repository: Arc<dyn Repository>,
}

impl ImportService {
    pub fn new(
        classifier: Arc<dyn StatementClassifier>,
        files: Arc<dyn FileAccess>,
        repository: Arc<dyn Repository>,
    ) -> Self {
        Self {
            classifier,
            files,
            repository,
        }
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Import a statement file and return its rows, newest first
    pub fn import_statement(&self, path: &Path) -> std::result::Result<Vec<ParsedTransaction>, ImportError> {
        Ok(self.import_statement_detailed(path)?.transactions)
    }

    /// Import a statement file, keeping the statement-level bank, summary
    /// and drop count alongside the rows
    pub fn import_statement_detailed(
        &self,
        path: &Path,
    ) -> std::result::Result<ClassifiedStatement, ImportError> {
        if !has_supported_extension(path) {
            return Err(ImportError::UnsupportedFormat);
        }

        let bytes = {
            let access = ScopedAccess::acquire(self.files.as_ref(), path)?;
            access.read_all()?
        };

        if bytes.is_empty() {
            return Err(ImportError::EmptyFile);
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "statement.pdf".to_string());

        self.classifier.classify(&bytes, &filename)
    }

    /// Persist the included rows as statement transactions
    ///
    /// Rows already in the ledger (same fingerprint) are skipped. When a
    /// card is given its balance moves by the committed amounts. Dedupe,
    /// inserts and the balance update happen in one repository call, so
    /// concurrent commits cannot double-insert or lose a balance update.
    ///
    /// A category the user has since removed lands in `Other`.
    pub fn commit(&self, items: &[ParsedTransaction], card_id: Option<Uuid>) -> Result<CommitResult> {
        let categories = self.repository.get_categories()?;

        let candidates: Vec<Transaction> = items
            .iter()
            .filter(|item| item.is_included)
            .map(|item| {
                let mut tx = Transaction::from_parsed(item, card_id);
                tx.category = stored_category(&categories, &tx.category);
                tx
            })
            .collect();
        let excluded = items.len() - candidates.len();

        let batch = self.repository.commit_transactions(&candidates, card_id)?;

        Ok(CommitResult {
            imported: batch.inserted,
            skipped_duplicates: batch.skipped_duplicates,
            excluded,
            balance_change: batch.balance_change,
        })
    }
}

/// Stored spelling of `name`, or `Other` when no such category exists
fn stored_category(categories: &[Category], name: &str) -> String {
    let wanted = name.trim().to_lowercase();
    categories
        .iter()
        .find(|c| c.name.to_lowercase() == wanted)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| OTHER_CATEGORY.to_string())
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(SUPPORTED_EXTENSION))
        .unwrap_or(false)
}
