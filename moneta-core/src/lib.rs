//! Moneta Core - Business logic for statement import and expense tracking
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Card, Category, Transaction, ParsedTransaction)
//! - **ports**: Trait definitions for external dependencies (Repository, StatementClassifier, FileAccess)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB, classification API, local files)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::classifier_api::ClassifierClient;
use adapters::duckdb::DuckDbRepository;
use adapters::local_files::LocalFileAccess;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, ImportError, OperationResult};
pub use domain::{Card, Category, ClassifiedStatement, ParsedTransaction, Transaction};

/// Main context for Moneta operations
///
/// Holds the ledger connection, configuration, and all services.
pub struct MonetaContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub import_service: ImportService,
    pub card_service: CardService,
    pub category_service: CategoryService,
    pub transaction_service: TransactionService,
}

impl MonetaContext {
    /// Create a context rooted at the data directory
    pub fn new(moneta_dir: &Path) -> Result<Self> {
        let config = Config::load(moneta_dir)?;
        let classifier = ClassifierClient::new(&config.classifier_url())?;
        Self::with_classifier(moneta_dir, config, Arc::new(classifier))
    }

    /// Create a context with an explicit classifier backend
    pub fn with_classifier(
        moneta_dir: &Path,
        config: Config,
        classifier: Arc<dyn ports::StatementClassifier>,
    ) -> Result<Self> {
        std::fs::create_dir_all(moneta_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&moneta_dir.join("moneta.duckdb"))?);
        repository.ensure_schema()?;

        let repo: Arc<dyn ports::Repository> = repository.clone();
        let import_service =
            ImportService::new(classifier, Arc::new(LocalFileAccess::new()), Arc::clone(&repo));
        let card_service = CardService::new(Arc::clone(&repo));
        let category_service = CategoryService::new(Arc::clone(&repo));
        let transaction_service = TransactionService::new(repo);

        Ok(Self {
            config,
            repository,
            import_service,
            card_service,
            category_service,
            transaction_service,
        })
    }
}
