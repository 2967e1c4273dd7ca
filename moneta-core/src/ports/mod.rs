//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod classifier;
mod file_access;
mod repository;

pub use classifier::StatementClassifier;
pub use file_access::{FileAccess, ScopedAccess};
pub use repository::{BatchCommit, Repository, TransactionFilter};
