//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod card;
pub mod category;
mod parsed;
pub mod result;
mod transaction;

pub use card::{normalize_currency, Card, DEFAULT_CURRENCY};
pub use category::{
    is_classifier_category, normalize_category, Category, CategoryKind, OTHER_CATEGORY,
};
pub use parsed::{ClassifiedStatement, ParsedTransaction, StatementSummary};
pub use transaction::{Transaction, TransactionSource};
