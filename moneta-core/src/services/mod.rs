//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod card;
mod category;
pub mod import;
pub mod logging;
pub mod migration;
mod transaction;

pub use card::{CardService, NewCard};
pub use category::{CategoryRemoval, CategoryService};
pub use import::{CommitResult, ImportService};
pub use logging::{EntryPoint, EventCount, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use transaction::{CategoryTotal, ManualEntry, TransactionService};
