//! CLI command implementations

pub mod card;
pub mod category;
pub mod config;
pub mod import;
pub mod logs;
pub mod tx;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use moneta_core::services::{EntryPoint, LogEvent, LoggingService};
use moneta_core::MonetaContext;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let moneta_dir = get_moneta_dir().ok()?;
    std::fs::create_dir_all(&moneta_dir).ok()?;
    LoggingService::new(&moneta_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the moneta directory from environment or default
pub fn get_moneta_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("MONETA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".moneta"))
        .ok_or_else(|| anyhow!("Could not find home directory; set MONETA_DIR"))
}

/// Get or create the moneta context
pub fn get_context() -> Result<MonetaContext> {
    let moneta_dir = get_moneta_dir()?;
    std::fs::create_dir_all(&moneta_dir)
        .with_context(|| format!("Failed to create moneta directory: {:?}", moneta_dir))?;

    MonetaContext::new(&moneta_dir).context("Failed to initialize moneta context")
}

pub fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| anyhow!("Invalid {} ID: {}", what, raw))
}

/// Dates on the command line are ISO `YYYY-MM-DD`
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow!("Invalid date '{}', expected YYYY-MM-DD", raw))
}

pub fn parse_amount(raw: &str) -> Result<Decimal> {
    raw.trim()
        .replace(',', ".")
        .parse::<Decimal>()
        .map_err(|_| anyhow!("Invalid amount: {}", raw))
}
