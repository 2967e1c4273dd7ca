//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use rust_decimal::Decimal;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format an absolute amount with its direction, e.g. `-1 250.00`
pub fn format_amount(amount: Decimal, is_expense: bool) -> String {
    let sign = if is_expense { "-" } else { "+" };
    format!("{}{}", sign, group_thousands(amount.abs().round_dp(2)))
}

/// Format a signed balance
pub fn format_balance(amount: Decimal) -> String {
    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    format!("{}{}", sign, group_thousands(amount.abs().round_dp(2)))
}

fn group_thousands(amount: Decimal) -> String {
    let text = format!("{:.2}", amount);
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    format!("{}.{}", grouped, frac_part)
}

/// Shorten an ID for table display
pub fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}
