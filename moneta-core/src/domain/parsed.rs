//! Statement rows produced by the classification service
//!
//! These records are transient: they live only for the review step between
//! a successful import and the user committing (or discarding) the rows.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reviewable transaction candidate decoded from a bank statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub id: Uuid,
    /// Whether the row will be committed; the user may untick it during review
    pub is_included: bool,
    pub date: NaiveDate,
    /// Display title, at most 60 characters
    pub title: String,
    /// Absolute amount
    pub amount: Decimal,
    pub is_expense: bool,
    /// Normalized category name
    pub category: String,
    pub bank: Option<String>,
    pub details: Option<String>,
    pub currency: Option<String>,
}

/// Per-category counts reported by the classifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementSummary {
    pub total_transactions: usize,
    pub by_category: BTreeMap<String, usize>,
}

/// Full outcome of classifying one statement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifiedStatement {
    /// Bank the classifier detected for the whole statement
    pub bank: Option<String>,
    /// Rows sorted newest first
    pub transactions: Vec<ParsedTransaction>,
    pub summary: Option<StatementSummary>,
    /// Records dropped for a missing or unparseable date or amount
    pub dropped: usize,
}

impl ClassifiedStatement {
    /// Rows the user kept ticked
    pub fn included(&self) -> impl Iterator<Item = &ParsedTransaction> {
        self.transactions.iter().filter(|t| t.is_included)
    }

    /// Sum of included expenses and incomes, as (expenses, incomes)
    pub fn totals(&self) -> (Decimal, Decimal) {
        self.included().fold((Decimal::ZERO, Decimal::ZERO), |(exp, inc), t| {
            if t.is_expense {
                (exp + t.amount, inc)
            } else {
                (exp, inc + t.amount)
            }
        })
    }
}
