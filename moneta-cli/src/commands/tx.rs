//! Tx command - list, add, remove and summarize transactions

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use colored::Colorize;
use moneta_core::ports::TransactionFilter;
use moneta_core::services::ManualEntry;
use rust_decimal::Decimal;

use super::{get_context, parse_amount, parse_date, parse_id};
use crate::output;

#[derive(Subcommand)]
pub enum TxCommands {
    /// List transactions, newest first
    List {
        /// From date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from: Option<String>,
        /// To date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: Option<String>,
        /// Only transactions on this card
        #[arg(long)]
        card: Option<String>,
        /// Only transactions in this category
        #[arg(long)]
        category: Option<String>,
        /// Maximum rows
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a transaction by hand
    Add {
        /// Title
        title: String,
        /// Amount (the sign is ignored)
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// Category name
        #[arg(long, default_value = "Other")]
        category: String,
        /// Record as income instead of an expense
        #[arg(long)]
        income: bool,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Card to book against
        #[arg(long)]
        card: Option<String>,
        /// Free-form note
        #[arg(long)]
        details: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a transaction
    Remove {
        /// Transaction ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Expense and income totals per category
    Summary {
        /// From date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from: Option<String>,
        /// To date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: TxCommands) -> Result<()> {
    let ctx = get_context()?;
    let txs = &ctx.transaction_service;

    match command {
        TxCommands::List {
            from,
            to,
            card,
            category,
            limit,
            json,
        } => {
            let filter = TransactionFilter {
                from: from.as_deref().map(parse_date).transpose()?,
                to: to.as_deref().map(parse_date).transpose()?,
                card_id: card.as_deref().map(|c| parse_id(c, "card")).transpose()?,
                category,
                limit: Some(limit),
            };
            let list = txs.list(&filter)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
                return Ok(());
            }
            if list.is_empty() {
                println!("No transactions found.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["ID", "Date", "Amount", "Title", "Category", "Source"]);
            for tx in &list {
                let amount = output::format_amount(tx.amount, tx.is_expense);
                let amount = if tx.is_expense { amount.red() } else { amount.green() };
                table.add_row(vec![
                    output::short_id(&tx.id),
                    tx.transaction_date.to_string(),
                    amount.to_string(),
                    tx.title.clone(),
                    tx.category.clone(),
                    tx.source.to_string(),
                ]);
            }
            println!("{}", table);
        }
        TxCommands::Add {
            title,
            amount,
            category,
            income,
            date,
            card,
            details,
            json,
        } => {
            let entry = ManualEntry {
                title,
                amount: parse_amount(&amount)?,
                is_expense: !income,
                category,
                date: match date {
                    Some(d) => parse_date(&d)?,
                    None => Utc::now().date_naive(),
                },
                card_id: card.as_deref().map(|c| parse_id(c, "card")).transpose()?,
                details,
            };
            let tx = txs.add_manual(entry)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&tx)?);
            } else {
                output::success(&format!(
                    "✓ Added {} {} ({})",
                    tx.title,
                    output::format_amount(tx.amount, tx.is_expense),
                    tx.category
                ));
                println!("  ID: {}", tx.id);
            }
        }
        TxCommands::Remove { id, json } => {
            let id = parse_id(&id, "transaction")?;
            txs.remove(id)?;
            if json {
                println!("{}", serde_json::json!({ "removed": id }));
            } else {
                output::success("✓ Transaction removed");
            }
        }
        TxCommands::Summary { from, to, json } => {
            let totals = txs.category_totals(
                from.as_deref().map(parse_date).transpose()?,
                to.as_deref().map(parse_date).transpose()?,
            )?;

            if json {
                println!("{}", serde_json::to_string_pretty(&totals)?);
                return Ok(());
            }
            if totals.is_empty() {
                println!("No transactions in this period.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Category", "Expenses", "Income", "Count"]);
            let (mut spent, mut earned) = (Decimal::ZERO, Decimal::ZERO);
            for total in &totals {
                spent += total.expenses;
                earned += total.incomes;
                table.add_row(vec![
                    total.category.clone(),
                    output::format_balance(total.expenses),
                    output::format_balance(total.incomes),
                    total.count.to_string(),
                ]);
            }
            println!("{}", table);
            println!(
                "{} {}   {} {}",
                "Spent:".bold(),
                output::format_balance(spent).red(),
                "Earned:".bold(),
                output::format_balance(earned).green()
            );
        }
    }

    Ok(())
}
