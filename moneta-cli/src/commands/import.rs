//! Import command - classify a PDF statement, review it and commit

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Confirm, MultiSelect};
use indicatif::{ProgressBar, ProgressStyle};
use moneta_core::services::LogEvent;
use moneta_core::ClassifiedStatement;

use super::{get_context, get_logger, log_event, parse_id};
use crate::output;

/// Rows shown in the preview table before truncating
const PREVIEW_ROWS: usize = 20;

pub fn run(file: &Path, preview: bool, all: bool, card: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();
    let classifier = ctx.import_service.classifier_name().to_string();

    let card = match card {
        Some(raw) => Some(ctx.card_service.get(parse_id(raw, "card")?)?),
        None => None,
    };

    let spinner = (!json && atty::is(atty::Stream::Stdout)).then(|| {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Classifying statement...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let outcome = ctx.import_service.import_statement_detailed(file);
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let mut statement = match outcome {
        Ok(statement) => statement,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("import_failed")
                    .with_command("import")
                    .with_classifier(&classifier)
                    .with_error(e.to_string()),
            );
            return Err(e.into());
        }
    };

    if preview {
        if json {
            println!("{}", serde_json::to_string_pretty(&statement)?);
        } else {
            output::warning("PREVIEW MODE - No changes applied");
            println!();
            print_statement(&statement);
        }
        return Ok(());
    }

    let interactive = !all && !json && atty::is(atty::Stream::Stdin);
    if interactive {
        print_statement(&statement);
        if statement.transactions.is_empty() {
            return Ok(());
        }

        let labels: Vec<String> = statement
            .transactions
            .iter()
            .map(|t| {
                format!(
                    "{}  {:>14}  {}  [{}]",
                    t.date,
                    output::format_amount(t.amount, t.is_expense),
                    t.title,
                    t.category
                )
            })
            .collect();
        let defaults = vec![true; labels.len()];
        let chosen = MultiSelect::new()
            .with_prompt("Select transactions to import (space toggles, enter confirms)")
            .items(&labels)
            .defaults(&defaults)
            .interact()?;

        for (i, row) in statement.transactions.iter_mut().enumerate() {
            row.is_included = chosen.contains(&i);
        }

        let (expenses, incomes) = statement.totals();
        let prompt = format!(
            "Import {} transaction(s)? Expenses {}, income {}",
            chosen.len(),
            output::format_amount(expenses, true),
            output::format_amount(incomes, false)
        );
        if !Confirm::new().with_prompt(prompt).default(true).interact()? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let result = ctx
        .import_service
        .commit(&statement.transactions, card.as_ref().map(|c| c.id))?;

    log_event(
        &logger,
        LogEvent::new("import_completed")
            .with_command("import")
            .with_classifier(&classifier),
    );

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "bank": statement.bank,
                "dropped": statement.dropped,
                "result": result,
            }))?
        );
        return Ok(());
    }

    output::success(&format!("✓ Imported {} transaction(s)", result.imported));
    if result.skipped_duplicates > 0 {
        println!("  Skipped {} already imported", result.skipped_duplicates);
    }
    if result.excluded > 0 {
        println!("  Left out {} during review", result.excluded);
    }
    if let (Some(card), Some(change)) = (&card, result.balance_change) {
        println!(
            "  {} balance {} {}",
            card.label(),
            "→".dimmed(),
            output::format_balance(card.balance + change)
        );
    }

    Ok(())
}

fn print_statement(statement: &ClassifiedStatement) {
    if let Some(bank) = &statement.bank {
        output::info(&format!("Bank: {}", bank));
    }

    if statement.transactions.is_empty() {
        println!("No transactions found in the statement.");
    } else {
        let mut table = output::create_table();
        table.set_header(vec!["Date", "Amount", "Title", "Category"]);
        for tx in statement.transactions.iter().take(PREVIEW_ROWS) {
            table.add_row(vec![
                tx.date.to_string(),
                output::format_amount(tx.amount, tx.is_expense),
                tx.title.clone(),
                tx.category.clone(),
            ]);
        }
        println!("{}", table);
        if statement.transactions.len() > PREVIEW_ROWS {
            println!("... and {} more", statement.transactions.len() - PREVIEW_ROWS);
        }
    }

    let (expenses, incomes) = statement.totals();
    println!(
        "{} rows, expenses {}, income {}",
        statement.transactions.len(),
        output::format_amount(expenses, true).red(),
        output::format_amount(incomes, false).green()
    );
    if statement.dropped > 0 {
        output::warning(&format!(
            "{} row(s) skipped: missing or unreadable date or amount",
            statement.dropped
        ));
    }
}
