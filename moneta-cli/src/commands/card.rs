//! Card command - manage cards

use anyhow::Result;
use clap::Subcommand;
use dialoguer::{Confirm, Input};
use moneta_core::services::NewCard;

use super::{get_context, parse_amount, parse_id};
use crate::output;

#[derive(Subcommand)]
pub enum CardCommands {
    /// Add a card
    Add {
        /// Card name (prompted if omitted)
        name: Option<String>,
        /// Issuing bank
        #[arg(long)]
        bank: Option<String>,
        /// Last four digits of the card number
        #[arg(long)]
        last_four: Option<String>,
        /// Opening balance
        #[arg(long, allow_hyphen_values = true)]
        balance: Option<String>,
        /// Three-letter currency code
        #[arg(long)]
        currency: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List cards
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a card
    Rename {
        /// Card ID
        id: String,
        /// New name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a card's balance
    Balance {
        /// Card ID
        id: String,
        /// New balance
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a card (its transactions are kept)
    Remove {
        /// Card ID
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: CardCommands) -> Result<()> {
    let ctx = get_context()?;
    let cards = &ctx.card_service;

    match command {
        CardCommands::Add {
            name,
            bank,
            last_four,
            balance,
            currency,
            json,
        } => {
            let name = match name {
                Some(n) => n,
                None => Input::new().with_prompt("Card name").interact_text()?,
            };
            let balance = balance.as_deref().map(parse_amount).transpose()?;

            let card = cards.add(NewCard {
                name,
                bank,
                last_four,
                balance,
                currency,
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&card)?);
            } else {
                output::success(&format!("✓ Added card {}", card.label()));
                println!("  ID: {}", card.id);
            }
        }
        CardCommands::List { json } => {
            let list = cards.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
                return Ok(());
            }
            if list.is_empty() {
                println!("No cards yet. Add one with `mn card add`.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["ID", "Card", "Bank", "Balance", "Currency"]);
            for card in &list {
                table.add_row(vec![
                    card.id.to_string(),
                    card.label(),
                    card.bank.clone().unwrap_or_else(|| "-".to_string()),
                    output::format_balance(card.balance),
                    card.currency.clone(),
                ]);
            }
            println!("{}", table);
        }
        CardCommands::Rename { id, name, json } => {
            let card = cards.rename(parse_id(&id, "card")?, &name)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&card)?);
            } else {
                output::success(&format!("✓ Renamed card to {}", card.name));
            }
        }
        CardCommands::Balance { id, amount, json } => {
            let card = cards.set_balance(parse_id(&id, "card")?, parse_amount(&amount)?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&card)?);
            } else {
                output::success(&format!(
                    "✓ {} balance set to {} {}",
                    card.label(),
                    output::format_balance(card.balance),
                    card.currency
                ));
            }
        }
        CardCommands::Remove { id, force, json } => {
            let card = cards.get(parse_id(&id, "card")?)?;

            if !force && !json {
                let prompt = format!(
                    "Remove card '{}'? Its transactions will be kept without a card.",
                    card.label()
                );
                if !Confirm::new().with_prompt(prompt).default(false).interact()? {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            cards.remove(card.id)?;
            if json {
                println!("{}", serde_json::json!({ "removed": card.id }));
            } else {
                output::success(&format!("✓ Removed card {}", card.label()));
            }
        }
    }

    Ok(())
}
