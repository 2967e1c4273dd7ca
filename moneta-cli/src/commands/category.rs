//! Category command - manage categories

use anyhow::{anyhow, Result};
use clap::Subcommand;
use dialoguer::Confirm;
use moneta_core::domain::CategoryKind;
use moneta_core::MonetaContext;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List categories
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a category
    Add {
        /// Category name
        name: String,
        /// expense or income
        #[arg(long, default_value = "expense")]
        kind: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a category; its transactions follow
    Rename {
        /// Current name
        name: String,
        /// New name
        new_name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a category; its transactions move to Other
    Remove {
        /// Category name
        name: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn find_id(ctx: &MonetaContext, name: &str) -> Result<uuid::Uuid> {
    ctx.category_service
        .find(name)?
        .map(|c| c.id)
        .ok_or_else(|| anyhow!("Category not found: {}", name))
}

pub fn run(command: CategoryCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        CategoryCommands::List { json } => {
            let categories = ctx.category_service.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Name", "Kind"]);
            for category in &categories {
                table.add_row(vec![category.name.clone(), category.kind.to_string()]);
            }
            println!("{}", table);
        }
        CategoryCommands::Add { name, kind, json } => {
            let kind: CategoryKind = kind.parse().map_err(|e: String| anyhow!(e))?;
            let category = ctx.category_service.add(&name, kind)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&category)?);
            } else {
                output::success(&format!("✓ Added {} category {}", category.kind, category.name));
            }
        }
        CategoryCommands::Rename {
            name,
            new_name,
            json,
        } => {
            let id = find_id(&ctx, &name)?;
            let category = ctx.category_service.rename(id, &new_name)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&category)?);
            } else {
                output::success(&format!("✓ Renamed {} to {}", name, category.name));
            }
        }
        CategoryCommands::Remove { name, force, json } => {
            let id = find_id(&ctx, &name)?;

            if !force && !json {
                let prompt = format!("Remove category '{}'? Its transactions move to Other.", name);
                if !Confirm::new().with_prompt(prompt).default(false).interact()? {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let removal = ctx.category_service.remove(id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&removal)?);
            } else {
                output::success(&format!("✓ Removed {}", removal.name));
                if removal.relabeled > 0 {
                    println!("  {} transaction(s) moved to Other", removal.relabeled);
                }
            }
        }
    }

    Ok(())
}
