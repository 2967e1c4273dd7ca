//! Moneta CLI - bank statements and expenses in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{card, category, config, import, logs, tx};

/// Moneta - bank statements and expenses in your terminal
#[derive(Parser)]
#[command(name = "mn", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a PDF bank statement through the classification service
    Import {
        /// Path to the statement PDF
        file: PathBuf,
        /// Show the classified rows without committing anything
        #[arg(long)]
        preview: bool,
        /// Commit every row without the review prompt
        #[arg(long)]
        all: bool,
        /// Card to book the transactions against
        #[arg(long)]
        card: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage cards
    Card {
        #[command(subcommand)]
        command: card::CardCommands,
    },

    /// Manage categories
    Category {
        #[command(subcommand)]
        command: category::CategoryCommands,
    },

    /// List, add and summarize transactions
    Tx {
        #[command(subcommand)]
        command: tx::TxCommands,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    /// Command name recorded in the event log
    fn name(&self) -> &'static str {
        match self {
            Commands::Import { .. } => "import",
            Commands::Card { .. } => "card",
            Commands::Category { .. } => "category",
            Commands::Tx { .. } => "tx",
            Commands::Config { .. } => "config",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logger = commands::get_logger();
    commands::log_event(
        &logger,
        moneta_core::services::LogEvent::new("command_executed").with_command(cli.command.name()),
    );

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import { file, preview, all, card, json } => {
            import::run(&file, preview, all, card.as_deref(), json)
        }
        Commands::Card { command } => card::run(command),
        Commands::Category { command } => category::run(command),
        Commands::Tx { command } => tx::run(command),
        Commands::Config { command } => config::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
