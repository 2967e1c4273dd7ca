//! Config command - show settings and switch classifier environment

use anyhow::{anyhow, Result};
use clap::Subcommand;
use colored::Colorize;
use moneta_core::config::{Config, Environment};

use super::get_moneta_dir;
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Select the classification server environment
    Env {
        /// production or development
        environment: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let moneta_dir = get_moneta_dir()?;

    match command {
        ConfigCommands::Show { json } => {
            let config = Config::load(&moneta_dir)?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "dataDir": moneta_dir.to_string_lossy(),
                        "environment": config.effective_environment(),
                        "classifierUrl": config.classifier_url(),
                        "source": config.url_source(),
                    }))?
                );
                return Ok(());
            }

            println!("{}", "Configuration".bold());
            println!("  Data directory: {}", moneta_dir.display());
            println!("  Environment:    {}", config.effective_environment());
            println!(
                "  Classifier:     {} {}",
                config.classifier_url(),
                format!("({:?})", config.url_source()).dimmed()
            );
        }
        ConfigCommands::Env { environment, json } => {
            let environment: Environment = environment.parse().map_err(|e: String| anyhow!(e))?;

            let mut config = Config::load_settings(&moneta_dir)?;
            config.set_environment(environment);
            config.save(&moneta_dir)?;

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "environment": environment,
                        "classifierUrl": environment.base_url(),
                    })
                );
            } else {
                output::success(&format!(
                    "✓ Classifier environment set to {} ({})",
                    environment,
                    environment.base_url()
                ));
                if std::env::var(moneta_core::config::ENVIRONMENT_ENV).is_ok()
                    || std::env::var(moneta_core::config::CLASSIFIER_URL_ENV).is_ok()
                {
                    output::warning("Note: an environment variable override is currently active");
                }
            }
        }
    }

    Ok(())
}
