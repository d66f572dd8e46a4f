//! CLI for the rcall remote-call layer.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rcall_core::config;

use commands::{run_config, run_get, run_probe};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rcall")]
#[command(about = "rcall: resilient calls against a remote backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Check that the backend answers on its health path (single attempt).
    Probe {
        /// Backend base URL; overrides `base_url` from config.
        url: Option<String>,
    },

    /// GET a JSON resource through the retry executor and print it.
    Get {
        /// Path relative to the base URL, or an absolute URL.
        path: String,

        /// Attempts for this call (default from config).
        #[arg(long, value_name = "N")]
        retries: Option<u32>,

        /// Print the health report as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show the config file path and effective configuration.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Probe { url } => {
                if url.is_some() {
                    cfg.base_url = url;
                }
                run_probe(&cfg).await?
            }
            CliCommand::Get {
                path,
                retries,
                json,
            } => {
                if let Some(n) = retries {
                    cfg.retry.max_retries = n;
                }
                run_get(&cfg, &path, json).await?
            }
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
