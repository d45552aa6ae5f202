//! CLI command definitions and dispatch.

pub mod config;
pub mod listen;
pub mod serve;
pub mod token;

use clap::{Parser, Subcommand};

use creatorhub_core::AppError;
use creatorhub_core::config::AppConfig;

use crate::output::OutputFormat;

/// CreatorHub relay: real-time presence and notifications
#[derive(Debug, Parser)]
#[command(name = "creatorhub", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding `default.toml` and per-environment overlays
    #[arg(short, long, default_value = "config")]
    pub config_dir: String,

    /// Environment overlay to apply (e.g. `development`, `production`)
    #[arg(short, long, env = "CREATORHUB_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the relay server
    Serve(serve::ServeArgs),
    /// Mint a development access token
    Token(token::TokenArgs),
    /// Connect as a client and print every event
    Listen(listen::ListenArgs),
    /// Configuration inspection
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = self.load_config()?;
        match &self.command {
            Commands::Serve(args) => serve::execute(args, config).await,
            Commands::Token(args) => token::execute(args, &config, self.format),
            Commands::Listen(args) => listen::execute(args, &config).await,
            Commands::Config(args) => config::execute(args, &config, self.format),
        }
    }

    fn load_config(&self) -> Result<AppConfig, AppError> {
        AppConfig::load_from(&self.config_dir, &self.env)
    }
}
