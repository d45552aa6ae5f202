//! Configuration inspection commands.

use clap::{Args, Subcommand};

use creatorhub_core::AppError;
use creatorhub_core::config::AppConfig;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration with secrets masked
    Show,
}

/// Execute config commands
pub fn execute(args: &ConfigArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            output::print_item(&masked(config), format);
        }
    }
    Ok(())
}

fn masked(config: &AppConfig) -> AppConfig {
    let mut config = config.clone();
    config.auth.jwt_secret = mask(&config.auth.jwt_secret);
    config.auth.static_tokens = std::mem::take(&mut config.auth.static_tokens)
        .into_values()
        .enumerate()
        .map(|(i, user)| (format!("{}{i}", mask("token")), user))
        .collect();
    if let Some(key) = config.realtime.producer_key.as_mut() {
        *key = mask(key);
    }
    config
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "********".to_string()
    }
}
