//! Mint a development access token.

use clap::Args;
use serde::Serialize;

use creatorhub_auth::JwtEncoder;
use creatorhub_core::AppError;
use creatorhub_core::config::AppConfig;
use creatorhub_core::types::id::UserId;

use crate::output::{self, OutputFormat};

/// Arguments for the token command
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// User to issue the token for; a random id when omitted
    #[arg(short, long)]
    pub user: Option<uuid::Uuid>,

    /// Display name to embed
    #[arg(short = 'n', long)]
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
struct IssuedToken {
    user_id: UserId,
    token: String,
    expires_at: String,
}

/// Execute the token command
pub fn execute(args: &TokenArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let user_id = args.user.map(UserId::from_uuid).unwrap_or_default();
    let encoder = JwtEncoder::new(&config.auth);
    let (token, expires_at) = encoder.generate_access_token(user_id, args.username.as_deref())?;

    let issued = IssuedToken {
        user_id,
        token,
        expires_at: expires_at.to_rfc3339(),
    };

    match format {
        OutputFormat::Json => output::print_item(&issued, format),
        OutputFormat::Text => {
            output::print_success("Access token issued");
            output::print_kv("User", &issued.user_id.to_string());
            output::print_kv("Expires", &issued.expires_at);
            println!("{}", issued.token);
        }
    }
    Ok(())
}
