use crate::idp::{self, signer::JwtSigner, state::IdpConfig};
use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub jwt_secret: SecretString,
    pub token_ttl_seconds: Option<i64>,
    pub otp_ttl_seconds: Option<i64>,
    pub sweep_interval_seconds: Option<u64>,
}

impl Args {
    fn config(&self) -> IdpConfig {
        let mut config = IdpConfig::new();
        if let Some(seconds) = self.token_ttl_seconds {
            config = config.with_token_ttl_seconds(seconds);
        }
        if let Some(seconds) = self.otp_ttl_seconds {
            config = config.with_otp_ttl_seconds(seconds);
        }
        if let Some(seconds) = self.sweep_interval_seconds {
            config = config.with_sweep_interval_seconds(seconds);
        }
        config.normalize()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.config();

    info!(
        "{} {} - {}\n  listen: tcp:{}\n  token_ttl: {}s\n  otp_ttl: {}s\n  sweep_interval: {}s",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH),
        args.port,
        config.token_ttl_seconds(),
        config.otp_ttl_seconds(),
        config.sweep_interval().as_secs(),
    );

    let signer = Arc::new(JwtSigner::new(&args.jwt_secret, config.token_ttl_seconds()));

    idp::new(args.port, config, signer).await
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
