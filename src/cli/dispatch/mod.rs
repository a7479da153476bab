use crate::cli::actions::{server::Args, Action};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let jwt_secret = matches
        .get_one::<String>("jwt-secret")
        .map(|secret| SecretString::from(secret.as_str()))
        .context("missing required argument: --jwt-secret")?;

    Ok(Action::Server(Args {
        port,
        jwt_secret,
        token_ttl_seconds: matches.get_one::<i64>("token-ttl").copied(),
        otp_ttl_seconds: matches.get_one::<i64>("otp-ttl").copied(),
        sweep_interval_seconds: matches.get_one::<u64>("sweep-interval").copied(),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn test_handler_builds_server_action() {
        temp_env::with_vars_unset(["IDP_TOKEN_TTL_SECONDS", "IDP_SWEEP_INTERVAL_SECONDS"], || {
            let matches = commands::new().get_matches_from(vec![
                "idp",
                "--port",
                "3000",
                "--jwt-secret",
                "s3cr3t",
                "--otp-ttl",
                "30",
            ]);

            let Action::Server(args) = handler(&matches).unwrap();

            assert_eq!(args.port, 3000);
            assert_eq!(args.jwt_secret.expose_secret(), "s3cr3t");
            assert_eq!(args.otp_ttl_seconds, Some(30));
            assert_eq!(args.token_ttl_seconds, Some(86400));
            assert_eq!(args.sweep_interval_seconds, Some(60));
        });
    }
}
