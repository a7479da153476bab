//! Background reclamation of expired OTP challenges.

use super::{OAuthTokenCache, OtpStore, TokenStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;

/// Spawn a task that sweeps `otp` every `every` and logs the OAuth cache status.
///
/// The sweep only frees memory; `OtpStore::verify` checks expiry on its own.
/// The task runs until its handle is aborted.
pub fn spawn_sweeper(
    otp: Arc<OtpStore>,
    oauth: Arc<OAuthTokenCache>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    let every = if every.is_zero() {
        Duration::from_secs(1)
    } else {
        every
    };

    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let removed = otp.sweep();
            if removed > 0 {
                info!(removed, remaining = otp.len(), "expired otp challenges swept");
            }

            log_token_status(&oauth);
        }
    })
}

fn log_token_status(oauth: &OAuthTokenCache) {
    let report = oauth.status_report();
    if report.is_empty() {
        debug!("no oauth tokens cached");
        return;
    }

    let expired = report
        .iter()
        .filter(|line| line.status == TokenStatus::Expired)
        .count();

    debug!(total = report.len(), expired, "oauth token status");

    for line in &report {
        debug!(
            user_id = %line.user_id,
            email = %line.email,
            status = ?line.status,
            expires_at = %line.expires_at,
            "oauth token"
        );
    }
}
