//! OTP delivery.
//!
//! Issuing a challenge hands the code to an `OtpNotifier`. The default
//! `LogOtpNotifier` only logs it, which is what local development needs; a
//! real deployment would implement the trait on top of an email or SMS sender.

use anyhow::Result;
use tracing::debug;

pub trait OtpNotifier: Send + Sync {
    /// Deliver `code` to `email`, or return an error if delivery failed.
    fn notify(&self, email: &str, code: &str) -> Result<()>;
}

/// Local dev notifier that logs the code instead of sending it.
#[derive(Clone, Debug)]
pub struct LogOtpNotifier;

impl OtpNotifier for LogOtpNotifier {
    fn notify(&self, email: &str, code: &str) -> Result<()> {
        debug!(email = %email, code = %code, "otp delivery stub");
        Ok(())
    }
}

#[cfg(test)]
pub use recording::RecordingNotifier;
