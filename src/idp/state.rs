//! Server configuration and the shared state handed to every handler.

use super::clock::Clock;
use super::code::{CodeGenerator, RandomCodeGenerator};
use super::notify::{LogOtpNotifier, OtpNotifier};
use super::signer::{TokenSigner, DEFAULT_TOKEN_TTL_SECONDS};
use super::store::{
    OAuthTokenCache, OtpStore, DEFAULT_OTP_TTL_SECONDS, DEFAULT_SWEEP_INTERVAL_SECONDS,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy, Debug)]
pub struct IdpConfig {
    token_ttl_seconds: i64,
    otp_ttl_seconds: i64,
    sweep_interval: Duration,
}

impl IdpConfig {
    /// Defaults: 24h bearer tokens, 5m OTP challenges, sweep every minute.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECONDS),
        }
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_sweep_interval_seconds(mut self, seconds: u64) -> Self {
        self.sweep_interval = Duration::from_secs(seconds);
        self
    }

    /// Replace non-positive lifetimes and a zero sweep interval with the defaults.
    #[must_use]
    pub fn normalize(self) -> Self {
        let token_ttl_seconds = if self.token_ttl_seconds <= 0 {
            DEFAULT_TOKEN_TTL_SECONDS
        } else {
            self.token_ttl_seconds
        };
        let otp_ttl_seconds = if self.otp_ttl_seconds <= 0 {
            DEFAULT_OTP_TTL_SECONDS
        } else {
            self.otp_ttl_seconds
        };
        let sweep_interval = if self.sweep_interval.is_zero() {
            Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECONDS)
        } else {
            self.sweep_interval
        };
        Self {
            token_ttl_seconds,
            otp_ttl_seconds,
            sweep_interval,
        }
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    #[must_use]
    pub fn otp_ttl_seconds(&self) -> i64 {
        self.otp_ttl_seconds
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }
}

impl Default for IdpConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AppState {
    config: IdpConfig,
    otp: Arc<OtpStore>,
    oauth: Arc<OAuthTokenCache>,
    signer: Arc<dyn TokenSigner>,
    codes: Arc<dyn CodeGenerator>,
    notifier: Arc<dyn OtpNotifier>,
}

impl AppState {
    /// Build both stores on `clock` and wire them to `signer`.
    ///
    /// Codes come from the OS entropy source and are delivered through the
    /// logging notifier unless overridden.
    pub fn new(config: IdpConfig, clock: Arc<dyn Clock>, signer: Arc<dyn TokenSigner>) -> Self {
        let config = config.normalize();
        let otp = OtpStore::new(clock.clone()).with_ttl_seconds(config.otp_ttl_seconds());
        Self {
            config,
            otp: Arc::new(otp),
            oauth: Arc::new(OAuthTokenCache::new(clock)),
            signer,
            codes: Arc::new(RandomCodeGenerator),
            notifier: Arc::new(LogOtpNotifier),
        }
    }

    #[must_use]
    pub fn with_code_generator(mut self, codes: Arc<dyn CodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn OtpNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn config(&self) -> &IdpConfig {
        &self.config
    }

    #[must_use]
    pub fn otp(&self) -> &Arc<OtpStore> {
        &self.otp
    }

    #[must_use]
    pub fn oauth(&self) -> &Arc<OAuthTokenCache> {
        &self.oauth
    }

    pub(crate) fn signer(&self) -> &dyn TokenSigner {
        self.signer.as_ref()
    }

    pub(crate) fn codes(&self) -> &dyn CodeGenerator {
        self.codes.as_ref()
    }

    pub(crate) fn notifier(&self) -> &dyn OtpNotifier {
        self.notifier.as_ref()
    }
}
