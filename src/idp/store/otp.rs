//! Outstanding one-time passcode challenges, keyed by email.
//!
//! Each email holds at most one challenge. Issuing again replaces it, a correct
//! `verify` consumes it, and an expired one is dropped the first time it is read
//! or when the background sweep runs, whichever comes first.

use super::{read, write};
use crate::idp::clock::Clock;
use chrono::{DateTime, TimeDelta, Utc};
use constant_time_eq::constant_time_eq;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, instrument};

pub const DEFAULT_OTP_TTL_SECONDS: i64 = 5 * 60;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtpChallenge {
    pub email: String,
    pub code: String,
    pub expiry: DateTime<Utc>,
}

impl OtpChallenge {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry
    }
}

pub struct OtpStore {
    challenges: RwLock<HashMap<String, OtpChallenge>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl OtpStore {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            challenges: RwLock::new(HashMap::new()),
            ttl: TimeDelta::seconds(DEFAULT_OTP_TTL_SECONDS),
            clock,
        }
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: i64) -> Self {
        self.ttl = TimeDelta::seconds(seconds);
        self
    }

    #[must_use]
    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Record `code` as the only outstanding challenge for `email`.
    #[instrument(skip(self, code))]
    pub fn issue(&self, email: &str, code: &str) {
        let challenge = OtpChallenge {
            email: email.to_string(),
            code: code.to_string(),
            expiry: self.clock.now() + self.ttl,
        };

        let replaced = write(&self.challenges)
            .insert(email.to_string(), challenge)
            .is_some();

        debug!(replaced, "otp challenge issued");
    }

    /// Check `code` against the challenge for `email`, consuming it on a match.
    ///
    /// Missing, expired and mismatched challenges all return `false`. Only the
    /// expired case removes the entry; a wrong guess leaves it in place until it
    /// expires or is consumed. The lookup and the removal share one write-lock
    /// critical section, so a single issued code verifies at most once.
    #[instrument(skip(self, code))]
    pub fn verify(&self, email: &str, code: &str) -> bool {
        let now = self.clock.now();
        let mut challenges = write(&self.challenges);

        let Some(challenge) = challenges.get(email) else {
            debug!("otp verification failed: not found");
            return false;
        };

        if challenge.is_expired(now) {
            challenges.remove(email);
            debug!("otp verification failed: expired");
            return false;
        }

        if !constant_time_eq(challenge.code.as_bytes(), code.as_bytes()) {
            debug!("otp verification failed: mismatch");
            return false;
        }

        challenges.remove(email);
        debug!("otp verification succeeded");
        true
    }

    /// Remove every expired challenge and return how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut challenges = write(&self.challenges);
        let before = challenges.len();

        challenges.retain(|email, challenge| {
            let keep = !challenge.is_expired(now);
            if !keep {
                debug!(email = %email, "expired otp challenge removed");
            }
            keep
        });

        before - challenges.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.challenges).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, email: &str) -> bool {
        read(&self.challenges).contains_key(email)
    }
}
