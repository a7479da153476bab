//! Ephemeral credential stores.
//!
//! Two independent in-memory maps live here:
//!
//! - **otp** - outstanding one-time passcode challenges, keyed by email
//! - **oauth** - the last OAuth token pair asserted for each user
//!
//! Each map sits behind its own `RwLock` and every value carries its own
//! expiry, so there are no per-entry timers. Expiry is checked when an entry is
//! read; the **sweep** task only reclaims memory for challenges nobody came
//! back for.
//!
//! Nothing here survives a restart.

mod oauth;
mod otp;
mod sweep;

pub use oauth::{
    OAuthTokenCache, OAuthTokenEntry, TokenReport, TokenStatus, REFRESHED_TOKEN_TTL_SECONDS,
    STALENESS_WINDOW_SECONDS,
};
pub use otp::{OtpChallenge, OtpStore, DEFAULT_OTP_TTL_SECONDS};
pub use sweep::{spawn_sweeper, DEFAULT_SWEEP_INTERVAL_SECONDS};

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// Writers never leave a map half-updated, so a poisoned lock still guards
// consistent data and is safe to keep using.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
