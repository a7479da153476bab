//! Cache of OAuth tokens asserted by the login callback.
//!
//! Entries are facts the caller handed us, not tokens we validated. The cache
//! keeps one entry per user id, classifies it as stale shortly before it
//! expires, and can mint a replacement access token without contacting the
//! provider. Entries are never evicted, so the map grows with the number of
//! distinct users that ever logged in through a provider.

use super::{read, write};
use crate::idp::clock::Clock;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, instrument};
use ulid::Ulid;
use utoipa::ToSchema;

/// Entries this close to `expires_at` are reported stale.
pub const STALENESS_WINDOW_SECONDS: i64 = 5 * 60;

/// Lifetime given to an access token produced by `refresh`.
pub const REFRESHED_TOKEN_TTL_SECONDS: i64 = 60 * 60;

const TOKEN_LOG_PREFIX: usize = 12;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthTokenEntry {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStatus {
    Valid,
    ExpiringSoon,
    Expired,
}

/// One line of `OAuthTokenCache::status_report`; carries no token material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenReport {
    pub user_id: String,
    pub email: String,
    pub status: TokenStatus,
    pub expires_at: DateTime<Utc>,
}

pub struct OAuthTokenCache {
    entries: RwLock<HashMap<String, OAuthTokenEntry>>,
    clock: Arc<dyn Clock>,
}

impl OAuthTokenCache {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Replace whatever is cached for `user_id`.
    ///
    /// `expires_at` is epoch seconds as asserted by the caller; a value that
    /// cannot be represented is stored as the Unix epoch, which reads as stale.
    #[instrument(skip(self, access_token, refresh_token))]
    pub fn store(
        &self,
        user_id: &str,
        email: &str,
        access_token: &str,
        refresh_token: &str,
        expires_at: i64,
    ) -> OAuthTokenEntry {
        let entry = OAuthTokenEntry {
            user_id: user_id.to_string(),
            email: email.to_string(),
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_at: DateTime::from_timestamp(expires_at, 0).unwrap_or(DateTime::UNIX_EPOCH),
            created_at: self.clock.now(),
        };

        let total = {
            let mut entries = write(&self.entries);
            entries.insert(entry.user_id.clone(), entry.clone());
            entries.len()
        };

        info!(
            access_token = %truncate_token(access_token),
            access_token_len = access_token.len(),
            refresh_token = %truncate_token(refresh_token),
            refresh_token_len = refresh_token.len(),
            expires_at = %entry.expires_at,
            total,
            "oauth token stored"
        );

        entry
    }

    /// Plain read; expiry is not evaluated here.
    #[must_use]
    pub fn lookup(&self, user_id: &str) -> Option<OAuthTokenEntry> {
        read(&self.entries).get(user_id).cloned()
    }

    /// True once `entry` is inside the staleness window before its expiry.
    #[must_use]
    pub fn is_stale(&self, entry: &OAuthTokenEntry) -> bool {
        entry
            .expires_at
            .checked_sub_signed(TimeDelta::seconds(STALENESS_WINDOW_SECONDS))
            .map_or(true, |threshold| self.clock.now() > threshold)
    }

    #[must_use]
    pub fn status(&self, entry: &OAuthTokenEntry) -> TokenStatus {
        if self.clock.now() > entry.expires_at {
            TokenStatus::Expired
        } else if self.is_stale(entry) {
            TokenStatus::ExpiringSoon
        } else {
            TokenStatus::Valid
        }
    }

    /// Mint a new access token for `entry` and store it.
    ///
    /// The refresh token and `created_at` carry over unchanged; the new access
    /// token expires `REFRESHED_TOKEN_TTL_SECONDS` from now. No provider is
    /// contacted, so this cannot fail.
    #[instrument(skip(self, entry), fields(user_id = %entry.user_id))]
    pub fn refresh(&self, entry: &OAuthTokenEntry) -> OAuthTokenEntry {
        let refreshed = OAuthTokenEntry {
            user_id: entry.user_id.clone(),
            email: entry.email.clone(),
            access_token: format!("refreshed_access_token_{}", Ulid::new()),
            refresh_token: entry.refresh_token.clone(),
            expires_at: self.clock.now() + TimeDelta::seconds(REFRESHED_TOKEN_TTL_SECONDS),
            created_at: entry.created_at,
        };

        write(&self.entries).insert(refreshed.user_id.clone(), refreshed.clone());

        info!(expires_at = %refreshed.expires_at, "oauth token refreshed");

        refreshed
    }

    /// Look up `user_id`, refreshing the entry first if it is stale.
    ///
    /// Returns the entry to use and whether a refresh happened. Two callers
    /// racing on the same stale entry may both refresh; the later write wins
    /// and both results are valid.
    #[must_use]
    pub fn live(&self, user_id: &str) -> Option<(OAuthTokenEntry, bool)> {
        let entry = self.lookup(user_id)?;
        if self.is_stale(&entry) {
            Some((self.refresh(&entry), true))
        } else {
            Some((entry, false))
        }
    }

    /// Status of every cached entry, sorted by user id.
    #[must_use]
    pub fn status_report(&self) -> Vec<TokenReport> {
        let mut report: Vec<TokenReport> = read(&self.entries)
            .values()
            .map(|entry| TokenReport {
                user_id: entry.user_id.clone(),
                email: entry.email.clone(),
                status: self.status(entry),
                expires_at: entry.expires_at,
            })
            .collect();

        report.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        debug!(total = report.len(), "oauth token status report built");

        report
    }

    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn truncate_token(token: &str) -> &str {
    token
        .char_indices()
        .nth(TOKEN_LOG_PREFIX)
        .map_or(token, |(index, _)| &token[..index])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::idp::clock::ManualClock;

    fn cache() -> (Arc<ManualClock>, OAuthTokenCache) {
        let clock = Arc::new(ManualClock::default());
        let cache = OAuthTokenCache::new(clock.clone());
        (clock, cache)
    }

    fn epoch_in(clock: &ManualClock, seconds: i64) -> i64 {
        (clock.now() + TimeDelta::seconds(seconds)).timestamp()
    }

    #[test]
    fn store_then_lookup_returns_entry() {
        let (clock, cache) = cache();
        let expires = epoch_in(&clock, 3600);
        cache.store(
            "alice@example.com",
            "alice@example.com",
            "ya29.access",
            "1//refresh",
            expires,
        );

        let entry = cache.lookup("alice@example.com").unwrap();
        assert_eq!(entry.access_token, "ya29.access");
        assert_eq!(entry.refresh_token, "1//refresh");
        assert_eq!(entry.expires_at.timestamp(), expires);
        assert_eq!(entry.created_at, clock.now());
        assert!(cache.lookup("bob@example.com").is_none());
    }

    #[test]
    fn store_replaces_previous_entry() {
        let (clock, cache) = cache();
        cache.store("u1", "u1@example.com", "first", "r1", epoch_in(&clock, 600));
        cache.store("u1", "u1@example.com", "second", "r2", epoch_in(&clock, 7200));

        assert_eq!(cache.len(), 1);
        let entry = cache.lookup("u1");
        assert_eq!(entry.map(|e| e.access_token), Some("second".to_string()));
    }

    #[test]
    fn lookup_does_not_evaluate_expiry() {
        let (clock, cache) = cache();
        cache.store("u1", "u1@example.com", "old", "r1", epoch_in(&clock, -3600));

        assert!(cache.lookup("u1").is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn ten_minutes_out_is_not_stale() {
        let (clock, cache) = cache();
        let ten_minutes = cache.store("u1", "u1@example.com", "a", "r", epoch_in(&clock, 10 * 60));
        let one_hour = cache.store("u2", "u2@example.com", "a", "r", epoch_in(&clock, 3600));

        assert!(!cache.is_stale(&ten_minutes));
        assert!(!cache.is_stale(&one_hour));
    }

    #[test]
    fn four_minutes_out_is_stale() {
        let (clock, cache) = cache();
        let four_minutes = cache.store("u1", "u1@example.com", "a", "r", epoch_in(&clock, 4 * 60));

        assert!(cache.is_stale(&four_minutes));
    }

    #[test]
    fn staleness_starts_just_past_the_window_edge() {
        let (clock, cache) = cache();
        let edge = cache.store(
            "u1",
            "u1@example.com",
            "a",
            "r",
            epoch_in(&clock, STALENESS_WINDOW_SECONDS),
        );
        // Whole-second epochs can land the edge slightly in the past.
        clock.advance(TimeDelta::seconds(-1));
        assert!(!cache.is_stale(&edge));

        clock.advance(TimeDelta::seconds(2));
        assert!(cache.is_stale(&edge));
    }

    #[test]
    fn entry_becomes_stale_as_time_passes() {
        let (clock, cache) = cache();
        let entry = cache.store("u1", "u1@example.com", "a", "r", epoch_in(&clock, 10 * 60));
        assert!(!cache.is_stale(&entry));

        clock.advance(TimeDelta::minutes(6));
        assert!(cache.is_stale(&entry));
    }

    #[test]
    fn unrepresentable_expiry_reads_as_stale() {
        let (_clock, cache) = cache();
        let entry = cache.store("u1", "u1@example.com", "a", "r", i64::MAX);
        assert_eq!(entry.expires_at, DateTime::UNIX_EPOCH);
        assert!(cache.is_stale(&entry));
    }

    #[test]
    fn status_classifies_entries() {
        let (clock, cache) = cache();
        let valid = cache.store("valid", "v@example.com", "a", "r", epoch_in(&clock, 3600));
        let soon = cache.store("soon", "s@example.com", "a", "r", epoch_in(&clock, 120));
        let expired = cache.store("expired", "e@example.com", "a", "r", epoch_in(&clock, -1));

        assert_eq!(cache.status(&valid), TokenStatus::Valid);
        assert_eq!(cache.status(&soon), TokenStatus::ExpiringSoon);
        assert_eq!(cache.status(&expired), TokenStatus::Expired);
    }

    #[test]
    fn refresh_mints_new_access_token_and_keeps_refresh_token() {
        let (clock, cache) = cache();
        let original = cache.store(
            "u1",
            "u1@example.com",
            "stale-access",
            "long-lived-refresh",
            epoch_in(&clock, 60),
        );
        clock.advance(TimeDelta::seconds(30));

        let refreshed = cache.refresh(&original);

        assert_ne!(refreshed.access_token, original.access_token);
        assert_eq!(refreshed.refresh_token, "long-lived-refresh");
        assert_eq!(refreshed.user_id, original.user_id);
        assert_eq!(refreshed.email, original.email);
        assert_eq!(refreshed.created_at, original.created_at);
        assert_eq!(
            refreshed.expires_at,
            clock.now() + TimeDelta::seconds(REFRESHED_TOKEN_TTL_SECONDS)
        );
        assert!(!cache.is_stale(&refreshed));
        assert_eq!(cache.lookup("u1"), Some(refreshed));
    }

    #[test]
    fn consecutive_refreshes_yield_distinct_tokens() {
        let (clock, cache) = cache();
        let entry = cache.store("u1", "u1@example.com", "a", "r", epoch_in(&clock, 0));
        let first = cache.refresh(&entry);
        let second = cache.refresh(&first);
        assert_ne!(first.access_token, second.access_token);
    }

    #[test]
    fn live_refreshes_only_stale_entries() {
        let (clock, cache) = cache();
        cache.store("fresh", "f@example.com", "fresh-access", "r", epoch_in(&clock, 3600));
        cache.store("stale", "s@example.com", "stale-access", "r", epoch_in(&clock, 60));

        let fresh = cache.live("fresh");
        assert!(matches!(fresh, Some((ref entry, false)) if entry.access_token == "fresh-access"));

        let stale = cache.live("stale");
        assert!(matches!(stale, Some((ref entry, true)) if entry.access_token != "stale-access"));

        assert!(cache.live("missing").is_none());
    }

    #[test]
    fn status_report_lists_every_entry_sorted() {
        let (clock, cache) = cache();
        cache.store("b", "b@example.com", "a", "r", epoch_in(&clock, 3600));
        cache.store("a", "a@example.com", "a", "r", epoch_in(&clock, -10));

        let report = cache.status_report();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].user_id, "a");
        assert_eq!(report[0].status, TokenStatus::Expired);
        assert_eq!(report[1].user_id, "b");
        assert_eq!(report[1].status, TokenStatus::Valid);
    }

    #[test]
    fn stale_entries_are_never_purged() {
        let (clock, cache) = cache();
        cache.store("u1", "u1@example.com", "a", "r", epoch_in(&clock, 60));
        clock.advance(TimeDelta::days(30));

        assert_eq!(cache.len(), 1);
        assert!(cache.lookup("u1").is_some());
    }

    #[test]
    fn truncate_token_keeps_short_prefix() {
        assert_eq!(truncate_token("short"), "short");
        assert_eq!(truncate_token("ya29.a0AfH6SMBxxxxxxxx"), "ya29.a0AfH6S");
        assert_eq!(truncate_token(""), "");
    }

    #[test]
    fn token_status_serializes_as_upper_snake_case() {
        let json = serde_json::to_string(&TokenStatus::ExpiringSoon).unwrap();
        assert_eq!(json, "\"EXPIRING_SOON\"");
    }
}
