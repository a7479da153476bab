//! # idp
//!
//! A small identity provider. Clients obtain a signed bearer token by one of
//! three routes:
//!
//! 1. **Password login:** any non-empty username and password pair.
//! 2. **Email OTP:** a six digit code is issued per email, delivered out of
//!    band, and exchanged exactly once for a token before it expires.
//! 3. **OAuth login:** the frontend asserts a federated identity; provider
//!    tokens for recognized providers are cached and refreshed when stale.
//!
//! All state lives in memory. A background sweeper reclaims expired OTP
//! challenges.

pub mod cli;
pub mod idp;

pub use idp::GIT_COMMIT_HASH;
