//! Request and response bodies.

use crate::idp::store::TokenStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OtpRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub otp: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct OtpResponse {
    pub success: bool,
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OAuthLoginRequest {
    pub email: String,
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token expiry in epoch seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// Cached OAuth token metadata; the tokens themselves are never returned.
#[derive(ToSchema, Serialize, Debug)]
pub struct TokenStatusResponse {
    pub user_id: String,
    pub email: String,
    pub status: TokenStatus,
    pub expires_at: DateTime<Utc>,
    pub refreshed: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}
