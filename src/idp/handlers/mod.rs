pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::login;

pub mod oauth;
pub use self::oauth::{oauth_login, oauth_token_status};

pub mod otp;
pub use self::otp::{send_otp, verify_otp};

pub mod types;

// common functions for the handlers
use crate::idp::signer::SignerError;
use crate::idp::state::AppState;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use tracing::error;
use types::{ErrorResponse, LoginResponse};

#[derive(Debug)]
pub enum IdpError {
    BadRequest,
    InvalidOtp,
    Unauthorized,
    NotFound,
    OtpDelivery(anyhow::Error),
    TokenIssuance(SignerError),
}

impl IntoResponse for IdpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest => (StatusCode::BAD_REQUEST, "Invalid request format"),
            // Unknown email, expired challenge and wrong code all land here.
            Self::InvalidOtp => (StatusCode::UNAUTHORIZED, "Invalid or expired OTP"),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid or missing bearer token"),
            Self::NotFound => (StatusCode::NOT_FOUND, "No OAuth token cached"),
            Self::OtpDelivery(err) => {
                error!("Failed to deliver OTP: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to send OTP")
            }
            Self::TokenIssuance(err) => {
                error!("Failed to generate token: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate token")
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trimmed `value`, or `BadRequest` when nothing is left.
pub(crate) fn required(value: &str) -> Result<&str, IdpError> {
    let value = value.trim();
    if value.is_empty() {
        Err(IdpError::BadRequest)
    } else {
        Ok(value)
    }
}

/// Normalized `email`, or `BadRequest` when it does not look like one.
pub(crate) fn required_email(email: &str) -> Result<String, IdpError> {
    let email = normalize_email(email);
    if valid_email(&email) {
        Ok(email)
    } else {
        Err(IdpError::BadRequest)
    }
}

pub(crate) fn issue_token(state: &AppState, subject: &str) -> Result<LoginResponse, IdpError> {
    state
        .signer()
        .sign(subject)
        .map(|token| LoginResponse { token })
        .map_err(IdpError::TokenIssuance)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("a b@example.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn required_rejects_blank_values() {
        assert!(matches!(required("   "), Err(IdpError::BadRequest)));
        assert!(matches!(required(" bob "), Ok("bob")));
    }

    #[test]
    fn required_email_normalizes() {
        assert!(matches!(
            required_email(" Bob@Example.com").as_deref(),
            Ok("bob@example.com")
        ));
        assert!(matches!(required_email("bob"), Err(IdpError::BadRequest)));
    }

    #[test]
    fn error_statuses() {
        assert_eq!(
            IdpError::BadRequest.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IdpError::InvalidOtp.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            IdpError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            IdpError::OtpDelivery(anyhow::anyhow!("smtp down"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
