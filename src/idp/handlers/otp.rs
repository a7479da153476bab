//! OTP request and verification endpoints.

use super::types::{ErrorResponse, LoginResponse, OtpRequest, OtpResponse, OtpVerifyRequest};
use super::{issue_token, required, required_email, IdpError};
use crate::idp::state::AppState;
use axum::{extract::Extension, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{info, instrument};

/// Issue a fresh challenge for the email, replacing any outstanding one.
#[utoipa::path(
    post,
    path = "/send-otp",
    request_body = OtpRequest,
    responses(
        (status = 200, description = "Challenge issued and delivered", body = OtpResponse),
        (status = 400, description = "Missing or malformed email", body = ErrorResponse),
        (status = 500, description = "Delivery failed", body = ErrorResponse)
    ),
    tag = "otp"
)]
#[instrument(skip(state, payload))]
pub async fn send_otp(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<OtpRequest>>,
) -> Result<impl IntoResponse, IdpError> {
    let Some(Json(request)) = payload else {
        return Err(IdpError::BadRequest);
    };

    let email = required_email(&request.email)?;
    let code = state.codes().generate();

    state.otp().issue(&email, &code);
    state
        .notifier()
        .notify(&email, &code)
        .map_err(IdpError::OtpDelivery)?;

    info!(email = %email, "otp sent");

    Ok(Json(OtpResponse {
        success: true,
        message: "OTP sent successfully".to_string(),
    }))
}

/// Consume the challenge for the email and exchange it for a token.
#[utoipa::path(
    post,
    path = "/verify-otp",
    request_body = OtpVerifyRequest,
    responses(
        (status = 200, description = "Code accepted, token issued", body = LoginResponse),
        (status = 400, description = "Missing or malformed payload", body = ErrorResponse),
        (status = 401, description = "No challenge, expired challenge, or wrong code", body = ErrorResponse),
        (status = 500, description = "Token could not be signed", body = ErrorResponse)
    ),
    tag = "otp"
)]
#[instrument(skip(state, payload))]
pub async fn verify_otp(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<OtpVerifyRequest>>,
) -> Result<impl IntoResponse, IdpError> {
    let Some(Json(request)) = payload else {
        return Err(IdpError::BadRequest);
    };

    let email = required_email(&request.email)?;
    let code = required(&request.otp)?;

    let verified = state.otp().verify(&email, code);
    info!(email = %email, success = verified, "otp verification");

    if !verified {
        return Err(IdpError::InvalidOtp);
    }

    Ok(Json(issue_token(&state, &email)?))
}
