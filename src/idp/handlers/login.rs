use super::types::{ErrorResponse, LoginRequest, LoginResponse};
use super::{issue_token, normalize_email, required, valid_email, IdpError};
use crate::idp::state::AppState;
use axum::{extract::Extension, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{info, instrument};

/// Password login.
///
/// The password is not checked against anything; any non-empty username and
/// password pair gets a token for that username. A username shaped like an
/// email is trimmed and lowercased, matching the OTP and OAuth subjects.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Missing or malformed payload", body = ErrorResponse),
        (status = 500, description = "Token could not be signed", body = ErrorResponse)
    ),
    tag = "login"
)]
#[instrument(skip(state, payload))]
pub async fn login(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, IdpError> {
    let Some(Json(request)) = payload else {
        return Err(IdpError::BadRequest);
    };

    let username = required(&request.username)?;
    required(&request.password)?;

    let subject = login_subject(username);
    let response = issue_token(&state, &subject)?;

    info!(username = %subject, "password login token issued");

    Ok(Json(response))
}

fn login_subject(username: &str) -> String {
    let email = normalize_email(username);
    if valid_email(&email) {
        email
    } else {
        username.to_string()
    }
}
