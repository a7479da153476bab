//! Federated login callback and cached provider token status.

use super::types::{ErrorResponse, LoginResponse, OAuthLoginRequest, TokenStatusResponse};
use super::{issue_token, required, required_email, IdpError};
use crate::idp::state::AppState;
use axum::{
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Providers whose tokens are cached on login.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    Google,
}

impl Provider {
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "google" => Some(Self::Google),
            _ => None,
        }
    }
}

/// Accept an OAuth login asserted by the frontend.
///
/// For a recognized provider the supplied tokens are cached under the user's
/// email. A token is issued whether or not provider tokens were sent.
#[utoipa::path(
    post,
    path = "/oauth-login",
    request_body = OAuthLoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Missing or malformed payload", body = ErrorResponse),
        (status = 500, description = "Token could not be signed", body = ErrorResponse)
    ),
    tag = "oauth"
)]
#[instrument(skip(state, payload))]
pub async fn oauth_login(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<OAuthLoginRequest>>,
) -> Result<impl IntoResponse, IdpError> {
    let Some(Json(request)) = payload else {
        warn!("OAuth login: invalid request format");
        return Err(IdpError::BadRequest);
    };

    let email = required_email(&request.email)?;
    let name = required(&request.name)?;
    let provider_tag = required(&request.provider)?;

    info!(provider = %provider_tag, email = %email, name = %name, "oauth login request");

    match Provider::from_tag(provider_tag) {
        Some(Provider::Google) => cache_tokens(&state, &email, &request),
        None => debug!(provider = %provider_tag, "provider tokens not cached"),
    }

    let response = issue_token(&state, &email)?;

    info!(email = %email, "oauth login token issued");

    Ok(Json(response))
}

fn cache_tokens(state: &AppState, email: &str, request: &OAuthLoginRequest) {
    let access_token = request.access_token.as_deref().unwrap_or_default();
    if access_token.is_empty() {
        warn!(email = %email, "oauth login without access token, nothing cached");
        return;
    }

    let refresh_token = request.refresh_token.as_deref().unwrap_or_default();
    if refresh_token.is_empty() {
        debug!(email = %email, "oauth login without refresh token");
    }

    // The verified email doubles as the cache's user id.
    state.oauth().store(
        email,
        email,
        access_token,
        refresh_token,
        request.expires_at.unwrap_or_default(),
    );
}

/// Report the caller's cached provider token, refreshing it when stale.
///
/// The caller is identified by the bearer token this service issued.
#[utoipa::path(
    get,
    path = "/oauth/token-status",
    params(
        ("Authorization" = String, Header, description = "Bearer token issued by this service")
    ),
    responses(
        (status = 200, description = "Cached token metadata", body = TokenStatusResponse),
        (status = 401, description = "Missing, invalid or expired bearer token", body = ErrorResponse),
        (status = 404, description = "No provider token cached for the caller", body = ErrorResponse)
    ),
    tag = "oauth"
)]
#[instrument(skip(state, headers))]
pub async fn oauth_token_status(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, IdpError> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(IdpError::Unauthorized)?;

    let subject = state.signer().verify(bearer.trim()).map_err(|err| {
        debug!("bearer token rejected: {err}");
        IdpError::Unauthorized
    })?;

    let (entry, refreshed) = state.oauth().live(&subject).ok_or(IdpError::NotFound)?;

    Ok(Json(TokenStatusResponse {
        status: state.oauth().status(&entry),
        user_id: entry.user_id,
        email: entry.email,
        expires_at: entry.expires_at,
        refreshed,
    }))
}
