#![allow(clippy::needless_for_each)]

use crate::idp::handlers::{
    health::{self, __path_health},
    login::__path_login,
    oauth::{__path_oauth_login, __path_oauth_token_status},
    otp::{__path_send_otp, __path_verify_otp},
    types,
};
use crate::idp::store::TokenStatus;
use utoipa::openapi::{Contact, License};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(health, login, send_otp, verify_otp, oauth_login, oauth_token_status),
    components(
        schemas(
            health::Health,
            types::LoginRequest,
            types::LoginResponse,
            types::OtpRequest,
            types::OtpResponse,
            types::OtpVerifyRequest,
            types::OAuthLoginRequest,
            types::TokenStatusResponse,
            types::ErrorResponse,
            TokenStatus,
        )
    ),
    tags(
        (name = "health", description = "Liveness and build information"),
        (name = "login", description = "Password login"),
        (name = "otp", description = "One-time passcode login by email"),
        (name = "oauth", description = "Federated login and cached provider tokens"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    // Cargo metadata rather than utoipa's defaults.
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = optional_str(env!("CARGO_PKG_DESCRIPTION")).map(str::to_string);
    doc.info.contact = cargo_contact();
    doc.info.license = optional_str(env!("CARGO_PKG_LICENSE")).map(License::new);

    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn optional_str(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.find('<') {
        Some(start) => (
            optional_str(&author[..start]),
            optional_str(author[start + 1..].trim_end_matches('>')),
        ),
        None => (optional_str(author), None),
    }
}
