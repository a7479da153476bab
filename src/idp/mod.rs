pub mod clock;
pub mod code;
pub mod handlers;
pub mod notify;
pub mod signer;
pub mod state;
pub mod store;

mod openapi;
pub use self::openapi::openapi;

use anyhow::Result;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Extension, Router,
};
use clock::SystemClock;
use signer::TokenSigner;
use state::{AppState, IdpConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer, request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, error, info, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// Build the HTTP surface over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health).options(handlers::health))
        .route("/login", post(handlers::login))
        .route("/send-otp", post(handlers::send_otp))
        .route("/verify-otp", post(handlers::verify_otp))
        .route("/oauth-login", post(handlers::oauth_login))
        .route("/oauth/token-status", get(handlers::oauth_token_status))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(CorsLayer::permissive())
                .layer(Extension(state)),
        )
}

/// Serve on `port` until ctrl-c, sweeping expired challenges in the background.
///
/// # Errors
/// Returns an error if the listener cannot bind or the server fails
pub async fn new(port: u16, config: IdpConfig, signer: Arc<dyn TokenSigner>) -> Result<()> {
    let state = Arc::new(AppState::new(config, Arc::new(SystemClock), signer));

    let sweeper = store::spawn_sweeper(
        state.otp().clone(),
        state.oauth().clone(),
        state.config().sweep_interval(),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    let served = axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.abort();

    served?;

    info!("Gracefully shutdown");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
    }
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, request_id)
}
