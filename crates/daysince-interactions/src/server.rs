//! HTTP surface for the interaction webhook.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use daysince_access::{SignatureVerifier, TrustedPublicKey};
use daysince_core::current_unix_timestamp;
use daysince_store::IncidentStore;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::info;

use crate::responder::{HttpInteractionResponder, DEFAULT_CALLBACK_API_BASE};
use crate::router::{InboundRequest, InteractionRouter, DEFAULT_STORE_TIMEOUT_MS};

const INTERACTIONS_ENDPOINT: &str = "/interactions";
const ROOT_ENDPOINT: &str = "/";
const HEALTH_ENDPOINT: &str = "/healthz";

#[derive(Debug, Clone)]
/// Runtime settings for the interaction webhook server.
pub struct InteractionServerConfig {
    pub bind: String,
    pub public_key_hex: String,
    pub callback_api_base: String,
    pub request_timeout_ms: u64,
    pub store_timeout_ms: u64,
}

impl Default for InteractionServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
            public_key_hex: String::new(),
            callback_api_base: DEFAULT_CALLBACK_API_BASE.to_string(),
            request_timeout_ms: 10_000,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
        }
    }
}

/// Builds the interaction router from configuration, parsing the trusted key once.
pub fn build_interaction_router(
    config: &InteractionServerConfig,
    store: Arc<dyn IncidentStore>,
) -> Result<InteractionRouter> {
    if config.public_key_hex.trim().is_empty() {
        bail!("--public-key must be provided");
    }
    let public_key = TrustedPublicKey::from_hex(&config.public_key_hex)
        .context("failed to parse --public-key")?;
    let responder = HttpInteractionResponder::new(
        &config.callback_api_base,
        config.request_timeout_ms.max(1_000),
    )?;
    Ok(InteractionRouter::new(
        SignatureVerifier::new(public_key),
        store,
        Arc::new(responder),
    )
    .with_store_timeout(Duration::from_millis(config.store_timeout_ms.max(1))))
}

/// Axum application exposing the webhook and a liveness probe.
pub fn build_interaction_app(router: Arc<InteractionRouter>) -> Router {
    Router::new()
        .route(HEALTH_ENDPOINT, get(handle_health))
        .route(INTERACTIONS_ENDPOINT, post(handle_interaction))
        .route(ROOT_ENDPOINT, post(handle_interaction))
        .with_state(router)
}

/// Run the interaction webhook server until ctrl-c.
pub async fn run_interaction_server(
    config: InteractionServerConfig,
    store: Arc<dyn IncidentStore>,
) -> Result<()> {
    let bind_addr: SocketAddr = config
        .bind
        .parse()
        .with_context(|| format!("invalid --bind '{}': expected host:port", config.bind))?;
    let router = Arc::new(build_interaction_router(&config, store)?);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind interaction server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve interaction server listen address")?;
    info!(
        addr = %local_addr,
        callback_api_base = %config.callback_api_base,
        "interaction server listening"
    );

    axum::serve(listener, build_interaction_app(router))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("interaction server exited unexpectedly")?;
    info!("interaction server stopped");
    Ok(())
}

async fn handle_health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ready" }))).into_response()
}

async fn handle_interaction(
    State(router): State<Arc<InteractionRouter>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = InboundRequest::from_parts(&headers, body);
    router
        .route(&request, current_unix_timestamp())
        .await
        .into_response()
}
