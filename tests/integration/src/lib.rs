//! Shared fixtures for end-to-end webhook tests.

use std::net::SocketAddr;
use std::sync::Arc;

use daysince_access::{signature_message_bytes, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use daysince_interactions::{build_interaction_app, build_interaction_router, InteractionServerConfig};
use daysince_store::IncidentStore;
use ed25519_dalek::{Signer, SigningKey};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Dispatcher key used to sign fixture requests.
pub fn dispatcher_signing_key() -> SigningKey {
    SigningKey::from_bytes(&[61; 32])
}

pub fn dispatcher_public_key_hex() -> String {
    hex::encode(dispatcher_signing_key().verifying_key().to_bytes())
}

/// A running webhook server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(callback_api_base: String, store: Arc<dyn IncidentStore>) -> Self {
        let config = InteractionServerConfig {
            bind: "127.0.0.1:0".to_string(),
            public_key_hex: dispatcher_public_key_hex(),
            callback_api_base,
            request_timeout_ms: 5_000,
            store_timeout_ms: 5_000,
        };
        let router = build_interaction_router(&config, store).expect("build router");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let app = build_interaction_app(Arc::new(router));
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { addr, handle }
    }

    pub fn url(&self) -> String {
        format!("http://{}/interactions", self.addr)
    }

    /// Posts `body` signed by the dispatcher key.
    pub async fn post_signed(&self, body: &str) -> reqwest::Response {
        let timestamp = "1718000000";
        let signature = dispatcher_signing_key()
            .sign(&signature_message_bytes(timestamp, body.as_bytes()));
        reqwest::Client::new()
            .post(self.url())
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, hex::encode(signature.to_bytes()))
            .header(TIMESTAMP_HEADER, timestamp)
            .body(body.to_string())
            .send()
            .await
            .expect("send interaction")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
