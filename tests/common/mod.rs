#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};

use notes_api::auth::{Identity, SharedSecretVerifier};
use notes_api::config::{AppConfig, NotesLayout};
use notes_api::store::{DocumentStore, MemoryStore};
use notes_api::{app, AppState};

const TEST_SECRET: &str = "integration-test-secret";

/// A server bound to a free port inside the current test's runtime,
/// backed by an in-memory store and shared-secret tokens
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub store: MemoryStore,
    client: Client,
    issuer: SharedSecretVerifier,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with_layout(NotesLayout::Namespaced).await
    }

    pub async fn start_with_layout(layout: NotesLayout) -> Result<Self> {
        let store = MemoryStore::new();
        Self::launch(layout, Arc::new(store.clone()), store).await
    }

    /// Serve from an arbitrary backend; `store` is then an unused empty memory store
    pub async fn start_with_store(backend: Arc<dyn DocumentStore>) -> Result<Self> {
        Self::launch(NotesLayout::Namespaced, backend, MemoryStore::new()).await
    }

    async fn launch(layout: NotesLayout, backend: Arc<dyn DocumentStore>, store: MemoryStore) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::from_env();
        config.storage.notes_layout = layout;

        let issuer = SharedSecretVerifier::new(TEST_SECRET);
        let state = AppState::new(config, backend, Arc::new(issuer.clone()));

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            port,
            base_url,
            store,
            client,
            issuer,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn token_for(&self, uid: &str) -> String {
        self.issuer
            .issue(&Identity::new(uid), chrono::Duration::hours(1))
            .expect("failed to issue test token")
    }

    pub fn expired_token_for(&self, uid: &str) -> String {
        self.issuer
            .issue(&Identity::new(uid), chrono::Duration::hours(-2))
            .expect("failed to issue test token")
    }

    /// Unauthenticated request builder
    pub fn anon(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Request builder carrying a bearer token for `uid`
    pub fn as_user(&self, uid: &str, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.anon(method, path).bearer_auth(self.token_for(uid))
    }
}
