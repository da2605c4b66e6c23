//! Shared test utilities for client integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common::store::{
    CredentialStore, MemoryCredentialStore, StoreError, CLIENT_REGISTERED, TOKENS,
};
use lm_client::{Config, LmClient, SessionToken};
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;
use wiremock::{MockServer, ResponseTemplate};

pub const EMAIL: &str = "user@example.com";
pub const PASSWORD: &str = "password";
/// Path prefix the mock API is mounted under
pub const API_PREFIX: &str = "/api/customer-app";

pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

pub fn test_config(server: &MockServer) -> Config {
    Config::new(EMAIL, PASSWORD).with_api_base(format!("{}{}", server.uri(), API_PREFIX))
}

/// Memory store that counts deletes of the token key and can be told to
/// reject token writes
#[derive(Debug, Clone, Default)]
pub struct CountingStore {
    inner: MemoryCredentialStore,
    token_deletes: Arc<AtomicUsize>,
    failing_token_writes: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn token_deletes(&self) -> usize {
        self.token_deletes.load(Ordering::SeqCst)
    }

    /// Reject the next `count` writes of the token key
    pub fn fail_token_writes(&self, count: usize) {
        self.failing_token_writes.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if key == TOKENS
            && self
                .failing_token_writes
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(StoreError::Internal("token write rejected".into()));
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if key == TOKENS {
            self.token_deletes.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.delete(key).await
    }
}

/// Store with the registration flag already set
pub async fn registered_store() -> CountingStore {
    let store = CountingStore::default();
    store.put(CLIENT_REGISTERED, "true").await.unwrap();
    store
}

pub async fn store_token<S: CredentialStore>(
    store: &S,
    access: &str,
    refresh: &str,
    expires_in_ms: i64,
) {
    let token = SessionToken {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_at_ms: chrono::Utc::now().timestamp_millis() + expires_in_ms,
    };
    store
        .put(TOKENS, &serde_json::to_string(&token).unwrap())
        .await
        .unwrap();
}

pub async fn stored_token<S: CredentialStore>(store: &S) -> Option<SessionToken> {
    store
        .get(TOKENS)
        .await
        .unwrap()
        .map(|raw| serde_json::from_str(&raw).unwrap())
}

pub fn token_response(access: &str, refresh: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "accessToken": access,
        "refreshToken": refresh,
    }))
}

pub fn client<S: CredentialStore>(server: &MockServer, store: S) -> LmClient<S> {
    LmClient::new(test_config(server), store).unwrap()
}

/// Paths of every request the mock server has seen, in order
pub async fn request_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

/// Counts WARN events emitted by this crate
#[derive(Debug, Clone, Default)]
pub struct WarnCounter(Arc<AtomicUsize>);

impl WarnCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        if *metadata.level() == tracing::Level::WARN && metadata.target().starts_with("lm_client") {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Route this thread's tracing events into a fresh [`WarnCounter`].
/// Only valid on the current-thread runtime `#[tokio::test]` uses.
pub fn capture_warnings() -> (WarnCounter, tracing::subscriber::DefaultGuard) {
    let counter = WarnCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (counter, guard)
}
