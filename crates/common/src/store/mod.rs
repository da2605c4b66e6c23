//! Persistent credential storage
//!
//! The installation identity, the registration flag and the session token
//! live behind [`CredentialStore`], a plain string key-value store with
//! `get`/`put`/`delete` and nothing else.
//!
//! # Concurrency
//!
//! There are no transactions, no compare-and-swap and no locking across
//! calls. Two callers racing on an expiring token may both refresh or sign
//! in; whichever `put` lands last wins. Callers that need stronger
//! guarantees must serialise access themselves.

mod fs;
mod memory;

pub use fs::FsCredentialStore;
pub use memory::MemoryCredentialStore;

use async_trait::async_trait;

/// Key holding the JSON installation identity
pub const INSTALLATION_KEY: &str = "installation_key";
/// Key holding the literal `"true"` once the client is registered
pub const CLIENT_REGISTERED: &str = "client_registered";
/// Key holding the JSON session token
pub const TOKENS: &str = "tokens";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid store key: {0}")]
    InvalidKey(String),
    #[error("could not determine home directory")]
    NoHomeDirectory,
    #[error("store error: {0}")]
    Internal(String),
}

#[async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug + Clone + 'static {
    /// Read the value under `key`, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing anything already there
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
