use common::crypto::{Base64DecodeError, KeyError, ProofError};
use common::store::StoreError;
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing credentials, bad base URL or unreadable config file
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The installation secret was not 32 bytes
    #[error("request proof error: {0}")]
    Proof(#[from] ProofError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("invalid base64 in stored credentials: {0}")]
    Base64(#[from] Base64DecodeError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// `/auth/init` answered with a non-2xx status
    #[error("Client registration failed: {} {}", .status.as_u16(), .body)]
    Registration { status: StatusCode, body: String },
    /// Sign-in or refresh failed, or returned an unusable body
    #[error("{0}")]
    Auth(String),
    /// A signed GET failed after the single 401 retry
    #[error("API request failed ({}): {}", .status.as_u16(), .body)]
    ApiRequest { status: StatusCode, body: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Machine(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
