//! Companion-app client for the La Marzocco customer-app API
//!
//! A deployment behaves like one installed companion app: it provisions a
//! durable installation identity, registers its public key once, keeps a
//! session token fresh, and signs every outbound request the way the vendor
//! protocol requires.
//!
//! ```ignore
//! let store = FsCredentialStore::open(FsCredentialStore::default_dir()?)?;
//! let client = LmClient::new(Config::from_env(), store)?;
//! let things = client.signed_get("/things").await?;
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod installation;
pub mod machines;
pub mod registration;
pub mod signing;

pub use api::SignedApiClient;
pub use auth::{SessionToken, TokenManager};
pub use client::LmClient;
pub use config::Config;
pub use error::{Error, Result};
pub use installation::{InstallationIdentity, InstallationKeyStore};
pub use registration::ClientRegistrar;
pub use signing::SignedRequestHeaders;

pub mod prelude {
    pub use common::prelude::*;

    pub use crate::{Config, Error, LmClient, Result};
}
