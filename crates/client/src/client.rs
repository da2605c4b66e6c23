use std::sync::Arc;

use common::store::CredentialStore;
use reqwest::Client;
use serde_json::Value;

use crate::api::SignedApiClient;
use crate::auth::TokenManager;
use crate::config::Config;
use crate::error::Result;
use crate::installation::{InstallationIdentity, InstallationKeyStore};
use crate::machines;

/// Entry point for collaborators: owns the configuration, the credential
///  store and the HTTP client, and hides identity loading, registration
///  and token handling behind [`LmClient::signed_get`].
#[derive(Debug, Clone)]
pub struct LmClient<S> {
    config: Arc<Config>,
    keys: InstallationKeyStore<S>,
    api: SignedApiClient<S>,
}

impl<S: CredentialStore> LmClient<S> {
    pub fn new(config: Config, store: S) -> Result<Self> {
        let http = Client::builder().build()?;
        Self::with_http_client(config, store, http)
    }

    pub fn with_http_client(config: Config, store: S, http: Client) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let keys = InstallationKeyStore::new(
            store.clone(),
            config.installation_id().map(str::to_string),
        );
        let api = SignedApiClient::new(store, http, config.clone());

        Ok(Self { config, keys, api })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api(&self) -> &SignedApiClient<S> {
        &self.api
    }

    pub fn tokens(&self) -> &TokenManager<S> {
        self.api.tokens()
    }

    /// Load or create the installation identity
    pub async fn identity(&self) -> Result<InstallationIdentity> {
        self.keys.get_or_create().await
    }

    /// Load the identity and make sure it is registered with the vendor
    pub async fn ensure_registered(&self) -> Result<InstallationIdentity> {
        let identity = self.identity().await?;
        self.tokens()
            .registrar()
            .ensure_registered(&identity)
            .await?;
        Ok(identity)
    }

    pub async fn access_token(&self) -> Result<String> {
        let identity = self.identity().await?;
        self.tokens().get_access_token(&identity).await
    }

    pub async fn signed_get(&self, path: &str) -> Result<Value> {
        let identity = self.identity().await?;
        self.api.signed_get(&identity, path).await
    }

    /// Serial number of the machine to query: the configured one, or the
    ///  only machine on the account
    pub async fn resolve_serial_number(&self) -> Result<String> {
        if let Some(machine_id) = self.config.machine_id() {
            return Ok(machine_id.to_string());
        }
        let things = self.signed_get(machines::THINGS_PATH).await?;
        machines::select_serial_number(&things)
    }
}
