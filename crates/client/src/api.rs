use std::sync::Arc;

use common::store::CredentialStore;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use crate::auth::TokenManager;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::installation::InstallationIdentity;
use crate::signing::SignedRequestHeaders;

/// Issues signed, bearer-authenticated GETs against the vendor API
#[derive(Debug, Clone)]
pub struct SignedApiClient<S> {
    http: Client,
    config: Arc<Config>,
    tokens: TokenManager<S>,
}

impl<S: CredentialStore> SignedApiClient<S> {
    pub fn new(store: S, http: Client, config: Arc<Config>) -> Self {
        let tokens = TokenManager::new(store, http.clone(), config.clone());
        Self {
            http,
            config,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenManager<S> {
        &self.tokens
    }

    /// GET `{api_base}{path}` and parse the JSON body.
    ///
    /// A 401 clears the cached token and retries exactly once with a new
    /// token and freshly signed headers. Any other failure, or a second
    /// 401, is returned as [`Error::ApiRequest`].
    pub async fn signed_get(&self, identity: &InstallationIdentity, path: &str) -> Result<Value> {
        let mut response = self.send_get(identity, path).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(path, "request unauthorized, renewing token and retrying once");
            self.tokens.clear_token_cache().await?;
            response = self.send_get(identity, path).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(Error::ApiRequest { status, body });
        }

        Ok(response.json::<Value>().await?)
    }

    async fn send_get(&self, identity: &InstallationIdentity, path: &str) -> Result<Response> {
        let token = self.tokens.get_access_token(identity).await?;
        let headers = SignedRequestHeaders::generate(identity)?;

        tracing::debug!(path, "signed GET");
        let request = self
            .http
            .get(self.config.endpoint(path))
            .bearer_auth(token);
        Ok(headers.apply(request).send().await?)
    }
}
