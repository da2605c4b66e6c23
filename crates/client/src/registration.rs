use std::sync::Arc;

use common::crypto::{base64_encode, request_proof, sha256};
use common::store::{CredentialStore, CLIENT_REGISTERED};
use reqwest::Client;
use serde::Serialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::installation::InstallationIdentity;
use crate::signing::{HEADER_INSTALLATION_ID, HEADER_REQUEST_PROOF};

pub const INIT_PATH: &str = "/auth/init";

const REGISTERED: &str = "true";

#[derive(Debug, Serialize)]
struct InitRequest<'a> {
    pk: &'a str,
}

/// Proof sent with `/auth/init`:
///  `request_proof("{id}.{b64(sha256(public_key_der))}", secret)`
pub fn registration_proof(identity: &InstallationIdentity) -> Result<String> {
    let base_string = format!(
        "{}.{}",
        identity.installation_id(),
        base64_encode(&sha256(identity.public_key_der()))
    );
    Ok(request_proof(&base_string, identity.derived_secret())?)
}

/// Registers the installation public key with the vendor, once
#[derive(Debug, Clone)]
pub struct ClientRegistrar<S> {
    store: S,
    http: Client,
    config: Arc<Config>,
}

impl<S: CredentialStore> ClientRegistrar<S> {
    pub fn new(store: S, http: Client, config: Arc<Config>) -> Self {
        Self {
            store,
            http,
            config,
        }
    }

    pub async fn is_registered(&self) -> Result<bool> {
        Ok(self.store.get(CLIENT_REGISTERED).await?.as_deref() == Some(REGISTERED))
    }

    /// No-op once the registration flag is set. On failure the flag stays
    ///  unset, so the next call registers from scratch.
    pub async fn ensure_registered(&self, identity: &InstallationIdentity) -> Result<()> {
        if self.is_registered().await? {
            return Ok(());
        }

        let proof = registration_proof(identity)?;
        let public_key_b64 = identity.public_key_b64();

        let response = self
            .http
            .post(self.config.endpoint(INIT_PATH))
            .header(HEADER_INSTALLATION_ID, identity.installation_id())
            .header(HEADER_REQUEST_PROOF, proof)
            .json(&InitRequest {
                pk: &public_key_b64,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(Error::Registration { status, body });
        }

        self.store.put(CLIENT_REGISTERED, REGISTERED).await?;
        tracing::info!(
            installation_id = %identity.installation_id(),
            "registered installation with vendor"
        );
        Ok(())
    }
}
