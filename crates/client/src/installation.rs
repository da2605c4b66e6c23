//! Installation identity provisioning
//!
//! A deployment acts as one companion-app installation: a lowercase id, a
//! P-256 keypair and a secret derived from the two. The identity is created
//! once, persisted under [`INSTALLATION_KEY`], and only ever read afterwards.

use std::fmt;

use common::crypto::{base64_decode, base64_encode, derive_secret, SecretKey};
use common::store::{CredentialStore, INSTALLATION_KEY};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// On-store representation of an [`InstallationIdentity`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredInstallationKey {
    pub installation_id: String,
    /// PKCS#8 PEM
    pub private_key_pem: String,
    /// SubjectPublicKeyInfo DER, base64
    pub public_key_b64: String,
    /// Derived secret, base64
    pub secret_b64: String,
}

#[derive(Clone)]
pub struct InstallationIdentity {
    installation_id: String,
    secret_key: SecretKey,
    public_key_der: Vec<u8>,
    derived_secret: Vec<u8>,
}

impl fmt::Debug for InstallationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallationIdentity")
            .field("installation_id", &self.installation_id)
            .field("public_key", &self.public_key_b64())
            .finish_non_exhaustive()
    }
}

impl InstallationIdentity {
    /// Generate a fresh keypair for `installation_id` (lower-cased)
    pub fn generate(installation_id: &str) -> Result<Self> {
        let installation_id = installation_id.to_lowercase();
        let secret_key = SecretKey::generate()?;
        let public_key_der = secret_key.public().to_der()?;
        let derived_secret = derive_secret(&installation_id, &public_key_der).to_vec();

        Ok(Self {
            installation_id,
            secret_key,
            public_key_der,
            derived_secret,
        })
    }

    pub fn installation_id(&self) -> &str {
        &self.installation_id
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    pub fn public_key_b64(&self) -> String {
        base64_encode(&self.public_key_der)
    }

    /// Keying material for request proofs. Normally 32 bytes; a corrupted
    ///  store can hand back anything, which the proof step rejects.
    pub fn derived_secret(&self) -> &[u8] {
        &self.derived_secret
    }

    pub fn to_stored(&self) -> Result<StoredInstallationKey> {
        Ok(StoredInstallationKey {
            installation_id: self.installation_id.clone(),
            private_key_pem: self.secret_key.to_pem()?,
            public_key_b64: self.public_key_b64(),
            secret_b64: base64_encode(&self.derived_secret),
        })
    }

    pub fn from_stored(stored: &StoredInstallationKey) -> Result<Self> {
        Ok(Self {
            installation_id: stored.installation_id.clone(),
            secret_key: SecretKey::from_pem(&stored.private_key_pem)?,
            public_key_der: base64_decode(&stored.public_key_b64)?,
            derived_secret: base64_decode(&stored.secret_b64)?,
        })
    }
}

/// Loads the persisted installation identity, creating it on first use
#[derive(Debug, Clone)]
pub struct InstallationKeyStore<S> {
    store: S,
    installation_id_override: Option<String>,
}

impl<S: CredentialStore> InstallationKeyStore<S> {
    pub fn new(store: S, installation_id_override: Option<String>) -> Self {
        Self {
            store,
            installation_id_override,
        }
    }

    /// Return the stored identity, or create and persist a new one.
    ///
    /// A stored identity always wins over the configured override so the
    /// installation never has to register again; a mismatch is only logged.
    pub async fn get_or_create(&self) -> Result<InstallationIdentity> {
        let requested = self.installation_id_override.as_deref();

        if let Some(raw) = self.store.get(INSTALLATION_KEY).await? {
            let stored: StoredInstallationKey = serde_json::from_str(&raw)?;
            if let Some(requested) = requested {
                if requested != stored.installation_id {
                    tracing::warn!(
                        stored = %stored.installation_id,
                        requested = %requested,
                        "LM_INSTALLATION_ID differs from stored installation key; using stored installation key to avoid re-registration"
                    );
                }
            }
            return InstallationIdentity::from_stored(&stored);
        }

        let installation_id = requested
            .map(str::to_lowercase)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let identity = InstallationIdentity::generate(&installation_id)?;

        let stored = serde_json::to_string(&identity.to_stored()?)?;
        self.store.put(INSTALLATION_KEY, &stored).await?;
        tracing::info!(
            installation_id = %identity.installation_id(),
            "created new installation identity"
        );

        Ok(identity)
    }
}
