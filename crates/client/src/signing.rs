use common::crypto::{base64_encode, request_proof, sign_and_der_encode};
use reqwest::RequestBuilder;
use uuid::Uuid;

use crate::error::Result;
use crate::installation::InstallationIdentity;

pub const HEADER_INSTALLATION_ID: &str = "X-App-Installation-Id";
pub const HEADER_TIMESTAMP: &str = "X-Timestamp";
pub const HEADER_NONCE: &str = "X-Nonce";
pub const HEADER_SIGNATURE: &str = "X-Request-Signature";
pub const HEADER_REQUEST_PROOF: &str = "X-Request-Proof";

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Per-request authentication headers. Built fresh for every outbound
///  call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequestHeaders {
    pub installation_id: String,
    pub timestamp_ms: i64,
    pub nonce: String,
    /// base64 of the DER signature
    pub signature: String,
}

impl SignedRequestHeaders {
    /// Sign with a random nonce and the current time
    pub fn generate(identity: &InstallationIdentity) -> Result<Self> {
        let nonce = Uuid::new_v4().to_string().to_lowercase();
        Self::build(identity, &nonce, now_ms())
    }

    /// Sign `{id}.{nonce}.{timestamp}.{proof}` where the proof covers the
    ///  first three fields
    pub fn build(
        identity: &InstallationIdentity,
        nonce: &str,
        timestamp_ms: i64,
    ) -> Result<Self> {
        let proof_input = format!("{}.{}.{}", identity.installation_id(), nonce, timestamp_ms);
        let proof = request_proof(&proof_input, identity.derived_secret())?;
        let signature_data = format!("{}.{}", proof_input, proof);
        let signature = sign_and_der_encode(&signature_data, identity.secret_key());

        Ok(Self {
            installation_id: identity.installation_id().to_string(),
            timestamp_ms,
            nonce: nonce.to_string(),
            signature: base64_encode(&signature),
        })
    }

    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(HEADER_INSTALLATION_ID, &self.installation_id)
            .header(HEADER_TIMESTAMP, self.timestamp_ms.to_string())
            .header(HEADER_NONCE, &self.nonce)
            .header(HEADER_SIGNATURE, &self.signature)
    }
}
