use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};

use super::der::{der_encode_signature, RAW_SIGNATURE_SIZE};

/// Size of a P-256 private scalar in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Errors that can occur during key operations
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
}

/// Public half of an installation keypair
///
/// Exported to the vendor as SubjectPublicKeyInfo DER (the same bytes
/// WebCrypto's `spki` export produces).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl From<VerifyingKey> for PublicKey {
    fn from(key: VerifyingKey) -> Self {
        PublicKey(key)
    }
}

impl PublicKey {
    /// Parse a SubjectPublicKeyInfo DER document
    pub fn from_der(der: &[u8]) -> Result<Self, KeyError> {
        let key = VerifyingKey::from_public_key_der(der)
            .map_err(|e| anyhow::anyhow!("failed to parse public key DER: {}", e))?;
        Ok(Self(key))
    }

    /// Encode as SubjectPublicKeyInfo DER
    pub fn to_der(&self) -> Result<Vec<u8>, KeyError> {
        let doc = self
            .0
            .to_public_key_der()
            .map_err(|e| anyhow::anyhow!("failed to encode public key DER: {}", e))?;
        Ok(doc.as_bytes().to_vec())
    }

    /// Verify a DER-encoded ECDSA-P256-SHA256 signature over `msg`
    pub fn verify_der(&self, msg: &[u8], der_signature: &[u8]) -> Result<(), KeyError> {
        let signature = Signature::from_der(der_signature)
            .map_err(|e| anyhow::anyhow!("malformed DER signature: {}", e))?;
        self.0
            .verify(msg, &signature)
            .map_err(|e| anyhow::anyhow!("signature verification failed: {}", e))?;
        Ok(())
    }
}

/// Private half of an installation keypair (ECDSA P-256)
///
/// Persisted as a PKCS#8 PEM string alongside the rest of the
/// installation identity.
#[derive(Clone)]
pub struct SecretKey(SigningKey);

// never print key material
impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretKey").field(&"..").finish()
    }
}

impl SecretKey {
    /// Generate a new random key using the OS RNG
    pub fn generate() -> Result<Self, KeyError> {
        loop {
            let mut bytes = [0u8; PRIVATE_KEY_SIZE];
            getrandom::getrandom(&mut bytes)
                .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
            // out-of-range scalars are astronomically rare; draw again
            if let Ok(key) = SigningKey::from_slice(&bytes) {
                return Ok(Self(key));
            }
        }
    }

    /// Derive the public key from this secret key
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().clone())
    }

    /// Encode secret key as PKCS#8 PEM for storage
    pub fn to_pem(&self) -> Result<String, KeyError> {
        let pem = self
            .0
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| anyhow::anyhow!("failed to encode private key PEM: {}", e))?;
        Ok(pem.as_str().to_owned())
    }

    /// Parse a secret key from PKCS#8 PEM
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        let key = SigningKey::from_pkcs8_pem(pem)
            .map_err(|e| anyhow::anyhow!("failed to parse private key PEM: {}", e))?;
        Ok(Self(key))
    }

    /// ECDSA-P256-SHA256 over `msg`, as the raw 64-byte `r || s` form
    pub fn sign_raw(&self, msg: &[u8]) -> [u8; RAW_SIGNATURE_SIZE] {
        let signature: Signature = self.0.sign(msg);
        let mut raw = [0u8; RAW_SIGNATURE_SIZE];
        raw.copy_from_slice(&signature.to_bytes());
        raw
    }

    /// Sign `msg` and DER-encode the signature
    pub fn sign_der(&self, msg: &[u8]) -> Vec<u8> {
        der_encode_signature(&self.sign_raw(msg))
    }
}
