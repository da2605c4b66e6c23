//! Installation secret derivation and the vendor request proof
//!
//! The request proof is a keyed checksum defined by the vendor API, not a MAC.
//! The server recomputes it byte for byte, so the transform below must stay
//! exactly as it is: XOR into the secret slot selected by the input byte,
//! then an 8-bit left rotation by the low three bits of the neighbouring slot.

use super::hashing::{base64_encode, sha256};

/// Size of the derived installation secret in bytes
pub const SECRET_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    #[error("secret must be {expected} bytes, got {actual}")]
    InvalidSecretLength { expected: usize, actual: usize },
}

/// Derive the 32-byte installation secret from the installation id and
/// the DER-encoded public key.
///
/// `sha256("{id}.{b64(public_key_der)}.{b64(sha256(id))}")`
pub fn derive_secret(installation_id: &str, public_key_der: &[u8]) -> [u8; SECRET_SIZE] {
    let public_key_b64 = base64_encode(public_key_der);
    let id_hash_b64 = base64_encode(&sha256(installation_id.as_bytes()));
    let triple = format!("{}.{}.{}", installation_id, public_key_b64, id_hash_b64);
    sha256(triple.as_bytes())
}

/// Compute the request proof for `base_string` keyed by `secret`.
///
/// Works on a copy of the secret; the caller's bytes are never touched.
/// Returns the base64 SHA-256 of the mutated secret.
///
/// # Errors
///
/// Returns [`ProofError::InvalidSecretLength`] unless `secret` is exactly
/// [`SECRET_SIZE`] bytes.
pub fn request_proof(base_string: &str, secret: &[u8]) -> Result<String, ProofError> {
    if secret.len() != SECRET_SIZE {
        return Err(ProofError::InvalidSecretLength {
            expected: SECRET_SIZE,
            actual: secret.len(),
        });
    }
    let mut work = [0u8; SECRET_SIZE];
    work.copy_from_slice(secret);

    for &byte in base_string.as_bytes() {
        let idx = byte as usize % SECRET_SIZE;
        let shift = u32::from(work[(idx + 1) % SECRET_SIZE] & 7);
        work[idx] = (byte ^ work[idx]).rotate_left(shift);
    }

    Ok(base64_encode(&sha256(&work)))
}
