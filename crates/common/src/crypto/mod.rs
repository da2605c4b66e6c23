//! Cryptographic primitives for the customer-app protocol
//!
//! - **Hashing**: SHA-256 and standard base64
//! - **Installation secret**: a 32-byte value derived from the installation id
//!   and the DER public key, used as keying material for request proofs
//! - **Request proof**: the vendor's keyed checksum, sent on registration and
//!   embedded in every signed request
//! - **Signing**: ECDSA P-256 keys, with signatures re-encoded as DER
//!
//! # Signed request payload
//!
//! Every authenticated call carries a signature over
//!
//! ```text
//! {installation_id}.{nonce}.{timestamp_ms}.{request_proof}
//! ```
//!
//! where the proof is computed over the first three dot-separated fields.

mod der;
mod hashing;
mod keys;
mod proof;

pub use der::{der_encode_signature, RAW_SIGNATURE_SIZE};
pub use hashing::{base64_decode, base64_encode, sha256, Base64DecodeError, SHA256_SIZE};
pub use keys::{KeyError, PublicKey, SecretKey, PRIVATE_KEY_SIZE};
pub use proof::{derive_secret, request_proof, ProofError, SECRET_SIZE};

/// Sign `signature_data` with `key` (ECDSA-P256-SHA256) and DER-encode the result.
pub fn sign_and_der_encode(signature_data: &str, key: &SecretKey) -> Vec<u8> {
    key.sign_der(signature_data.as_bytes())
}
