/**
 * Cryptographic types and operations.
 *  - SHA-256 / base64 helpers
 *  - Installation secret derivation and request proofs
 *  - ECDSA P-256 keys and DER signature encoding
 */
pub mod crypto;
/**
 * Credential storage.
 *  A get/put/delete string store holding the
 *  installation identity, the registration flag
 *  and the session token.
 */
pub mod store;

pub mod prelude {
    pub use crate::crypto::{PublicKey, SecretKey};
    pub use crate::store::{
        CredentialStore, FsCredentialStore, MemoryCredentialStore, StoreError,
    };
}
