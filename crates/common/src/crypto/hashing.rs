//! Hashing and base64 helpers shared by the proof and signing code.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

pub use base64::DecodeError as Base64DecodeError;

/// Size of a SHA-256 digest in bytes
pub const SHA256_SIZE: usize = 32;

/// SHA-256 over `data`
pub fn sha256(data: &[u8]) -> [u8; SHA256_SIZE] {
    Sha256::digest(data).into()
}

/// Standard (padded) base64, the alphabet the vendor API expects
pub fn base64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn base64_decode(value: &str) -> Result<Vec<u8>, Base64DecodeError> {
    STANDARD.decode(value)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let digest = sha256(b"abc");
        assert_eq!(
            digest[..4],
            [0xba, 0x78, 0x16, 0xbf],
            "sha256(abc) should start with ba7816bf"
        );
        assert_eq!(digest[SHA256_SIZE - 1], 0xad);
    }

    #[test]
    fn test_base64_uses_padded_standard_alphabet() {
        assert_eq!(base64_encode(&[0xfb, 0xff]), "+/8=");
        assert_eq!(base64_decode("+/8=").unwrap(), vec![0xfb, 0xff]);
        assert!(base64_decode("not base64!").is_err());
    }
}
