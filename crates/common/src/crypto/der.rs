//! DER encoding for raw `r || s` ECDSA signatures
//!
//! The vendor expects `X-Request-Signature` as an ASN.1 `SEQUENCE` of two
//! `INTEGER`s, while P-256 signing hands back the fixed 64-byte form.

/// Size of a raw P-256 `r || s` signature
pub const RAW_SIGNATURE_SIZE: usize = 64;

const TAG_SEQUENCE: u8 = 0x30;
const TAG_INTEGER: u8 = 0x02;

/// Encode a raw 64-byte `r || s` signature as DER.
///
/// Input of any other length is returned unchanged.
///
/// ```text
/// 0x30 len 0x02 len(r) r 0x02 len(s) s
/// ```
///
/// Each half has its leading zero bytes stripped (one byte always remains)
/// and gets a `0x00` pad when its first byte has the high bit set, so the
/// INTEGER stays non-negative. The longest output is 72 bytes, so every
/// length fits in a single short-form byte.
pub fn der_encode_signature(raw: &[u8]) -> Vec<u8> {
    if raw.len() != RAW_SIGNATURE_SIZE {
        return raw.to_vec();
    }

    let (r, s) = raw.split_at(RAW_SIGNATURE_SIZE / 2);
    let r = encode_integer(r);
    let s = encode_integer(s);

    let mut out = Vec::with_capacity(2 + r.len() + s.len());
    out.push(TAG_SEQUENCE);
    out.push((r.len() + s.len()) as u8);
    out.extend_from_slice(&r);
    out.extend_from_slice(&s);
    out
}

fn encode_integer(bytes: &[u8]) -> Vec<u8> {
    let leading_zeros = bytes[..bytes.len() - 1]
        .iter()
        .take_while(|byte| **byte == 0)
        .count();
    let value = &bytes[leading_zeros..];
    let pad = value[0] & 0x80 != 0;

    let len = value.len() + usize::from(pad);
    let mut out = Vec::with_capacity(2 + len);
    out.push(TAG_INTEGER);
    out.push(len as u8);
    if pad {
        out.push(0x00);
    }
    out.extend_from_slice(value);
    out
}
