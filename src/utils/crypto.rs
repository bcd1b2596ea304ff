use k256::elliptic_curve::subtle::ConstantTimeEq;
use sha3::{Digest, Keccak256};

/// Keccak-256 digest (the pre-standard SHA-3 variant Ethereum uses)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Keccak-256 over several slices without concatenating them first
pub fn keccak256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Compare two byte strings in constant time
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

/// Decode a hex string, tolerating an optional `0x` prefix
pub fn decode_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let s = s.trim();
    hex::decode(s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s))
}
