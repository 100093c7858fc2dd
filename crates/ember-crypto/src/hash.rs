//! SHA-256 hashing with canonical `0x`-prefixed hex rendering.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// A 32-byte SHA-256 digest, rendered as 64 lowercase hex chars with a `0x`
/// prefix everywhere it is stored or transmitted (spec.md §6).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a `0x`-prefixed, 64-hex-char hash string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidHex(s.to_string()))?;
        Ok(Self(arr))
    }

    /// Number of leading hex-zero characters in the hex rendering (without
    /// the `0x` prefix). Used for the proof-of-work difficulty check.
    pub fn leading_hex_zeros(&self) -> usize {
        self.hex_body().bytes().take_while(|&b| b == b'0').count()
    }

    fn hex_body(&self) -> String {
        let mut s = String::with_capacity(64);
        for byte in &self.0 {
            s.push_str(&format!("{byte:02x}"));
        }
        s
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.hex_body())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({self})")
    }
}

/// SHA-256 hash of `bytes`, rendered with a `0x` prefix.
pub fn sha256(bytes: &[u8]) -> Hash256 {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash256(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_deterministic() {
        assert_eq!(sha256(b"hello"), sha256(b"hello"));
    }

    #[test]
    fn sha256_differs_on_input() {
        assert_ne!(sha256(b"hello"), sha256(b"world"));
    }

    #[test]
    fn display_is_0x_prefixed_64_hex() {
        let h = sha256(b"hello");
        let s = h.to_string();
        assert_eq!(s.len(), 66);
        assert!(s.starts_with("0x"));
        assert!(s[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn from_hex_round_trips() {
        let h = sha256(b"round trip me");
        let parsed = Hash256::from_hex(&h.to_string()).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(Hash256::from_hex("0xabcd").is_err());
    }

    #[test]
    fn leading_hex_zeros_counts_correctly() {
        let zero_prefixed = Hash256([0u8; 32]);
        assert_eq!(zero_prefixed.leading_hex_zeros(), 64);
    }

    #[test]
    fn leading_hex_zeros_on_nonzero_first_byte() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x0a;
        let h = Hash256(bytes);
        assert_eq!(h.leading_hex_zeros(), 1);
    }
}
