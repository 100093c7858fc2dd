//! Address derivation (spec.md §4.1, GLOSSARY).
//!
//! `address_from(pub_hex) = "0x" || first_40_hex_chars(sha256(strip_prefix(pub_hex)))`
//!
//! The hash input is the *ASCII hex string* itself, not the bytes it
//! decodes to, matching `original_source/crypto_utils.cpp`'s
//! `deriveAddressFromPublicKey` which feeds the public key's hex
//! `std::string` straight into `computeSHA256(const std::string&)`
//! (`original_source/sha.cpp`) after stripping `0x`. Hashing the decoded
//! bytes instead would derive a different address for every legitimately
//! formatted public key and break interop with spec-compliant peers.

use crate::error::CryptoError;
use crate::hash::sha256;
use crate::keys::PublicKey;

/// Derive a 42-char (`0x` + 40 hex) address from a public key's hex string.
pub fn address_from(pub_hex: &str) -> Result<String, CryptoError> {
    let stripped = pub_hex.strip_prefix("0x").unwrap_or(pub_hex);
    let digest = sha256(stripped.as_bytes());
    let full_hex = hex::encode(digest.as_bytes());
    Ok(format!("0x{}", &full_hex[..40]))
}

/// Derive the address for a parsed [`PublicKey`].
pub fn address_from_public_key(pk: &PublicKey) -> String {
    address_from(&pk.to_hex()).expect("PublicKey::to_hex always yields a valid address input")
}
