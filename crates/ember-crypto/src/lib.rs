//! Cryptographic primitives for EmberChain: SHA-256 hashing, secp256k1
//! ECDSA keypairs, signing, verification, and address derivation.

pub mod address;
pub mod error;
pub mod hash;
pub mod keys;

pub use address::{address_from, address_from_public_key};
pub use error::CryptoError;
pub use hash::{sha256, Hash256};
pub use keys::{KeyPair, PublicKey};
