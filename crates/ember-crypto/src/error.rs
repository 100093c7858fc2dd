//! Error types for cryptographic operations.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),
    #[error("invalid public key bytes")]
    InvalidPublicKey,
    #[error("invalid secret key bytes")]
    InvalidSecretKey,
    #[error("invalid signature bytes")]
    InvalidSignature,
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("expected uncompressed public key (0x04 prefix, 65 bytes)")]
    NotUncompressed,
}
