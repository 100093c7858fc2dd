//! secp256k1 ECDSA keypairs, signing, and verification (spec.md §4.1).
//!
//! Public keys are always handled in their uncompressed SEC1 form
//! (`0x04 || X || Y`, 65 bytes), hex-encoded with a `0x` prefix.
//! Signatures are DER-encoded, also hex with a `0x` prefix.

use std::fmt;

use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey as Secp256k1PublicKey, Secp256k1, SecretKey};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::hash::Hash256;

/// A secp256k1 keypair used to sign transactions.
///
/// The secret key bytes are held in a [`Zeroizing`] buffer so they are wiped
/// from memory on drop.
pub struct KeyPair {
    secret: Zeroizing<[u8; 32]>,
}

impl KeyPair {
    /// Generate a random keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let mut rng = rand::rngs::OsRng;
        let (secret_key, _) = secp.generate_keypair(&mut rng);
        Self {
            secret: Zeroizing::new(secret_key.secret_bytes()),
        }
    }

    /// Construct a keypair from 32 bytes of secret key material.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        SecretKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidSecretKey)?;
        Ok(Self {
            secret: Zeroizing::new(bytes),
        })
    }

    fn secret_key(&self) -> SecretKey {
        // Bytes were validated at construction time.
        SecretKey::from_slice(&*self.secret).expect("validated at construction")
    }

    /// Derive this keypair's public key.
    pub fn public_key(&self) -> PublicKey {
        let secp = Secp256k1::new();
        let pk = Secp256k1PublicKey::from_secret_key(&secp, &self.secret_key());
        PublicKey(pk)
    }

    /// Sign `message` (typically a transaction hash digest), returning a
    /// DER-encoded signature hex string with a `0x` prefix.
    pub fn sign(&self, message: &Hash256) -> String {
        let secp = Secp256k1::new();
        let msg = Message::from_slice(&message.0).expect("digest is exactly 32 bytes");
        let sig = secp.sign_ecdsa(&msg, &self.secret_key());
        format!("0x{}", hex::encode(sig.serialize_der()))
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        Self {
            secret: Zeroizing::new(*self.secret),
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// An uncompressed secp256k1 public key.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(Secp256k1PublicKey);

impl PublicKey {
    /// Parse an uncompressed, `0x04`-prefixed, hex-encoded public key.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        if bytes.len() != 65 || bytes[0] != 0x04 {
            return Err(CryptoError::NotUncompressed);
        }
        let pk = Secp256k1PublicKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(pk))
    }

    /// Render as `0x04 || X || Y`, hex-encoded.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0.serialize_uncompressed()))
    }

    /// The 65 raw uncompressed bytes (`0x04 || X || Y`), without hex/prefix.
    pub fn to_uncompressed_bytes(&self) -> [u8; 65] {
        self.0.serialize_uncompressed()
    }

    /// Verify a DER-encoded, `0x`-prefixed hex signature over `message`.
    pub fn verify(&self, message: &Hash256, signature_hex: &str) -> Result<(), CryptoError> {
        let stripped = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);
        let der = hex::decode(stripped).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let sig = Signature::from_der(&der).map_err(|_| CryptoError::InvalidSignature)?;
        let secp = Secp256k1::new();
        let msg = Message::from_slice(&message.0).expect("digest is exactly 32 bytes");
        secp.verify_ecdsa(&msg, &sig, &self.0)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
