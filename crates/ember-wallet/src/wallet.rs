//! Thin wallet: keypair custody plus signed-transaction construction
//! (spec.md §4.1 Crypto, §4.2 Transaction). On-disk key persistence is a
//! collaborator outside this crate's scope.

use std::time::{SystemTime, UNIX_EPOCH};

use ember_core::Transaction;
use ember_crypto::{address_from_public_key, KeyPair};

use crate::error::WalletError;

/// An in-memory keypair bound to its derived address.
pub struct Wallet {
    keypair: KeyPair,
    address: String,
}

impl Wallet {
    /// Generate a fresh keypair and derive its address.
    pub fn generate() -> Self {
        let keypair = KeyPair::generate();
        let address = address_from_public_key(&keypair.public_key());
        Self { keypair, address }
    }

    /// Load a wallet from raw secret-key bytes (e.g. supplied by an
    /// external key-material source).
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Result<Self, WalletError> {
        let keypair =
            KeyPair::from_secret_bytes(bytes).map_err(|e| WalletError::InvalidKey(e.to_string()))?;
        let address = address_from_public_key(&keypair.public_key());
        Ok(Self { keypair, address })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key().to_hex()
    }

    /// Build and sign a value-transfer transaction to `receiver`, timestamped now.
    pub fn send(&self, receiver: impl Into<String>, amount: f64) -> Result<Transaction, WalletError> {
        if amount <= 0.0 {
            return Err(WalletError::NonPositiveAmount(amount));
        }
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is after the Unix epoch")
            .as_secs();
        let mut tx = Transaction::new(self.address.clone(), receiver, amount, timestamp);
        tx.sign(&self.keypair);
        Ok(tx)
    }

    /// Build and sign a transaction with an explicit timestamp (used by
    /// tests and by callers replaying deterministic scenarios).
    pub fn send_at(&self, receiver: impl Into<String>, amount: f64, timestamp: u64) -> Result<Transaction, WalletError> {
        if amount <= 0.0 {
            return Err(WalletError::NonPositiveAmount(amount));
        }
        let mut tx = Transaction::new(self.address.clone(), receiver, amount, timestamp);
        tx.sign(&self.keypair);
        Ok(tx)
    }
}
