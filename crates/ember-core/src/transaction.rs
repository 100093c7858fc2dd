//! Transaction model: canonical form, hashing, signing, and validation
//! (spec.md §3, §4.2).

use ember_crypto::{address_from, sha256, Hash256, KeyPair, PublicKey};

use crate::constants::GENESIS_SENDER;
use crate::error::TransactionError;
use crate::fmt_util::{fmt_amount, fmt_u64};

/// A value-transfer transaction.
///
/// Immutable once hashed: callers must call [`Transaction::sign`] (which
/// recomputes the hash to cover the now-populated public key) before
/// treating a transaction as final.
#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    pub sender: String,
    pub sender_public_key: String,
    pub receiver: String,
    pub amount: f64,
    pub timestamp: u64,
    pub hash: String,
    pub signature: String,
}

impl Transaction {
    /// Construct a new, unsigned, pending transaction.
    ///
    /// `sender_public_key` starts empty; the hash is computed over the
    /// canonical form that includes that empty field, and must be
    /// recomputed by [`Transaction::sign`] once the key is known.
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, amount: f64, timestamp: u64) -> Self {
        let mut tx = Self {
            sender: sender.into(),
            sender_public_key: String::new(),
            receiver: receiver.into(),
            amount,
            timestamp,
            hash: String::new(),
            signature: String::new(),
        };
        tx.hash = tx.compute_hash().to_string();
        tx
    }

    /// Build the literal canonical hash-input concatenation (spec.md §6):
    /// `sender || senderPublicKey || receiver || fmt(amount) || fmt(timestamp)`.
    fn canonical_input(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.sender,
            self.sender_public_key,
            self.receiver,
            fmt_amount(self.amount),
            fmt_u64(self.timestamp)
        )
    }

    /// Recompute the SHA-256 hash over the current canonical form.
    pub fn compute_hash(&self) -> Hash256 {
        sha256(self.canonical_input().as_bytes())
    }

    /// Assign `sender_public_key` from `wallet`, recompute the hash (so the
    /// now-present public key is covered), then sign that hash.
    ///
    /// Hash recomputation happens strictly before signing, per spec.md §4.2.
    pub fn sign(&mut self, wallet: &KeyPair) {
        self.sender_public_key = wallet.public_key().to_hex();
        let digest = self.compute_hash();
        self.hash = digest.to_string();
        self.signature = wallet.sign(&digest);
    }

    /// True for the single Genesis-to-Genesis sentinel transaction that
    /// seeds the genesis block.
    pub fn is_genesis_sentinel(&self) -> bool {
        self.sender == GENESIS_SENDER && self.receiver == GENESIS_SENDER && self.amount == 0.0
    }

    /// True for a coinbase/mint transaction: sender is the `"Genesis"`
    /// sentinel but the receiver is a real miner address.
    pub fn is_coinbase(&self) -> bool {
        self.sender == GENESIS_SENDER && self.receiver != GENESIS_SENDER
    }

    /// Full structural + cryptographic validity check (spec.md §4.2).
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.is_genesis_sentinel() {
            return Ok(());
        }

        if self.sender.is_empty() || self.receiver.is_empty() {
            return Err(TransactionError::EmptyParty);
        }
        if self.amount <= 0.0 {
            return Err(TransactionError::NonPositiveAmount(self.amount));
        }

        let recomputed = self.compute_hash().to_string();
        if recomputed != self.hash {
            return Err(TransactionError::HashMismatch {
                stored: self.hash.clone(),
                recomputed,
            });
        }

        // Coinbase transactions carry no public key/signature; their
        // validity is guaranteed structurally by block validation.
        if self.sender == GENESIS_SENDER {
            return Ok(());
        }

        let public_key = PublicKey::from_hex(&self.sender_public_key)
            .map_err(|e| TransactionError::MalformedCrypto(e.to_string()))?;
        let derived = address_from(&self.sender_public_key)
            .map_err(|e| TransactionError::MalformedCrypto(e.to_string()))?;
        if derived != self.sender {
            return Err(TransactionError::AddressMismatch {
                sender: self.sender.clone(),
                derived,
            });
        }

        let digest = Hash256::from_hex(&self.hash)
            .map_err(|e| TransactionError::MalformedCrypto(e.to_string()))?;
        public_key
            .verify(&digest, &self.signature)
            .map_err(|_| TransactionError::SignatureInvalid)
    }

    /// Convenience boolean wrapper over [`Transaction::validate`].
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Encode the 7 TRANSACTION wire fields (spec.md §4.6), `|`-joined.
    pub fn encode_fields(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.sender,
            self.sender_public_key,
            self.receiver,
            fmt_amount(self.amount),
            fmt_u64(self.timestamp),
            self.hash,
            self.signature
        )
    }

    /// Parse a transaction from its 7 `|`-separated wire fields.
    ///
    /// Per spec.md §4.6, a trailing `|` inside the final field (signature)
    /// is tolerated by rejoining any fields beyond the expected 7.
    pub fn decode_fields(fields: &[&str]) -> Result<Self, TransactionError> {
        if fields.len() < 7 {
            return Err(TransactionError::MalformedCrypto(format!(
                "expected 7 transaction fields, got {}",
                fields.len()
            )));
        }
        let amount: f64 = fields[3]
            .parse()
            .map_err(|_| TransactionError::MalformedCrypto(format!("bad amount: {}", fields[3])))?;
        let timestamp: u64 = fields[4]
            .parse()
            .map_err(|_| TransactionError::MalformedCrypto(format!("bad timestamp: {}", fields[4])))?;
        // Tolerate a `|` that leaked into the signature by rejoining any
        // extra trailing fields.
        let signature = fields[6..].join("|");
        Ok(Self {
            sender: fields[0].to_string(),
            sender_public_key: fields[1].to_string(),
            receiver: fields[2].to_string(),
            amount,
            timestamp,
            hash: fields[5].to_string(),
            signature,
        })
    }

    /// Build a coinbase transaction paying `amount` to `receiver`.
    ///
    /// The coinbase's hash is computed like any other transaction's; it
    /// carries an empty public key and signature (no sender to verify).
    pub fn coinbase(receiver: impl Into<String>, amount: f64, timestamp: u64) -> Self {
        Self::new(GENESIS_SENDER, receiver, amount, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> KeyPair {
        KeyPair::generate()
    }

    #[test]
    fn new_tx_has_consistent_hash() {
        let tx = Transaction::new("0xabc", "0xdef", 10.0, 1_000);
        assert_eq!(tx.compute_hash().to_string(), tx.hash);
    }

    #[test]
    fn sign_sets_public_key_and_recomputes_hash() {
        let kp = wallet();
        let sender = ember_crypto::address_from_public_key(&kp.public_key());
        let mut tx = Transaction::new(sender, "0xreceiver", 5.0, 1_000);
        let unsigned_hash = tx.hash.clone();
        tx.sign(&kp);
        assert_ne!(tx.hash, unsigned_hash, "hash must change once pubkey is populated");
        assert_eq!(tx.sender_public_key, kp.public_key().to_hex());
        assert!(!tx.signature.is_empty());
    }

    #[test]
    fn signed_tx_is_valid() {
        let kp = wallet();
        let sender = ember_crypto::address_from_public_key(&kp.public_key());
        let mut tx = Transaction::new(sender, "0xreceiver", 5.0, 1_000);
        tx.sign(&kp);
        assert!(tx.is_valid());
    }

    #[test]
    fn tampered_amount_invalidates_hash() {
        let kp = wallet();
        let sender = ember_crypto::address_from_public_key(&kp.public_key());
        let mut tx = Transaction::new(sender, "0xreceiver", 5.0, 1_000);
        tx.sign(&kp);
        tx.amount = 500.0;
        assert!(!tx.is_valid());
    }

    #[test]
    fn tampered_signature_fails_verification() {
        let kp = wallet();
        let sender = ember_crypto::address_from_public_key(&kp.public_key());
        let mut tx = Transaction::new(sender, "0xreceiver", 5.0, 1_000);
        tx.sign(&kp);
        // Flip a hex digit deep in the DER signature without touching the hash.
        let mut sig_bytes: Vec<char> = tx.signature.chars().collect();
        let last = sig_bytes.len() - 1;
        sig_bytes[last] = if sig_bytes[last] == 'a' { 'b' } else { 'a' };
        tx.signature = sig_bytes.into_iter().collect();
        assert!(!tx.is_valid());
    }

    #[test]
    fn sender_mismatch_is_rejected() {
        let kp = wallet();
        let mut tx = Transaction::new("0xsomeoneelse", "0xreceiver", 5.0, 1_000);
        tx.sign(&kp);
        assert!(!tx.is_valid());
    }

    #[test]
    fn coinbase_is_valid_without_signature() {
        let tx = Transaction::coinbase("0xminer", 50.0, 1_000);
        assert!(tx.is_coinbase());
        assert!(tx.is_valid());
        assert!(tx.signature.is_empty());
        assert!(tx.sender_public_key.is_empty());
    }

    #[test]
    fn genesis_sentinel_is_valid() {
        let tx = Transaction::new(GENESIS_SENDER, GENESIS_SENDER, 0.0, 1_000);
        assert!(tx.is_genesis_sentinel());
        assert!(tx.is_valid());
    }

    #[test]
    fn zero_amount_non_genesis_is_invalid() {
        let kp = wallet();
        let sender = ember_crypto::address_from_public_key(&kp.public_key());
        let mut tx = Transaction::new(sender, "0xreceiver", 0.0, 1_000);
        tx.sign(&kp);
        assert!(!tx.is_valid());
    }

    #[test]
    fn wire_fields_round_trip() {
        let kp = wallet();
        let sender = ember_crypto::address_from_public_key(&kp.public_key());
        let mut tx = Transaction::new(sender, "0xreceiver", 5.5, 1_234);
        tx.sign(&kp);
        let encoded = tx.encode_fields();
        let fields: Vec<&str> = encoded.split('|').collect();
        let decoded = Transaction::decode_fields(&fields).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn empty_receiver_is_invalid() {
        let kp = wallet();
        let sender = ember_crypto::address_from_public_key(&kp.public_key());
        let mut tx = Transaction::new(sender, "", 5.0, 1_000);
        tx.sign(&kp);
        assert!(!tx.is_valid());
    }
}
