//! Transaction signing with signer verification.
//!
//! A [`SigningAuthority`] owns one decrypted private key. Every signature it produces
//! is checked by recovering the signer from the signature itself; if the recovered
//! address is not the address the caller expected, the signature is discarded and
//! [`SignerError::SignerMismatch`] is returned instead.
//!
//! Nonces are derived deterministically (RFC 6979) and `s` is always in the lower half
//! of the curve order.

use crate::utils::crypto::{keccak256, keccak256_concat};
use crate::wallet::keypair::{Address, PrivateKey, PublicKey};
use crate::wallet::keystore::{self, KeystoreError, KeystoreRecord};
use alloy_consensus::{SignableTransaction, Signed, TxLegacy};
use alloy_primitives::{Bytes, TxKind, U256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur while loading a key or signing.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Signer mismatch: expected {expected}, recovered {recovered}")]
    SignerMismatch { expected: Address, recovered: Address },

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Keystore error: {0}")]
    Keystore(#[from] KeystoreError),
}

/// How the signing hash and `v` value of a legacy transaction are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum SigningScheme {
    /// Pre-EIP-155: no chain id, `v = 27 + recovery id`.
    #[default]
    Homestead,
    /// Replay-protected: `v = recovery id + 2 * chain_id + 35`.
    Eip155 { chain_id: u64 },
}

impl SigningScheme {
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Self::Homestead => None,
            Self::Eip155 { chain_id } => Some(*chain_id),
        }
    }

    /// Keccak-256 of the RLP payload that gets signed.
    pub fn signing_hash(&self, tx: &Transaction) -> [u8; 32] {
        tx.to_legacy(self.chain_id()).signature_hash().0
    }

    /// RLP payload that gets signed.
    pub fn signing_payload(&self, tx: &Transaction) -> Vec<u8> {
        tx.to_legacy(self.chain_id()).encoded_for_signing()
    }

    /// Computed in `u128` so that any `u64` chain id fits.
    fn v(&self, y_parity: bool) -> u128 {
        let parity = u128::from(y_parity);
        match self {
            Self::Homestead => 27 + parity,
            Self::Eip155 { chain_id } => u128::from(*chain_id) * 2 + 35 + parity,
        }
    }
}

impl fmt::Display for SigningScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Homestead => write!(f, "homestead"),
            Self::Eip155 { chain_id } => write!(f, "eip155 (chain {})", chain_id),
        }
    }
}

/// A legacy (type 0) transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    /// `None` creates a contract.
    pub to: Option<Address>,
    pub value: u128,
    pub data: Vec<u8>,
}

impl Transaction {
    fn to_legacy(&self, chain_id: Option<u64>) -> TxLegacy {
        TxLegacy {
            chain_id,
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: match self.to {
                Some(address) => TxKind::Call(address.into()),
                None => TxKind::Create,
            },
            value: U256::from(self.value),
            input: Bytes::from(self.data.clone()),
        }
    }
}

/// An ECDSA signature with its public-key recovery id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

impl RecoverableSignature {
    fn from_k256(signature: &Signature, recovery_id: RecoveryId) -> Self {
        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Self {
            r,
            s,
            recovery_id: recovery_id.to_byte(),
        }
    }

    pub fn y_parity(&self) -> bool {
        self.recovery_id & 1 == 1
    }

    /// `r ‖ s ‖ v` with `v = 27 + recovery id`, the layout used for signed messages.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = 27 + self.recovery_id;
        out
    }

    /// Parse `r ‖ s ‖ v`, accepting `v` as 0/1 or 27/28.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignerError> {
        if bytes.len() != 65 {
            return Err(SignerError::InvalidSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }
        let recovery_id = match bytes[64] {
            0 | 1 => bytes[64],
            27 | 28 => bytes[64] - 27,
            v => {
                return Err(SignerError::InvalidSignature(format!("bad v value {}", v)));
            }
        };
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, recovery_id })
    }

    /// Recover the public key that produced this signature over `prehash`.
    pub fn recover(&self, prehash: &[u8; 32]) -> Result<PublicKey, SignerError> {
        let mut rs = [0u8; 64];
        rs[..32].copy_from_slice(&self.r);
        rs[32..].copy_from_slice(&self.s);
        let signature = Signature::from_slice(&rs)
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
        let recovery_id = RecoveryId::from_byte(self.recovery_id).ok_or_else(|| {
            SignerError::InvalidSignature(format!("bad recovery id {}", self.recovery_id))
        })?;
        let key = VerifyingKey::recover_from_prehash(prehash, &signature, recovery_id)
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
        Ok(PublicKey::from_verifying_key(key))
    }
}

/// A transaction plus the signature that authorises it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    transaction: Transaction,
    scheme: SigningScheme,
    signature: RecoverableSignature,
}

impl SignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn scheme(&self) -> SigningScheme {
        self.scheme
    }

    pub fn signature(&self) -> &RecoverableSignature {
        &self.signature
    }

    pub fn v(&self) -> u128 {
        self.scheme.v(self.signature.y_parity())
    }

    /// RLP encoding ready to broadcast.
    pub fn raw(&self) -> Vec<u8> {
        let signature = alloy_primitives::Signature::new(
            U256::from_be_bytes(self.signature.r),
            U256::from_be_bytes(self.signature.s),
            self.signature.y_parity(),
        );
        let signed = Signed::new_unhashed(
            self.transaction.to_legacy(self.scheme.chain_id()),
            signature,
        );
        let mut out = Vec::with_capacity(signed.rlp_encoded_length());
        signed.rlp_encode(&mut out);
        out
    }

    /// Transaction hash (Keccak-256 of the raw encoding).
    pub fn hash(&self) -> [u8; 32] {
        keccak256(&self.raw())
    }

    /// Address that signed this transaction.
    pub fn recover_signer(&self) -> Result<Address, SignerError> {
        let hash = self.scheme.signing_hash(&self.transaction);
        Ok(self.signature.recover(&hash)?.address())
    }
}

fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());
    keccak256_concat(&[prefix.as_bytes(), message])
}

/// Address that signed `message` with EIP-191 personal signing.
pub fn recover_message_signer(message: &[u8], signature: &[u8]) -> Result<Address, SignerError> {
    let signature = RecoverableSignature::from_bytes(signature)?;
    Ok(signature
        .recover(&personal_message_hash(message))?
        .address())
}

/// Holder of one decrypted private key.
///
/// There is no "unloaded" value: an authority exists only while its key is loaded,
/// and [`SigningAuthority::dispose`] (or dropping it) wipes the key.
pub struct SigningAuthority {
    private_key: PrivateKey,
    address: Address,
    scheme: SigningScheme,
}

impl fmt::Debug for SigningAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Don't expose the private key in debug output
        f.debug_struct("SigningAuthority")
            .field("address", &self.address)
            .field("scheme", &self.scheme)
            .finish()
    }
}

impl SigningAuthority {
    /// Decrypt `record` with `password` and hold the key.
    ///
    /// # Returns
    /// A loaded authority, or `AuthenticationFailed` (wrapped in [`SignerError::Keystore`])
    /// for a wrong password or damaged record.
    pub fn load(
        record: &KeystoreRecord,
        password: &str,
        scheme: SigningScheme,
    ) -> Result<Self, SignerError> {
        let private_key = keystore::decrypt(record, password, None)?;
        Ok(Self::from_private_key(private_key, scheme))
    }

    pub fn from_private_key(private_key: PrivateKey, scheme: SigningScheme) -> Self {
        let address = private_key.address();
        tracing::debug!(address = %address, scheme = %scheme, "signing key loaded");
        Self {
            private_key,
            address,
            scheme,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn scheme(&self) -> SigningScheme {
        self.scheme
    }

    pub fn with_scheme(mut self, scheme: SigningScheme) -> Self {
        self.scheme = scheme;
        self
    }

    fn sign_prehash(&self, prehash: &[u8; 32]) -> Result<RecoverableSignature, SignerError> {
        let (signature, recovery_id) = self
            .private_key
            .signing_key()
            .sign_prehash_recoverable(prehash)
            .map_err(|e| SignerError::SigningFailed(e.to_string()))?;

        // Low-S form; flipping s flips the parity of the recovered point.
        let (signature, recovery_id) = match signature.normalize_s() {
            Some(normalized) => (
                normalized,
                RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
            ),
            None => (signature, recovery_id),
        };

        Ok(RecoverableSignature::from_k256(&signature, recovery_id))
    }

    fn check_signer(&self, expected: Address, recovered: Address) -> Result<(), SignerError> {
        if recovered != expected {
            tracing::warn!(
                expected = %expected,
                recovered = %recovered,
                "refusing signature: signer mismatch"
            );
            return Err(SignerError::SignerMismatch {
                expected,
                recovered,
            });
        }
        Ok(())
    }

    /// Sign `transaction` and confirm the signature recovers to `expected_address`.
    pub fn sign(
        &self,
        transaction: &Transaction,
        expected_address: Address,
    ) -> Result<SignedTransaction, SignerError> {
        let hash = self.scheme.signing_hash(transaction);
        let signature = self.sign_prehash(&hash)?;
        let signed = SignedTransaction {
            transaction: transaction.clone(),
            scheme: self.scheme,
            signature,
        };

        self.check_signer(expected_address, signed.recover_signer()?)?;
        tracing::debug!(
            signer = %expected_address,
            nonce = transaction.nonce,
            tx_hash = %hex::encode(signed.hash()),
            "signed transaction"
        );
        Ok(signed)
    }

    /// EIP-191 personal-sign `message`, returning `r ‖ s ‖ v`.
    pub fn sign_message(
        &self,
        message: &[u8],
        expected_address: Address,
    ) -> Result<[u8; 65], SignerError> {
        let signature = self.sign_prehash(&personal_message_hash(message))?;
        let bytes = signature.to_bytes();
        self.check_signer(expected_address, recover_message_signer(message, &bytes)?)?;
        Ok(bytes)
    }

    /// Drop the key. The scalar is wiped as part of the drop.
    pub fn dispose(self) {
        tracing::debug!(address = %self.address, "signing key disposed");
    }
}
