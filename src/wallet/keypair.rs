//! Keypair management for Ethereum-style accounts.
//!
//! This module provides secp256k1 private/public keys, the 20-byte account address
//! derived from them, and the mnemonic → account derivation used by every wallet.

use crate::utils::crypto::decode_hex;
use crate::wallet::hd::{DerivationError, DerivationPath, Seed};
use crate::wallet::mnemonic::{Mnemonic, MnemonicError};
use k256::ecdsa::{SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::Zeroizing;

/// Errors that can occur during keypair operations.
#[derive(Debug, Error)]
pub enum KeypairError {
    #[error("Invalid private key: must be 32 bytes in the range 1..n")]
    InvalidPrivateKey,

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Mnemonic error: {0}")]
    Mnemonic(#[from] MnemonicError),

    #[error("Key derivation error: {0}")]
    Derivation(#[from] DerivationError),
}

/// A 20-byte account address.
///
/// Displays as `0x` followed by EIP-55 mixed-case checksum hex. Parsing accepts
/// any case, with or without the `0x` prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(alloy_primitives::Address);

impl Address {
    pub const ZERO: Address = Address(alloy_primitives::Address::ZERO);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(alloy_primitives::Address::new(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeypairError> {
        if bytes.len() != 20 {
            return Err(KeypairError::InvalidAddress(format!(
                "expected 20 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(alloy_primitives::Address::from_slice(bytes)))
    }

    /// Address of a public key: last 20 bytes of Keccak-256 over the 64-byte X‖Y encoding.
    pub fn from_public_key(public: &PublicKey) -> Self {
        let uncompressed = public.to_uncompressed();
        Self(alloy_primitives::Address::from_raw_public_key(&uncompressed[1..]))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0 .0 .0
    }

    /// Lowercase hex without prefix, the form keystore records embed.
    pub fn to_hex_lower(&self) -> String {
        hex::encode(self.0)
    }

    /// `0x`-prefixed EIP-55 checksum encoding.
    pub fn to_checksum(&self) -> String {
        self.0.to_checksum(None)
    }
}

impl From<alloy_primitives::Address> for Address {
    fn from(address: alloy_primitives::Address) -> Self {
        Self(address)
    }
}

impl From<Address> for alloy_primitives::Address {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl FromStr for Address {
    type Err = KeypairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if body.len() != 40 {
            return Err(KeypairError::InvalidAddress(format!(
                "expected 40 hex characters, got {}",
                body.len()
            )));
        }
        body.parse::<alloy_primitives::Address>()
            .map(Self)
            .map_err(|e| KeypairError::InvalidAddress(e.to_string()))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A secp256k1 private key (scalar in 1..n).
///
/// The scalar is zeroized when the key is dropped and never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Don't expose the secret scalar in debug output
        f.debug_struct("PrivateKey")
            .field("address", &self.address())
            .finish()
    }
}

impl PrivateKey {
    /// Parse a 32-byte big-endian scalar. Zero and values ≥ n are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeypairError> {
        if bytes.len() != 32 {
            return Err(KeypairError::InvalidPrivateKey);
        }
        let inner = SigningKey::from_slice(bytes).map_err(|_| KeypairError::InvalidPrivateKey)?;
        Ok(Self { inner })
    }

    pub fn from_hex(s: &str) -> Result<Self, KeypairError> {
        let bytes = Zeroizing::new(decode_hex(s).map_err(|_| KeypairError::InvalidPrivateKey)?);
        Self::from_bytes(&bytes)
    }

    pub(crate) fn from_signing_key(inner: SigningKey) -> Self {
        Self { inner }
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }

    /// Big-endian scalar bytes. The buffer is wiped when dropped.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: *self.inner.verifying_key(),
        }
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public_key())
    }
}

/// A secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_compressed()))
    }
}

impl PublicKey {
    /// Parse a SEC1 encoded point (33-byte compressed or 65-byte uncompressed).
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, KeypairError> {
        let inner = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| KeypairError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { inner })
    }

    pub(crate) fn from_verifying_key(inner: VerifyingKey) -> Self {
        Self { inner }
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.inner
    }

    pub fn to_compressed(&self) -> [u8; 33] {
        let point = self.inner.to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(point.as_bytes());
        out
    }

    pub fn to_uncompressed(&self) -> [u8; 65] {
        let point = self.inner.to_encoded_point(false);
        let mut out = [0u8; 65];
        out.copy_from_slice(point.as_bytes());
        out
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(self)
    }
}

/// Derive the account address of a private key.
pub fn private_key_to_address(private_key: &PrivateKey) -> Address {
    private_key.address()
}

/// A private key together with its public key and address.
#[derive(Clone)]
pub struct Keypair {
    private_key: PrivateKey,
    public_key: PublicKey,
    address: Address,
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address)
            .finish()
    }
}

impl Keypair {
    pub fn from_private_key(private_key: PrivateKey) -> Self {
        let public_key = private_key.public_key();
        let address = public_key.address();
        Self {
            private_key,
            public_key,
            address,
        }
    }

    /// Create the wallet account keypair from a BIP39 mnemonic phrase.
    ///
    /// # Arguments
    /// * `mnemonic` - A valid BIP39 mnemonic phrase
    /// * `passphrase` - Optional BIP39 passphrase
    ///
    /// # Example
    /// ```
    /// use hdwallet_keystore::wallet::Keypair;
    /// let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    /// let keypair = Keypair::from_mnemonic(phrase, None).unwrap();
    /// println!("Address: {}", keypair.address());
    /// ```
    pub fn from_mnemonic(mnemonic: &str, passphrase: Option<&str>) -> Result<Self, KeypairError> {
        let mnemonic = Mnemonic::from_phrase(mnemonic)?;
        Self::from_mnemonic_obj(&mnemonic, passphrase)
    }

    /// Create the wallet account keypair from a parsed mnemonic.
    pub fn from_mnemonic_obj(
        mnemonic: &Mnemonic,
        passphrase: Option<&str>,
    ) -> Result<Self, KeypairError> {
        let seed = mnemonic.to_seed(passphrase.unwrap_or(""));
        Self::from_seed(&seed)
    }

    /// Derive the wallet account keypair from a seed over the fixed account path.
    pub fn from_seed(seed: &Seed) -> Result<Self, KeypairError> {
        Self::from_seed_at(seed, &DerivationPath::wallet_default())
    }

    /// Derive a keypair from a seed over an arbitrary path.
    pub fn from_seed_at(seed: &Seed, path: &DerivationPath) -> Result<Self, KeypairError> {
        let master = crate::wallet::hd::seed_to_master_key(seed)?;
        let leaf = crate::wallet::hd::derive(&master, path)?;
        let private_key = leaf
            .private_key()
            .cloned()
            .ok_or(KeypairError::InvalidPrivateKey)?;
        Ok(Self::from_private_key(private_key))
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn into_private_key(self) -> PrivateKey {
        self.private_key
    }
}

/// Private key of the wallet account for a mnemonic phrase.
pub fn derive_private_key_from_mnemonic(
    phrase: &str,
    passphrase: Option<&str>,
) -> Result<PrivateKey, KeypairError> {
    Ok(Keypair::from_mnemonic(phrase, passphrase)?.into_private_key())
}

/// Address of the wallet account for a mnemonic phrase.
pub fn derive_address_from_mnemonic(
    phrase: &str,
    passphrase: Option<&str>,
) -> Result<Address, KeypairError> {
    Ok(Keypair::from_mnemonic(phrase, passphrase)?.address())
}
