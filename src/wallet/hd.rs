//! BIP-32 hierarchical deterministic key derivation over secp256k1.
//!
//! A [`Seed`] is turned into a master [`ExtendedKey`] with HMAC-SHA512 keyed by
//! `"Bitcoin seed"`, and child keys are derived one [`ChildIndex`] at a time along a
//! [`DerivationPath`]. Hardened children commit to the parent private key, normal
//! children to the parent's compressed public key, so a public-only extended key can
//! follow normal steps but never hardened ones.
//!
//! An intermediate result outside the curve order (probability below 2^-127 per step)
//! is reported as [`DerivationError::DerivationFailed`]; nothing is skipped or retried.

// Allow unused_assignments - the ZeroizeOnDrop derive macro generates code that clippy
// incorrectly flags as unused assignments when it reads/writes struct fields for zeroization
#![allow(unused_assignments)]

use crate::core::constants::{BIP32_SEED_KEY, WALLET_DERIVATION_PATH};
use crate::wallet::keypair::{PrivateKey, PublicKey};
use crate::wallet::mnemonic::Mnemonic;
use hmac::{Hmac, Mac};
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, NonZeroScalar, ProjectivePoint, Scalar};
use sha2::Sha512;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

type HmacSha512 = Hmac<Sha512>;

/// Indices at or above this value are hardened.
pub const HARDENED_OFFSET: u32 = 1 << 31;

/// Errors that can occur during key derivation.
#[derive(Debug, Error)]
pub enum DerivationError {
    #[error("Invalid seed length: {0} bytes. Must be between 16 and 64")]
    InvalidSeedLength(usize),

    #[error("Invalid derivation path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Child index {0} out of range: must be below 2^31")]
    IndexOutOfRange(u32),

    #[error("Cannot derive hardened child {0} from a public key")]
    HardenedFromPublic(ChildIndex),

    #[error("Key derivation failed at {0}: intermediate key is invalid")]
    DerivationFailed(String),
}

/// 64-byte BIP-39 seed (16 to 64 bytes when supplied directly). Zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Seed(Vec<u8>);

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed").field("len", &self.0.len()).finish()
    }
}

impl Seed {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DerivationError> {
        if !(16..=64).contains(&bytes.len()) {
            return Err(DerivationError::InvalidSeedLength(bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }

    pub(crate) fn from_array(mut bytes: [u8; 64]) -> Self {
        let seed = Self(bytes.to_vec());
        bytes.zeroize();
        seed
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Stretch a mnemonic and optional passphrase into a seed.
pub fn mnemonic_to_seed(mnemonic: &Mnemonic, passphrase: &str) -> Seed {
    mnemonic.to_seed(passphrase)
}

/// One step of a derivation path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChildIndex {
    Normal(u32),
    Hardened(u32),
}

impl ChildIndex {
    pub fn normal(index: u32) -> Result<Self, DerivationError> {
        if index >= HARDENED_OFFSET {
            return Err(DerivationError::IndexOutOfRange(index));
        }
        Ok(Self::Normal(index))
    }

    pub fn hardened(index: u32) -> Result<Self, DerivationError> {
        if index >= HARDENED_OFFSET {
            return Err(DerivationError::IndexOutOfRange(index));
        }
        Ok(Self::Hardened(index))
    }

    /// Decode the 32-bit wire form, where the top bit marks a hardened index.
    pub fn from_raw(raw: u32) -> Self {
        if raw >= HARDENED_OFFSET {
            Self::Hardened(raw - HARDENED_OFFSET)
        } else {
            Self::Normal(raw)
        }
    }

    /// The 32-bit wire form fed to the child key function.
    pub fn to_raw(self) -> u32 {
        match self {
            Self::Normal(i) => i,
            Self::Hardened(i) => i | HARDENED_OFFSET,
        }
    }

    pub fn is_hardened(self) -> bool {
        matches!(self, Self::Hardened(_))
    }
}

impl fmt::Display for ChildIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal(i) => write!(f, "{}", i),
            Self::Hardened(i) => write!(f, "{}'", i),
        }
    }
}

/// An ordered list of child indices starting at the master key, e.g. `m/44'/60'/0'/0/1`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct DerivationPath(Vec<ChildIndex>);

impl DerivationPath {
    pub fn new(indices: Vec<ChildIndex>) -> Self {
        Self(indices)
    }

    /// The account path every wallet in this crate uses.
    pub fn wallet_default() -> Self {
        Self(vec![
            ChildIndex::Hardened(44),
            ChildIndex::Hardened(60),
            ChildIndex::Hardened(0),
            ChildIndex::Normal(0),
            ChildIndex::Normal(1),
        ])
    }

    pub fn indices(&self) -> &[ChildIndex] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// This path extended by one more index.
    pub fn child(&self, index: ChildIndex) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }
}

impl FromStr for DerivationPath {
    type Err = DerivationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| DerivationError::InvalidPath {
            path: s.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.trim().split('/');
        match parts.next() {
            Some("m") | Some("M") => {}
            _ => return Err(invalid("must start with 'm'")),
        }

        let mut indices = Vec::new();
        for part in parts {
            let (digits, hardened) = match part
                .strip_suffix('\'')
                .or_else(|| part.strip_suffix('h'))
                .or_else(|| part.strip_suffix('H'))
            {
                Some(d) => (d, true),
                None => (part, false),
            };
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(&format!("bad component '{}'", part)));
            }
            let value: u32 = digits
                .parse()
                .map_err(|_| invalid(&format!("component '{}' out of range", part)))?;
            let index = if hardened {
                ChildIndex::hardened(value)
            } else {
                ChildIndex::normal(value)
            }
            .map_err(|_| invalid(&format!("component '{}' out of range", part)))?;
            indices.push(index);
        }

        Ok(Self(indices))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

#[derive(Clone)]
enum KeyMaterial {
    Private(PrivateKey),
    Public(PublicKey),
}

/// A key plus chain code at some depth of the derivation tree.
#[derive(Clone)]
pub struct ExtendedKey {
    key: KeyMaterial,
    chain_code: Zeroizing<[u8; 32]>,
    depth: u8,
    child_number: u32,
}

impl fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Don't expose the private key or chain code in debug output
        f.debug_struct("ExtendedKey")
            .field("private", &self.is_private())
            .field("depth", &self.depth)
            .field("child_number", &ChildIndex::from_raw(self.child_number))
            .finish()
    }
}

impl ExtendedKey {
    pub fn is_private(&self) -> bool {
        matches!(self.key, KeyMaterial::Private(_))
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        match &self.key {
            KeyMaterial::Private(k) => Some(k),
            KeyMaterial::Public(_) => None,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match &self.key {
            KeyMaterial::Private(k) => k.public_key(),
            KeyMaterial::Public(p) => *p,
        }
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Index this key was derived with (0 for the master key).
    pub fn child_number(&self) -> ChildIndex {
        ChildIndex::from_raw(self.child_number)
    }

    /// The public-only counterpart of this key.
    pub fn neuter(&self) -> ExtendedKey {
        ExtendedKey {
            key: KeyMaterial::Public(self.public_key()),
            chain_code: self.chain_code.clone(),
            depth: self.depth,
            child_number: self.child_number,
        }
    }

    /// Derive one child key.
    pub fn derive_child(&self, index: ChildIndex) -> Result<ExtendedKey, DerivationError> {
        let depth = self
            .depth
            .checked_add(1)
            .ok_or_else(|| DerivationError::DerivationFailed(format!("{} (depth)", index)))?;
        let raw = index.to_raw();

        let mut mac = HmacSha512::new_from_slice(self.chain_code.as_slice())
            .map_err(|e| DerivationError::DerivationFailed(e.to_string()))?;
        match (&self.key, index) {
            (KeyMaterial::Private(k), ChildIndex::Hardened(_)) => {
                mac.update(&[0u8]);
                mac.update(k.to_bytes().as_slice());
            }
            (KeyMaterial::Public(_), ChildIndex::Hardened(_)) => {
                return Err(DerivationError::HardenedFromPublic(index));
            }
            (_, ChildIndex::Normal(_)) => {
                mac.update(&self.public_key().to_compressed());
            }
        }
        mac.update(&raw.to_be_bytes());

        let (il, chain_code) = split_hmac(mac);
        let tweak = parse_scalar(&il)
            .ok_or_else(|| DerivationError::DerivationFailed(index.to_string()))?;

        let key = match &self.key {
            KeyMaterial::Private(parent) => {
                let parent_scalar: Scalar = *parent.signing_key().as_nonzero_scalar().as_ref();
                let child = Option::<NonZeroScalar>::from(NonZeroScalar::new(tweak + parent_scalar))
                    .ok_or_else(|| DerivationError::DerivationFailed(index.to_string()))?;
                KeyMaterial::Private(PrivateKey::from_signing_key(SigningKey::from(child)))
            }
            KeyMaterial::Public(parent) => {
                let point = ProjectivePoint::GENERATOR * tweak
                    + ProjectivePoint::from(*parent.verifying_key().as_affine());
                let child = VerifyingKey::from_affine(point.to_affine())
                    .map_err(|_| DerivationError::DerivationFailed(index.to_string()))?;
                KeyMaterial::Public(PublicKey::from_verifying_key(child))
            }
        };

        Ok(ExtendedKey {
            key,
            chain_code,
            depth,
            child_number: raw,
        })
    }

    /// Derive along every index of `path`, starting from this key.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<ExtendedKey, DerivationError> {
        let mut node = self.clone();
        for index in path.indices() {
            node = node.derive_child(*index)?;
        }
        Ok(node)
    }
}

fn split_hmac(mac: HmacSha512) -> (Zeroizing<[u8; 32]>, Zeroizing<[u8; 32]>) {
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    let mut left = Zeroizing::new([0u8; 32]);
    let mut right = Zeroizing::new([0u8; 32]);
    left.copy_from_slice(&out[..32]);
    right.copy_from_slice(&out[32..]);
    (left, right)
}

/// Interpret 32 bytes as a scalar, rejecting values ≥ n.
fn parse_scalar(bytes: &[u8; 32]) -> Option<Scalar> {
    Option::from(Scalar::from_repr(FieldBytes::clone_from_slice(bytes)))
}

/// Compute the BIP-32 master key of a seed.
pub fn seed_to_master_key(seed: &Seed) -> Result<ExtendedKey, DerivationError> {
    let len = seed.as_bytes().len();
    if !(16..=64).contains(&len) {
        return Err(DerivationError::InvalidSeedLength(len));
    }

    let mut mac = HmacSha512::new_from_slice(BIP32_SEED_KEY)
        .map_err(|e| DerivationError::DerivationFailed(e.to_string()))?;
    mac.update(seed.as_bytes());
    let (il, chain_code) = split_hmac(mac);

    let signing_key = SigningKey::from_slice(il.as_slice())
        .map_err(|_| DerivationError::DerivationFailed("master key".to_string()))?;

    Ok(ExtendedKey {
        key: KeyMaterial::Private(PrivateKey::from_signing_key(signing_key)),
        chain_code,
        depth: 0,
        child_number: 0,
    })
}

/// Derive the key at `path` below `master`.
pub fn derive(master: &ExtendedKey, path: &DerivationPath) -> Result<ExtendedKey, DerivationError> {
    let leaf = master.derive_path(path)?;
    tracing::trace!(path = %path, depth = leaf.depth(), "derived extended key");
    Ok(leaf)
}

/// The fixed account path as text.
pub fn wallet_derivation_path() -> &'static str {
    WALLET_DERIVATION_PATH
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector1_master() -> ExtendedKey {
        let seed = Seed::from_bytes(&hex::decode("000102030405060708090a0b0c0d0e0f").unwrap())
            .unwrap();
        seed_to_master_key(&seed).unwrap()
    }

    #[test]
    fn test_bip32_vector1_master() {
        let master = vector1_master();
        assert_eq!(
            hex::encode(master.private_key().unwrap().to_bytes().as_slice()),
            "e8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35"
        );
        assert_eq!(
            hex::encode(master.chain_code()),
            "873dff81c02f525623fd1fe5167eac3a55a049de3d314bb42ee227ffed37d508"
        );
        assert_eq!(master.depth(), 0);
    }

    #[test]
    fn test_bip32_vector1_hardened_child() {
        let master = vector1_master();
        let child = derive(&master, &"m/0'".parse().unwrap()).unwrap();
        assert_eq!(
            hex::encode(child.private_key().unwrap().to_bytes().as_slice()),
            "edb2e14f9ee77d26dd93b4ecede8d16ed408ce149b6cd80b0715a2d911a0afea"
        );
        assert_eq!(child.depth(), 1);
        assert_eq!(child.child_number(), ChildIndex::Hardened(0));
    }

    #[test]
    fn test_public_derivation_matches_private() {
        let master = vector1_master();
        let parent = derive(&master, &"m/0'".parse().unwrap()).unwrap();
        let private_child = parent.derive_child(ChildIndex::Normal(1)).unwrap();
        let public_child = parent.neuter().derive_child(ChildIndex::Normal(1)).unwrap();
        assert!(!public_child.is_private());
        assert_eq!(private_child.public_key(), public_child.public_key());
        assert_eq!(private_child.chain_code(), public_child.chain_code());
    }

    #[test]
    fn test_hardened_from_public_fails() {
        let master = vector1_master().neuter();
        assert!(matches!(
            master.derive_child(ChildIndex::Hardened(0)),
            Err(DerivationError::HardenedFromPublic(ChildIndex::Hardened(0)))
        ));
    }

    #[test]
    fn test_seed_length_bounds() {
        assert!(matches!(
            Seed::from_bytes(&[0u8; 15]),
            Err(DerivationError::InvalidSeedLength(15))
        ));
        assert!(matches!(
            Seed::from_bytes(&[0u8; 65]),
            Err(DerivationError::InvalidSeedLength(65))
        ));
        assert!(Seed::from_bytes(&[0u8; 64]).is_ok());
    }

    #[test]
    fn test_path_parse_and_display() {
        let path: DerivationPath = "m/44'/60'/0'/0/1".parse().unwrap();
        assert_eq!(path, DerivationPath::wallet_default());
        assert_eq!(path.to_string(), wallet_derivation_path());

        let alt: DerivationPath = "m/44h/60H/0'/0/1".parse().unwrap();
        assert_eq!(alt, path);

        let root: DerivationPath = "m".parse().unwrap();
        assert!(root.is_empty());
    }

    #[test]
    fn test_path_parse_errors() {
        for bad in ["", "44'/60'", "m/", "m/abc", "m/-1", "m/2147483648", "m/1''"] {
            assert!(
                bad.parse::<DerivationPath>().is_err(),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_child_index_raw() {
        assert_eq!(ChildIndex::Hardened(44).to_raw(), 0x8000_002c);
        assert_eq!(ChildIndex::from_raw(0x8000_002c), ChildIndex::Hardened(44));
        assert_eq!(ChildIndex::from_raw(5), ChildIndex::Normal(5));
        assert!(ChildIndex::normal(HARDENED_OFFSET).is_err());
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let master = vector1_master();
        let path = DerivationPath::wallet_default();
        let a = derive(&master, &path).unwrap();
        let b = derive(&master, &path).unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.depth(), 5);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let debug = format!("{:?}", vector1_master());
        assert!(!debug.contains("e8f32e72"));
        assert!(!debug.contains("873dff81"));
    }
}
