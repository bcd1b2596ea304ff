//! BIP39 entropy and mnemonic handling for wallet creation and recovery.
//!
//! Entropy comes from the operating system's random source and is encoded as an
//! English wordlist phrase whose last bits are a SHA-256 checksum. Decoding a phrase
//! reproduces exactly the entropy it was made from, and a damaged phrase is rejected
//! rather than decoded into different entropy.

// Allow unused_assignments - the ZeroizeOnDrop derive macro generates code that clippy
// incorrectly flags as unused assignments when it reads/writes struct fields for zeroization
#![allow(unused_assignments)]

use crate::core::constants::{DEFAULT_ENTROPY_BITS, SUPPORTED_ENTROPY_BITS};
use crate::wallet::hd::Seed;
use bip39::{Language, Mnemonic as Bip39Mnemonic};
use rand::rngs::OsRng;
use rand::TryRngCore;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Errors that can occur during mnemonic operations.
#[derive(Debug, Error)]
pub enum MnemonicError {
    #[error("Invalid entropy length: {0} bits. Must be 128, 160, 192, 224, or 256")]
    InvalidEntropyLength(usize),

    #[error("Secure random source unavailable: {0}")]
    InsufficientRandomness(String),

    #[error("Invalid word count: {0}. Must be 12, 15, 18, 21, or 24")]
    InvalidWordCount(usize),

    #[error("Unknown mnemonic word: '{0}'")]
    UnknownWord(String),

    #[error("Mnemonic checksum mismatch")]
    ChecksumMismatch,

    #[error("Invalid mnemonic phrase: {0}")]
    InvalidPhrase(String),
}

/// Raw entropy backing a mnemonic. Zeroized when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Entropy(Vec<u8>);

impl std::fmt::Debug for Entropy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entropy")
            .field("bits", &self.bits())
            .finish()
    }
}

impl Entropy {
    /// Wrap existing entropy bytes, checking the length is one BIP39 supports.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MnemonicError> {
        let bits = bytes.len() * 8;
        if !SUPPORTED_ENTROPY_BITS.contains(&bits) {
            return Err(MnemonicError::InvalidEntropyLength(bits));
        }
        Ok(Self(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn bits(&self) -> usize {
        self.0.len() * 8
    }
}

/// Number of mnemonic words produced by the given entropy size.
pub fn word_count_for_bits(bits: usize) -> Result<usize, MnemonicError> {
    if !SUPPORTED_ENTROPY_BITS.contains(&bits) {
        return Err(MnemonicError::InvalidEntropyLength(bits));
    }
    // 11 bits per word, checksum adds bits/32
    Ok((bits + bits / 32) / 11)
}

fn bits_for_word_count(word_count: usize) -> Result<usize, MnemonicError> {
    match word_count {
        12 => Ok(128),
        15 => Ok(160),
        18 => Ok(192),
        21 => Ok(224),
        24 => Ok(256),
        _ => Err(MnemonicError::InvalidWordCount(word_count)),
    }
}

/// Generate fresh entropy from the operating system's secure random source.
///
/// # Arguments
/// * `bits` - Entropy size (128, 160, 192, 224, or 256)
///
/// # Returns
/// The entropy, or `InsufficientRandomness` if the random source failed.
pub fn generate_entropy(bits: usize) -> Result<Entropy, MnemonicError> {
    if !SUPPORTED_ENTROPY_BITS.contains(&bits) {
        return Err(MnemonicError::InvalidEntropyLength(bits));
    }

    let mut bytes = vec![0u8; bits / 8];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| MnemonicError::InsufficientRandomness(e.to_string()))?;

    Ok(Entropy(bytes))
}

/// Encode entropy as an English BIP39 mnemonic.
pub fn entropy_to_mnemonic(entropy: &Entropy) -> Result<Mnemonic, MnemonicError> {
    let inner = Bip39Mnemonic::from_entropy_in(Language::English, entropy.as_bytes())
        .map_err(|e| map_bip39_error(e, ""))?;
    Ok(Mnemonic::from_inner(inner))
}

/// Decode a mnemonic phrase back to the entropy it encodes.
///
/// Fails with `UnknownWord`, `InvalidWordCount` or `ChecksumMismatch` instead of
/// returning entropy for a phrase that was not produced by [`entropy_to_mnemonic`].
pub fn mnemonic_to_entropy(phrase: &str) -> Result<Entropy, MnemonicError> {
    Ok(Mnemonic::from_phrase(phrase)?.to_entropy())
}

fn map_bip39_error(err: bip39::Error, normalized: &str) -> MnemonicError {
    match err {
        bip39::Error::BadWordCount(count) => MnemonicError::InvalidWordCount(count),
        bip39::Error::UnknownWord(index) => MnemonicError::UnknownWord(
            normalized
                .split_whitespace()
                .nth(index)
                .unwrap_or_default()
                .to_string(),
        ),
        bip39::Error::BadEntropyBitCount(bits) => MnemonicError::InvalidEntropyLength(bits),
        bip39::Error::InvalidChecksum => MnemonicError::ChecksumMismatch,
        other => MnemonicError::InvalidPhrase(other.to_string()),
    }
}

/// A BIP39 mnemonic phrase for wallet generation and recovery.
///
/// The mnemonic is securely zeroed from memory when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Mnemonic {
    #[zeroize(skip)]
    inner: Bip39Mnemonic,
    phrase: String,
    words: Vec<String>,
}

impl std::fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't expose the actual phrase in debug output
        f.debug_struct("Mnemonic")
            .field("word_count", &self.words.len())
            .finish()
    }
}

impl Mnemonic {
    fn from_inner(inner: Bip39Mnemonic) -> Self {
        let phrase = inner.to_string();
        let words: Vec<String> = phrase.split_whitespace().map(String::from).collect();
        Self {
            inner,
            phrase,
            words,
        }
    }

    /// Generate a new mnemonic with the specified number of words.
    ///
    /// # Arguments
    /// * `word_count` - Number of words (12, 15, 18, 21, or 24)
    ///
    /// # Example
    /// ```
    /// use hdwallet_keystore::wallet::Mnemonic;
    /// let mnemonic = Mnemonic::generate(24).unwrap();
    /// assert_eq!(mnemonic.word_count(), 24);
    /// ```
    pub fn generate(word_count: usize) -> Result<Self, MnemonicError> {
        let entropy = generate_entropy(bits_for_word_count(word_count)?)?;
        entropy_to_mnemonic(&entropy)
    }

    /// Generate a 12-word mnemonic, the size used for new wallets.
    pub fn generate_default() -> Result<Self, MnemonicError> {
        let entropy = generate_entropy(DEFAULT_ENTROPY_BITS)?;
        entropy_to_mnemonic(&entropy)
    }

    /// Create a mnemonic from an existing phrase.
    ///
    /// Surrounding whitespace, repeated spaces and upper case are tolerated.
    ///
    /// # Example
    /// ```
    /// use hdwallet_keystore::wallet::Mnemonic;
    /// let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    /// let mnemonic = Mnemonic::from_phrase(phrase).unwrap();
    /// assert_eq!(mnemonic.to_entropy().as_bytes(), &[0u8; 16]);
    /// ```
    pub fn from_phrase(phrase: &str) -> Result<Self, MnemonicError> {
        let mut normalized = phrase
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let parsed = Bip39Mnemonic::parse_in_normalized(Language::English, &normalized)
            .map_err(|e| map_bip39_error(e, &normalized));
        normalized.zeroize();
        Ok(Self::from_inner(parsed?))
    }

    /// Validate a mnemonic phrase without keeping it.
    pub fn validate(phrase: &str) -> bool {
        Self::from_phrase(phrase).is_ok()
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Stretch the mnemonic into a 64-byte seed (PBKDF2-HMAC-SHA512, 2048 rounds).
    ///
    /// # Arguments
    /// * `passphrase` - BIP39 passphrase, empty for none
    pub fn to_seed(&self, passphrase: &str) -> Seed {
        Seed::from_array(self.inner.to_seed(passphrase))
    }

    /// The entropy this mnemonic encodes.
    pub fn to_entropy(&self) -> Entropy {
        Entropy(self.inner.to_entropy())
    }
}
