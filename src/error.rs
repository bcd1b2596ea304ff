//! Crate-wide error type.
//!
//! Every module owns its own error enum; [`Error`] wraps them so callers that
//! drive several modules at once can use a single `Result`. [`Error::kind`]
//! sorts any failure into one of four categories.

use crate::chain::{ChainError, TransferError};
use crate::config::ConfigError;
use crate::wallet::{
    DerivationError, KeypairError, KeystoreError, MnemonicError, SignerError, WalletError,
};
use std::fmt;
use thiserror::Error;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller-supplied data is malformed.
    InputValidation,
    /// A check over key material or ciphertext failed.
    CryptographicFailure,
    /// Filesystem, permissions or randomness source.
    ResourceFailure,
    /// The chain collaborator failed.
    ExternalFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InputValidation => "input validation",
            Self::CryptographicFailure => "cryptographic failure",
            Self::ResourceFailure => "resource failure",
            Self::ExternalFailure => "external failure",
        };
        f.write_str(name)
    }
}

/// Unified error type for all wallet operations
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Mnemonic(#[from] MnemonicError),
    #[error(transparent)]
    Derivation(#[from] DerivationError),
    #[error(transparent)]
    Keypair(#[from] KeypairError),
    #[error(transparent)]
    Keystore(#[from] KeystoreError),
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Mnemonic(e) => e.kind(),
            Self::Derivation(e) => e.kind(),
            Self::Keypair(e) => e.kind(),
            Self::Keystore(e) => e.kind(),
            Self::Signer(e) => e.kind(),
            Self::Wallet(e) => e.kind(),
            Self::Chain(e) => e.kind(),
            Self::Transfer(e) => e.kind(),
            Self::Config(e) => e.kind(),
        }
    }
}

impl MnemonicError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidEntropyLength(_)
            | Self::InvalidWordCount(_)
            | Self::UnknownWord(_)
            | Self::InvalidPhrase(_) => ErrorKind::InputValidation,
            Self::ChecksumMismatch => ErrorKind::CryptographicFailure,
            Self::InsufficientRandomness(_) => ErrorKind::ResourceFailure,
        }
    }
}

impl DerivationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSeedLength(_)
            | Self::InvalidPath { .. }
            | Self::IndexOutOfRange(_)
            | Self::HardenedFromPublic(_) => ErrorKind::InputValidation,
            Self::DerivationFailed(_) => ErrorKind::CryptographicFailure,
        }
    }
}

impl KeypairError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPrivateKey | Self::InvalidPublicKey(_) | Self::InvalidAddress(_) => {
                ErrorKind::InputValidation
            }
            Self::Mnemonic(e) => e.kind(),
            Self::Derivation(e) => e.kind(),
        }
    }
}

impl KeystoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_)
            | Self::Io(_)
            | Self::AlreadyExists(_)
            | Self::InsufficientRandomness(_) => ErrorKind::ResourceFailure,
            Self::Json(_)
            | Self::InvalidFormat(_)
            | Self::UnsupportedVersion(_)
            | Self::UnsupportedCipher(_)
            | Self::UnsupportedKdf(_) => ErrorKind::InputValidation,
            Self::AuthenticationFailed
            | Self::AddressMismatch { .. }
            | Self::KeyDerivationFailed(_) => ErrorKind::CryptographicFailure,
        }
    }
}

impl SignerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SignerMismatch { .. } | Self::SigningFailed(_) => {
                ErrorKind::CryptographicFailure
            }
            Self::InvalidSignature(_) => ErrorKind::InputValidation,
            Self::Keystore(e) => e.kind(),
        }
    }
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::AlreadyExists(_) => ErrorKind::ResourceFailure,
            Self::InvalidName(_) => ErrorKind::InputValidation,
            Self::Keystore(e) => e.kind(),
            Self::Keypair(e) => e.kind(),
            Self::Mnemonic(e) => e.kind(),
            Self::Derivation(e) => e.kind(),
            Self::Signer(e) => e.kind(),
        }
    }
}

impl ChainError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ExternalFailure
    }
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Chain(e) => e.kind(),
            Self::Signer(e) => e.kind(),
            Self::ChainIdMismatch { .. } => ErrorKind::ExternalFailure,
        }
    }
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::ResourceFailure,
            Self::Json(_) | Self::InvalidValue { .. } | Self::UnknownNetwork(_) => {
                ErrorKind::InputValidation
            }
        }
    }
}
