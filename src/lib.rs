//! Hierarchical deterministic wallet with an encrypted keystore.
//!
//! A BIP-39 mnemonic is turned into a seed, the account key is derived along
//! `m/44'/60'/0'/0/1`, and the key is stored in a Web3 Secret Storage v3 file
//! (scrypt + AES-128-CTR). A [`SigningAuthority`] loaded from that file signs
//! transactions and refuses to return a signature that does not recover to the
//! expected address.
//!
//! ```no_run
//! use hdwallet_keystore::{Transaction, Wallet};
//!
//! # fn main() -> hdwallet_keystore::Result<()> {
//! let wallet = Wallet::at_default_path();
//! let created = wallet.create("correct-horse")?;
//!
//! let authority = wallet.load(&created.address.to_string(), "correct-horse")?;
//! let tx = Transaction { nonce: 0, gas_limit: 21_000, ..Default::default() };
//! let signed = authority.sign(&tx, created.address)?;
//! # let _ = signed;
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod utils;
pub mod wallet;

pub use chain::{
    ChainClient, ChainError, JsonRpcClient, TokenContract, TransferError, TransferOptions,
    TransferReceipt,
};
pub use config::{ChainConfig, Config, ConfigError, KeystoreConfig};
pub use error::{Error, ErrorKind, Result};
pub use logging::{init_default_logging, init_logging, is_initialized, LogFormat, LoggingConfig};
pub use wallet::{
    Address, DerivationPath, Keypair, KeystoreRecord, Mnemonic, PrivateKey, PublicKey,
    ScryptParams, SignedTransaction, SigningAuthority, SigningScheme, Transaction, Wallet,
};
