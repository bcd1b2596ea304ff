//! Wallet management for Ethereum-style accounts.
//!
//! This module provides:
//!
//! - **Mnemonic generation and recovery** (BIP39)
//! - **Hierarchical deterministic derivation** (BIP32, fixed path `m/44'/60'/0'/0/1`)
//! - **Keypairs and addresses** (secp256k1, Keccak-256, EIP-55)
//! - **Encrypted keystores** (Web3 Secret Storage v3: scrypt + AES-128-CTR)
//! - **Transaction signing** with signer verification
//!
//! ## Quick Start
//!
//! ### Create a new wallet
//!
//! ```no_run
//! use hdwallet_keystore::wallet::Wallet;
//!
//! let wallet = Wallet::at_default_path();
//! let created = wallet.create("password").unwrap();
//!
//! println!("Address: {}", created.address);
//! println!("Save this: {}", created.mnemonic.phrase());
//! ```
//!
//! ### Recover a wallet from mnemonic
//!
//! ```no_run
//! use hdwallet_keystore::wallet::Wallet;
//!
//! let mnemonic = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
//! let restored = Wallet::at_default_path()
//!     .create_from_mnemonic(mnemonic, None, "password", false)
//!     .unwrap();
//! ```
//!
//! ### Sign a transaction
//!
//! ```no_run
//! use hdwallet_keystore::wallet::{Transaction, Wallet};
//!
//! let wallet = Wallet::at_default_path();
//! let authority = wallet.load("0x2c7536E3605D9C16a7a3D7b1898e529396a65c23", "password").unwrap();
//! let tx = Transaction { nonce: 0, gas_limit: 21_000, ..Default::default() };
//! let signed = authority.sign(&tx, authority.address()).unwrap();
//! println!("raw: 0x{}", hex::encode(signed.raw()));
//! ```
//!
//! ## Security Notes
//!
//! - Entropy, seeds, private keys, mnemonics and derived encryption keys are zeroed
//!   from memory when dropped using the `zeroize` crate.
//! - Keystore files are written atomically with 0600 permissions inside a 0700
//!   directory on Unix systems.

pub mod hd;
pub mod keypair;
pub mod keystore;
pub mod mnemonic;
pub mod signer;
#[allow(clippy::module_inception)]
pub mod wallet;

// Re-export main types at module level
pub use hd::{
    derive, mnemonic_to_seed, seed_to_master_key, ChildIndex, DerivationError, DerivationPath,
    ExtendedKey, Seed, HARDENED_OFFSET,
};
pub use keypair::{
    derive_address_from_mnemonic, derive_private_key_from_mnemonic, private_key_to_address,
    Address, Keypair, KeypairError, PrivateKey, PublicKey,
};
pub use keystore::{
    decrypt, encrypt, list_keystores, Keystore, KeystoreError, KeystoreRecord, ScryptParams,
};
pub use mnemonic::{
    entropy_to_mnemonic, generate_entropy, mnemonic_to_entropy, Entropy, Mnemonic,
    MnemonicError,
};
pub use signer::{
    recover_message_signer, RecoverableSignature, SignedTransaction, SignerError,
    SigningAuthority, SigningScheme, Transaction,
};
pub use wallet::{default_keystore_path, CreatedWallet, Wallet, WalletError};
