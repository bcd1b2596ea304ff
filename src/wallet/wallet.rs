//! Wallet facade: create accounts and load them for signing.
//!
//! ## Keystore Layout
//!
//! Every account is one encrypted record named after its checksummed address:
//! ```text
//! ~/.hdwallet/keystore/
//!   ├── 0x2c7536E3605D9C16a7a3D7b1898e529396a65c23
//!   └── 0x9858EfFD232B4033E47d90003D41EC34EcaEda94
//! ```
//!
//! Creating a wallet runs the whole pipeline: fresh entropy, mnemonic, seed, the
//! fixed derivation path, encryption and an atomic write. Loading a wallet decrypts
//! the record and hands back a [`SigningAuthority`] bound to the record's address.

use crate::wallet::hd::{DerivationError, DerivationPath};
use crate::wallet::keypair::{Address, Keypair, KeypairError};
use crate::wallet::keystore::{
    self, list_keystores, Keystore, KeystoreError, KeystoreRecord, ScryptParams,
};
use crate::wallet::mnemonic::{Mnemonic, MnemonicError};
use crate::wallet::signer::{SignerError, SigningAuthority, SigningScheme};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default keystore directory under home
const KEYSTORE_DIR_NAME: &str = ".hdwallet/keystore";

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Wallet not found: {0}")]
    NotFound(String),

    #[error("Wallet already exists: {0}")]
    AlreadyExists(Address),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Keystore error: {0}")]
    Keystore(#[from] KeystoreError),

    #[error("Keypair error: {0}")]
    Keypair(#[from] KeypairError),

    #[error("Mnemonic error: {0}")]
    Mnemonic(#[from] MnemonicError),

    #[error("Derivation error: {0}")]
    Derivation(#[from] DerivationError),

    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),
}

/// Sanitize a keystore file name to prevent path traversal.
///
/// Rejects path separators, `..`, empty names and names starting with a dot.
fn sanitize_name(name: &str) -> Result<&str, WalletError> {
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(WalletError::InvalidName(format!(
            "Name '{}' contains invalid path characters",
            name
        )));
    }
    if name.trim().is_empty() {
        return Err(WalletError::InvalidName("Name cannot be empty".to_string()));
    }
    if name.starts_with('.') {
        return Err(WalletError::InvalidName(format!(
            "Name '{}' cannot start with a dot",
            name
        )));
    }
    Ok(name)
}

/// Result of creating a wallet.
///
/// The mnemonic is the only backup of the account; it is handed to the caller once
/// and never written to disk.
#[derive(Debug)]
pub struct CreatedWallet {
    pub address: Address,
    pub record: KeystoreRecord,
    pub mnemonic: Mnemonic,
    pub path: PathBuf,
}

/// Handle on a keystore directory.
#[derive(Debug, Clone)]
pub struct Wallet {
    keystore_dir: PathBuf,
    scrypt: ScryptParams,
    scheme: SigningScheme,
}

impl Wallet {
    /// Create a handle without touching the filesystem.
    ///
    /// # Example
    /// ```
    /// use hdwallet_keystore::wallet::Wallet;
    /// let wallet = Wallet::new("/tmp/keystore");
    /// assert!(wallet.keystore_dir().ends_with("keystore"));
    /// ```
    pub fn new(keystore_dir: impl AsRef<Path>) -> Self {
        Self {
            keystore_dir: keystore_dir.as_ref().to_path_buf(),
            scrypt: ScryptParams::light(),
            scheme: SigningScheme::default(),
        }
    }

    /// Handle on `~/.hdwallet/keystore`.
    pub fn at_default_path() -> Self {
        Self::new(default_keystore_path())
    }

    pub fn with_scrypt_params(mut self, params: ScryptParams) -> Self {
        self.scrypt = params;
        self
    }

    pub fn with_signing_scheme(mut self, scheme: SigningScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn keystore_dir(&self) -> &Path {
        &self.keystore_dir
    }

    pub fn signing_scheme(&self) -> SigningScheme {
        self.scheme
    }

    /// Where the record for `address` lives.
    pub fn keystore_path(&self, address: &Address) -> PathBuf {
        self.keystore_dir.join(address.to_checksum())
    }

    pub fn exists(&self, address: &Address) -> bool {
        self.find(address).is_some()
    }

    fn find(&self, address: &Address) -> Option<PathBuf> {
        let path = self.keystore_path(address);
        if path.exists() {
            return Some(path);
        }
        // Files written by other tools may use a different case or no prefix
        list_keystores(&self.keystore_dir)
            .ok()?
            .into_iter()
            .find(|(a, _)| a == address)
            .map(|(_, p)| p)
    }

    /// Resolve an address or file name to a record path and the address it should hold.
    ///
    /// Absolute paths are used as given; anything else is looked up in the keystore
    /// directory.
    pub fn resolve(&self, name: &str) -> Result<(PathBuf, Option<Address>), WalletError> {
        let as_path = Path::new(name);
        if as_path.is_absolute() {
            let expected = as_path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.parse().ok());
            return Ok((as_path.to_path_buf(), expected));
        }

        if let Ok(address) = name.parse::<Address>() {
            let path = self
                .find(&address)
                .ok_or_else(|| WalletError::NotFound(address.to_string()))?;
            return Ok((path, Some(address)));
        }

        let name = sanitize_name(name)?;
        let path = self.keystore_dir.join(name);
        if !path.exists() {
            return Err(WalletError::NotFound(name.to_string()));
        }
        Ok((path, None))
    }

    /// Create a brand-new wallet protected by `password`.
    ///
    /// # Returns
    /// The address, the record written, its path, and the mnemonic to show the user.
    ///
    /// # Example
    /// ```no_run
    /// use hdwallet_keystore::wallet::Wallet;
    /// let created = Wallet::at_default_path().create("correct-horse").unwrap();
    /// println!("{}", created.address);
    /// ```
    pub fn create(&self, password: &str) -> Result<CreatedWallet, WalletError> {
        let mnemonic = Mnemonic::generate_default()?;
        self.store_mnemonic(mnemonic, None, password, false)
    }

    /// Like [`Wallet::create`] with a 12, 15, 18, 21 or 24 word mnemonic.
    pub fn create_with_word_count(
        &self,
        password: &str,
        word_count: usize,
    ) -> Result<CreatedWallet, WalletError> {
        let mnemonic = Mnemonic::generate(word_count)?;
        self.store_mnemonic(mnemonic, None, password, false)
    }

    /// Restore a wallet from its mnemonic and re-encrypt it under `password`.
    ///
    /// # Arguments
    /// * `phrase` - The BIP39 mnemonic phrase
    /// * `passphrase` - Optional BIP39 passphrase
    /// * `password` - Keystore password
    /// * `overwrite` - Replace an existing record for the same address
    pub fn create_from_mnemonic(
        &self,
        phrase: &str,
        passphrase: Option<&str>,
        password: &str,
        overwrite: bool,
    ) -> Result<CreatedWallet, WalletError> {
        let mnemonic = Mnemonic::from_phrase(phrase)?;
        self.store_mnemonic(mnemonic, passphrase, password, overwrite)
    }

    fn store_mnemonic(
        &self,
        mnemonic: Mnemonic,
        passphrase: Option<&str>,
        password: &str,
        overwrite: bool,
    ) -> Result<CreatedWallet, WalletError> {
        let keypair = Keypair::from_mnemonic_obj(&mnemonic, passphrase)?;
        let address = keypair.address();

        if !overwrite && self.exists(&address) {
            return Err(WalletError::AlreadyExists(address));
        }

        let path = self.keystore_path(&address);
        let record = Keystore::new(&path)
            .store(keypair.private_key(), password, &self.scrypt, overwrite)
            .map_err(|e| match e {
                KeystoreError::AlreadyExists(_) => WalletError::AlreadyExists(address),
                other => WalletError::Keystore(other),
            })?;

        tracing::info!(
            address = %address,
            path = %path.display(),
            derivation_path = %DerivationPath::wallet_default(),
            "wallet stored"
        );

        Ok(CreatedWallet {
            address,
            record,
            mnemonic,
            path,
        })
    }

    /// Decrypt a wallet and return an authority ready to sign.
    ///
    /// When the name is an address, or a file named after one, the decrypted key
    /// must belong to that address.
    pub fn load(&self, name: &str, password: &str) -> Result<SigningAuthority, WalletError> {
        let (path, expected) = self.resolve(name)?;
        let record = KeystoreRecord::read(&path)?;
        let private_key = keystore::decrypt(&record, password, expected)?;
        Ok(SigningAuthority::from_private_key(private_key, self.scheme))
    }

    /// Re-encrypt a wallet under a new password.
    pub fn change_password(
        &self,
        name: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<KeystoreRecord, WalletError> {
        let (path, expected) = self.resolve(name)?;
        let keystore = Keystore::new(&path);
        let private_key = keystore.private_key(old_password, expected)?;
        let record = keystore.store(&private_key, new_password, &self.scrypt, true)?;
        tracing::info!(path = %path.display(), "wallet password changed");
        Ok(record)
    }

    /// Addresses of every wallet in the keystore directory.
    pub fn list(&self) -> Result<Vec<Address>, WalletError> {
        Ok(list_keystores(&self.keystore_dir)?
            .into_iter()
            .map(|(address, _)| address)
            .collect())
    }
}

/// Get the default keystore directory (`~/.hdwallet/keystore`).
pub fn default_keystore_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(KEYSTORE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(KEYSTORE_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::keypair::derive_address_from_mnemonic;
    use crate::wallet::signer::Transaction;
    use tempfile::tempdir;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_create_names_file_after_address() {
        let dir = tempdir().unwrap();
        let wallet = Wallet::new(dir.path());
        let created = wallet.create("correct-horse").unwrap();

        assert_eq!(created.path, dir.path().join(created.address.to_string()));
        assert!(created.path.exists());
        assert_eq!(created.record.address().unwrap(), Some(created.address));
        assert_eq!(created.mnemonic.word_count(), 12);
    }

    #[test]
    fn test_created_address_matches_mnemonic() {
        let dir = tempdir().unwrap();
        let created = Wallet::new(dir.path()).create("correct-horse").unwrap();
        let derived = derive_address_from_mnemonic(created.mnemonic.phrase(), None).unwrap();
        assert_eq!(derived, created.address);
    }

    #[test]
    fn test_load_and_sign() {
        let dir = tempdir().unwrap();
        let wallet = Wallet::new(dir.path());
        let created = wallet.create("correct-horse").unwrap();

        let authority = wallet
            .load(&created.address.to_string(), "correct-horse")
            .unwrap();
        assert_eq!(authority.address(), created.address);

        let tx = Transaction {
            nonce: 1,
            gas_price: 1,
            gas_limit: 21_000,
            to: Some(Address::from_bytes([0x22; 20])),
            value: 5,
            data: Vec::new(),
        };
        let signed = authority.sign(&tx, created.address).unwrap();
        assert_eq!(signed.recover_signer().unwrap(), created.address);
    }

    #[test]
    fn test_load_wrong_password() {
        let dir = tempdir().unwrap();
        let wallet = Wallet::new(dir.path());
        let created = wallet.create("correct-horse").unwrap();

        let result = wallet.load(&created.address.to_string(), "battery-staple");
        assert!(matches!(
            result,
            Err(WalletError::Keystore(KeystoreError::AuthenticationFailed))
        ));
    }

    #[test]
    fn test_load_accepts_any_address_form() {
        let dir = tempdir().unwrap();
        let wallet = Wallet::new(dir.path());
        let created = wallet.create("pw").unwrap();

        let lower = created.address.to_hex_lower();
        assert!(wallet.load(&lower, "pw").is_ok());
        assert!(wallet.load(&format!("0x{}", lower), "pw").is_ok());
        assert!(wallet
            .load(created.path.to_str().unwrap(), "pw")
            .is_ok());
    }

    #[test]
    fn test_load_missing_wallet() {
        let dir = tempdir().unwrap();
        let wallet = Wallet::new(dir.path());
        let missing = Address::from_bytes([0x33; 20]).to_string();
        assert!(matches!(
            wallet.load(&missing, "pw"),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn test_record_for_other_address_is_rejected() {
        let dir = tempdir().unwrap();
        let wallet = Wallet::new(dir.path());
        let created = wallet.create("pw").unwrap();

        // Copy the record under someone else's name
        let imposter = Address::from_bytes([0x44; 20]);
        std::fs::copy(&created.path, wallet.keystore_path(&imposter)).unwrap();

        assert!(matches!(
            wallet.load(&imposter.to_string(), "pw"),
            Err(WalletError::Keystore(KeystoreError::AddressMismatch { .. }))
        ));
    }

    #[test]
    fn test_restore_from_mnemonic() {
        let dir = tempdir().unwrap();
        let wallet = Wallet::new(dir.path());
        let restored = wallet
            .create_from_mnemonic(ABANDON, None, "pw", false)
            .unwrap();
        assert_eq!(
            restored.address,
            derive_address_from_mnemonic(ABANDON, None).unwrap()
        );

        let again = wallet.create_from_mnemonic(ABANDON, None, "pw", false);
        assert!(matches!(again, Err(WalletError::AlreadyExists(_))));

        wallet
            .create_from_mnemonic(ABANDON, None, "new", true)
            .unwrap();
        assert!(wallet.load(&restored.address.to_string(), "new").is_ok());
    }

    #[test]
    fn test_list_and_change_password() {
        let dir = tempdir().unwrap();
        let wallet = Wallet::new(dir.path());
        let a = wallet.create("pw").unwrap();
        let b = wallet.create("pw").unwrap();

        let mut expected = vec![a.address, b.address];
        expected.sort();
        assert_eq!(wallet.list().unwrap(), expected);

        wallet
            .change_password(&a.address.to_string(), "pw", "pw2")
            .unwrap();
        assert!(wallet.load(&a.address.to_string(), "pw").is_err());
        assert!(wallet.load(&a.address.to_string(), "pw2").is_ok());
    }

    #[test]
    fn test_path_traversal_prevention() {
        let dir = tempdir().unwrap();
        let wallet = Wallet::new(dir.path());
        for bad in ["../etc/passwd", "a/b", "a\\b", ".hidden", "  "] {
            assert!(
                matches!(wallet.resolve(bad), Err(WalletError::InvalidName(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_signing_scheme_is_applied() {
        let dir = tempdir().unwrap();
        let wallet =
            Wallet::new(dir.path()).with_signing_scheme(SigningScheme::Eip155 { chain_id: 5 });
        let created = wallet.create("pw").unwrap();
        let authority = wallet.load(&created.address.to_string(), "pw").unwrap();
        assert_eq!(authority.scheme(), SigningScheme::Eip155 { chain_id: 5 });
    }

    #[test]
    fn test_default_keystore_path() {
        assert!(default_keystore_path().ends_with(".hdwallet/keystore"));
    }
}
