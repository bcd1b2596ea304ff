//! Password-encrypted key storage in the Web3 Secret Storage (version 3) format.
//!
//! ## Record Format
//!
//! ```json
//! {
//!     "address": "<lowercase hex, no 0x>",
//!     "crypto": {
//!         "cipher": "aes-128-ctr",
//!         "ciphertext": "<hex>",
//!         "cipherparams": {"iv": "<hex, 16 bytes>"},
//!         "kdf": "scrypt",
//!         "kdfparams": {"dklen": 32, "n": 4096, "p": 6, "r": 8, "salt": "<hex, 32 bytes>"},
//!         "mac": "<hex, keccak256(dk[16..32] ++ ciphertext)>"
//!     },
//!     "id": "<uuid v4>",
//!     "version": 3
//! }
//! ```
//!
//! The first half of the derived key drives the cipher and the second half
//! authenticates the ciphertext. A wrong password and a corrupted ciphertext both
//! surface as [`KeystoreError::AuthenticationFailed`]; no key bytes are produced
//! unless the MAC matches.

use crate::core::constants::{
    KEYSTORE_VERSION, LIGHT_SCRYPT_LOG_N, LIGHT_SCRYPT_P, SCRYPT_DKLEN, SCRYPT_R,
    STANDARD_SCRYPT_LOG_N, STANDARD_SCRYPT_P,
};
use crate::utils::crypto::{constant_time_eq, decode_hex, keccak256_concat};
use crate::wallet::keypair::{Address, PrivateKey};
use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes128;
use rand::rngs::OsRng;
use rand::TryRngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use thiserror::Error;
use uuid::Uuid;
use zeroize::Zeroizing;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

const CIPHER_AES_128_CTR: &str = "aes-128-ctr";
const KDF_SCRYPT: &str = "scrypt";
const KDF_PBKDF2: &str = "pbkdf2";
const PRF_HMAC_SHA256: &str = "hmac-sha256";
const SALT_LEN: usize = 32;
const IV_LEN: usize = 16;

/// Errors that can occur during keystore operations.
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("Keystore not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid keystore format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported keystore version: {0}")]
    UnsupportedVersion(u32),

    #[error("Unsupported cipher: {0}")]
    UnsupportedCipher(String),

    #[error("Unsupported key derivation function: {0}")]
    UnsupportedKdf(String),

    #[error("Authentication failed: wrong password or corrupted keystore")]
    AuthenticationFailed,

    #[error("Keystore address mismatch: expected {expected}, found {actual}")]
    AddressMismatch { expected: Address, actual: Address },

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Secure random source unavailable: {0}")]
    InsufficientRandomness(String),

    #[error("Keystore already exists: {0}")]
    AlreadyExists(PathBuf),
}

/// scrypt cost parameters used when encrypting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScryptParams {
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

impl ScryptParams {
    /// N = 4096, r = 8, p = 6. Fast enough for interactive use.
    pub const fn light() -> Self {
        Self {
            log_n: LIGHT_SCRYPT_LOG_N,
            r: SCRYPT_R,
            p: LIGHT_SCRYPT_P,
        }
    }

    /// N = 262144, r = 8, p = 1.
    pub const fn standard() -> Self {
        Self {
            log_n: STANDARD_SCRYPT_LOG_N,
            r: SCRYPT_R,
            p: STANDARD_SCRYPT_P,
        }
    }

    pub fn n(&self) -> u32 {
        1u32 << self.log_n
    }
}

impl Default for ScryptParams {
    fn default() -> Self {
        Self::light()
    }
}

/// KDF parameters as stored in a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KdfParams {
    Scrypt {
        dklen: usize,
        n: u32,
        p: u32,
        r: u32,
        salt: String,
    },
    Pbkdf2 {
        c: u32,
        dklen: usize,
        prf: String,
        salt: String,
    },
}

/// Cipher parameters for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherParams {
    pub iv: String,
}

/// Crypto section of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoJson {
    pub cipher: String,
    pub ciphertext: String,
    pub cipherparams: CipherParams,
    pub kdf: String,
    pub kdfparams: KdfParams,
    pub mac: String,
}

/// A complete encrypted key record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystoreRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(alias = "Crypto")]
    pub crypto: CryptoJson,
    pub id: Uuid,
    pub version: u32,
}

impl KeystoreRecord {
    /// The address the record claims to hold.
    ///
    /// `Ok(None)` when the record has no address field; a present but malformed
    /// address is an `InvalidFormat` error.
    pub fn address(&self) -> Result<Option<Address>, KeystoreError> {
        self.address
            .as_deref()
            .map(|a| {
                a.parse()
                    .map_err(|e| KeystoreError::InvalidFormat(format!("address: {}", e)))
            })
            .transpose()
    }

    pub fn to_json(&self) -> Result<Vec<u8>, KeystoreError> {
        serde_json::to_vec_pretty(self).map_err(KeystoreError::Json)
    }

    pub fn from_json(data: &[u8]) -> Result<Self, KeystoreError> {
        serde_json::from_slice(data).map_err(KeystoreError::Json)
    }

    /// Read and parse a record from disk.
    pub fn read(path: &Path) -> Result<Self, KeystoreError> {
        if !path.exists() {
            return Err(KeystoreError::NotFound(path.to_path_buf()));
        }
        let data = fs::read(path)?;
        tracing::debug!(path = %path.display(), "read keystore record");
        Self::from_json(&data)
    }

    /// Write the record atomically with owner-only permissions.
    pub fn write(&self, path: &Path, overwrite: bool) -> Result<(), KeystoreError> {
        write_atomic(path, &self.to_json()?, overwrite)
    }
}

fn random_bytes<const N: usize>() -> Result<[u8; N], KeystoreError> {
    let mut out = [0u8; N];
    OsRng
        .try_fill_bytes(&mut out)
        .map_err(|e| KeystoreError::InsufficientRandomness(e.to_string()))?;
    Ok(out)
}

fn scrypt_key(
    password: &str,
    salt: &[u8],
    log_n: u8,
    r: u32,
    p: u32,
    dklen: usize,
) -> Result<Zeroizing<Vec<u8>>, KeystoreError> {
    let params = scrypt::Params::new(log_n, r, p, dklen)
        .map_err(|e| KeystoreError::KeyDerivationFailed(e.to_string()))?;
    let mut dk = Zeroizing::new(vec![0u8; dklen]);
    scrypt::scrypt(password.as_bytes(), salt, &params, &mut dk)
        .map_err(|e| KeystoreError::KeyDerivationFailed(e.to_string()))?;
    Ok(dk)
}

fn apply_aes_ctr(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), KeystoreError> {
    let mut cipher = Aes128Ctr::new_from_slices(key, iv)
        .map_err(|e| KeystoreError::InvalidFormat(format!("cipher setup: {}", e)))?;
    cipher.apply_keystream(data);
    Ok(())
}

/// Encrypt a private key under `password`.
///
/// A fresh salt and IV are drawn for every call, so two encryptions of the same key
/// never produce the same ciphertext.
///
/// # Arguments
/// * `private_key` - The key to protect
/// * `password` - Encryption password
/// * `params` - scrypt cost; [`ScryptParams::light`] matches the wallet default
pub fn encrypt(
    private_key: &PrivateKey,
    password: &str,
    params: &ScryptParams,
) -> Result<KeystoreRecord, KeystoreError> {
    let salt: [u8; SALT_LEN] = random_bytes()?;
    let iv: [u8; IV_LEN] = random_bytes()?;

    let dk = scrypt_key(password, &salt, params.log_n, params.r, params.p, SCRYPT_DKLEN)?;

    let mut ciphertext = private_key.to_bytes().to_vec();
    apply_aes_ctr(&dk[..16], &iv, &mut ciphertext)?;
    let mac = keccak256_concat(&[&dk[16..32], ciphertext.as_slice()]);

    Ok(KeystoreRecord {
        address: Some(private_key.address().to_hex_lower()),
        crypto: CryptoJson {
            cipher: CIPHER_AES_128_CTR.to_string(),
            ciphertext: hex::encode(&ciphertext),
            cipherparams: CipherParams {
                iv: hex::encode(iv),
            },
            kdf: KDF_SCRYPT.to_string(),
            kdfparams: KdfParams::Scrypt {
                dklen: SCRYPT_DKLEN,
                n: params.n(),
                p: params.p,
                r: params.r,
                salt: hex::encode(salt),
            },
            mac: hex::encode(mac),
        },
        id: Uuid::new_v4(),
        version: KEYSTORE_VERSION,
    })
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, KeystoreError> {
    decode_hex(value).map_err(|e| KeystoreError::InvalidFormat(format!("{}: {}", name, e)))
}

fn check_dklen(dklen: usize) -> Result<(), KeystoreError> {
    if dklen != SCRYPT_DKLEN {
        return Err(KeystoreError::InvalidFormat(format!(
            "dklen must be {}, got {}",
            SCRYPT_DKLEN, dklen
        )));
    }
    Ok(())
}

fn derive_record_key(
    crypto: &CryptoJson,
    password: &str,
) -> Result<Zeroizing<Vec<u8>>, KeystoreError> {
    match (crypto.kdf.as_str(), &crypto.kdfparams) {
        (
            KDF_SCRYPT,
            KdfParams::Scrypt {
                dklen,
                n,
                p,
                r,
                salt,
            },
        ) => {
            check_dklen(*dklen)?;
            if *n < 2 || !n.is_power_of_two() {
                return Err(KeystoreError::InvalidFormat(format!(
                    "scrypt n {} is not a power of two",
                    n
                )));
            }
            let salt = decode_field("salt", salt)?;
            scrypt_key(password, &salt, n.trailing_zeros() as u8, *r, *p, *dklen)
        }
        (
            KDF_PBKDF2,
            KdfParams::Pbkdf2 {
                c,
                dklen,
                prf,
                salt,
            },
        ) => {
            if prf != PRF_HMAC_SHA256 {
                return Err(KeystoreError::UnsupportedKdf(format!("pbkdf2 with {}", prf)));
            }
            check_dklen(*dklen)?;
            let salt = decode_field("salt", salt)?;
            let mut dk = Zeroizing::new(vec![0u8; *dklen]);
            pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, *c, &mut dk);
            Ok(dk)
        }
        (KDF_SCRYPT, _) | (KDF_PBKDF2, _) => Err(KeystoreError::InvalidFormat(format!(
            "kdfparams do not match kdf '{}'",
            crypto.kdf
        ))),
        (other, _) => Err(KeystoreError::UnsupportedKdf(other.to_string())),
    }
}

/// Decrypt a record back to its private key.
///
/// The MAC is checked before anything is decrypted. When `expected_address` is given,
/// the recovered key must belong to it; the record's own `address` field is always
/// checked against the recovered key.
pub fn decrypt(
    record: &KeystoreRecord,
    password: &str,
    expected_address: Option<Address>,
) -> Result<PrivateKey, KeystoreError> {
    if record.version != KEYSTORE_VERSION {
        return Err(KeystoreError::UnsupportedVersion(record.version));
    }
    let crypto = &record.crypto;
    if crypto.cipher != CIPHER_AES_128_CTR {
        return Err(KeystoreError::UnsupportedCipher(crypto.cipher.clone()));
    }

    let ciphertext = decode_field("ciphertext", &crypto.ciphertext)?;
    let iv = decode_field("iv", &crypto.cipherparams.iv)?;
    let mac = decode_field("mac", &crypto.mac)?;
    if iv.len() != IV_LEN {
        return Err(KeystoreError::InvalidFormat(format!(
            "Invalid iv length: expected {}, got {}",
            IV_LEN,
            iv.len()
        )));
    }
    if mac.len() != 32 {
        return Err(KeystoreError::InvalidFormat(format!(
            "Invalid mac length: expected 32, got {}",
            mac.len()
        )));
    }

    let claimed = record.address()?;
    let dk = derive_record_key(crypto, password)?;
    let computed = keccak256_concat(&[&dk[16..32], ciphertext.as_slice()]);
    if !constant_time_eq(&computed, &mac) {
        tracing::debug!(id = %record.id, "keystore MAC mismatch");
        return Err(KeystoreError::AuthenticationFailed);
    }

    let mut plaintext = Zeroizing::new(ciphertext);
    apply_aes_ctr(&dk[..16], &iv, &mut plaintext)?;
    let private_key = PrivateKey::from_bytes(&plaintext).map_err(|_| {
        KeystoreError::InvalidFormat("decrypted key is not a valid secp256k1 key".to_string())
    })?;

    let actual = private_key.address();
    if let Some(claimed) = claimed {
        if claimed != actual {
            return Err(KeystoreError::AddressMismatch {
                expected: claimed,
                actual,
            });
        }
    }
    if let Some(expected) = expected_address {
        if expected != actual {
            return Err(KeystoreError::AddressMismatch { expected, actual });
        }
    }

    Ok(private_key)
}

type LockTable = HashMap<PathBuf, Arc<Mutex<()>>>;

fn lock_table() -> MutexGuard<'static, LockTable> {
    static LOCKS: OnceLock<Mutex<LockTable>> = OnceLock::new();
    LOCKS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

fn path_lock(path: &Path) -> Arc<Mutex<()>> {
    lock_table().entry(path.to_path_buf()).or_default().clone()
}

/// Forget the lock for `path` once no other writer holds or waits on it.
fn release_path_lock(path: &Path, lock: Arc<Mutex<()>>) {
    let mut locks = lock_table();
    // One reference in the table, one here.
    if Arc::strong_count(&lock) == 2 {
        locks.remove(path);
    }
}

/// Create `dir` (and parents) readable only by the owner.
pub fn create_private_dir(dir: &Path) -> Result<(), KeystoreError> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)?;
    Ok(())
}

/// Write `content` to `path` through a temporary file in the same directory.
///
/// The final file either holds the complete content or does not change. Writers to
/// the same path within this process are serialised.
pub fn write_atomic(path: &Path, content: &[u8], overwrite: bool) -> Result<(), KeystoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    create_private_dir(dir)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| KeystoreError::InvalidFormat(format!("bad keystore path {:?}", path)))?;

    let lock = path_lock(path);
    let result = {
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        replace_file(dir, file_name, path, content, overwrite)
    };
    release_path_lock(path, lock);
    result?;

    tracing::debug!(path = %path.display(), "wrote keystore");
    Ok(())
}

fn replace_file(
    dir: &Path,
    file_name: &str,
    path: &Path,
    content: &[u8],
    overwrite: bool,
) -> Result<(), KeystoreError> {
    if path.exists() && !overwrite {
        return Err(KeystoreError::AlreadyExists(path.to_path_buf()));
    }

    let temp_path = dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));
    let result = write_temp(&temp_path, content).and_then(|_| {
        fs::rename(&temp_path, path)?;
        Ok(())
    });
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_temp(temp_path: &Path, content: &[u8]) -> Result<(), KeystoreError> {
    // On Unix the file is created 0o600 so it is never briefly world-readable.
    #[cfg(unix)]
    let mut file = {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(temp_path)?
    };
    #[cfg(not(unix))]
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)?;

    file.write_all(content)?;
    file.sync_all()?;
    Ok(())
}

/// A keystore file on disk.
///
/// This is a thin handle; nothing is read until a method needs it.
#[derive(Debug, Clone)]
pub struct Keystore {
    path: PathBuf,
}

impl Keystore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn record(&self) -> Result<KeystoreRecord, KeystoreError> {
        KeystoreRecord::read(&self.path)
    }

    /// Decrypt the stored key.
    pub fn private_key(
        &self,
        password: &str,
        expected_address: Option<Address>,
    ) -> Result<PrivateKey, KeystoreError> {
        decrypt(&self.record()?, password, expected_address)
    }

    /// Encrypt and store `private_key`, returning the record that was written.
    pub fn store(
        &self,
        private_key: &PrivateKey,
        password: &str,
        params: &ScryptParams,
        overwrite: bool,
    ) -> Result<KeystoreRecord, KeystoreError> {
        let record = encrypt(private_key, password, params)?;
        record.write(&self.path, overwrite)?;
        Ok(record)
    }

    /// Re-encrypt the stored key under a new password with a fresh salt and IV.
    pub fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
        params: &ScryptParams,
    ) -> Result<KeystoreRecord, KeystoreError> {
        let private_key = self.private_key(old_password, None)?;
        self.store(&private_key, new_password, params, true)
    }
}

/// Addresses of all keystore files in `dir`, sorted.
///
/// Files count when their name parses as an address (with or without `0x`).
pub fn list_keystores(dir: &Path) -> Result<Vec<(Address, PathBuf)>, KeystoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(address) = name.to_str().and_then(|n| n.parse::<Address>().ok()) {
            found.push((address, entry.path()));
        }
    }
    found.sort();
    Ok(found)
}
