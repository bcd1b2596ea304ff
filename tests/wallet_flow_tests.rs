//! End-to-end wallet tests through the public API.
//!
//! Validates:
//! - Known derivation vectors for the fixed account path
//! - Create, load and sign round trips through the keystore directory
//! - Restoring from a mnemonic lands on the same keystore
//! - Error categories for the failure modes callers branch on

use hdwallet_keystore::wallet::{
    derive_address_from_mnemonic, KeystoreError, SignerError, WalletError,
};
use hdwallet_keystore::{
    Address, DerivationPath, Error, ErrorKind, Keypair, KeystoreRecord, Mnemonic, PrivateKey,
    SigningAuthority, SigningScheme, Transaction, Wallet,
};
use tempfile::tempdir;

const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn salary_tx(to: Address) -> Transaction {
    Transaction {
        nonce: 0,
        gas_price: 21_000_000_000,
        gas_limit: 300_000,
        to: Some(to),
        value: 1_000,
        data: b"Salary".to_vec(),
    }
}

// ============================================================================
// Derivation vectors
// ============================================================================

#[test]
fn test_abandon_first_account_address() {
    let mnemonic = Mnemonic::from_phrase(ABANDON).unwrap();
    let seed = mnemonic.to_seed("");
    let path: DerivationPath = "m/44'/60'/0'/0/0".parse().unwrap();
    let keypair = Keypair::from_seed_at(&seed, &path).unwrap();

    assert_eq!(
        keypair.address().to_string(),
        "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
    );
}

#[test]
fn test_wallet_path_is_fixed_and_deterministic() {
    let a = derive_address_from_mnemonic(ABANDON, None).unwrap();
    let b = derive_address_from_mnemonic(ABANDON, None).unwrap();
    assert_eq!(a, b);

    let mnemonic = Mnemonic::from_phrase(ABANDON).unwrap();
    let seed = mnemonic.to_seed("");
    let explicit = Keypair::from_seed_at(&seed, &"m/44'/60'/0'/0/1".parse().unwrap()).unwrap();
    assert_eq!(explicit.address(), a);
    assert_eq!(DerivationPath::wallet_default().to_string(), "m/44'/60'/0'/0/1");
}

#[test]
fn test_passphrase_selects_a_different_account() {
    let plain = derive_address_from_mnemonic(ABANDON, None).unwrap();
    let salted = derive_address_from_mnemonic(ABANDON, Some("TREZOR")).unwrap();
    assert_ne!(plain, salted);
}

// ============================================================================
// Wallet facade
// ============================================================================

#[test]
fn test_create_load_sign() {
    let dir = tempdir().unwrap();
    let wallet = Wallet::new(dir.path());

    let created = wallet.create("correct-horse").unwrap();
    assert_eq!(created.mnemonic.word_count(), 12);
    assert_eq!(created.path, dir.path().join(created.address.to_checksum()));
    assert!(wallet.exists(&created.address));

    let authority = wallet
        .load(&created.address.to_string(), "correct-horse")
        .unwrap();
    assert_eq!(authority.address(), created.address);

    let signed = authority.sign(&salary_tx(Address::ZERO), created.address).unwrap();
    assert_eq!(signed.recover_signer().unwrap(), created.address);
    assert_eq!(signed.v(), 27 + u128::from(signed.signature().y_parity()));
}

#[test]
fn test_mnemonic_recreates_same_keystore_address() {
    let dir = tempdir().unwrap();
    let wallet = Wallet::new(dir.path());
    let created = wallet.create("pw-one").unwrap();
    let phrase = created.mnemonic.phrase().to_string();

    // Same mnemonic into a fresh directory
    let other_dir = tempdir().unwrap();
    let restored = Wallet::new(other_dir.path())
        .create_from_mnemonic(&phrase, None, "pw-two", false)
        .unwrap();
    assert_eq!(restored.address, created.address);

    // Same directory refuses to clobber unless asked
    let again = wallet.create_from_mnemonic(&phrase, None, "pw-two", false);
    assert!(matches!(again, Err(WalletError::AlreadyExists(a)) if a == created.address));

    let replaced = wallet
        .create_from_mnemonic(&phrase, None, "pw-two", true)
        .unwrap();
    assert_eq!(replaced.address, created.address);
    assert!(wallet.load(&created.address.to_string(), "pw-two").is_ok());
}

#[test]
fn test_load_accepts_any_address_case() {
    let dir = tempdir().unwrap();
    let wallet = Wallet::new(dir.path());
    let created = wallet.create_from_mnemonic(ABANDON, None, "pw", false).unwrap();

    let lower = created.address.to_hex_lower();
    let upper = format!("0x{}", lower.trim_start_matches("0x").to_uppercase());
    for name in [lower, upper] {
        let authority = wallet.load(&name, "pw").unwrap();
        assert_eq!(authority.address(), created.address);
    }
}

#[test]
fn test_list_and_change_password() {
    let dir = tempdir().unwrap();
    let wallet = Wallet::new(dir.path());
    let a = wallet.create("one").unwrap().address;
    let b = wallet.create("two").unwrap().address;

    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(wallet.list().unwrap(), expected);

    wallet.change_password(&a.to_string(), "one", "uno").unwrap();
    assert!(matches!(
        wallet.load(&a.to_string(), "one"),
        Err(WalletError::Keystore(KeystoreError::AuthenticationFailed))
    ));
    assert_eq!(wallet.load(&a.to_string(), "uno").unwrap().address(), a);
}

#[test]
fn test_record_on_disk_is_web3_v3() {
    let dir = tempdir().unwrap();
    let wallet = Wallet::new(dir.path());
    let created = wallet.create("pw").unwrap();

    let record = KeystoreRecord::read(&created.path).unwrap();
    assert_eq!(record.version, 3);
    assert_eq!(record.crypto.cipher, "aes-128-ctr");
    assert_eq!(record.crypto.kdf, "scrypt");
    assert_eq!(record.address().unwrap(), Some(created.address));
    assert_eq!(record, created.record);
}

// ============================================================================
// Signing authority
// ============================================================================

#[test]
fn test_signer_mismatch_is_cryptographic_failure() {
    let key = PrivateKey::from_hex(
        "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
    )
    .unwrap();
    let authority = SigningAuthority::from_private_key(key, SigningScheme::Homestead);
    let stranger = Address::from_bytes([0xaa; 20]);

    let err = authority
        .sign(&salary_tx(stranger), stranger)
        .unwrap_err();
    assert!(matches!(err, SignerError::SignerMismatch { expected, .. } if expected == stranger));
    assert_eq!(Error::from(err).kind(), ErrorKind::CryptographicFailure);
}

#[test]
fn test_eip155_wallet_signatures_carry_chain_id() {
    let dir = tempdir().unwrap();
    let wallet =
        Wallet::new(dir.path()).with_signing_scheme(SigningScheme::Eip155 { chain_id: 1337 });
    let created = wallet.create("pw").unwrap();
    let authority = wallet.load(&created.address.to_string(), "pw").unwrap();

    let signed = authority.sign(&salary_tx(Address::ZERO), created.address).unwrap();
    assert!(signed.v() == 1337 * 2 + 35 || signed.v() == 1337 * 2 + 36);
    assert_eq!(signed.recover_signer().unwrap(), created.address);
}

// ============================================================================
// Error categories
// ============================================================================

#[test]
fn test_error_kinds_from_facade() {
    let dir = tempdir().unwrap();
    let wallet = Wallet::new(dir.path());

    let missing = wallet
        .load("0x0000000000000000000000000000000000000001", "pw")
        .unwrap_err();
    assert_eq!(Error::from(missing).kind(), ErrorKind::ResourceFailure);

    let bad_phrase = wallet
        .create_from_mnemonic("abandon abandon", None, "pw", false)
        .unwrap_err();
    assert_eq!(Error::from(bad_phrase).kind(), ErrorKind::InputValidation);

    let created = wallet.create("pw").unwrap();
    let wrong = wallet
        .load(&created.address.to_string(), "not-pw")
        .unwrap_err();
    assert_eq!(Error::from(wrong).kind(), ErrorKind::CryptographicFailure);

    let traversal = wallet.load("../etc/passwd", "pw").unwrap_err();
    assert!(matches!(traversal, WalletError::InvalidName(_)));
}
