//! Transfer flows against an in-memory node.
//!
//! The wallet is created on disk, unlocked with its password and used to
//! send ether and tokens; the node double records what was broadcast.

use async_trait::async_trait;
use hdwallet_keystore::chain::{self, BlockTag, ChainClient, ChainError, TransferOptions};
use hdwallet_keystore::utils::keccak256;
use hdwallet_keystore::{Address, SigningScheme, TokenContract, Transaction, Wallet};
use std::sync::Mutex;
use tempfile::tempdir;

struct Node {
    chain_id: u64,
    nonce: u64,
    pending_nonce: u64,
    gas_price: u128,
    token_balance: u128,
    broadcast: Mutex<Vec<Vec<u8>>>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            chain_id: 1337,
            nonce: 5,
            pending_nonce: 7,
            gas_price: 2_000_000_000,
            token_balance: 0,
            broadcast: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChainClient for Node {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.chain_id)
    }

    async fn nonce(&self, _address: Address, tag: BlockTag) -> Result<u64, ChainError> {
        Ok(match tag {
            BlockTag::Latest => self.nonce,
            BlockTag::Pending => self.pending_nonce,
        })
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        Ok(self.gas_price)
    }

    async fn balance_at(&self, _address: Address) -> Result<u128, ChainError> {
        Ok(0)
    }

    async fn call(&self, _to: Address, _data: &[u8]) -> Result<Vec<u8>, ChainError> {
        let mut word = vec![0u8; 32];
        word[16..].copy_from_slice(&self.token_balance.to_be_bytes());
        Ok(word)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<[u8; 32], ChainError> {
        self.broadcast.lock().unwrap().push(raw.to_vec());
        Ok(keccak256(raw))
    }
}

#[tokio::test]
async fn test_send_value_from_keystore() {
    let dir = tempdir().unwrap();
    let wallet = Wallet::new(dir.path());
    let created = wallet.create("pw").unwrap();
    let authority = wallet.load(&created.address.to_string(), "pw").unwrap();

    let node = Node::default();
    let to = Address::from_bytes([0x42; 20]);
    let receipt = chain::send_value(&node, &authority, to, 10_000, &TransferOptions::default())
        .await
        .unwrap();

    assert_eq!(receipt.from, created.address);
    assert_eq!(receipt.nonce, 5);
    assert_eq!(receipt.gas_price, 21_000_000_000);

    let expected = Transaction {
        nonce: 5,
        gas_price: 21_000_000_000,
        gas_limit: 300_000,
        to: Some(to),
        value: 10_000,
        data: b"Salary".to_vec(),
    };
    let signed = authority.sign(&expected, created.address).unwrap();
    assert_eq!(node.broadcast.lock().unwrap().as_slice(), &[signed.raw()]);
    assert_eq!(receipt.tx_hash, signed.hash());
}

#[tokio::test]
async fn test_send_token_with_replay_protection() {
    let dir = tempdir().unwrap();
    let wallet =
        Wallet::new(dir.path()).with_signing_scheme(SigningScheme::Eip155 { chain_id: 1337 });
    let created = wallet.create("pw").unwrap();
    let authority = wallet.load(&created.address.to_string(), "pw").unwrap();

    let node = Node::default();
    let token = TokenContract::default();
    let to = Address::from_bytes([0x24; 20]);
    let receipt = chain::send_token(
        &node,
        &authority,
        &token,
        to,
        500,
        &TransferOptions::token_defaults(),
    )
    .await
    .unwrap();

    assert_eq!(receipt.nonce, 7);
    assert_eq!(receipt.gas_price, 2_000_000_000);

    let expected = token.transfer_transaction(7, 2_000_000_000, 300_000, &to, 500);
    let signed = authority.sign(&expected, created.address).unwrap();
    assert_eq!(node.broadcast.lock().unwrap()[0], signed.raw());
    assert!(signed.v() >= 1337 * 2 + 35);
}

#[tokio::test]
async fn test_wrong_chain_is_refused() {
    let dir = tempdir().unwrap();
    let wallet =
        Wallet::new(dir.path()).with_signing_scheme(SigningScheme::Eip155 { chain_id: 1 });
    let created = wallet.create("pw").unwrap();
    let authority = wallet.load(&created.address.to_string(), "pw").unwrap();

    let node = Node::default();
    let result = chain::send_value(
        &node,
        &authority,
        Address::ZERO,
        1,
        &TransferOptions::default(),
    )
    .await;

    assert!(matches!(
        result,
        Err(chain::TransferError::ChainIdMismatch { expected: 1, actual: 1337 })
    ));
    assert!(node.broadcast.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_token_balance() {
    let node = Node {
        token_balance: 1_000_000,
        ..Default::default()
    };
    let balance = chain::token_balance(&node, &TokenContract::default(), Address::ZERO)
        .await
        .unwrap();
    assert_eq!(balance, 1_000_000);
}
