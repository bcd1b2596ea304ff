//! Value and token transfer flows.
//!
//! Each flow fetches a nonce and gas price, builds a legacy transaction, signs it
//! with the wallet's [`SigningAuthority`] (which must recover to its own address)
//! and broadcasts the raw bytes.

use super::token::TokenContract;
use super::{ChainClient, ChainError};
use crate::core::{DEFAULT_GAS_LIMIT, DEFAULT_GAS_PRICE, DEFAULT_TRANSFER_MEMO};
use crate::wallet::{Address, SignerError, SigningAuthority, SigningScheme, Transaction};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),
    #[error("Signing error: {0}")]
    Signer(#[from] SignerError),
    #[error("Chain id mismatch: signer uses {expected}, node reports {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },
}

/// Knobs for a single transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    pub gas_limit: u64,
    /// `None` asks the node for a suggestion.
    pub gas_price: Option<u128>,
    /// Transaction data for value transfers. Ignored by token transfers.
    pub memo: Vec<u8>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self::value_defaults()
    }
}

impl TransferOptions {
    /// Fixed 21 gwei gas price and the default memo.
    pub fn value_defaults() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_price: Some(DEFAULT_GAS_PRICE),
            memo: DEFAULT_TRANSFER_MEMO.to_vec(),
        }
    }

    /// Node-suggested gas price and no memo.
    pub fn token_defaults() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_price: None,
            memo: Vec::new(),
        }
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }
}

/// Outcome of a broadcast transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub tx_hash: [u8; 32],
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
    pub gas_price: u128,
    pub amount: u128,
}

impl TransferReceipt {
    pub fn tx_hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.tx_hash))
    }
}

async fn resolve_gas_price(
    client: &dyn ChainClient,
    options: &TransferOptions,
) -> Result<u128, ChainError> {
    match options.gas_price {
        Some(price) => Ok(price),
        None => client.gas_price().await,
    }
}

async fn check_chain_id(
    client: &dyn ChainClient,
    authority: &SigningAuthority,
) -> Result<(), TransferError> {
    if let SigningScheme::Eip155 { chain_id } = authority.scheme() {
        let actual = client.chain_id().await?;
        if actual != chain_id {
            return Err(TransferError::ChainIdMismatch {
                expected: chain_id,
                actual,
            });
        }
    }
    Ok(())
}

async fn sign_and_send(
    client: &dyn ChainClient,
    authority: &SigningAuthority,
    tx: &Transaction,
) -> Result<[u8; 32], TransferError> {
    let from = authority.address();
    let signed = authority.sign(tx, from)?;
    let tx_hash = client.send_raw_transaction(&signed.raw()).await?;
    if tx_hash != signed.hash() {
        tracing::warn!(
            local = %hex::encode(signed.hash()),
            node = %hex::encode(tx_hash),
            "node reported a different transaction hash"
        );
    }
    Ok(tx_hash)
}

/// Send `value` wei from the authority's address to `to`.
///
/// Uses the latest (not pending) nonce.
pub async fn send_value(
    client: &dyn ChainClient,
    authority: &SigningAuthority,
    to: Address,
    value: u128,
    options: &TransferOptions,
) -> Result<TransferReceipt, TransferError> {
    check_chain_id(client, authority).await?;
    let from = authority.address();
    let nonce = client.nonce_at(from).await?;
    let gas_price = resolve_gas_price(client, options).await?;

    let tx = Transaction {
        nonce,
        gas_price,
        gas_limit: options.gas_limit,
        to: Some(to),
        value,
        data: options.memo.clone(),
    };
    let tx_hash = sign_and_send(client, authority, &tx).await?;

    tracing::info!(%from, %to, value, nonce, tx_hash = %hex::encode(tx_hash), "value transfer sent");
    Ok(TransferReceipt {
        tx_hash,
        from,
        to,
        nonce,
        gas_price,
        amount: value,
    })
}

/// Send `amount` token units from the authority's address to `to`.
///
/// Uses the pending nonce so transfers can be queued back to back.
pub async fn send_token(
    client: &dyn ChainClient,
    authority: &SigningAuthority,
    token: &TokenContract,
    to: Address,
    amount: u128,
    options: &TransferOptions,
) -> Result<TransferReceipt, TransferError> {
    check_chain_id(client, authority).await?;
    let from = authority.address();
    let nonce = client.pending_nonce_at(from).await?;
    let gas_price = resolve_gas_price(client, options).await?;

    let tx = token.transfer_transaction(nonce, gas_price, options.gas_limit, &to, amount);
    let tx_hash = sign_and_send(client, authority, &tx).await?;

    tracing::info!(
        %from,
        %to,
        token = %token.address(),
        amount,
        nonce,
        tx_hash = %hex::encode(tx_hash),
        "token transfer sent"
    );
    Ok(TransferReceipt {
        tx_hash,
        from,
        to,
        nonce,
        gas_price,
        amount,
    })
}

/// Native balance of `address`, in wei.
pub async fn balance(client: &dyn ChainClient, address: Address) -> Result<u128, ChainError> {
    client.balance_at(address).await
}

/// Token balance of `owner`.
pub async fn token_balance(
    client: &dyn ChainClient,
    token: &TokenContract,
    owner: Address,
) -> Result<u128, ChainError> {
    token.balance_of(client, &owner).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockChain;
    use crate::utils::keccak256;
    use crate::wallet::PrivateKey;

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn authority(scheme: SigningScheme) -> SigningAuthority {
        SigningAuthority::from_private_key(PrivateKey::from_hex(KEY).unwrap(), scheme)
    }

    fn recipient() -> Address {
        Address::from_bytes([0x35; 20])
    }

    #[test]
    fn test_option_defaults() {
        let value = TransferOptions::default();
        assert_eq!(value.gas_limit, 300_000);
        assert_eq!(value.gas_price, Some(21_000_000_000));
        assert_eq!(value.memo, b"Salary");

        let token = TransferOptions::token_defaults();
        assert_eq!(token.gas_price, None);
        assert!(token.memo.is_empty());
    }

    #[tokio::test]
    async fn test_send_value_uses_latest_nonce_and_fixed_price() {
        let chain = MockChain {
            latest_nonce: 3,
            pending_nonce: 9,
            gas_price: 1,
            ..Default::default()
        };
        let authority = authority(SigningScheme::Homestead);

        let receipt = send_value(&chain, &authority, recipient(), 1_000, &TransferOptions::default())
            .await
            .unwrap();

        assert_eq!(receipt.nonce, 3);
        assert_eq!(receipt.gas_price, 21_000_000_000);
        assert_eq!(receipt.from, authority.address());

        let sent = chain.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(receipt.tx_hash, keccak256(&sent[0]));
    }

    #[tokio::test]
    async fn test_send_token_uses_pending_nonce_and_suggested_price() {
        let chain = MockChain {
            latest_nonce: 3,
            pending_nonce: 9,
            gas_price: 5_000_000_000,
            ..Default::default()
        };
        let authority = authority(SigningScheme::Homestead);
        let token = TokenContract::default();

        let receipt = send_token(
            &chain,
            &authority,
            &token,
            recipient(),
            42,
            &TransferOptions::token_defaults(),
        )
        .await
        .unwrap();

        assert_eq!(receipt.nonce, 9);
        assert_eq!(receipt.gas_price, 5_000_000_000);
        assert_eq!(receipt.amount, 42);

        // Rebuild and sign the expected transaction; signing is deterministic.
        let expected = token.transfer_transaction(9, 5_000_000_000, 300_000, &recipient(), 42);
        let signed = authority.sign(&expected, authority.address()).unwrap();
        assert_eq!(chain.sent.lock().unwrap()[0], signed.raw());
    }

    #[tokio::test]
    async fn test_broadcast_rejection_propagates() {
        let chain = MockChain {
            reject_broadcast: true,
            ..Default::default()
        };
        let authority = authority(SigningScheme::Homestead);

        let err = send_value(&chain, &authority, recipient(), 1, &TransferOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Chain(ChainError::Rpc { .. })));
    }

    #[tokio::test]
    async fn test_chain_id_mismatch_stops_before_signing() {
        let chain = MockChain {
            chain_id: 1,
            ..Default::default()
        };
        let authority = authority(SigningScheme::Eip155 { chain_id: 1337 });

        let err = send_value(&chain, &authority, recipient(), 1, &TransferOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransferError::ChainIdMismatch {
                expected: 1337,
                actual: 1
            }
        ));
        assert!(chain.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_balances() {
        let owner = recipient();
        let mut chain = MockChain::default();
        chain.balances.insert(owner, 7);
        let mut word = vec![0u8; 32];
        word[31] = 9;
        chain.call_result = word;

        assert_eq!(balance(&chain, owner).await.unwrap(), 7);
        assert_eq!(
            token_balance(&chain, &TokenContract::default(), owner)
                .await
                .unwrap(),
            9
        );
    }
}
