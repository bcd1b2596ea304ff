//! Chain collaborator: the node the wallet talks to when it moves funds.
//!
//! Everything network-facing sits behind the [`ChainClient`] trait so the
//! transfer flows can be driven by the JSON-RPC client in production and by an
//! in-memory double in tests.

pub mod rpc;
pub mod token;
pub mod transfer;

use crate::wallet::Address;
use async_trait::async_trait;
use thiserror::Error;

pub use rpc::{parse_quantity, JsonRpcClient};
pub use token::{TokenContract, BALANCE_OF_SELECTOR, DEFAULT_TOKEN_ADDRESS, TRANSFER_SELECTOR};
pub use transfer::{
    balance, send_token, send_value, token_balance, TransferError, TransferOptions,
    TransferReceipt,
};

/// Error types for chain operations
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Decoding error: {0}")]
    Decoding(String),
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Block tag used for state queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Pending,
}

impl BlockTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Pending => "pending",
        }
    }
}

/// Node operations the wallet depends on.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain id reported by the node.
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// Transaction count of `address` at `tag`.
    async fn nonce(&self, address: Address, tag: BlockTag) -> Result<u64, ChainError>;

    /// Gas price suggested by the node, in wei.
    async fn gas_price(&self) -> Result<u128, ChainError>;

    /// Native balance of `address` at the latest block, in wei.
    async fn balance_at(&self, address: Address) -> Result<u128, ChainError>;

    /// Execute a read-only call against `to` and return the raw output.
    async fn call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, ChainError>;

    /// Broadcast a signed transaction and return its hash.
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<[u8; 32], ChainError>;

    /// Transaction count of `address` at the latest block.
    async fn nonce_at(&self, address: Address) -> Result<u64, ChainError> {
        self.nonce(address, BlockTag::Latest).await
    }

    /// Transaction count of `address` including pending transactions.
    async fn pending_nonce_at(&self, address: Address) -> Result<u64, ChainError> {
        self.nonce(address, BlockTag::Pending).await
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory node double recording every broadcast.
    #[derive(Default)]
    pub struct MockChain {
        pub chain_id: u64,
        pub latest_nonce: u64,
        pub pending_nonce: u64,
        pub gas_price: u128,
        pub balances: HashMap<Address, u128>,
        pub call_result: Vec<u8>,
        pub calls: Mutex<Vec<(Address, Vec<u8>)>>,
        pub sent: Mutex<Vec<Vec<u8>>>,
        pub reject_broadcast: bool,
    }

    #[async_trait]
    impl ChainClient for MockChain {
        async fn chain_id(&self) -> Result<u64, ChainError> {
            Ok(self.chain_id)
        }

        async fn nonce(&self, _address: Address, tag: BlockTag) -> Result<u64, ChainError> {
            Ok(match tag {
                BlockTag::Latest => self.latest_nonce,
                BlockTag::Pending => self.pending_nonce,
            })
        }

        async fn gas_price(&self) -> Result<u128, ChainError> {
            Ok(self.gas_price)
        }

        async fn balance_at(&self, address: Address) -> Result<u128, ChainError> {
            Ok(self.balances.get(&address).copied().unwrap_or_default())
        }

        async fn call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, ChainError> {
            self.calls.lock().unwrap().push((to, data.to_vec()));
            Ok(self.call_result.clone())
        }

        async fn send_raw_transaction(&self, raw: &[u8]) -> Result<[u8; 32], ChainError> {
            if self.reject_broadcast {
                return Err(ChainError::Rpc {
                    code: -32000,
                    message: "insufficient funds for gas * price + value".to_string(),
                });
            }
            self.sent.lock().unwrap().push(raw.to_vec());
            Ok(crate::utils::keccak256(raw))
        }
    }
}
