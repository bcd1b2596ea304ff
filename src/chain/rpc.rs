//! JSON-RPC 2.0 client for an Ethereum node.
//!
//! Only the handful of `eth_*` methods the wallet needs are wrapped. Every
//! result is a hex string, decoded here into native integers or bytes.

use super::{BlockTag, ChainClient, ChainError};
use crate::utils::decode_hex;
use crate::wallet::Address;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

/// HTTP JSON-RPC client with connection pooling.
#[derive(Debug)]
pub struct JsonRpcClient {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Create a client for `endpoint` with the default timeout.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ChainError> {
        Self::with_timeout(endpoint, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ChainError> {
        let endpoint = endpoint.into();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ChainError::InvalidEndpoint(endpoint));
        }

        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one request and return its `result` field.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = request_body(id, method, params);
        tracing::trace!(method, id, "rpc request");

        let response: Value = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_response(response).inspect_err(|e| {
            tracing::debug!(method, id, error = %e, "rpc request failed");
        })
    }

    async fn request_string(&self, method: &str, params: Value) -> Result<String, ChainError> {
        match self.request(method, params).await? {
            Value::String(s) => Ok(s),
            other => Err(ChainError::Decoding(format!(
                "{method}: expected hex string, got {other}"
            ))),
        }
    }
}

fn request_body(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": id,
    })
}

fn parse_response(response: Value) -> Result<Value, ChainError> {
    let response: RpcResponse = serde_json::from_value(response)
        .map_err(|e| ChainError::Decoding(format!("malformed JSON-RPC response: {e}")))?;

    if let Some(error) = response.error {
        return Err(ChainError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    response
        .result
        .ok_or_else(|| ChainError::Decoding("response has neither result nor error".to_string()))
}

/// Parse a hex quantity such as `"0x1a"`. `"0x"` and `"0x0"` are zero.
pub fn parse_quantity(s: &str) -> Result<u128, ChainError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| ChainError::Decoding(format!("quantity without 0x prefix: {s}")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| ChainError::Decoding(format!("invalid quantity {s}: {e}")))
}

fn parse_u64(s: &str) -> Result<u64, ChainError> {
    u64::try_from(parse_quantity(s)?)
        .map_err(|_| ChainError::Decoding(format!("quantity out of range: {s}")))
}

fn parse_hash(s: &str) -> Result<[u8; 32], ChainError> {
    let bytes = decode_hex(s).map_err(|e| ChainError::Decoding(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| ChainError::Decoding(format!("expected 32-byte hash, got {s}")))
}

#[async_trait]
impl ChainClient for JsonRpcClient {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        parse_u64(&self.request_string("eth_chainId", json!([])).await?)
    }

    async fn nonce(&self, address: Address, tag: BlockTag) -> Result<u64, ChainError> {
        let params = json!([address.to_checksum(), tag.as_str()]);
        parse_u64(&self.request_string("eth_getTransactionCount", params).await?)
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        parse_quantity(&self.request_string("eth_gasPrice", json!([])).await?)
    }

    async fn balance_at(&self, address: Address) -> Result<u128, ChainError> {
        let params = json!([address.to_checksum(), BlockTag::Latest.as_str()]);
        parse_quantity(&self.request_string("eth_getBalance", params).await?)
    }

    async fn call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, ChainError> {
        let params = json!([
            { "to": to.to_checksum(), "data": format!("0x{}", hex::encode(data)) },
            BlockTag::Latest.as_str(),
        ]);
        let output = self.request_string("eth_call", params).await?;
        decode_hex(&output).map_err(|e| ChainError::Decoding(e.to_string()))
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<[u8; 32], ChainError> {
        let params = json!([format!("0x{}", hex::encode(raw))]);
        parse_hash(&self.request_string("eth_sendRawTransaction", params).await?)
    }
}
