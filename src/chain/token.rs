//! Binding for the ERC-20 token contract the wallet pays out in.
//!
//! Only `transfer(address,uint256)` and `balanceOf(address)` are bound. Amounts
//! are carried as `u128`; a balance word that does not fit is a decoding error.

use super::{ChainClient, ChainError};
use crate::wallet::{Address, Transaction};
use alloy_primitives::{B256, U256};

/// `keccak256("transfer(address,uint256)")[..4]`
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// `keccak256("balanceOf(address)")[..4]`
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// 0x9B4E5A473d60D2D696F82d224723769d25F104c2
pub const DEFAULT_TOKEN_ADDRESS: Address = Address::from_bytes([
    0x9b, 0x4e, 0x5a, 0x47, 0x3d, 0x60, 0xd2, 0xd6, 0x96, 0xf8, 0x2d, 0x22, 0x47, 0x23, 0x76,
    0x9d, 0x25, 0xf1, 0x04, 0xc2,
]);

const WORD: usize = 32;

fn address_word(address: &Address) -> [u8; WORD] {
    B256::left_padding_from(address.as_bytes()).0
}

fn amount_word(amount: u128) -> [u8; WORD] {
    U256::from(amount).to_be_bytes::<WORD>()
}

/// Decode the first ABI word of `output` as an unsigned integer.
pub fn decode_uint(output: &[u8]) -> Result<u128, ChainError> {
    if output.len() < WORD {
        return Err(ChainError::Decoding(format!(
            "expected a 32-byte word, got {} bytes",
            output.len()
        )));
    }
    u128::try_from(U256::from_be_slice(&output[..WORD])).map_err(|_| {
        ChainError::Decoding("token amount does not fit in 128 bits".to_string())
    })
}

/// A deployed ERC-20 contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenContract {
    address: Address,
}

impl Default for TokenContract {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_ADDRESS)
    }
}

impl TokenContract {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Calldata for `transfer(to, amount)`.
    pub fn transfer_calldata(&self, to: &Address, amount: u128) -> Vec<u8> {
        let mut data = Vec::with_capacity(4 + 2 * WORD);
        data.extend_from_slice(&TRANSFER_SELECTOR);
        data.extend_from_slice(&address_word(to));
        data.extend_from_slice(&amount_word(amount));
        data
    }

    /// Calldata for `balanceOf(owner)`.
    pub fn balance_of_calldata(&self, owner: &Address) -> Vec<u8> {
        let mut data = Vec::with_capacity(4 + WORD);
        data.extend_from_slice(&BALANCE_OF_SELECTOR);
        data.extend_from_slice(&address_word(owner));
        data
    }

    /// Unsigned transaction calling `transfer(to, amount)` on this contract.
    pub fn transfer_transaction(
        &self,
        nonce: u64,
        gas_price: u128,
        gas_limit: u64,
        to: &Address,
        amount: u128,
    ) -> Transaction {
        Transaction {
            nonce,
            gas_price,
            gas_limit,
            to: Some(self.address),
            value: 0,
            data: self.transfer_calldata(to, amount),
        }
    }

    /// Token balance of `owner`.
    pub async fn balance_of(
        &self,
        client: &dyn ChainClient,
        owner: &Address,
    ) -> Result<u128, ChainError> {
        let output = client
            .call(self.address, &self.balance_of_calldata(owner))
            .await?;
        decode_uint(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockChain;
    use crate::core::DEFAULT_TOKEN_CONTRACT;
    use crate::utils::keccak256;

    #[test]
    fn test_selectors_match_signatures() {
        assert_eq!(
            keccak256(b"transfer(address,uint256)")[..4],
            TRANSFER_SELECTOR
        );
        assert_eq!(keccak256(b"balanceOf(address)")[..4], BALANCE_OF_SELECTOR);
    }

    #[test]
    fn test_default_token_address() {
        let parsed: Address = DEFAULT_TOKEN_CONTRACT.parse().unwrap();
        assert_eq!(parsed, DEFAULT_TOKEN_ADDRESS);
        assert_eq!(TokenContract::default().address(), DEFAULT_TOKEN_ADDRESS);
    }

    #[test]
    fn test_transfer_calldata_layout() {
        let to = Address::from_bytes([0x11; 20]);
        let data = TokenContract::default().transfer_calldata(&to, 1_000);

        assert_eq!(data.len(), 68);
        assert_eq!(hex::encode(&data[..4]), "a9059cbb");
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], &[0x11; 20]);
        assert_eq!(&data[36..66], &[0u8; 30]);
        assert_eq!(&data[66..], &[0x03, 0xe8]);
    }

    #[test]
    fn test_balance_of_calldata_layout() {
        let owner = Address::from_bytes([0x22; 20]);
        let data = TokenContract::default().balance_of_calldata(&owner);
        assert_eq!(data.len(), 36);
        assert_eq!(hex::encode(&data[..4]), "70a08231");
        assert_eq!(&data[16..], &[0x22; 20]);
    }

    #[test]
    fn test_transfer_transaction_targets_contract() {
        let token = TokenContract::default();
        let to = Address::from_bytes([0x33; 20]);
        let tx = token.transfer_transaction(4, 7, 300_000, &to, 5);
        assert_eq!(tx.to, Some(DEFAULT_TOKEN_ADDRESS));
        assert_eq!(tx.value, 0);
        assert_eq!(tx.nonce, 4);
        assert_eq!(tx.data, token.transfer_calldata(&to, 5));
    }

    #[test]
    fn test_decode_uint() {
        let mut word = [0u8; 32];
        word[31] = 0x2a;
        assert_eq!(decode_uint(&word).unwrap(), 42);

        let mut max = [0xffu8; 32];
        max[..16].fill(0);
        assert_eq!(decode_uint(&max).unwrap(), u128::MAX);

        word[0] = 1;
        assert!(decode_uint(&word).is_err());
        assert!(decode_uint(&[0u8; 31]).is_err());
    }

    #[tokio::test]
    async fn test_balance_of_queries_contract() {
        let mut word = vec![0u8; 32];
        word[30] = 0x01;
        let chain = MockChain {
            call_result: word,
            ..Default::default()
        };
        let owner = Address::from_bytes([0x44; 20]);
        let token = TokenContract::default();

        assert_eq!(token.balance_of(&chain, &owner).await.unwrap(), 256);

        let calls = chain.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, DEFAULT_TOKEN_ADDRESS);
        assert_eq!(calls[0].1, token.balance_of_calldata(&owner));
    }
}
