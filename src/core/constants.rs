//! Core constants for the wallet, keystore and chain collaborators.
//! Values match what existing Ethereum tooling expects on disk and on the wire.

/// 1 ether = 10^18 wei
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// 1 gwei = 10^9 wei
pub const WEI_PER_GWEI: u128 = 1_000_000_000;

const _: () = assert!(
    WEI_PER_ETHER == 10u128.pow(18),
    "WEI_PER_ETHER must equal 10^18"
);

/// Entropy used for newly created wallets (12 words)
pub const DEFAULT_ENTROPY_BITS: usize = 128;

/// Entropy sizes accepted by BIP-39
pub const SUPPORTED_ENTROPY_BITS: [usize; 5] = [128, 160, 192, 224, 256];

/// Account derivation path used by every wallet this crate creates
pub const WALLET_DERIVATION_PATH: &str = "m/44'/60'/0'/0/1";

/// HMAC key for the BIP-32 master key
pub const BIP32_SEED_KEY: &[u8] = b"Bitcoin seed";

/// Keystore record version (Web3 Secret Storage)
pub const KEYSTORE_VERSION: u32 = 3;

/// Light scrypt preset: N = 2^12
pub const LIGHT_SCRYPT_LOG_N: u8 = 12;
pub const LIGHT_SCRYPT_P: u32 = 6;

/// Standard scrypt preset: N = 2^18
pub const STANDARD_SCRYPT_LOG_N: u8 = 18;
pub const STANDARD_SCRYPT_P: u32 = 1;

pub const SCRYPT_R: u32 = 8;
pub const SCRYPT_DKLEN: usize = 32;

/// Default gas limit for value and token transfers
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;

/// Default gas price for value transfers: 21 gwei
pub const DEFAULT_GAS_PRICE: u128 = 21 * WEI_PER_GWEI;

/// Memo attached to plain value transfers
pub const DEFAULT_TRANSFER_MEMO: &[u8] = b"Salary";

/// Token contract the wallet binds to
pub const DEFAULT_TOKEN_CONTRACT: &str = "0x9B4E5A473d60D2D696F82d224723769d25F104c2";

/// Network names
pub const NETWORK_MAINNET: &str = "mainnet";
pub const NETWORK_SEPOLIA: &str = "sepolia";
pub const NETWORK_LOCAL: &str = "local";

/// Default network
pub const DEFAULT_NETWORK: &str = NETWORK_LOCAL;

/// Network endpoints
pub const MAINNET_ENDPOINT: &str = "https://ethereum-rpc.publicnode.com";
pub const SEPOLIA_ENDPOINT: &str = "https://ethereum-sepolia-rpc.publicnode.com";
pub const LOCAL_ENDPOINT: &str = "http://127.0.0.1:8545";


/// Chain ids
pub const MAINNET_CHAIN_ID: u64 = 1;
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;
pub const LOCAL_CHAIN_ID: u64 = 1337;
