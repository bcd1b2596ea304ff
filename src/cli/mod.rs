//! Command-line front end for the wallet.
//!
//! # Commands
//!
//! - `createwallet` - Create a wallet and print its mnemonic once
//! - `regen` - Restore a wallet from a mnemonic
//! - `list` - List keystores in the keystore directory
//! - `address` - Show the address of a keystore
//! - `changepassword` - Re-encrypt a keystore under a new password
//! - `transfer` - Send ether
//! - `getbalance` - Show an ether balance
//! - `sendtoken` - Send tokens from the bound contract
//! - `tokenbalance` - Show a token balance

use crate::config::Config;
use crate::logging::{init_logging, LogFormat};
use clap::{Parser, Subcommand};

pub mod commands;
pub mod utils;

/// HD wallet with an encrypted keystore
#[derive(Parser)]
#[command(name = "hdwallet")]
#[command(version)]
#[command(about = "HD wallet with encrypted keystore and transaction signing", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Network to connect to (local, sepolia, mainnet)
    #[arg(short, long, global = true)]
    pub network: Option<String>,

    /// Custom RPC endpoint (overrides --network)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Directory holding keystore files
    #[arg(long, global = true)]
    pub keystore_dir: Option<std::path::PathBuf>,

    /// Sign with EIP-155 replay protection for this chain id
    #[arg(long, global = true)]
    pub chain_id: Option<u64>,

    /// Load defaults from a JSON config file
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,

    /// Don't prompt: auto-approve and read passwords from HDWALLET_PASSWORD
    #[arg(long, global = true)]
    pub no_prompt: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new wallet
    #[command(name = "createwallet", alias = "create")]
    CreateWallet(commands::wallet::CreateWalletArgs),

    /// Restore a wallet from its mnemonic
    #[command(alias = "restore")]
    Regen(commands::wallet::RegenArgs),

    /// List wallets in the keystore directory
    #[command(alias = "ls")]
    List,

    /// Show the address stored in a keystore
    Address(commands::wallet::AddressArgs),

    /// Re-encrypt a wallet under a new password
    #[command(name = "changepassword", alias = "passwd")]
    ChangePassword(commands::wallet::ChangePasswordArgs),

    /// Send ether from a wallet
    Transfer(commands::transfer::TransferArgs),

    /// Show the ether balance of an address
    #[command(name = "getbalance", alias = "balance")]
    GetBalance(commands::transfer::BalanceArgs),

    /// Send tokens from a wallet
    #[command(name = "sendtoken")]
    SendToken(commands::token::SendTokenArgs),

    /// Show the token balance of an address
    #[command(name = "tokenbalance")]
    TokenBalance(commands::token::TokenBalanceArgs),
}

impl Cli {
    /// Resolve configuration: file, then environment, then flags.
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        }
        .apply_env()?;

        if let Some(network) = &self.network {
            config = config.with_network(network)?;
        }
        if let Some(endpoint) = &self.endpoint {
            config = config.with_endpoint(endpoint);
        }
        if let Some(dir) = &self.keystore_dir {
            config = config.with_keystore_dir(dir);
        }
        if let Some(chain_id) = self.chain_id {
            config = config.with_chain_id(chain_id).with_replay_protection(true);
        }
        if self.debug {
            config = config.with_debug(true);
        }
        Ok(config)
    }
}

/// Run the CLI application
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = cli.config()?;
    if std::env::var("HDWALLET_LOG_FORMAT").is_err() {
        config.logging.format = LogFormat::Compact;
    }
    init_logging(&config.logging);

    match &cli.command {
        Commands::CreateWallet(args) => commands::wallet::create_wallet(args, &config, &cli),
        Commands::Regen(args) => commands::wallet::regen_wallet(args, &config, &cli),
        Commands::List => commands::wallet::list_wallets(&config),
        Commands::Address(args) => commands::wallet::show_address(args, &config),
        Commands::ChangePassword(args) => commands::wallet::change_password(args, &config, &cli),
        Commands::Transfer(args) => commands::transfer::transfer(args, &config, &cli).await,
        Commands::GetBalance(args) => commands::transfer::get_balance(args, &config).await,
        Commands::SendToken(args) => commands::token::send_token(args, &config, &cli).await,
        Commands::TokenBalance(args) => commands::token::token_balance(args, &config).await,
    }
}
