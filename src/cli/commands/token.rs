//! Token transfer and balance commands.

use crate::chain::{self, TransferOptions};
use crate::cli::utils::{confirm, print_info, print_success, read_password, spinner};
use crate::cli::Cli;
use crate::config::Config;
use crate::wallet::Address;
use anyhow::Context;
use clap::Args;

#[derive(Args, Clone, Debug)]
pub struct SendTokenArgs {
    /// Sending wallet (address or keystore file name)
    #[arg(long)]
    pub from: String,
    /// Recipient address
    #[arg(long)]
    pub to: Address,
    /// Amount in the token's base units
    #[arg(long)]
    pub value: u128,
    /// Gas limit
    #[arg(long)]
    pub gas_limit: Option<u64>,
}

#[derive(Args, Clone, Debug)]
pub struct TokenBalanceArgs {
    /// Address to query
    #[arg(long)]
    pub from: Address,
}

/// Sign and broadcast a token transfer
pub async fn send_token(args: &SendTokenArgs, config: &Config, cli: &Cli) -> anyhow::Result<()> {
    let token = config.token();
    let mut options = TransferOptions::token_defaults();
    if let Some(gas_limit) = args.gas_limit {
        options = options.with_gas_limit(gas_limit);
    }

    print_info(&format!(
        "Sending {} tokens of {} from {} to {}",
        args.value,
        token.address(),
        args.from,
        args.to
    ));
    if !confirm("Proceed with token transfer?", cli.no_prompt) {
        print_info("Aborted");
        return Ok(());
    }

    let password = read_password("Enter wallet password", cli.no_prompt)?;
    let authority = config
        .wallet()
        .load(&args.from, &password)
        .context("Failed to unlock wallet")?;
    drop(password);

    let client = config.rpc_client()?;
    let sp = spinner(&format!("Broadcasting to {}...", client.endpoint()));
    let result =
        chain::send_token(&client, &authority, &token, args.to, args.value, &options).await;
    sp.finish_and_clear();
    authority.dispose();

    let receipt = result.context("Token transfer failed")?;
    print_success(&format!("Transaction sent: {}", receipt.tx_hash_hex()));
    println!("Nonce: {}", receipt.nonce);
    Ok(())
}

/// Show the token balance of an address
pub async fn token_balance(args: &TokenBalanceArgs, config: &Config) -> anyhow::Result<()> {
    let token = config.token();
    let client = config.rpc_client()?;

    let sp = spinner(&format!("Querying {}...", token.address()));
    let result = chain::token_balance(&client, &token, args.from).await;
    sp.finish_and_clear();

    let balance = result.context("Failed to fetch token balance")?;
    println!("{}'s token balance is: {}", args.from, balance);
    Ok(())
}
