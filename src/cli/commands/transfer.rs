//! Ether transfer and balance commands.

use crate::chain::{self, TransferOptions};
use crate::cli::utils::{
    confirm, format_ether, format_gwei, parse_amount, print_info, print_success, read_password,
    spinner, Unit,
};
use crate::cli::Cli;
use crate::config::Config;
use crate::wallet::Address;
use anyhow::Context;
use clap::Args;

#[derive(Args, Clone, Debug)]
pub struct TransferArgs {
    /// Sending wallet (address or keystore file name)
    #[arg(long)]
    pub from: String,
    /// Recipient address
    #[arg(long)]
    pub to: Address,
    /// Amount to send
    #[arg(long)]
    pub value: String,
    /// Unit of --value
    #[arg(long, value_enum, default_value_t = Unit::Wei)]
    pub unit: Unit,
    /// Gas limit
    #[arg(long)]
    pub gas_limit: Option<u64>,
    /// Gas price in gwei (defaults to 21)
    #[arg(long)]
    pub gas_price: Option<String>,
    /// Transaction data as text (defaults to "Salary")
    #[arg(long)]
    pub memo: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct BalanceArgs {
    /// Address to query
    #[arg(long)]
    pub from: Address,
}

impl TransferArgs {
    fn options(&self) -> anyhow::Result<TransferOptions> {
        let mut options = TransferOptions::value_defaults();
        if let Some(gas_limit) = self.gas_limit {
            options = options.with_gas_limit(gas_limit);
        }
        if let Some(gas_price) = &self.gas_price {
            options = options.with_gas_price(parse_amount(gas_price, Unit::Gwei)?);
        }
        if let Some(memo) = &self.memo {
            options.memo = memo.as_bytes().to_vec();
        }
        Ok(options)
    }
}

/// Sign and broadcast an ether transfer
pub async fn transfer(args: &TransferArgs, config: &Config, cli: &Cli) -> anyhow::Result<()> {
    let value = parse_amount(&args.value, args.unit)?;
    let options = args.options()?;

    print_info(&format!(
        "Sending {} from {} to {} (gas limit {}, gas price {})",
        format_ether(value),
        args.from,
        args.to,
        options.gas_limit,
        options
            .gas_price
            .map(format_gwei)
            .unwrap_or_else(|| "node suggested".to_string()),
    ));
    if !confirm("Proceed with transfer?", cli.no_prompt) {
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
    let result = chain::send_value(&client, &authority, args.to, value, &options).await;
    sp.finish_and_clear();
    authority.dispose();

    let receipt = result.context("Transfer failed")?;
    print_success(&format!("Transaction sent: {}", receipt.tx_hash_hex()));
    println!("Nonce: {}", receipt.nonce);
    Ok(())
}

/// Show the ether balance of an address
pub async fn get_balance(args: &BalanceArgs, config: &Config) -> anyhow::Result<()> {
    let client = config.rpc_client()?;

    let sp = spinner(&format!("Fetching balance from {}...", client.endpoint()));
    let result = chain::balance(&client, args.from).await;
    sp.finish_and_clear();

    let wei = result.context("Failed to fetch balance")?;
    println!("{}'s balance is {} ({} wei)", args.from, format_ether(wei), wei);
    Ok(())
}
