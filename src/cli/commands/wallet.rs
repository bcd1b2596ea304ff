//! Wallet commands: create, restore, list, inspect and re-encrypt keystores.

use crate::cli::utils::{
    confirm, create_table_with_headers, print_info, print_success, print_warning, prompt_input,
    read_new_password, read_password, spinner,
};
use crate::cli::Cli;
use crate::config::Config;
use crate::wallet::{list_keystores, Address, KeystoreRecord, Mnemonic, WalletError};
use anyhow::{bail, Context};
use clap::Args;

#[derive(Args, Clone, Debug)]
pub struct CreateWalletArgs {
    /// Number of mnemonic words (12, 15, 18, 21, 24)
    #[arg(long, default_value = "12")]
    pub words: usize,
}

#[derive(Args, Clone, Debug)]
pub struct RegenArgs {
    /// Mnemonic phrase (prompted for when omitted)
    #[arg(long)]
    pub mnemonic: Option<String>,
    /// Ask for a BIP39 passphrase
    #[arg(long)]
    pub with_passphrase: bool,
    /// Replace an existing keystore for the same address
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args, Clone, Debug)]
pub struct AddressArgs {
    /// Wallet address or keystore file name
    #[arg(long)]
    pub from: String,
}

#[derive(Args, Clone, Debug)]
pub struct ChangePasswordArgs {
    /// Wallet address or keystore file name
    #[arg(long)]
    pub from: String,
}

/// Create a new wallet and show its mnemonic once
pub fn create_wallet(args: &CreateWalletArgs, config: &Config, cli: &Cli) -> anyhow::Result<()> {
    if ![12, 15, 18, 21, 24].contains(&args.words) {
        bail!("Word count must be 12, 15, 18, 21, or 24");
    }

    let password = read_new_password("Enter password for keystore encryption", cli.no_prompt)?;

    let sp = spinner("Creating wallet...");
    let result = config
        .wallet()
        .create_with_word_count(&password, args.words);
    sp.finish_and_clear();
    let created = result.context("Failed to create wallet")?;

    print_success("Wallet created successfully!");
    println!();
    println!("Address:  {}", created.address);
    println!("Keystore: {}", created.path.display());
    println!();
    print_warning("IMPORTANT: Write down this mnemonic. It is not stored anywhere.");
    println!("{}", created.mnemonic.phrase());

    Ok(())
}

/// Restore a wallet from its mnemonic
pub fn regen_wallet(args: &RegenArgs, config: &Config, cli: &Cli) -> anyhow::Result<()> {
    let phrase = match &args.mnemonic {
        Some(phrase) => zeroize::Zeroizing::new(phrase.clone()),
        None => prompt_input("Enter mnemonic phrase")?,
    };
    if !Mnemonic::validate(&phrase) {
        bail!("Invalid mnemonic phrase");
    }

    let passphrase = if args.with_passphrase {
        Some(read_password("Enter BIP39 passphrase", cli.no_prompt)?)
    } else {
        None
    };
    let password = read_new_password("Enter password for keystore encryption", cli.no_prompt)?;

    let wallet = config.wallet();
    let mut overwrite = args.overwrite;
    loop {
        let sp = spinner("Restoring wallet from mnemonic...");
        let result = wallet.create_from_mnemonic(
            &phrase,
            passphrase.as_ref().map(|p| p.as_str()),
            &password,
            overwrite,
        );
        sp.finish_and_clear();

        match result {
            Ok(created) => {
                print_success("Wallet restored successfully!");
                println!("Address:  {}", created.address);
                println!("Keystore: {}", created.path.display());
                return Ok(());
            }
            Err(WalletError::AlreadyExists(address)) if !overwrite => {
                print_warning(&format!("Wallet {} already exists", address));
                if !confirm("Overwrite existing keystore?", cli.no_prompt) {
                    print_info("Aborted");
                    return Ok(());
                }
                overwrite = true;
            }
            Err(e) => return Err(e).context("Failed to restore wallet"),
        }
    }
}

/// List keystores in the configured directory
pub fn list_wallets(config: &Config) -> anyhow::Result<()> {
    let dir = &config.keystore.dir;
    let entries = list_keystores(dir)
        .with_context(|| format!("Failed to list keystores in {}", dir.display()))?;

    if entries.is_empty() {
        print_info(&format!("No wallets found in {}", dir.display()));
        return Ok(());
    }

    let mut table = create_table_with_headers(&["Address", "Keystore Path"]);
    for (address, path) in &entries {
        table.add_row(vec![address.to_string(), path.display().to_string()]);
    }

    println!("{table}");
    Ok(())
}

/// Print the address a keystore holds. No password needed.
pub fn show_address(args: &AddressArgs, config: &Config) -> anyhow::Result<()> {
    let (path, expected) = config.wallet().resolve(&args.from)?;
    let record = KeystoreRecord::read(&path)?;

    let address: Address = match (record.address()?, expected) {
        (Some(stored), _) => stored,
        (None, Some(expected)) => expected,
        (None, None) => bail!(
            "Keystore {} does not record its address; decrypt it with a password to find out",
            path.display()
        ),
    };

    println!("{address}");
    Ok(())
}

/// Re-encrypt a keystore under a new password
pub fn change_password(
    args: &ChangePasswordArgs,
    config: &Config,
    cli: &Cli,
) -> anyhow::Result<()> {
    let old_password = read_password("Enter current password", cli.no_prompt)?;
    let new_password = if cli.no_prompt {
        std::env::var("HDWALLET_NEW_PASSWORD")
            .map(zeroize::Zeroizing::new)
            .context("HDWALLET_NEW_PASSWORD must be set when --no-prompt is used")?
    } else {
        read_new_password("Enter new password", false)?
    };

    let sp = spinner("Re-encrypting keystore...");
    let result = config
        .wallet()
        .change_password(&args.from, &old_password, &new_password);
    sp.finish_and_clear();
    result.context("Failed to change password")?;

    print_success("Password changed");
    Ok(())
}
