//! `hdwallet` binary entrypoint.
//!
//! Wallet creation and restore, balance queries, and ether or token transfers
//! signed from an encrypted keystore.

use hdwallet_keystore::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run().await
}
