//! CLI utility functions for terminal interaction and formatting.

use crate::core::constants::{WEI_PER_ETHER, WEI_PER_GWEI};
use anyhow::{anyhow, bail, Context};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use console::{style, Term};
use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use zeroize::Zeroizing;

/// Environment variable read for passwords when prompting is disabled.
pub const PASSWORD_ENV: &str = "HDWALLET_PASSWORD";

/// Prompt for confirmation. With `no_prompt`, returns true without asking.
pub fn confirm(message: &str, no_prompt: bool) -> bool {
    if no_prompt {
        return true;
    }

    Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// Read a keystore password.
///
/// With `no_prompt` the password comes from `HDWALLET_PASSWORD`; otherwise the
/// user is asked with hidden input.
pub fn read_password(message: &str, no_prompt: bool) -> anyhow::Result<Zeroizing<String>> {
    if no_prompt {
        return std::env::var(PASSWORD_ENV)
            .map(Zeroizing::new)
            .with_context(|| format!("{PASSWORD_ENV} must be set when --no-prompt is used"));
    }

    Password::new()
        .with_prompt(message)
        .interact()
        .map(Zeroizing::new)
        .context("Failed to read password")
}

/// Read a new password, asking twice unless prompting is disabled.
pub fn read_new_password(message: &str, no_prompt: bool) -> anyhow::Result<Zeroizing<String>> {
    if no_prompt {
        return read_password(message, true);
    }

    Password::new()
        .with_prompt(message)
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .map(Zeroizing::new)
        .context("Failed to read password")
}

/// Prompt for a line of text.
pub fn prompt_input(message: &str) -> anyhow::Result<Zeroizing<String>> {
    Input::<String>::new()
        .with_prompt(message)
        .interact_text()
        .map(Zeroizing::new)
        .context("Failed to read input")
}

/// Create a spinner progress bar with message.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn print_success(message: &str) {
    let term = Term::stdout();
    let _ = term.write_line(&format!("{} {}", style("✓").green().bold(), message));
}

pub fn print_error(message: &str) {
    let term = Term::stderr();
    let _ = term.write_line(&format!("{} {}", style("✗").red().bold(), message));
}

pub fn print_info(message: &str) {
    let term = Term::stdout();
    let _ = term.write_line(&format!("{} {}", style("ℹ").blue().bold(), message));
}

pub fn print_warning(message: &str) {
    let term = Term::stdout();
    let _ = term.write_line(&format!("{} {}", style("⚠").yellow().bold(), message));
}

/// Denomination of a value given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Unit {
    #[default]
    Wei,
    Gwei,
    Ether,
}

impl Unit {
    fn decimals(self) -> u32 {
        match self {
            Unit::Wei => 0,
            Unit::Gwei => 9,
            Unit::Ether => 18,
        }
    }
}

/// Parse a decimal amount such as `1.5` into base units.
pub fn parse_amount(input: &str, unit: Unit) -> anyhow::Result<u128> {
    let decimals = unit.decimals();
    let input = input.trim();
    let (whole, fraction) = input.split_once('.').unwrap_or((input, ""));

    if whole.is_empty() && fraction.is_empty() {
        bail!("Empty amount");
    }
    if fraction.len() > decimals as usize {
        bail!("Amount '{input}' has more than {decimals} decimal places for {unit:?}");
    }
    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !digits_only(whole) || !digits_only(fraction) {
        bail!("Invalid amount '{input}'");
    }

    let scale = 10u128.pow(decimals);
    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse()? };
    let fraction: u128 = if fraction.is_empty() {
        0
    } else {
        fraction.parse::<u128>()? * 10u128.pow(decimals - fraction.len() as u32)
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| anyhow!("Amount '{input}' is too large"))
}

/// Format wei as ether with all 18 decimals.
pub fn format_ether(wei: u128) -> String {
    format!("{}.{:018} ETH", wei / WEI_PER_ETHER, wei % WEI_PER_ETHER)
}

/// Format wei as gwei for gas prices.
pub fn format_gwei(wei: u128) -> String {
    format!("{}.{:09} gwei", wei / WEI_PER_GWEI, wei % WEI_PER_GWEI)
}

/// Truncate an address for table display: first 8 and last 6 characters.
pub fn format_address(address: &str) -> String {
    if address.len() <= 16 {
        return address.to_string();
    }
    format!("{}...{}", &address[..8], &address[address.len() - 6..])
}

/// Create a styled table for CLI output.
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Create a table with custom headers.
pub fn create_table_with_headers(headers: &[&str]) -> Table {
    let mut table = create_table();
    table.set_header(headers.iter().map(|h| style(*h).bold().to_string()));
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(0), "0.000000000000000000 ETH");
        assert_eq!(format_ether(WEI_PER_ETHER), "1.000000000000000000 ETH");
        assert_eq!(
            format_ether(1_500_000_000_000_000_000),
            "1.500000000000000000 ETH"
        );
    }

    #[test]
    fn test_format_gwei() {
        assert_eq!(format_gwei(21_000_000_000), "21.000000000 gwei");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1000", Unit::Wei).unwrap(), 1000);
        assert_eq!(parse_amount("21", Unit::Gwei).unwrap(), 21_000_000_000);
        assert_eq!(
            parse_amount("1.5", Unit::Ether).unwrap(),
            1_500_000_000_000_000_000
        );
        assert_eq!(parse_amount(".5", Unit::Gwei).unwrap(), 500_000_000);
    }

    #[test]
    fn test_parse_amount_rejects() {
        assert!(parse_amount("1.5", Unit::Wei).is_err());
        assert!(parse_amount("", Unit::Ether).is_err());
        assert!(parse_amount("-1", Unit::Ether).is_err());
        assert!(parse_amount("1e18", Unit::Wei).is_err());
        assert!(parse_amount("1000000000000000000000000000000000000000", Unit::Ether).is_err());
    }

    #[test]
    fn test_format_address() {
        let addr = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";
        assert_eq!(format_address(addr), "0x2c7536...a65c23");
        assert_eq!(format_address("0x1234"), "0x1234");
    }

    #[test]
    fn test_confirm_no_prompt() {
        assert!(confirm("Proceed?", true));
    }
}
