//! Whitelist commands

use colored::Colorize;

use crate::cli::CommandContext;
use crate::cli::args::GlobalOptions;
use crate::client::abi::parse_address;
use crate::client::backend::WhitelistSaveRequest;
use crate::client::wallet::require_account;
use crate::error::{ConfigError, Result};
use crate::output::json::print_json;

/// Validate and upload a whitelist phase
pub async fn save(
    opts: &GlobalOptions,
    collection: &str,
    phase: &str,
    addresses: Vec<String>,
) -> Result<()> {
    parse_address(collection)?;
    if phase.trim().is_empty() {
        return Err(ConfigError::Invalid("phase must not be empty".into()).into());
    }

    let mut cleaned = Vec::with_capacity(addresses.len());
    for address in addresses.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
        parse_address(address)?;
        let address = address.to_lowercase();
        if !cleaned.contains(&address) {
            cleaned.push(address);
        }
    }

    let ctx = CommandContext::new(opts)?;
    let owner = require_account(&*ctx.wallet).await?;
    log::debug!("Saving whitelist for {} as {}", collection, owner);

    let saved = ctx
        .backend()
        .save_whitelist(&WhitelistSaveRequest {
            collection: collection.to_lowercase(),
            phase: phase.to_string(),
            addresses: cleaned,
        })
        .await?;

    if ctx.format.is_json() {
        return print_json(&saved);
    }
    println!(
        "{} Saved {} addresses for phase {}",
        "✓".green(),
        saved.address_count,
        phase.bold()
    );
    println!("  {}", saved.ipfs_url.cyan());
    Ok(())
}
