//! Status command implementation

use colored::Colorize;
use serde::Serialize;

use crate::cli::CommandContext;
use crate::cli::args::GlobalOptions;
use crate::cli::context::cache_dir;
use crate::client::wallet::WalletProvider;
use crate::config::Config;
use crate::error::Result;
use crate::output::json::print_json;

#[derive(Debug, Serialize)]
struct StatusReport {
    config_path: String,
    config_found: bool,
    api_host: String,
    backend_up: bool,
    backend_error: Option<String>,
    wallet_provider: String,
    account: Option<String>,
    registry_address: Option<String>,
    rpc_endpoints: usize,
    ipfs_gateways: usize,
    cache_dir: Option<String>,
    cache_version: String,
}

/// Show configuration, wallet and backend liveness
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let config_path = Config::resolve_path(opts.config_ref())?;

    let liveness = ctx.backend().status().await;
    let account = match ctx.wallet.active_account().await {
        Ok(account) => account,
        Err(e) => {
            log::warn!("Configured account is invalid: {}", e);
            None
        }
    };

    let report = StatusReport {
        config_found: config_path.exists(),
        config_path: config_path.display().to_string(),
        api_host: ctx.config.api_host.clone(),
        backend_up: liveness.is_ok(),
        backend_error: liveness.err().map(|e| e.to_string()),
        wallet_provider: ctx.wallet.kind().to_string(),
        account,
        registry_address: ctx.config.registry_address.clone(),
        rpc_endpoints: ctx.config.rpc_endpoints.len(),
        ipfs_gateways: ctx.config.ipfs_gateways.len(),
        cache_dir: if opts.no_cache {
            None
        } else {
            cache_dir(opts).ok().map(|p| p.display().to_string())
        },
        cache_version: ctx.config.cache.version.clone(),
    };

    if ctx.format.is_json() {
        return print_json(&report);
    }

    println!("{}\n", "Dreava Status".bold());

    if report.config_found {
        println!("Config file: {}", report.config_path.cyan());
    } else {
        println!(
            "Config file: {} {}",
            report.config_path.cyan(),
            "(not found, using defaults)".dimmed()
        );
    }
    println!();

    if report.backend_up {
        println!("{} Backend reachable at {}", "✓".green(), report.api_host);
    } else {
        println!("{} Backend unreachable at {}", "✗".red(), report.api_host);
        if let Some(err) = &report.backend_error {
            println!("  → {}", err.dimmed());
        }
    }

    match &report.account {
        Some(account) => println!(
            "{} Wallet: {} ({})",
            "✓".green(),
            account,
            report.wallet_provider
        ),
        None => {
            println!("{} No wallet account", "○".dimmed());
            println!("  → Pass --account or set wallet.account in the config");
        }
    }

    match &report.registry_address {
        Some(registry) => println!("{} Collection registry: {}", "✓".green(), registry),
        None => println!("{} Collection registry not configured", "⚠".yellow()),
    }

    println!(
        "{} {} RPC endpoints, {} IPFS gateways",
        "○".dimmed(),
        report.rpc_endpoints,
        report.ipfs_gateways
    );

    match &report.cache_dir {
        Some(dir) => println!(
            "{} Cache: {} (router version {})",
            "○".dimmed(),
            dir,
            report.cache_version
        ),
        None => println!("{} Cache disabled", "○".dimmed()),
    }
    println!();

    Ok(())
}
