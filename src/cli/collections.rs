//! Collection commands

use std::time::Duration;

use colored::Colorize;
use log::debug;
use serde::Serialize;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat};
use crate::client::abi::parse_address;
use crate::client::wallet::AccountWatcher;
use crate::collections::{CollectionSummary, CollectionsView, ViewSource, truncate_address};
use crate::error::Result;
use crate::models::CollectionDisplay;
use crate::output::Formattable;
use crate::output::json::print_json;
use crate::output::table::format_fields;

#[derive(Debug, Serialize)]
struct ListReport {
    initial: CollectionsView,
    settled: CollectionsView,
}

fn print_view(view: &CollectionsView, format: OutputFormat) -> Result<()> {
    let heading = match view.source {
        ViewSource::Empty => "No collections".to_string(),
        ViewSource::Cached => format!("Cached ({})", view.collections.len()),
        ViewSource::Refreshed => format!("Refreshed ({})", view.collections.len()),
    };
    println!("{}", heading.bold());

    if !view.collections.is_empty() {
        let rows: Vec<CollectionDisplay> = view.collections.iter().map(Into::into).collect();
        rows.print(format)?;
    }
    Ok(())
}

/// Print the cached view, then the refreshed one
pub async fn list(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let engine = ctx.engine();

    let load = engine.load().await;
    let initial = load.current();

    if ctx.format.is_json() {
        let settled = load.settled().await;
        return print_json(&ListReport { initial, settled });
    }

    match &initial.owner {
        Some(owner) => println!("Account: {}\n", owner.cyan()),
        None => {
            println!("{} No wallet account connected", "○".dimmed());
            return Ok(());
        }
    }

    print_view(&initial, ctx.format)?;
    let settled = load.settled().await;
    if settled != initial {
        println!();
        print_view(&settled, ctx.format)?;
    } else if settled.source != ViewSource::Refreshed {
        println!(
            "\n{} Registry unreachable, showing cached data",
            "⚠".yellow()
        );
    }
    Ok(())
}

/// Record an optimistic write
pub fn add(
    opts: &GlobalOptions,
    address: &str,
    name: Option<String>,
    cover: Option<String>,
    description: String,
) -> Result<()> {
    parse_address(address)?;
    let ctx = CommandContext::new(opts)?;

    let summary = CollectionSummary {
        address: address.to_lowercase(),
        name: name.unwrap_or_else(|| truncate_address(address)),
        cover: cover.or_else(|| Some(ctx.config.default_cover.clone())),
        description,
        first_nft_image: None,
    };
    ctx.engine().record_created(summary.clone());

    if ctx.format.is_json() {
        return print_json(&summary);
    }
    println!("{} Recorded {} as pending", "✓".green(), summary.address);
    println!(
        "{}",
        format_fields(&[
            ("Name", summary.name.clone()),
            ("Cover", summary.cover.clone().unwrap_or_default()),
        ])
    );
    if !ctx.cache.is_enabled() {
        println!("{} Cache disabled, nothing was stored", "⚠".yellow());
    }
    Ok(())
}

/// List optimistic writes
pub fn pending(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let pending = ctx.engine().pending();

    if ctx.format.is_json() {
        return print_json(&pending);
    }
    let rows: Vec<CollectionDisplay> = pending.iter().map(Into::into).collect();
    rows.print(ctx.format)
}

/// Reload on every account change until interrupted
pub async fn watch(opts: &GlobalOptions, interval: u64) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let wallet = ctx.live_wallet(opts)?;
    let engine = ctx.engine_with(wallet.clone());
    let watcher = AccountWatcher::spawn(wallet, Duration::from_secs(interval.max(1)));
    let mut accounts = watcher.subscribe();

    println!("Watching for account changes (Ctrl-C to stop)");
    loop {
        tokio::select! {
            changed = accounts.changed() => {
                if changed.is_err() {
                    break;
                }
                let account = accounts.borrow_and_update().clone();
                debug!("Account now {:?}", account);

                let view = engine.load().await.settled().await;
                if ctx.format.is_json() {
                    print_json(&view)?;
                } else {
                    println!();
                    match &view.owner {
                        Some(owner) => println!("Account: {}", owner.cyan()),
                        None => println!("{} No wallet account connected", "○".dimmed()),
                    }
                    print_view(&view, ctx.format)?;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    watcher.stop();
    Ok(())
}
