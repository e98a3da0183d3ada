//! Preload command

use std::sync::Arc;

use colored::Colorize;
use log::warn;

use crate::cli::CommandContext;
use crate::cli::args::GlobalOptions;
use crate::client::wallet::WalletProvider;
use crate::error::Result;
use crate::output::json::print_json;
use crate::preload::{HttpImageLoader, ImageLoader, collect_image_urls};

/// Preload the given URLs, plus cached covers with `--from-cache`.
///
/// Loads go through the cache router so they prime its image bucket;
/// with `--no-cache` they hit the network directly.
pub async fn run(opts: &GlobalOptions, urls: Vec<String>, from_cache: bool) -> Result<()> {
    let ctx = CommandContext::new(opts)?;

    let mut targets = urls;
    if from_cache {
        let owner = match ctx.wallet.active_account().await {
            Ok(owner) => owner,
            Err(e) => {
                warn!("Ignoring invalid account: {}", e);
                None
            }
        };
        targets.extend(collect_image_urls(&ctx.cache, owner.as_deref(), &ctx.origin()?));
    }

    let router = if ctx.storage.is_some() {
        let router = ctx.router()?;
        router.ensure_active().await?;
        Some(router)
    } else {
        None
    };
    let loader: Arc<dyn ImageLoader> = match &router {
        Some(router) => router.clone(),
        None => Arc::new(HttpImageLoader::new(ctx.http.clone())),
    };

    let preloader = ctx.preloader(loader);
    let report = preloader.preload(&targets).await;
    if let Some(router) = &router {
        router.settle().await;
    }

    if ctx.format.is_json() {
        return print_json(&report);
    }

    if report.requested == 0 {
        println!("{} No images to preload", "○".dimmed());
        return Ok(());
    }
    println!(
        "{} Preloaded {} of {} images",
        "✓".green(),
        report.loaded,
        report.requested - report.skipped
    );
    if report.failed > 0 {
        println!("{} {} failed", "⚠".yellow(), report.failed);
    }
    if report.skipped > 0 {
        println!("{} {} duplicates skipped", "○".dimmed(), report.skipped);
    }
    Ok(())
}
