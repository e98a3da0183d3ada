//! Router lifecycle commands

use colored::Colorize;
use serde::Serialize;

use crate::cli::CommandContext;
use crate::cli::args::GlobalOptions;
use crate::error::Result;
use crate::models::BucketDisplay;
use crate::output::Formattable;
use crate::output::json::print_json;

#[derive(Debug, Serialize)]
struct ActivateReport {
    version: String,
    shell_cached: bool,
    deleted: Vec<String>,
}

/// Install and activate the configured version
pub async fn activate(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let router = ctx.router()?;

    let shell_cached = router.install().await;
    let deleted = router.activate()?;

    let report = ActivateReport {
        version: router.version().to_string(),
        shell_cached,
        deleted,
    };
    if ctx.format.is_json() {
        return print_json(&report);
    }

    println!("{} Router {} active", "✓".green(), report.version.bold());
    if !report.shell_cached {
        println!(
            "{} App shell not cached (backend unreachable)",
            "⚠".yellow()
        );
    }
    for name in &report.deleted {
        println!("{} Deleted {}", "○".dimmed(), name);
    }
    Ok(())
}

/// List stored buckets
pub fn buckets(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let rows: Vec<BucketDisplay> = ctx
        .router()?
        .buckets()?
        .into_iter()
        .map(BucketDisplay::from)
        .collect();
    rows.print(ctx.format)
}
