//! Cache management commands

use serde_json::json;

use crate::cache::CacheStorage;
use crate::cli::args::GlobalOptions;
use crate::cli::context::cache_dir;
use crate::error::Result;
use crate::output::formatters::{format_local, format_size};
use crate::output::json::print_json;
use crate::output::table::format_fields;

fn open(opts: &GlobalOptions) -> Result<(CacheStorage, String)> {
    let dir = cache_dir(opts)?;
    let storage = CacheStorage::open_at(&dir)?;
    Ok((storage, dir.display().to_string()))
}

/// Show cache statistics
pub fn status(opts: &GlobalOptions) -> Result<()> {
    let (storage, path) = open(opts)?;
    let stats = storage.stats()?;
    let buckets = storage.bucket_names()?;

    if opts.format.is_json() {
        return print_json(&json!({
            "path": path,
            "total_entries": stats.total_entries,
            "fresh_entries": stats.fresh_entries,
            "stale_entries": stats.stale_entries,
            "bucket_responses": stats.bucket_responses,
            "buckets": buckets,
            "total_size_bytes": stats.total_size_bytes,
            "total_size_human": format_size(stats.total_size_bytes),
            "oldest_entry": stats.oldest_entry,
            "newest_entry": stats.newest_entry,
        }));
    }

    println!("Cache Status");
    println!("────────────────────────────────────────");
    println!(
        "{}",
        format_fields(&[
            ("Location", path),
            ("Fresh entries", stats.fresh_entries.to_string()),
            ("Stale", stats.stale_entries.to_string()),
            (
                "Buckets",
                format!("{} ({} responses)", buckets.len(), stats.bucket_responses),
            ),
            ("Total size", format_size(stats.total_size_bytes)),
            ("Oldest entry", format_local(stats.oldest_entry)),
            ("Newest entry", format_local(stats.newest_entry)),
        ])
    );
    Ok(())
}

/// Clear all entries and buckets
pub fn clear(opts: &GlobalOptions) -> Result<()> {
    let (storage, _) = open(opts)?;
    let stats = storage.clear_all()?;

    if opts.format.is_json() {
        return print_json(&json!({
            "entries_removed": stats.entries_removed,
            "buckets_removed": stats.buckets_removed,
            "success": true,
        }));
    }

    if stats.entries_removed > 0 || stats.buckets_removed > 0 {
        println!(
            "Cleared {} cache entries and {} buckets",
            stats.entries_removed, stats.buckets_removed
        );
    } else {
        println!("Cache was already empty");
    }
    Ok(())
}

/// Show the cache directory
pub fn path(opts: &GlobalOptions) -> Result<()> {
    println!("{}", cache_dir(opts)?.display());
    Ok(())
}
