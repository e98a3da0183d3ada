//! CLI command definitions and handlers

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;

pub mod args;
pub mod cache;
pub mod collections;
pub mod completions;
pub mod context;
pub mod fetch;
pub mod preload;
pub mod router;
pub mod status;
pub mod whitelist;

pub use args::OutputFormat;
pub use context::CommandContext;

/// Dreava - caching and data-reconciliation companion for the Dreava launchpad
#[derive(Parser, Debug)]
#[command(name = "dreava")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "DREAVA_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "DREAVA_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "DREAVA_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Bypass the local cache
    #[arg(long, global = true, env = "DREAVA_NO_CACHE", hide_env = true)]
    pub no_cache: bool,

    /// Backend base URL (also the router's origin)
    #[arg(long, global = true, env = "DREAVA_API_HOST", hide_env = true)]
    pub api_host: Option<String>,

    /// Wallet account to act as
    #[arg(long, global = true, env = "DREAVA_ACCOUNT", hide_env = true)]
    pub account: Option<String>,

    /// Cache directory
    #[arg(long, global = true, env = "DREAVA_CACHE_DIR", hide_env = true)]
    pub cache_dir: Option<String>,

    /// Router bucket version tag
    #[arg(long, global = true, env = "DREAVA_CACHE_VERSION", hide_env = true)]
    pub cache_version: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show configuration, wallet and backend status
    Status,

    /// Display version information
    Version,

    /// List and record collections for the active account
    #[command(subcommand)]
    Collections(CollectionsCommands),

    /// Preload images in batches
    Preload {
        /// Image URLs to preload
        urls: Vec<String>,

        /// Also preload covers found in the local collection caches
        #[arg(long)]
        from_cache: bool,
    },

    /// Fetch a URL through the cache router
    Fetch {
        /// URL to request
        url: String,

        /// Treat the request as a page navigation
        #[arg(long, conflicts_with = "image")]
        navigate: bool,

        /// Treat the request as an image load
        #[arg(long)]
        image: bool,
    },

    /// Manage the cache router
    #[command(subcommand)]
    Router(RouterCommands),

    /// Manage the local cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Manage mint whitelists
    #[command(subcommand)]
    Whitelist(WhitelistCommands),

    /// Generate shell completions
    #[command(after_help = "\
Examples:
  bash:   dreava completion bash > /etc/bash_completion.d/dreava
  zsh:    dreava completion zsh > \"${fpath[1]}/_dreava\"
  fish:   dreava completion fish > ~/.config/fish/completions/dreava.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Collection subcommands
#[derive(Subcommand, Debug)]
pub enum CollectionsCommands {
    /// Show cached collections, then the refreshed list
    List,

    /// Record a just-created collection before it is confirmed on-chain
    Add {
        /// Collection contract address
        address: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Cover image URL
        #[arg(long)]
        cover: Option<String>,

        /// Description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// List collections awaiting on-chain confirmation
    Pending,

    /// Reload collections whenever the active account changes
    Watch {
        /// Poll interval in seconds
        #[arg(long, default_value = "5")]
        interval: u64,
    },
}

/// Router subcommands
#[derive(Subcommand, Debug)]
pub enum RouterCommands {
    /// Install and activate the current version, deleting old buckets
    Activate,

    /// List stored buckets
    Buckets,
}

/// Cache management subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache statistics
    Status,

    /// Clear all cached entries and buckets
    Clear,

    /// Show cache directory path
    Path,
}

/// Whitelist subcommands
#[derive(Subcommand, Debug)]
pub enum WhitelistCommands {
    /// Upload a whitelist phase to the backend
    Save {
        /// Collection contract address
        #[arg(long)]
        collection: String,

        /// Sale phase name
        #[arg(long)]
        phase: String,

        /// Whitelisted wallet addresses (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        addresses: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fetch_flags_conflict() {
        let result = Cli::try_parse_from(["dreava", "fetch", "http://x/", "--navigate", "--image"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_whitelist_addresses_split_on_comma() {
        let cli = Cli::try_parse_from([
            "dreava",
            "whitelist",
            "save",
            "--collection",
            "0xabc",
            "--phase",
            "presale",
            "--addresses",
            "0x1,0x2",
        ])
        .unwrap();

        match cli.command {
            Commands::Whitelist(WhitelistCommands::Save { addresses, .. }) => {
                assert_eq!(addresses, vec!["0x1", "0x2"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
