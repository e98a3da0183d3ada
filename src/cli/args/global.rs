//! Global CLI options shared across all commands
//!
//! Consolidates the global flags into one struct so handlers take a
//! single `&GlobalOptions` instead of threading every flag through.

use crate::cli::{Cli, OutputFormat};

/// Global CLI options passed to all command handlers.
///
/// # Precedence
///
/// CLI flag > environment variable > config file > default. This struct
/// captures the CLI/env layer; config file values are merged in
/// `CommandContext`.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Output format (pretty, table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.dreava/config.yaml)
    pub config: Option<String>,

    /// Skip the local cache entirely
    pub no_cache: bool,

    /// Backend base URL override
    pub api_host: Option<String>,

    /// Wallet account override
    pub account: Option<String>,

    /// Cache directory override
    pub cache_dir: Option<String>,

    /// Router bucket version override
    pub cache_version: Option<String>,
}

impl GlobalOptions {
    /// Called once in main.rs after parsing.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            no_cache: cli.no_cache,
            api_host: cli.api_host.clone(),
            account: cli.account.clone(),
            cache_dir: cli.cache_dir.clone(),
            cache_version: cli.cache_version.clone(),
        }
    }

    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    pub fn api_host_ref(&self) -> Option<&str> {
        self.api_host.as_deref()
    }

    pub fn account_ref(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn cache_dir_ref(&self) -> Option<&str> {
        self.cache_dir.as_deref()
    }

    pub fn cache_version_ref(&self) -> Option<&str> {
        self.cache_version.as_deref()
    }
}
