//! Wallet identity
//!
//! The reconciliation engine only needs to know which account is
//! active. Provider detection collapses the injected provider's flags
//! into one closed enum, and account changes are observed by polling.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::abi::parse_address;
use crate::config::Config;
use crate::error::{FetchError, Result};

/// Kind of wallet provider in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WalletProviderKind {
    MetaMask,
    WalletConnect,
    Coinbase,
    Reown,
    Unknown,
    None,
}

impl std::fmt::Display for WalletProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WalletProviderKind::MetaMask => "MetaMask",
            WalletProviderKind::WalletConnect => "WalletConnect",
            WalletProviderKind::Coinbase => "Coinbase Wallet",
            WalletProviderKind::Reown => "Reown",
            WalletProviderKind::Unknown => "Unknown provider",
            WalletProviderKind::None => "No provider",
        };
        f.write_str(name)
    }
}

/// Identification flags an injected provider advertises
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFlags {
    #[serde(default, rename = "isMetaMask")]
    pub is_meta_mask: bool,

    #[serde(default, rename = "isCoinbaseWallet")]
    pub is_coinbase_wallet: bool,

    #[serde(default, rename = "isWalletConnect")]
    pub is_wallet_connect: bool,

    #[serde(default, rename = "isReown")]
    pub is_reown: bool,
}

/// Classify an injected provider.
///
/// Several wallets impersonate MetaMask (Coinbase sets `isMetaMask` too),
/// so the more specific flags are checked first.
pub fn classify(flags: Option<&ProviderFlags>) -> WalletProviderKind {
    let Some(flags) = flags else {
        return WalletProviderKind::None;
    };

    if flags.is_coinbase_wallet {
        WalletProviderKind::Coinbase
    } else if flags.is_reown {
        WalletProviderKind::Reown
    } else if flags.is_wallet_connect {
        WalletProviderKind::WalletConnect
    } else if flags.is_meta_mask {
        WalletProviderKind::MetaMask
    } else {
        WalletProviderKind::Unknown
    }
}

/// Source of the active account
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn kind(&self) -> WalletProviderKind;

    /// The connected account, if any
    async fn active_account(&self) -> Result<Option<String>>;
}

/// Wallet identity taken from configuration / command-line flags
#[derive(Debug, Clone, Default)]
pub struct ConfiguredWallet {
    account: Option<String>,
    flags: Option<ProviderFlags>,
}

impl ConfiguredWallet {
    pub fn new(account: Option<String>, flags: Option<ProviderFlags>) -> Self {
        Self { account, flags }
    }
}

#[async_trait]
impl WalletProvider for ConfiguredWallet {
    fn kind(&self) -> WalletProviderKind {
        match (&self.flags, &self.account) {
            (Some(flags), _) => classify(Some(flags)),
            (None, Some(_)) => WalletProviderKind::Unknown,
            (None, None) => WalletProviderKind::None,
        }
    }

    async fn active_account(&self) -> Result<Option<String>> {
        match &self.account {
            Some(account) => {
                parse_address(account)?;
                Ok(Some(account.to_lowercase()))
            }
            None => Ok(None),
        }
    }
}

/// Wallet identity re-read from the config file on every call, so a
/// long-running watcher sees `wallet.account` edits.
#[derive(Debug, Clone)]
pub struct ConfigFileWallet {
    path: PathBuf,
}

impl ConfigFileWallet {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn snapshot(&self) -> Result<ConfiguredWallet> {
        let config = if self.path.exists() {
            Config::load_from(&self.path)?
        } else {
            Config::default()
        };
        Ok(ConfiguredWallet::new(
            config.wallet.account,
            config.wallet.provider,
        ))
    }
}

#[async_trait]
impl WalletProvider for ConfigFileWallet {
    fn kind(&self) -> WalletProviderKind {
        match self.snapshot() {
            Ok(wallet) => wallet.kind(),
            Err(e) => {
                log::debug!("Cannot read {}: {}", self.path.display(), e);
                WalletProviderKind::Unknown
            }
        }
    }

    async fn active_account(&self) -> Result<Option<String>> {
        self.snapshot()?.active_account().await
    }
}

/// Resolve the active account or fail with `NoAccount`.
pub async fn require_account(wallet: &dyn WalletProvider) -> Result<String> {
    wallet
        .active_account()
        .await?
        .ok_or_else(|| FetchError::NoAccount.into())
}

/// Polls a wallet provider and publishes account changes.
///
/// The polling task stops on `stop()` or when the watcher is dropped.
pub struct AccountWatcher {
    rx: watch::Receiver<Option<String>>,
    task: JoinHandle<()>,
}

impl AccountWatcher {
    pub fn spawn(provider: Arc<dyn WalletProvider>, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(None);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let account = match provider.active_account().await {
                    Ok(account) => account.map(|a| a.to_lowercase()),
                    Err(e) => {
                        log::debug!("Wallet poll failed: {}", e);
                        None
                    }
                };

                tx.send_if_modified(|current| {
                    if *current != account {
                        log::info!("Active account changed to {:?}", account);
                        *current = account;
                        true
                    } else {
                        false
                    }
                });

                if tx.is_closed() {
                    break;
                }
            }
        });

        Self { rx, task }
    }

    /// Receiver notified on every account change
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.rx.clone()
    }

    /// Last observed account
    pub fn current(&self) -> Option<String> {
        self.rx.borrow().clone()
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for AccountWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
