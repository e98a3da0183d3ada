//! Dreava - caching and data-reconciliation companion for the Dreava NFT launchpad

use clap::Parser;

mod cache;
mod cli;
mod client;
mod collections;
mod config;
mod error;
mod models;
mod output;
mod preload;
mod router;

use cli::args::GlobalOptions;
use cli::{CacheCommands, Cli, CollectionsCommands, Commands, RouterCommands, WhitelistCommands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_module("dreava", log::LevelFilter::Debug);
    }
    builder.format_timestamp_millis().init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Status => cli::status::run(&opts).await,
        Commands::Version => {
            println!("dreava version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Collections(cmd) => match cmd {
            CollectionsCommands::List => cli::collections::list(&opts).await,
            CollectionsCommands::Add {
                address,
                name,
                cover,
                description,
            } => cli::collections::add(&opts, &address, name, cover, description),
            CollectionsCommands::Pending => cli::collections::pending(&opts),
            CollectionsCommands::Watch { interval } => {
                cli::collections::watch(&opts, interval).await
            }
        },
        Commands::Preload { urls, from_cache } => cli::preload::run(&opts, urls, from_cache).await,
        Commands::Fetch {
            url,
            navigate,
            image,
        } => cli::fetch::run(&opts, &url, navigate, image).await,
        Commands::Router(cmd) => match cmd {
            RouterCommands::Activate => cli::router::activate(&opts).await,
            RouterCommands::Buckets => cli::router::buckets(&opts),
        },
        Commands::Cache(cmd) => match cmd {
            CacheCommands::Status => cli::cache::status(&opts),
            CacheCommands::Clear => cli::cache::clear(&opts),
            CacheCommands::Path => cli::cache::path(&opts),
        },
        Commands::Whitelist(WhitelistCommands::Save {
            collection,
            phase,
            addresses,
        }) => cli::whitelist::save(&opts, &collection, &phase, addresses).await,
        Commands::Completion { shell } => {
            cli::completions::run(shell);
            Ok(())
        }
    }
}
