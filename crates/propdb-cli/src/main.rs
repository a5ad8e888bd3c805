mod favorites;
mod search;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use propdb_client::{
    FavoritesStore, HttpPropertyApi, LocalFavorites, PropertyApi, RemoteFavorites,
};
use propdb_core::ClientConfig;
use tracing_subscriber::EnvFilter;

use crate::favorites::FavoritesCommands;
use crate::search::SearchArgs;

#[derive(Debug, Parser)]
#[command(name = "propdb-cli")]
#[command(about = "Search and manage property listings")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search listings with filters, sorting and paging
    Search(SearchArgs),
    /// Show one listing in full
    Show {
        /// Listing id
        id: String,
    },
    /// Manage favorite listings
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommands,
    },
    /// Database utilities
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = propdb_core::load_client_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Search(args)) => {
            let api = build_api(&config)?;
            let store = open_favorites(&config, Arc::clone(&api)).await?;
            search::run_search(api, store, &config, &args).await?;
        }
        Some(Commands::Show { id }) => {
            let api = build_api(&config)?;
            search::run_show(api.as_ref(), &id).await?;
        }
        Some(Commands::Favorites { command }) => {
            let api = build_api(&config)?;
            let store = open_favorites(&config, api).await?;
            favorites::run_favorites(store.as_ref(), command).await?;
        }
        Some(Commands::Db {
            command: DbCommands::Ping,
        }) => run_db_ping().await?,
        None => println!("propdb-cli: run with --help to list commands"),
    }

    Ok(())
}

fn build_api(config: &ClientConfig) -> anyhow::Result<Arc<dyn PropertyApi>> {
    Ok(Arc::new(HttpPropertyApi::from_config(config)?))
}

/// Server-side favorites when a token is configured, a local file otherwise.
async fn open_favorites(
    config: &ClientConfig,
    api: Arc<dyn PropertyApi>,
) -> anyhow::Result<Arc<dyn FavoritesStore>> {
    if config.api_token.is_some() {
        tracing::debug!("using server-backed favorites");
        return Ok(Arc::new(RemoteFavorites::new(api)));
    }
    tracing::debug!(path = %config.favorites_path.display(), "using local favorites file");
    Ok(Arc::new(LocalFavorites::load(&config.favorites_path).await?))
}

async fn run_db_ping() -> anyhow::Result<()> {
    let config = propdb_core::load_server_config()?;
    let pool = propdb_db::connect_pool(
        &config.database_url,
        propdb_db::PoolConfig::from_server_config(&config),
    )
    .await?;
    propdb_db::health_check(&pool).await?;
    println!("database ok");
    Ok(())
}
