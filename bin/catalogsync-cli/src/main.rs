//! CatalogSync CLI - inspect and sync the local catalog
//!
//! Wires a redb store, the bundled baseline and the HTTP catalog client into
//! a [`Catalog`] and prints results as JSON.

use anyhow::{Context, Result};
use catalogsync_cache::{Baseline, Catalog, CacheStore};
use catalogsync_client::HttpCatalogClient;
use catalogsync_common::{Config, Entity, FilterCriteria};
use catalogsync_kv::RedbKvStore;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "catalogsync-cli")]
#[command(about = "Offline-first catalog cache")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "catalogsync.toml")]
    config: PathBuf,

    /// Directory holding the persistent store
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Baseline snapshot (JSON)
    #[arg(long)]
    baseline: Option<PathBuf>,

    /// Catalog service base URL
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Skip the version check and serve local data only
    #[arg(long)]
    offline: bool,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a sync cycle if one is due and report what it did
    Sync,
    /// Show version, freshness and counters
    Status,
    /// Show one entity
    Get {
        /// Entity ID
        id: String,
    },
    /// Search name, locality, keywords and code
    Search {
        /// Search text
        text: String,
    },
    /// Filter by status and/or locality
    Filter {
        /// Exact `metadata.status`
        #[arg(long)]
        status: Option<String>,
        /// Locality, ignoring case
        #[arg(long)]
        locality: Option<String>,
    },
    /// List every entity in the merged view
    List,
}

/// Read the config file if present; CLI flags take precedence
fn load_config(args: &Args) -> Result<Config> {
    let mut config: Config = if args.config.exists() {
        let config_str = std::fs::read_to_string(&args.config)
            .with_context(|| format!("reading {}", args.config.display()))?;
        toml::from_str(&config_str).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to parse config file: {e}");
            Config::default()
        })
    } else {
        Config::default()
    };

    if let Some(data_dir) = &args.data_dir {
        config.catalog.data_dir.clone_from(data_dir);
    }
    if let Some(baseline) = &args.baseline {
        config.catalog.baseline_path = Some(baseline.clone());
    }
    if let Some(endpoint) = &args.endpoint {
        config.sync.endpoint.clone_from(endpoint);
    }
    if args.offline {
        config.sync.enabled = false;
    }
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    Ok(config)
}

fn load_baseline(path: Option<&Path>) -> Result<Baseline> {
    let Some(path) = path else {
        warn!("No baseline configured, starting from an empty catalog");
        return Ok(Baseline::empty());
    };
    Ok(Baseline::from_path(path)?)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_entities(entities: &[Entity]) -> Result<()> {
    print_json(&entities)
}

async fn run(command: Commands, catalog: &Catalog, store: &CacheStore) -> Result<()> {
    match command {
        Commands::Sync => {
            let outcome = catalog.last_outcome();
            let summary = outcome.as_deref().map(ToString::to_string);
            print_json(&json!({
                "outcome": summary,
                "entities": store.len(),
                "freshness": catalog.freshness().await,
            }))?;
        }
        Commands::Status => {
            print_json(&json!({
                "baseline": {
                    "version": catalog.baseline().version(),
                    "entities": catalog.baseline().len(),
                },
                "entities": store.len(),
                "freshness": catalog.freshness().await,
                "last_outcome": catalog.last_outcome().as_deref().map(ToString::to_string),
                "stats": catalog.stats(),
            }))?;
        }
        Commands::Get { id } => match store.get_by_id(&id) {
            Some(entity) => print_json(&entity)?,
            None => anyhow::bail!("no entity with id {id}"),
        },
        Commands::Search { text } => print_entities(&store.query().search(&text))?,
        Commands::Filter { status, locality } => {
            let criteria = FilterCriteria { status, locality };
            print_entities(&store.query().filter(&criteria))?;
        }
        Commands::List => print_entities(&store.get_all())?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    let config = load_config(&args)?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("Config file: {}", args.config.display());

    let baseline = load_baseline(config.catalog.baseline_path.as_deref())?;
    let db_path = config.catalog.data_dir.join("catalog.redb");
    let kv = RedbKvStore::open(&db_path)
        .with_context(|| format!("opening store at {}", db_path.display()))?;
    let remote = HttpCatalogClient::new(&config.sync.endpoint, config.sync.request_timeout())?;
    info!(
        "Catalog {} at {} (sync {})",
        config.catalog.namespace,
        db_path.display(),
        if config.sync.enabled {
            config.sync.endpoint.as_str()
        } else {
            "disabled"
        }
    );

    let catalog = Catalog::new(baseline, Arc::new(kv), Arc::new(remote), &config);
    let store = catalog.ensure_ready().await;

    run(args.command, &catalog, &store).await
}
