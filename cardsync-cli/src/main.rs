use cardsync::{
    CollectionStore, FileCache, LoadSource, Notification, NotificationLevel, NotificationSink,
    PendingSave, SyncConfig, SyncCoordinator,
};
use cardsync_remote::{HttpCollectionService, RemoteConfig};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cardsync", about = "Manage a card collection that syncs to a remote server")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, env = "CARDSYNC_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// Overrides remote.json and CARDSYNC_REMOTE_URL
    #[arg(long)]
    remote_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print every record in the collection
    Show,
    /// Print the count of one card variant
    Quantity {
        item_id: String,
        #[arg(long)]
        foil: bool,
    },
    /// Add one copy of a card
    Add {
        item_id: String,
        #[arg(long)]
        foil: bool,
    },
    /// Remove one copy of a card
    Remove {
        item_id: String,
        #[arg(long)]
        foil: bool,
    },
    /// Write a backup of the collection
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Replace the collection with a backup file
    Import { file: PathBuf },
    /// Show where the collection was loaded from and the last sync outcome
    Status,
}

/// Prints engine notifications for the user, apart from the log stream.
struct StderrSink;

impl NotificationSink for StderrSink {
    fn notify(&self, notification: Notification) {
        let label = match notification.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        eprintln!("{}: {}", label, notification.message);
    }
}

/// A failed push leaves the local edit in place, so it is reported but not fatal.
async fn report_sync(pending: PendingSave) {
    if let Err(e) = pending.wait().await {
        eprintln!("sync failed: {} (change kept locally)", e);
    }
}

async fn run(
    cli: Cli,
    store: Arc<CollectionStore>,
    remote: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = store.initialize().await;

    match cli.command {
        Command::Show => {
            let snapshot = store.snapshot().await;
            let sorted: BTreeMap<_, _> = snapshot.iter().collect();
            for (item_id, record) in sorted {
                println!(
                    "{}\tnormal: {}\tfoil: {}",
                    item_id, record.normal_count, record.foil_count
                );
            }
            let stats = snapshot.stats();
            println!(
                "{} cards ({} unique, {} foil)",
                stats.total_cards, stats.unique_cards, stats.foil_cards
            );
        }
        Command::Quantity { item_id, foil } => {
            println!("{}", store.get_quantity(&item_id, foil).await);
        }
        Command::Add { item_id, foil } => {
            let pending = store.add_card(&item_id, foil).await;
            println!("{}", store.get_quantity(&item_id, foil).await);
            report_sync(pending).await;
        }
        Command::Remove { item_id, foil } => {
            let pending = store.remove_card(&item_id, foil).await;
            println!("{}", store.get_quantity(&item_id, foil).await);
            report_sync(pending).await;
        }
        Command::Export { output } => {
            let json = store.export_json().await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    eprintln!("Exported to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Command::Import { file } => {
            let data = std::fs::read_to_string(&file)?;
            let pending = store.import_json(&data).await?;
            let stats = store.stats().await;
            println!(
                "Imported {} cards ({} unique)",
                stats.total_cards, stats.unique_cards
            );
            report_sync(pending).await;
        }
        Command::Status => {
            let status = store.coordinator().status().await;
            let source = match source {
                LoadSource::Remote => "remote",
                LoadSource::LocalCache => "local cache",
                LoadSource::Empty => "empty",
            };
            println!("remote: {}", remote);
            println!("loaded from: {}", source);
            println!("records: {}", store.snapshot().await.len());
            match status.last_synced_at {
                Some(at) => println!("last synced: {}", at.to_rfc3339()),
                None => println!("last synced: never"),
            }
            if let Some(error) = status.last_error {
                println!("last error: {}", error);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = SyncConfig::from_env();
    if let Some(data_dir) = &cli.data_dir {
        config = config.with_data_dir(data_dir.clone());
    }

    let mut remote_config = RemoteConfig::load_or_default(&config.data_dir);
    if let Some(url) = &cli.remote_url {
        remote_config.base_url = url.clone();
    }
    let remote = HttpCollectionService::new(remote_config);
    let remote_label = remote.config().base_url.clone();

    let coordinator = SyncCoordinator::from_config(
        &config,
        Arc::new(FileCache::new(config.cache_dir())),
        Arc::new(remote),
        Arc::new(StderrSink),
    );
    let store = CollectionStore::new(Arc::new(coordinator));

    let result = run(cli, Arc::clone(&store), &remote_label).await;
    store.shutdown().await;
    result
}
