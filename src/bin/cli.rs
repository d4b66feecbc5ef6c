//! SOPA Tracker CLI
//!
//! Local execution entry point.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use sopa_tracker::{
    error::{AppError, Result},
    models::{Config, UpdateMode},
    pipeline,
    services::{LogNotifier, Notifier, WebhookNotifier},
    storage::{DatasetStore, DocumentArchive, LocalStorage},
    utils::http::HttpFetcher,
};
use tokio_util::sync::CancellationToken;

/// sopa - Schedule of Proposed Actions tracker
#[derive(Parser, Debug)]
#[command(
    name = "sopa",
    version,
    about = "Tracks Forest Service SOPA reports and their project updates"
)]
struct Cli {
    /// Path to storage directory holding datasets and documents
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Path to config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chat webhook for run notifications
    #[arg(long, env = "SOPA_WEBHOOK_URL")]
    webhook_url: Option<String>,

    /// Keep datasets and documents in S3 (S3_BUCKET, S3_PREFIX)
    #[cfg(feature = "s3")]
    #[arg(long)]
    s3: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a fresh dataset from the unit directory
    #[cfg(feature = "bootstrap")]
    Bootstrap {
        /// Only crawl the first N units
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Merge newer snapshots into the latest dataset
    Update {
        /// Parse every missed snapshot instead of only the newest
        #[arg(long)]
        catch_up: bool,
    },

    /// Write the latest dataset as CSV tables
    Export {
        /// Output directory (default: {storage_dir}/export)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Validate configuration and the latest dataset
    Validate,

    /// Show latest dataset info
    Info,
}

/// Storage backend selected on the command line.
enum Backend {
    Local(LocalStorage),
    #[cfg(feature = "s3")]
    S3(sopa_tracker::storage::S3Storage),
}

impl Backend {
    fn store(&self) -> &dyn DatasetStore {
        match self {
            Self::Local(storage) => storage,
            #[cfg(feature = "s3")]
            Self::S3(storage) => storage,
        }
    }

    fn archive(&self) -> &dyn DocumentArchive {
        match self {
            Self::Local(storage) => storage,
            #[cfg(feature = "s3")]
            Self::S3(storage) => storage,
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(cli.storage_dir.join("config.toml")),
    };
    if cli.webhook_url.is_some() {
        config.notify.webhook_url = cli.webhook_url.clone();
    }
    Ok(config)
}

async fn open_backend(cli: &Cli) -> Result<Backend> {
    #[cfg(feature = "s3")]
    if cli.s3 {
        return Ok(Backend::S3(sopa_tracker::storage::S3Storage::from_env().await?));
    }
    Ok(Backend::Local(LocalStorage::new(&cli.storage_dir)))
}

/// Cancel in-flight work on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted; abandoning in-flight units");
            token.cancel();
        }
    });
    cancel
}

fn notifier(config: &Config, fetcher: &HttpFetcher) -> Box<dyn Notifier> {
    match &config.notify.webhook_url {
        Some(url) => Box::new(WebhookNotifier::new(fetcher.client().clone(), url)),
        None => Box::new(LogNotifier),
    }
}

async fn show_info(store: &dyn DatasetStore, storage_dir: &Path) -> Result<()> {
    log::info!("Storage directory: {}", storage_dir.display());

    let units = match store.load_latest().await {
        Ok(units) => units,
        Err(AppError::NotFound(_)) => {
            log::info!("No dataset found yet. Run 'bootstrap' first.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let projects: usize = units.iter().map(|u| u.projects.len()).sum();
    let documents: usize = units.iter().map(|u| u.document_count()).sum();
    let freshest = units.iter().filter_map(|u| u.latest_known_date()).max();

    log::info!("Units: {}", units.len());
    log::info!("Projects: {projects}");
    log::info!("Documents: {documents}");
    match freshest {
        Some(date) => log::info!("Freshest snapshot: {date}"),
        None => log::info!("Freshest snapshot: none"),
    }
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("SOPA tracker starting...");

    let mut config = load_config(&cli)?;
    let backend = open_backend(&cli).await?;

    match &cli.command {
        #[cfg(feature = "bootstrap")]
        Command::Bootstrap { limit } => {
            config.validate()?;
            let fetcher = HttpFetcher::new(&config, cancel_on_ctrl_c())?;
            pipeline::run_bootstrap(
                &config,
                fetcher,
                backend.store(),
                Some(backend.archive()),
                *limit,
            )
            .await?;
        }

        Command::Update { catch_up } => {
            if *catch_up {
                config.update.mode = UpdateMode::CatchUp;
            }
            config.validate()?;

            let fetcher = HttpFetcher::new(&config, cancel_on_ctrl_c())?;
            let notifier = notifier(&config, &fetcher);
            let report = pipeline::run_update(
                &config,
                fetcher,
                backend.store(),
                Some(backend.archive()),
                notifier.as_ref(),
            )
            .await?;

            if report.cancelled() {
                return Err(AppError::Cancelled);
            }
        }

        Command::Export { out_dir } => {
            let out_dir = out_dir
                .clone()
                .unwrap_or_else(|| cli.storage_dir.join("export"));
            pipeline::run_export(backend.store(), &out_dir).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            match backend.store().load_latest().await {
                Ok(units) => log::info!("✓ Latest dataset OK ({} units)", units.len()),
                Err(AppError::NotFound(_)) => log::warn!("No dataset saved yet"),
                Err(e) => {
                    log::error!("Dataset validation failed: {}", e);
                    return Err(e);
                }
            }

            log::info!("All validations passed!");
        }

        Command::Info => show_info(backend.store(), &cli.storage_dir).await?,
    }

    log::info!("Done!");

    Ok(())
}
