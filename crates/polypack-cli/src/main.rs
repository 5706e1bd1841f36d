use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use kanal::AsyncReceiver;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use polypack_config::Config;
use polypack_pipeline::{
    Catalog, FileFetcher, HttpFetcher, LocalPublisher, PipelineError, PipelinePool, SourceFetcher,
    publish_with_retry,
};
use polypack_types::StageEvent;

/// Fraction of packs in a multi-pack run that must succeed.
const MIN_SUCCESS_RATE: f64 = 0.8;

#[derive(Parser)]
#[command(name = "polypack", about = "Generate and deploy bidirectional dictionary packs")]
struct Cli {
    /// Pack catalog listing the language pairs to build
    #[arg(long, default_value = "packs.json")]
    catalog: PathBuf,

    /// Read source dumps from this directory instead of fetching over HTTP
    #[arg(long)]
    source_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the store for one language pair
    Generate {
        pair_id: String,
        /// Re-verify the existing store without regenerating it
        #[arg(long)]
        verify_only: bool,
    },
    /// Generate stores for every pair in the catalog
    GenerateAll,
    /// Generate one pair and publish it to the local registry
    Deploy {
        pair_id: String,
        /// Check the already published artifact and registry entry instead of regenerating
        #[arg(long)]
        verify_only: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Arc::new(Config::new());

    if let Err(e) = run(cli, config).await {
        tracing::error!(category = e.category(), error = %e, "run failed");
        process::exit(1);
    }
}

async fn run(cli: Cli, config: Arc<Config>) -> Result<(), PipelineError> {
    let catalog = Catalog::load(&cli.catalog)?;
    let fetcher = make_fetcher(&cli, &config)?;

    let cancel = CancellationToken::new();
    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            shutdown_cancel.cancel();
        }
    });

    let (event_tx, event_rx) = kanal::unbounded_async();
    let printer = tokio::spawn(print_progress(event_rx));

    let pool = PipelinePool::new(Arc::clone(&config), fetcher, event_tx, cancel);

    let result = match cli.command {
        Command::Generate {
            pair_id,
            verify_only,
        } => {
            let spec = find_pair(&catalog, &pair_id)?;
            if verify_only {
                pool.verify_one(spec).await
            } else {
                pool.run_one(spec).await.map(|_| ())
            }
        }
        Command::GenerateAll => generate_all(&pool, &catalog).await,
        Command::Deploy {
            pair_id,
            verify_only,
        } => {
            let spec = find_pair(&catalog, &pair_id)?;
            let publisher = LocalPublisher::new(&config.pipeline);
            if verify_only {
                publisher.verify_deployment(&spec.id)
            } else {
                let summary = pool.run_one(spec).await?;
                publish_with_retry(
                    &publisher,
                    &summary,
                    config.source.retry_attempts,
                    config.source.retry_backoff_ms,
                )
                .await
            }
        }
    };

    drop(pool);
    let _ = printer.await;
    result
}

async fn generate_all(pool: &PipelinePool, catalog: &Catalog) -> Result<(), PipelineError> {
    let outcomes = pool.run_many(&catalog.packs).await;
    let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
    let rate = succeeded as f64 / outcomes.len() as f64;
    if rate < MIN_SUCCESS_RATE {
        return Err(PipelineError::Internal(format!(
            "only {succeeded}/{} packs generated successfully",
            outcomes.len()
        )));
    }
    Ok(())
}

fn find_pair<'a>(
    catalog: &'a Catalog,
    pair_id: &str,
) -> Result<&'a polypack_types::PairSpec, PipelineError> {
    catalog
        .find(pair_id)
        .ok_or_else(|| PipelineError::Internal(format!("pair {pair_id} is not in the catalog")))
}

fn make_fetcher(cli: &Cli, config: &Config) -> Result<Arc<dyn SourceFetcher>, PipelineError> {
    match &cli.source_dir {
        Some(dir) => Ok(Arc::new(FileFetcher::new(dir.clone()))),
        None => Ok(Arc::new(HttpFetcher::new(&config.source)?)),
    }
}

async fn print_progress(events: AsyncReceiver<StageEvent>) {
    while let Ok(event) = events.recv().await {
        tracing::info!(
            pack = %event.pair,
            stage = %format!("{}/{}", event.stage_index, event.stage_count),
            percent = %format!("{:.0}", event.percent),
            "{}",
            event.label
        );
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if atty::is(atty::Stream::Stdout) {
        builder.init();
    } else {
        builder.json().init();
    }
}
