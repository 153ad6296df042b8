use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sentinel_stac_sync::collection;
use sentinel_stac_sync::config::{Config, CONFIG_FILE};
use sentinel_stac_sync::dhus::Dhus;
use sentinel_stac_sync::ledger::FailureLedger;
use sentinel_stac_sync::state::{self, StateStore};
use sentinel_stac_sync::tracker::{Report, RunOptions, Tracker};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sentinel-sync")]
#[command(about = "Tracks Sentinel products published on a DHuS endpoint for STAC registration")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Enable extended progress messages
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products published since the previous run
    ListNew {
        /// Do not store results
        #[arg(short = 'r', long)]
        dry_run: bool,

        /// Start date (YYYY-MM-DD) to use instead of the stored timestamp
        #[arg(short, long)]
        from: Option<NaiveDate>,

        /// Server to fetch Sentinel data from; overrides SENTINEL_HOST
        #[arg(short = 'e', long)]
        sentinel_host: Option<String>,

        /// Also write the new product ids to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the collection and STAC feature id of a product title
    Identify {
        #[arg(short = 'i', long)]
        product_id: String,

        #[arg(long)]
        json: bool,
    },
}

/// `RUST_LOG` directives apply first; `--debug` then raises the global level.
fn log_filter(env: Option<&str>, debug: bool) -> EnvFilter {
    let filter = env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    if debug {
        filter.add_directive(LevelFilter::DEBUG.into())
    } else {
        filter
    }
}

fn init_tracing(debug: bool) -> Result<()> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_filter(env.as_deref(), debug))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let config = Config::read(&cli.config)?;
    let ledger = config.err_prefix.as_deref().map(FailureLedger::new);

    let (context, outcome) = match cli.command {
        Commands::ListNew {
            dry_run,
            from,
            sentinel_host,
            output,
            json,
        } => {
            let options = RunOptions {
                dry_run,
                from,
                seen_mode: config.seen_mode,
            };
            let outcome = list_new(&config, sentinel_host, options, output, json).await;
            ("list-new".to_string(), outcome)
        }
        Commands::Identify { product_id, json } => {
            let outcome = identify(&config, &product_id, json);
            (product_id, outcome)
        }
    };

    if let (Err(err), Some(ledger)) = (&outcome, &ledger) {
        match ledger.record(&context, err) {
            Ok(path) => info!("Failure recorded in {}", path.display()),
            Err(e) => warn!("Unable to record failure: {e:#}"),
        }
    }
    outcome
}

/// The `--output` file is written before any state is stored, so a failed
/// write leaves the same products to be reported by the next run.
async fn list_new(
    config: &Config,
    sentinel_host: Option<String>,
    options: RunOptions,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let host = sentinel_host
        .or_else(|| config.sentinel_host.clone())
        .filter(|host| !host.trim().is_empty())
        .ok_or(anyhow!(
            "SENTINEL_HOST is not defined and --sentinel-host parameter not passed"
        ))?;

    let source = Dhus::new(&host, config.request_timeout())?;
    let store = StateStore::new(config.local_dir());
    let tracker = Tracker::new(source, store, options);

    let discovery = tracker.discover().await?;
    if let Some(path) = output {
        let ids = &discovery.report.new_products;
        state::write_replacing(&path, &ids.join("\n"))?;
        info!("Wrote {} product ids to {}", ids.len(), path.display());
    }
    let report = tracker.commit(discovery)?;
    print_report(&report, json)
}

fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        for id in &report.new_products {
            println!("{id}");
        }
    }
    Ok(())
}

fn identify(config: &Config, product_id: &str, json: bool) -> Result<()> {
    let product = collection::identify(product_id, config.salt.as_deref())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&product)?);
    } else {
        println!("{}\t{}", product.collection, product.feature_id);
    }
    Ok(())
}
