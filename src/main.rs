use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trendwatch::catalog::Catalog;
use trendwatch::config::Config;
use trendwatch::scanner::ScannerContext;
use trendwatch::sched::BatchScheduler;

#[derive(Parser)]
#[command(
    name = "trendwatch",
    version,
    about = "Search-interest breakout scanner with Telegram alerts",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file (environment variables are used otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to a catalog file (the built-in catalog is used otherwise)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scan loop on the configured interval
    Run,

    /// Run a single scan cycle and exit
    Scan {
        /// Restrict the cycle to one category
        #[arg(long)]
        category: Option<String>,
    },

    /// Print the catalog and exit
    Catalog,

    /// Send a test message to every configured recipient
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    match cli.command {
        Commands::Run => {
            let scheduler = build_scheduler(&cli, None)?;
            tracing::info!(
                scan_interval_hours = scheduler.context().config().scheduler.scan_interval_hours,
                "trendwatch starting scan loop"
            );

            tokio::select! {
                _ = scheduler.run_forever() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown requested");
                }
            }
        }

        Commands::Scan { ref category } => {
            let scheduler = build_scheduler(&cli, category.as_deref())?;
            let summary = scheduler.run_cycle().await;

            println!(
                "Cycle complete: {} categories, {} terms, {} breakouts ({} no data, {} failed)",
                summary.categories_scanned,
                summary.terms_scanned,
                summary.events.len(),
                summary.terms_no_data,
                summary.terms_failed,
            );
            for event in &summary.events {
                println!(
                    "  {} ({}): peak {:.0} on {}",
                    event.term,
                    event.category,
                    event.peak,
                    event.peak_time.format("%Y-%m-%d")
                );
            }
        }

        Commands::Catalog => {
            let catalog = load_catalog(&cli)?;
            println!(
                "{} categories, {} terms",
                catalog.len(),
                catalog.total_terms()
            );
            for category in &catalog.categories {
                println!("\n{}", category.name);
                for term in &category.terms {
                    println!("  - {term}");
                }
                for symbol in &category.symbols {
                    println!("  [{}] {}", symbol.ticker, symbol.description);
                }
            }
        }

        Commands::Check => {
            let config = load_config(&cli)?;
            let ctx = ScannerContext::from_config(config)?;

            let statuses = ctx
                .dispatcher()
                .broadcast("trendwatch connectivity check")
                .await;
            for status in &statuses {
                println!("{status}");
            }

            if statuses.iter().any(|s| !s.success) {
                anyhow::bail!("delivery failed for at least one recipient");
            }
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("trendwatch=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("trendwatch=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::from_file(path),
        None => Config::from_env(),
    }
}

fn load_catalog(cli: &Cli) -> Result<Catalog> {
    match &cli.catalog {
        Some(path) => Ok(Catalog::from_file(path)?),
        None => Ok(Catalog::builtin()),
    }
}

fn build_scheduler(cli: &Cli, only_category: Option<&str>) -> Result<BatchScheduler> {
    let config = load_config(cli)?;
    let mut catalog = load_catalog(cli)?;

    if let Some(name) = only_category {
        let category = catalog
            .find(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("category not found in catalog: {name}"))?;
        catalog = Catalog {
            categories: vec![category],
        };
    }

    let ctx = ScannerContext::from_config(config)?;
    Ok(BatchScheduler::new(ctx, catalog))
}
