use aov_reconciler::export::ExportFormat;
use aov_reconciler::{ingestion, ReconConfig, ReconciliationPipeline};

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aov-reconciler")]
#[command(about = "Reconcile order gross values against item-level costs")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write both output tables
    Run(RunArgs),
    /// Run the pipeline without writing and print the discrepancy report as JSON
    Report(RunArgs),
}

#[derive(ClapArgs)]
struct RunArgs {
    /// JSON config file (fields not given take their defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Order table CSV
    #[arg(long)]
    orders: Option<PathBuf>,

    /// Item table CSV
    #[arg(long)]
    items: Option<PathBuf>,

    /// Directory for the output tables
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format: csv or parquet
    #[arg(long)]
    format: Option<ExportFormat>,

    /// Log precondition violations instead of failing on them
    #[arg(long)]
    no_validate: bool,
}

impl RunArgs {
    fn resolve(self) -> Result<ReconConfig> {
        let base = match &self.config {
            Some(path) => ReconConfig::from_file(path)?,
            None => ReconConfig::default(),
        };
        let mut config = base.with_env()?;

        if let Some(orders) = self.orders {
            config.orders_path = orders;
        }
        if let Some(items) = self.items {
            config.items_path = items;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(format) = self.format {
            config.export_format = format;
        }
        if self.no_validate {
            config.validate_preconditions = false;
        }
        Ok(config)
    }
}

fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let outcome = match args.command {
        Commands::Run(run_args) => run(run_args),
        Commands::Report(run_args) => report(run_args),
    };

    if let Err(e) = outcome {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(args: RunArgs) -> Result<()> {
    let config = args.resolve()?;
    info!(
        orders = %config.orders_path.display(),
        items = %config.items_path.display(),
        output_dir = %config.output_dir.display(),
        "starting reconciliation"
    );

    let pipeline = ReconciliationPipeline::new(config);
    let output = pipeline
        .run_from_files()
        .context("reconciliation run failed")?;

    let summary = &output.summary;
    println!("Orders checked:   {}", summary.report.orders_checked);
    println!("Line items:       {}", summary.line_items);
    println!("Balancing items:  {}", summary.balancing_items);
    println!("Net adjustment:   {:.2}", summary.report.net_adjustment());
    for path in [&summary.item_detail_path, &summary.balanced_detail_path]
        .into_iter()
        .flatten()
    {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn report(args: RunArgs) -> Result<()> {
    let config = args.resolve()?;
    let orders = ingestion::load_orders(&config.orders_path)?;
    let items = ingestion::load_items(&config.items_path)?;

    let pipeline = ReconciliationPipeline::new(config);
    let output = pipeline
        .dry_run(orders, items)
        .context("reconciliation dry run failed")?;

    println!("{}", serde_json::to_string_pretty(&output.summary.report)?);
    Ok(())
}
