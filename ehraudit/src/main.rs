//! EHR batch data quality audit tool.
//!
//! Loads a batch of records from a JSON file, runs the three-stage audit
//! pipeline, and renders the resulting quality report as text or JSON.

mod loader;
mod render;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use ehraudit_core::audit::{AuditConfig, Auditor, OutlierConfig};
use ehraudit_core::logging::init_logging;

/// Command-line interface for the EHR quality auditor
#[derive(Parser)]
#[command(name = "ehraudit")]
#[command(about = "EHR batch data quality auditor")]
#[command(version)]
struct Cli {
    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Audit a batch of records and produce a quality report
    Audit {
        /// Input batch file (JSON array of record objects)
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output file path (stdout when omitted)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Expected fraction of outliers in the batch
        #[arg(long)]
        contamination: Option<f64>,

        /// Random seed for the anomaly model
        #[arg(long)]
        seed: Option<u64>,

        /// Skip outlier detection entirely
        #[arg(long)]
        no_outliers: bool,
    },
}

/// Available output formats
#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    /// Human-readable text summary
    Text,
    /// JSON structured output
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet).context("failed to initialize logging")?;

    match cli.command {
        Commands::Audit {
            input,
            format,
            output,
            contamination,
            seed,
            no_outliers,
        } => {
            let mut outlier = OutlierConfig::new().with_enabled(!no_outliers);
            if let Some(contamination) = contamination {
                outlier = outlier.with_contamination(contamination);
            }
            if let Some(seed) = seed {
                outlier = outlier.with_seed(seed);
            }
            let config = AuditConfig::new().with_outlier(outlier);

            let batch = loader::load_batch(&input)
                .with_context(|| format!("failed to load batch from {}", input.display()))?;
            if batch.rejected > 0 {
                tracing::warn!(rejected = batch.rejected, "some rows were rejected during load");
            }

            let report = Auditor::new(config)
                .audit(&batch.records)
                .context("audit failed")?;

            let rendered = match format {
                OutputFormat::Text => render::render_text(&report),
                OutputFormat::Json => render::render_json(&report)?,
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write report to {}", path.display()))?;
                    tracing::info!(path = %path.display(), "report written");
                }
                None => print!("{}", rendered),
            }
        }
    }

    Ok(())
}
