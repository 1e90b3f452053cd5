use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use credit_features::config::PipelineConfig;
use credit_features::io::{load_partition, save_output};
use credit_features::pipeline::{Pipeline, PipelineOutput};
use credit_features::record::Split;
use credit_features::schema::SchemaRegistry;
use credit_features::schema::credit::{CUSTOMER_KEY, credit_score_registry};
use credit_features::split::split_by_key;
use credit_features::stats::Stats;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "credit-features",
    about = "Clean monthly credit records into a feature matrix"
)]
pub struct Cli {
    /// Schema table (JSON). Defaults to the built-in credit-score schema.
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    /// Pipeline configuration (JSON). Defaults to the credit-score settings.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write rolling log files into this directory
    #[arg(long, global = true, env = "CREDIT_FEATURES_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit stats on a training file and write its feature matrix
    Fit {
        /// Training records (CSV, Parquet, JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the fitted stats document
        #[arg(short, long)]
        stats: PathBuf,

        /// Feature matrix output (CSV or Parquet)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Hold out this fraction of customers before fitting
        #[arg(long)]
        holdout_fraction: Option<f64>,

        /// Column that keeps a customer's records on one side of the split
        #[arg(long, default_value = CUSTOMER_KEY)]
        split_key: String,

        /// Feature matrix output for the held-out customers
        #[arg(long, requires = "holdout_fraction")]
        holdout_output: Option<PathBuf>,

        /// Run report output (JSON)
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Transform a file with previously fitted stats
    Transform {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        stats: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Partition label: holdout, production or train
        #[arg(long, default_value = "production", value_parser = parse_split)]
        split: Split,

        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Write a drift snapshot of a file, computed with the stats' coercion rules
    Snapshot {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        stats: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write the default schema table and configuration for editing
    Schema {
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        config_output: Option<PathBuf>,
    },
}

fn parse_split(value: &str) -> std::result::Result<Split, String> {
    match value.to_ascii_lowercase().as_str() {
        "train" => Ok(Split::Train),
        "holdout" => Ok(Split::Holdout),
        "production" => Ok(Split::Production),
        other => Err(format!("unknown split '{other}'")),
    }
}

pub fn run_command(cli: Cli) -> Result<()> {
    let registry = match &cli.schema {
        Some(path) => SchemaRegistry::from_file(path)?,
        None => credit_score_registry()?,
    };
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::credit_score(),
    };

    match cli.command {
        Commands::Fit {
            input,
            stats,
            output,
            holdout_fraction,
            split_key,
            holdout_output,
            report,
        } => {
            let source = load_partition(&input, Split::Train)?;
            let (train, holdout) = match holdout_fraction {
                Some(fraction) => {
                    let (train, holdout) = split_by_key(source, &split_key, fraction)?;
                    (train, Some(holdout))
                }
                None => (source, None),
            };

            let mut pipeline = Pipeline::new(registry, config)?;
            let fitted = pipeline.fit_transform(&train)?;
            fitted.stats.to_file(&stats)?;
            println!("Stats {} written to {}", fitted.stats.id(), stats.display());
            finish(&fitted.output, output.as_deref(), report.as_deref())?;

            if let (Some(holdout), Some(path)) = (holdout, holdout_output) {
                let scored = pipeline.transform(&holdout)?;
                finish(&scored, Some(&path), None)?;
            }
            Ok(())
        }
        Commands::Transform {
            input,
            stats,
            output,
            split,
            report,
        } => {
            let pipeline = load_pipeline(registry, config, &stats)?;
            let batch = load_partition(&input, split)?;
            let scored = pipeline.transform(&batch)?;
            finish(&scored, Some(&output), report.as_deref())
        }
        Commands::Snapshot {
            input,
            stats,
            output,
        } => {
            let pipeline = load_pipeline(registry, config, &stats)?;
            let batch = load_partition(&input, Split::Production)?;
            pipeline.snapshot(&batch)?.to_file(&output)?;
            println!("Snapshot written to {}", output.display());
            Ok(())
        }
        Commands::Schema {
            output,
            config_output,
        } => {
            registry.to_file(&output)?;
            println!("Schema written to {}", output.display());
            if let Some(path) = config_output {
                config.to_file(&path)?;
                println!("Config written to {}", path.display());
            }
            Ok(())
        }
    }
}

fn load_pipeline(registry: SchemaRegistry, config: PipelineConfig, stats: &Path) -> Result<Pipeline> {
    let stats = Stats::from_file(stats).context("Failed to load stats")?;
    Ok(Pipeline::from_stats(registry, config, Arc::new(stats))?)
}

fn finish(output: &PipelineOutput, path: Option<&Path>, report: Option<&Path>) -> Result<()> {
    println!("{}", output.report.summary());
    if let Some(path) = path {
        save_output(output, path)?;
        println!("Features written to {}", path.display());
    }
    if let Some(report_path) = report {
        let json = serde_json::to_string_pretty(&output.report)
            .context("Failed to serialize run report")?;
        std::fs::write(report_path, json)
            .with_context(|| format!("Failed to write {}", report_path.display()))?;
    }
    Ok(())
}
