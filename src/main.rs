//! runport CLI - export, import, and maintenance of tracked experiments

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use runport::config::{TrackingConfig, DEFAULT_TRACKING_URI, TRACKING_URI_ENV};
use runport::export::{ExportOptions, Exporter, RunPager};
use runport::import::{ImportDriver, ImportOptions};
use runport::tracking::{connect, resolve_experiment, LifecycleStage, TrackingStore};

#[derive(Parser)]
#[command(
    name = "runport",
    version,
    about = "Move experiment runs between tracking stores through flat-file bundles"
)]
struct Cli {
    /// Tracking URI: file:<path>, mem:, or a bare directory path
    #[arg(
        long,
        global = true,
        env = TRACKING_URI_ENV,
        default_value = DEFAULT_TRACKING_URI
    )]
    tracking_uri: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export an experiment's runs into a bundle directory
    Export {
        /// Experiment name or id
        #[arg(long)]
        experiment: String,
        /// Bundle directory (defaults to <experiment>_export)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Skip artifact mirroring
        #[arg(long)]
        no_artifacts: bool,
        /// Runs fetched per store request
        #[arg(long, default_value_t = 1000)]
        page_size: usize,
    },
    /// Import a bundle's runs table into an experiment
    Import {
        /// Path of the runs table (CSV)
        #[arg(long)]
        table: PathBuf,
        /// Destination experiment name
        #[arg(long)]
        experiment: String,
        /// Path of the column ledger (defaults to the table's sibling
        /// <experiment>_metadata.json when present)
        #[arg(long)]
        ledger: Option<PathBuf>,
        /// Directory of mirrored artifact trees (a bundle's artifacts/)
        #[arg(long)]
        artifacts_dir: Option<PathBuf>,
        /// Skip artifact upload
        #[arg(long)]
        no_artifacts: bool,
        /// Fail instead of creating a missing destination experiment
        #[arg(long)]
        no_create: bool,
    },
    /// Soft-delete an experiment by name
    DeleteExperiment {
        /// Experiment name
        #[arg(long)]
        experiment: String,
    },
    /// Restore soft-deleted experiments by name
    RestoreExperiment {
        /// Experiment name (repeatable)
        #[arg(long = "experiment", required = true)]
        experiments: Vec<String>,
    },
    /// Delete every run in an experiment
    ClearRuns {
        /// Experiment name or id
        #[arg(long)]
        experiment: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = TrackingConfig::new(&cli.tracking_uri);
    info!(uri = config.uri(), "using tracking URI");
    let store = connect(&config)?;

    match cli.command {
        Command::Export {
            experiment,
            output_dir,
            no_artifacts,
            page_size,
        } => {
            let output_dir =
                output_dir.unwrap_or_else(|| PathBuf::from(format!("{experiment}_export")));
            let options = ExportOptions {
                include_artifacts: !no_artifacts,
                page_size,
            };
            Exporter::new(store.as_ref(), &config).export(&experiment, &output_dir, &options)?;
        }
        Command::Import {
            table,
            experiment,
            ledger,
            artifacts_dir,
            no_artifacts,
            no_create,
        } => {
            let options = ImportOptions {
                ledger_path: ledger.or_else(|| sibling_ledger(&table)),
                artifacts_dir,
                import_artifacts: !no_artifacts,
                create_experiment: !no_create,
            };
            ImportDriver::new(store.as_ref(), &config).import(&table, &experiment, &options)?;
        }
        Command::DeleteExperiment { experiment } => {
            let record = store
                .experiment_by_name(&experiment)?
                .ok_or_else(|| anyhow!("experiment '{experiment}' not found"))?;
            store.delete_experiment(record.experiment_id())?;
            info!(
                name = record.name(),
                id = record.experiment_id(),
                "experiment deleted"
            );
        }
        Command::RestoreExperiment { experiments } => {
            let all = store.list_experiments()?;
            for name in &experiments {
                let deleted = all.iter().find(|e| {
                    e.name() == name.as_str() && e.lifecycle_stage() == LifecycleStage::Deleted
                });
                match deleted {
                    Some(record) => {
                        store.restore_experiment(record.experiment_id())?;
                        info!(name = %name, id = record.experiment_id(), "experiment restored");
                    }
                    None => warn!(name = %name, "deleted experiment not found"),
                }
            }
        }
        Command::ClearRuns { experiment } => {
            let record = resolve_experiment(store.as_ref(), &experiment)?;
            let run_ids: Vec<String> = RunPager::new(store.as_ref(), record.experiment_id(), 1000)
                .map(|run| run.map(|r| r.run_id().to_string()))
                .collect::<runport::Result<_>>()?;
            for run_id in &run_ids {
                store.delete_run(run_id)?;
                info!(run_id = %run_id, "run deleted");
            }
            info!(
                runs = run_ids.len(),
                experiment = record.name(),
                "experiment cleared"
            );
        }
    }
    Ok(())
}

// "<x>_runs.csv" sits beside "<x>_metadata.json" in a bundle.
fn sibling_ledger(table: &std::path::Path) -> Option<PathBuf> {
    let file_name = table.file_name()?.to_str()?;
    let stem = file_name.strip_suffix("_runs.csv")?;
    let candidate = table.with_file_name(format!("{stem}_metadata.json"));
    candidate.is_file().then_some(candidate)
}
