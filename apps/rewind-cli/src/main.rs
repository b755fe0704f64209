use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rewind_common::{Map, Value};
use rewind_dispatch::{Action, InputFormat, dispatch, normalize};
use rewind_store::{CheckpointStore, ExportFormat, Snapshot, StoreConfig, StoreError};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod config;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "rewind", about = "Checkpoint, roll back and export structured state")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (JSON, or YAML by extension)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Checkpoint a series of actions, then roll back through them
    Demo {
        /// Retained checkpoints
        #[arg(short, long, default_value = "3")]
        capacity: usize,
        /// Number of actions to checkpoint
        #[arg(short, long, default_value = "5")]
        steps: usize,
    },
    /// Dispatch each line of a file and checkpoint the outcome
    Run {
        /// Input file; one JSON, YAML or text record per line
        input: PathBuf,
        /// Export every retained checkpoint into this directory
        #[arg(long)]
        export_dir: Option<PathBuf>,
        /// Export as CBOR+zstd instead of JSON
        #[arg(long)]
        compact: bool,
        /// Restore the N-th newest checkpoint after the run
        #[arg(long)]
        rollback: Option<usize>,
    },
    /// Import exported checkpoints and report on them
    Inspect {
        /// Exported checkpoint files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    let filter = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("rewind v{}", env!("CARGO_PKG_VERSION"));
            println!("store: {}", rewind_store::crate_info());
            println!("dispatch: {}", rewind_dispatch::crate_info());
            println!(
                "config: enabled={} max_history={} auto_cleanup={}",
                config.rollback.enabled, config.rollback.max_history, config.rollback.auto_cleanup
            );
        }
        Commands::Demo { capacity, steps } => {
            let store = CheckpointStore::new(StoreConfig {
                max_history: capacity,
                ..config.rollback
            });
            run_demo(&store, steps)?;
        }
        Commands::Run {
            input,
            export_dir,
            compact,
            rollback,
        } => {
            let store = CheckpointStore::new(config.rollback);
            run_file(&store, &input)?;
            if let Some(n) = rollback {
                let restored = store
                    .rollback()
                    .restore_n_back(n)
                    .with_context(|| format!("rolling back {n} checkpoints"))?;
                println!("Restored #{n}: {}", render(&restored));
            }
            if let Some(dir) = export_dir {
                let format = if compact {
                    ExportFormat::CborZstd
                } else {
                    ExportFormat::Json
                };
                export_all(&store, &dir, format)?;
            }
            println!("{}", store.stats());
            println!("{}", store.validate());
        }
        Commands::Inspect { files } => {
            let store = CheckpointStore::new(StoreConfig::unbounded());
            for path in &files {
                if let Err(e) = store.import_from_file(path) {
                    warn!(path = %path.display(), error = %e, "skipping checkpoint file");
                }
            }
            for snapshot in store.history() {
                print_snapshot(&snapshot);
            }
            println!("{}", store.stats());
            println!("{}", store.validate());
        }
    }

    Ok(())
}

/// Status record handed to action handlers.
fn controller_status(executed: usize) -> Value {
    [
        ("name", Value::from("rewind-cli")),
        ("version", Value::from(env!("CARGO_PKG_VERSION"))),
        ("current_status", Value::from("idle")),
        ("execution_count", Value::from(executed)),
    ]
    .into_iter()
    .collect()
}

/// Dispatch one normalized record and checkpoint the input/response pair.
fn execute(
    store: &CheckpointStore,
    record: Value,
    format: InputFormat,
    executed: usize,
) -> Result<Option<String>> {
    let action = match Action::from_record(&record) {
        Ok(action) => action,
        Err(e) => {
            warn!(error = %e, "skipping record");
            return Ok(None);
        }
    };
    let response = dispatch(&action, &controller_status(executed));
    let state: Value = [("input", record), ("response", response)]
        .into_iter()
        .collect();

    let mut metadata = Map::new();
    metadata.insert("action".into(), Value::from(action.type_tag()));
    metadata.insert("format".into(), Value::from(format!("{format:?}").to_lowercase()));

    match store.checkpoint(action.type_tag(), &state, Some(&metadata)) {
        Ok(id) => Ok(Some(id)),
        Err(StoreError::Disabled) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn run_demo(store: &CheckpointStore, steps: usize) -> Result<()> {
    println!("Checkpointing {steps} actions (capacity {:?})", store.config().capacity());
    for step in 0..steps {
        let line = match step % 3 {
            0 => format!(r#"{{"type": "sample", "data": "step {step}"}}"#),
            1 => "type: test".to_owned(),
            _ => format!("free text {step}"),
        };
        let normalized = normalize(&line);
        if let Some(id) = execute(store, normalized.record, normalized.format, step)? {
            println!("  {id}");
        }
    }

    println!("History (newest first):");
    for snapshot in store.history() {
        print_snapshot(&snapshot);
    }

    let engine = store.rollback();
    match engine.restore_latest() {
        Ok(state) => println!("Latest: {}", render(&state)),
        Err(e) => println!("Latest: {e}"),
    }
    let oldest = store.len();
    if oldest > 0 {
        let state = engine.restore_n_back(oldest)?;
        println!("Oldest (#{oldest}): {}", render(&state));
    }
    if let Err(e) = engine.restore_n_back(oldest + 1) {
        println!("Beyond history: {e}");
    }

    println!("{}", store.stats());
    println!("{}", store.validate());
    Ok(())
}

fn run_file(store: &CheckpointStore, input: &Path) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading input {}", input.display()))?;
    let mut executed = 0;
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let normalized = normalize(line);
        if let Some(id) = execute(store, normalized.record, normalized.format, executed)? {
            println!("{id}");
        }
        executed += 1;
    }
    Ok(())
}

fn export_all(store: &CheckpointStore, dir: &Path, format: ExportFormat) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for snapshot in store.history() {
        let path = dir.join(format!("{}.{}", snapshot.id(), format.extension()));
        match store.export_to_file(snapshot.id(), &path) {
            Ok(()) => println!("Exported {}", path.display()),
            Err(e) => warn!(id = snapshot.id(), error = %e, "export failed"),
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    let fingerprint = snapshot
        .fingerprint()
        .map(|f| f[..12].to_owned())
        .unwrap_or_else(|_| "unserializable".to_owned());
    println!(
        "  [{}] {} {:?} fp={} {}",
        snapshot.id(),
        snapshot.created_at().format("%H:%M:%S%.3f"),
        snapshot.description(),
        fingerprint,
        render(snapshot.payload())
    );
}

fn render(value: &Value) -> String {
    value
        .to_json()
        .map(|json| json.to_string())
        .unwrap_or_else(|_| format!("{value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["rewind", "run", "--verbose", "--config", "c.yaml", "in.txt"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("c.yaml")));
        assert!(matches!(cli.command, Commands::Run { .. }));
    }

    #[test]
    fn global_flags_before_subcommand() {
        let cli = Cli::try_parse_from(["rewind", "-v", "info"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Info));
    }
}
