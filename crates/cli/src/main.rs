//! `consigno` — group-buy cluster consolidation and cost
//! reconciliation CLI.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use consigno_engine::consolidate;
use consigno_io::{read_sheet, write_sheet, ClusterStore, IoError};
use consigno_sources::{RetryError, SourceError};

mod config;
mod exit_codes;
mod run;

use config::Config;
use exit_codes::{EXIT_CONFIG, EXIT_FETCH_FORMAT, EXIT_FETCH_UPSTREAM, EXIT_IO, EXIT_PARSE,
    EXIT_SUCCESS, EXIT_UNKNOWN_GROUP};

#[derive(Parser)]
#[command(name = "consigno")]
#[command(about = "Group-buy package cluster consolidation and cost reconciliation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full reconciliation batch: ingest trackings, consolidate
    /// clusters, fetch costs per group, attribute them, save
    #[command(after_help = "\
Examples:
  consigno run --config consigno.toml --trackings new-trackings.csv
  consigno run --config consigno.toml --group usa --group oaks
  consigno run --config consigno.toml --skip-fetch --export sheet.csv")]
    Run {
        /// Path to the TOML config file
        #[arg(long, env = "CONSIGNO_CONFIG")]
        config: PathBuf,

        /// CSV of newly observed trackings to ingest
        #[arg(long)]
        trackings: Option<PathBuf>,

        /// Write the resulting cluster sheet here after the run
        #[arg(long)]
        export: Option<PathBuf>,

        /// Fetch costs only for these groups (default: all configured)
        #[arg(long = "group")]
        groups: Vec<String>,

        /// Consolidate and save without touching any cost source
        #[arg(long)]
        skip_fetch: bool,
    },

    /// Re-run cluster consolidation over the stored snapshot
    Merge {
        #[arg(long, env = "CONSIGNO_CONFIG")]
        config: PathBuf,
    },

    /// Export the stored clusters as a CSV sheet
    Export {
        #[arg(long, env = "CONSIGNO_CONFIG")]
        config: PathBuf,

        /// Output file (default: stdout)
        output: Option<PathBuf>,
    },

    /// Import a hand-edited CSV sheet, replacing the stored snapshot
    Import {
        #[arg(long, env = "CONSIGNO_CONFIG")]
        config: PathBuf,

        /// Sheet to import
        input: PathBuf,
    },

    /// Configuration tools
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Parse the config, resolve credentials, report what it defines
    Validate {
        #[arg(long, env = "CONSIGNO_CONFIG")]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, trackings, export, groups, skip_fetch } => {
            run::cmd_run(config, trackings, export, groups, skip_fetch)
        }
        Commands::Merge { config } => cmd_merge(config),
        Commands::Export { config, output } => cmd_export(config, output),
        Commands::Import { config, input } => cmd_import(config, input),
        Commands::Config { command } => match command {
            ConfigCommands::Validate { config } => cmd_config_validate(config),
        },
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn cmd_merge(config: PathBuf) -> Result<(), CliError> {
    let cfg = Config::load(&config)?;
    let store = ClusterStore::new(&cfg.store_path);
    let clusters = store.load().map_err(CliError::from_io)?;
    let before = clusters.len();

    let clusters = consolidate(clusters);
    store.save(&clusters).map_err(CliError::from_io)?;
    eprintln!("{} clusters consolidated into {}", before, clusters.len());
    Ok(())
}

fn cmd_export(config: PathBuf, output: Option<PathBuf>) -> Result<(), CliError> {
    let cfg = Config::load(&config)?;
    let clusters = ClusterStore::new(&cfg.store_path)
        .load()
        .map_err(CliError::from_io)?;

    let writer: Box<dyn Write> = match &output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| CliError::io(format!("cannot create {}: {e}", path.display())))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };
    write_sheet(writer, &clusters).map_err(CliError::from_io)?;

    let label = output
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());
    eprintln!("exported {} clusters to {}", clusters.len(), label);
    Ok(())
}

fn cmd_import(config: PathBuf, input: PathBuf) -> Result<(), CliError> {
    let cfg = Config::load(&config)?;
    let file = File::open(&input)
        .map_err(|e| CliError::io(format!("cannot open {}: {e}", input.display())))?;
    let clusters = read_sheet(file).map_err(CliError::from_io)?;

    ClusterStore::new(&cfg.store_path)
        .save(&clusters)
        .map_err(CliError::from_io)?;
    eprintln!(
        "imported {} clusters into {}",
        clusters.len(),
        cfg.store_path.display()
    );
    Ok(())
}

fn cmd_config_validate(config: PathBuf) -> Result<(), CliError> {
    let cfg = Config::load(&config)?;
    println!("store:    {}", cfg.store_path.display());
    println!("reports:  {}", cfg.csv_folder.display());
    println!("archives: {}", cfg.archive_dir.display());
    for (name, source) in &cfg.sources {
        println!("group {name}: {:?}", source.kind());
    }
    println!("config ok ({} groups)", cfg.sources.len());
    Ok(())
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    pub fn from_io(err: IoError) -> Self {
        let code = match err {
            IoError::Io(_) => EXIT_IO,
            IoError::Json(_) | IoError::Csv(_) => EXIT_PARSE,
        };
        Self { code, message: err.to_string(), hint: None }
    }

    /// Map an exhausted fetch/upload to the exit code its final
    /// failure deserves.
    pub fn fetch(err: RetryError) -> Self {
        let (code, hint) = match &err.last {
            SourceError::Upstream(_) => (
                EXIT_FETCH_UPSTREAM,
                Some("upstream kept failing; rerun later or drop the report into the CSV folder".to_string()),
            ),
            SourceError::Format(_) => (EXIT_FETCH_FORMAT, None),
            SourceError::UnknownGroup(_) => (
                EXIT_UNKNOWN_GROUP,
                Some("add a [groups.<name>] section to the config".to_string()),
            ),
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
