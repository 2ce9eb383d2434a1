//! Pose safety checks from the command line.
//!
//! Reads keypoints produced by an external pose detector and prints a JSON
//! safety report. Configuration is layered: built-in defaults, then an
//! optional TOML file (`--config`), then `POSE_SAFETY_*` environment variables.
//!
//! # Commands
//!
//! - `pose-check analyze [FILE]` - analyze keypoints JSON (stdin when omitted)
//! - `pose-check validate FILE` - run the upload gate on an image file
//! - `pose-check config` - print the effective configuration as TOML
//!
//! Logs go to stderr; filter with `--log-level` or `RUST_LOG`.

mod analyze;
mod validate;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pose_safety::{SafetyConfig, SafetyEngine};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Joint-angle safety checks for detected poses
#[derive(Parser)]
#[command(name = "pose-check")]
#[command(about = "Joint-angle safety checks for detected poses", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file layered over the defaults
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter (e.g. "debug", "pose_safety=trace"); overrides RUST_LOG
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze detector keypoints and print a safety report
    Analyze {
        /// Keypoints JSON (array of keypoints, or null for "no pose"); stdin when omitted
        #[arg(name = "FILE")]
        input: Option<PathBuf>,

        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Check an upload against the size and type limits
    Validate {
        /// Image file to check
        #[arg(name = "FILE")]
        file: PathBuf,

        /// Declared size in bytes (defaults to the file's size on disk)
        #[arg(long)]
        size: Option<u64>,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { input, compact } => {
            let engine = build_engine(&config)?;
            analyze::run(&engine, input.as_deref(), compact)
        }
        Commands::Validate { file, size } => {
            let engine = build_engine(&config)?;
            validate::run(&engine, &file, size)
        }
        Commands::Config => {
            build_engine(&config)?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter '{directives}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SafetyConfig> {
    let mut config = match path {
        Some(path) => SafetyConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => SafetyConfig::default(),
    };
    config
        .apply_env(std::env::vars())
        .context("invalid configuration override in environment")?;
    Ok(config)
}

fn build_engine(config: &SafetyConfig) -> Result<SafetyEngine> {
    let engine = config.build().context("invalid safety configuration")?;
    info!(joints = engine.joints().len(), "Configuration validated");
    Ok(engine)
}
