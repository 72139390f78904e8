//! Autoclave CLI
//!
//! Command-line tools for reading autoclaved measurement archives.
//!
//! # Commands
//!
//! - `record` - Extract one JSON record by its locator
//! - `report` - Stream a whole report by its window or member locators
//! - `object` - Fetch and decompress a standalone `*.json.lz4` object
//! - `inspect` - List the LZ4 frames of a local archive file

mod commands;

use autoclave_core::{ArchiveEngine, EngineConfig};
use autoclave_storage::{HttpArchive, HttpArchiveConfig, DEFAULT_BASE_URL};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Autoclaved archive tools.
#[derive(Parser)]
#[command(name = "autoclave")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the archive store
    #[arg(global = true, long, env = "AUTOCLAVED_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Timeout for buffered requests, in seconds
    #[arg(global = true, long, default_value = "60")]
    request_timeout: u64,

    /// Timeout for each network read while streaming, in seconds
    #[arg(global = true, long, default_value = "30")]
    read_timeout: u64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where to write extracted bytes.
#[derive(Args)]
struct OutputArgs {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one JSON record
    Record {
        #[command(flatten)]
        locator: commands::record::LocatorArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Stream a whole report
    Report {
        #[command(flatten)]
        window: commands::report::WindowArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Fetch a standalone compressed measurement object
    Object {
        /// Object path relative to the base URL
        file: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the frames of a local archive file
    Inspect {
        /// Path to the archive file
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn engine(cli: &Cli) -> Result<ArchiveEngine, Box<dyn std::error::Error>> {
    let fetcher = HttpArchive::new(
        HttpArchiveConfig::new(cli.base_url.clone())
            .with_request_timeout(Duration::from_secs(cli.request_timeout)),
    )?;
    let config = EngineConfig::new().read_timeout(Duration::from_secs(cli.read_timeout));
    Ok(ArchiveEngine::new(Arc::new(fetcher), config))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so extracted bytes on stdout stay clean
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Record { locator, output } => {
            let engine = engine(&cli)?;
            let mut out = commands::open_output(output.output.as_deref()).await?;
            commands::record::run(&engine, locator, &mut out).await?;
        }
        Commands::Report { window, output } => {
            let engine = engine(&cli)?;
            let mut out = commands::open_output(output.output.as_deref()).await?;
            commands::report::run(&engine, window, &mut out).await?;
        }
        Commands::Object { file, output } => {
            let engine = engine(&cli)?;
            let mut out = commands::open_output(output.output.as_deref()).await?;
            commands::object::run(&engine, file, &mut out).await?;
        }
        Commands::Inspect { path, format } => {
            commands::inspect::run(path, format)?;
        }
        Commands::Version => {
            println!("autoclave CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("default base URL: {DEFAULT_BASE_URL}");
        }
    }

    Ok(())
}
