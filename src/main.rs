//! pubscout - PubMed company-affiliation finder
//!
//! Searches PubMed, fetches the matching records and reports the authors
//! whose affiliations look like biotech/pharma companies.
//!
//! ## Usage
//!
//! ```bash
//! pubscout "cancer AND immunotherapy" --retmax 20 -f immuno.csv
//! pubscout "CRISPR[Title]"            # print and save pubscout_output/output.csv
//! pubscout "CRISPR[Title]" --print    # print only
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use pubscout::eutils::{EutilsClient, EutilsConfig, DEFAULT_BASE_URL, DEFAULT_RESULT_CAP};
use pubscout::export::DEFAULT_OUTPUT_DIR;
use pubscout::pipeline::{Destination, Outcome, Pipeline};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{debug, error, info, Level};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Fetch PubMed papers with biotech/pharma author affiliations
#[derive(Parser)]
#[command(name = "pubscout")]
#[command(version, about, long_about = None)]
struct Cli {
    /// PubMed query (full PubMed syntax: boolean operators, field tags)
    query: String,

    /// Maximum number of results to return (1-10000, otherwise 5)
    #[arg(long, visible_alias = "max-results", default_value_t = i64::from(DEFAULT_RESULT_CAP), allow_negative_numbers = true)]
    retmax: i64,

    /// Export only, to this CSV file name (without it, results are printed
    /// and also saved to output.csv)
    #[arg(short, long, conflicts_with = "print")]
    filename: Option<String>,

    /// Output directory for exported files
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Print results to the console without writing a file
    #[arg(short, long)]
    print: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Also append logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// E-utilities base URL
    #[arg(long, default_value = DEFAULT_BASE_URL, hide = true)]
    base_url: String,
}

impl Cli {
    /// A non-blank `--filename` exports only; otherwise records are shown
    /// and, unless `--print` was given, also saved under the default name.
    fn destination(&self) -> Destination {
        let filename = self.filename.as_deref().map(str::trim).filter(|f| !f.is_empty());

        match filename {
            _ if self.print => Destination::Console,
            Some(name) => Destination::Csv {
                output_dir: self.output_dir.clone(),
                filename: Some(name.to_string()),
            },
            None => Destination::ConsoleAndCsv {
                output_dir: self.output_dir.clone(),
            },
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.debug, cli.log_file.as_deref()) {
        eprintln!("Failed to initialise logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start runtime");
            eprintln!("An unexpected error occurred: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&cli)) {
        Ok(outcome) => {
            debug!(outcome = ?outcome, "Run finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Pipeline failed");
            debug!(error = ?e, "Pipeline failure details");
            eprintln!("An error occurred: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<Outcome> {
    if cli.debug {
        debug!("Debug mode enabled");
    }

    let config = EutilsConfig::default().with_base_url(cli.base_url.clone());
    let client = EutilsClient::new(config).context("Failed to create E-utilities client")?;
    let pipeline = Pipeline::new(client);

    let mut stdout = std::io::stdout().lock();
    let outcome = pipeline
        .run(&cli.query, cli.retmax, &cli.destination(), &mut stdout)
        .await?;

    info!(outcome = ?outcome, "pubscout finished");
    Ok(outcome)
}

// ============================================================================
// Logging
// ============================================================================

/// Install the global subscriber: stderr always, plus `log_file` when given.
///
/// `RUST_LOG` overrides the level picked from `debug`.
fn init_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let log_level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(path) = log_file {
        debug!(path = %path.display(), "File logging enabled");
    }

    Ok(())
}
