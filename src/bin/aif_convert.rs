//! aif_convert command line
//!
//! Converts annotation files between Callisto/AIF, APF and SGML, extracts
//! chains, scores a response against a key and aligns token files.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `AIF_*`: conversion parameters, see `ConvertConfig::from_env`
//! - `RUST_LOG`: Log level filter (default: aif_convert=info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: pretty)
//!
//! ## Usage
//!
//! ```bash
//! aif_convert apf2aif doc.apf doc.source
//! aif_convert aif2sgml corpus/*.aif.xml
//! LOG_FORMAT=json aif_convert score key.aif.xml response.aif.xml
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aif_convert::{
    diff_align, files, AlignMethod, AlignOptions, BatchOp, BatchRunner, ConvertConfig,
    ConvertError, Result,
};

#[derive(Parser)]
#[command(name = "aif_convert")]
#[command(about = "Convert coreference annotation between Callisto/AIF, APF and SGML")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// APF + source to Callisto/AIF (default output: <apf>.aif.xml)
    Apf2aif {
        /// APF file
        apf: PathBuf,
        /// Source text file
        source: PathBuf,
        /// Output file
        out: Option<PathBuf>,
    },

    /// Callisto/AIF to <in>.apf and <in>.source
    Aif2apf {
        /// Callisto files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Callisto/AIF to <in>.coref or <in>.name
    Aif2sgml {
        /// Callisto files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Print the chains of a Callisto file as JSON
    Chains {
        /// Callisto file
        input: PathBuf,
    },

    /// B-cubed score of a response against a key
    Score {
        /// Key Callisto file
        key: PathBuf,
        /// Response Callisto file
        response: PathBuf,
    },

    /// Map whitespace tokens of one file onto another, as JSON
    Align {
        /// Tokens to map from
        from: PathBuf,
        /// Tokens to map onto
        to: PathBuf,
        /// Use the longest-matching-block matcher instead of Myers
        #[arg(long)]
        matcher: bool,
        /// Pair substituted tokens as well as equal ones
        #[arg(long)]
        map_differences: bool,
    },
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "aif_convert=info".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ConvertError::BadFormat(format!("cannot encode output as json: {e}")))
}

fn read_tokens(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| ConvertError::from(e).in_file(path))?;
    Ok(text.split_whitespace().map(str::to_string).collect())
}

fn run_batch(inputs: &[PathBuf], op: BatchOp, config: ConvertConfig) -> Result<bool> {
    let report = BatchRunner::new(config).run(inputs, op);
    println!("{}", to_json(&report)?);
    Ok(report.failed() == 0)
}

fn run(command: Command, config: ConvertConfig) -> Result<bool> {
    match command {
        Command::Apf2aif { apf, source, out } => {
            let written = files::apf_to_callisto_file(&apf, &source, out.as_deref(), &config)?;
            println!("{}", written.display());
        }
        Command::Aif2apf { inputs } => return run_batch(&inputs, BatchOp::CallistoToApf, config),
        Command::Aif2sgml { inputs } => return run_batch(&inputs, BatchOp::CallistoToSgml, config),
        Command::Chains { input } => {
            let chains = files::callisto_file_to_chain_lists(&input, config.include_metadata)?;
            println!("{}", to_json(&chains)?);
        }
        Command::Score { key, response } => {
            let score = files::score_files(&key, &response)?;
            println!(
                "precision={:.4} recall={:.4} f1={:.4}",
                score.precision,
                score.recall,
                score.f1()
            );
        }
        Command::Align { from, to, matcher, map_differences } => {
            let options = AlignOptions {
                method: if matcher { AlignMethod::Matcher } else { AlignMethod::Myers },
                map_differences,
            };
            let mapping = diff_align(&read_tokens(&from)?, &read_tokens(&to)?, options)?;
            println!("{}", to_json(&mapping)?);
        }
    }
    Ok(true)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let config = ConvertConfig::from_env();
    info!(config_hash = %config.params_hash(), language = %config.language, "starting");

    match run(cli.command, config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(kind = %e.kind(), error = %e, "conversion failed");
            ExitCode::FAILURE
        }
    }
}
