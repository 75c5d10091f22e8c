//! Corpus-level driver.
//!
//! Applies one conversion to many Callisto files. A failing document is
//! logged and recorded in the report; the rest of the batch still runs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::canonical::{chain_list_fingerprint, Fingerprinter};
use crate::config::ConvertConfig;
use crate::error::{ConvertError, ErrorKind, Result};
use crate::files;

/// Conversion applied to every input of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOp {
    /// Callisto to `<in>.apf` + `<in>.source`.
    CallistoToApf,
    /// Callisto to `<in>.coref` or `<in>.name`.
    CallistoToSgml,
    /// Chain extraction only; nothing is written.
    ChainLists,
}

/// What one successful conversion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Produced {
    outputs: Vec<PathBuf>,
    fingerprint: String,
}

fn fingerprint_files(paths: &[PathBuf]) -> Result<String> {
    let mut fp = Fingerprinter::new();
    fp.number(paths.len());
    for path in paths {
        let text = fs::read_to_string(path).map_err(|e| ConvertError::from(e).in_file(path))?;
        fp.text(&text);
    }
    Ok(fp.finish())
}

impl BatchOp {
    fn apply(self, input: &Path, config: &ConvertConfig) -> Result<Produced> {
        let outputs = match self {
            Self::CallistoToApf => {
                let (apf, source) = files::callisto_to_apf_file(input, None, None)?;
                vec![apf, source]
            }
            Self::CallistoToSgml => vec![files::callisto_to_sgml_file(input, None, config, None)?],
            Self::ChainLists => {
                let chains = files::callisto_file_to_chain_lists(input, config.include_metadata)?;
                return Ok(Produced {
                    outputs: Vec::new(),
                    fingerprint: chain_list_fingerprint(&chains),
                });
            }
        };
        let fingerprint = fingerprint_files(&outputs)?;
        Ok(Produced { outputs, fingerprint })
    }
}

/// Result for one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// The input file.
    pub input: PathBuf,
    /// Files written for it.
    #[serde(default)]
    pub outputs: Vec<PathBuf>,
    /// Fingerprint of what was produced; absent on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Error class on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchOutcome {
    /// True if the conversion succeeded.
    pub fn is_ok(&self) -> bool {
        self.error_kind.is_none()
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// The conversion applied.
    pub op: BatchOp,
    /// Hash of the configuration used.
    pub config_hash: String,
    /// When the batch finished.
    pub computed_at: DateTime<Utc>,
    /// One outcome per input, in input order.
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchReport {
    /// Number of inputs converted.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    /// Number of inputs that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Runs one conversion over many inputs.
#[derive(Debug, Clone, Default)]
pub struct BatchRunner {
    config: ConvertConfig,
}

impl BatchRunner {
    /// Create a runner using `config`.
    pub fn new(config: ConvertConfig) -> Self {
        Self { config }
    }

    /// Get the configuration being used.
    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Convert every input, isolating failures.
    pub fn run<P: AsRef<Path>>(&self, inputs: &[P], op: BatchOp) -> BatchReport {
        let mut outcomes = Vec::with_capacity(inputs.len());
        for input in inputs {
            let input = input.as_ref();
            let outcome = match op.apply(input, &self.config) {
                Ok(produced) => BatchOutcome {
                    input: input.to_path_buf(),
                    outputs: produced.outputs,
                    fingerprint: Some(produced.fingerprint),
                    error_kind: None,
                    error: None,
                },
                Err(e) => {
                    warn!(input = %input.display(), kind = %e.kind(), error = %e, "conversion failed");
                    BatchOutcome {
                        input: input.to_path_buf(),
                        outputs: Vec::new(),
                        fingerprint: None,
                        error_kind: Some(e.kind()),
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let report = BatchReport {
            op,
            config_hash: self.config.params_hash(),
            computed_at: Utc::now(),
            outcomes,
        };
        info!(
            op = ?op,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch finished"
        );
        report
    }
}
