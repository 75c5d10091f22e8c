//! File-level conversions with default output names.
//!
//! Outputs are rendered in memory first and only then written. Writes go
//! through [`OutputGuard`], which deletes the file again unless the whole
//! operation succeeded, so a failure never leaves a truncated output
//! behind. Every error is tagged with the file it concerns.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::chain::ChainList;
use crate::config::ConvertConfig;
use crate::convert;
use crate::error::{ConvertError, Result};
use crate::score::BCubed;
use crate::sgml::Transliterate;

/// An output file that is removed on drop unless committed.
#[derive(Debug)]
pub struct OutputGuard {
    path: PathBuf,
    committed: bool,
}

impl OutputGuard {
    /// Write `contents` to `path`.
    ///
    /// If the write itself fails, whatever was created is removed before
    /// the error is returned.
    pub fn write(path: impl Into<PathBuf>, contents: &str) -> Result<Self> {
        let guard = Self {
            path: path.into(),
            committed: false,
        };
        fs::write(&guard.path, contents).map_err(|e| ConvertError::from(e).in_file(&guard.path))?;
        Ok(guard)
    }

    /// The file this guard owns.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file.
    pub fn commit(mut self) -> PathBuf {
        self.committed = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if !self.committed && self.path.exists() {
            debug!(path = %self.path.display(), "removing partial output");
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| ConvertError::from(e).in_file(path))
}

/// `path` with `suffix` appended to the full file name.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Convert an APF file to Callisto/AIF.
///
/// Writes `out`, or `<apf>.aif.xml` when not given, and returns the path.
pub fn apf_to_callisto_file(
    apf: &Path,
    source: &Path,
    out: Option<&Path>,
    config: &ConvertConfig,
) -> Result<PathBuf> {
    let apf_text = read(apf)?;
    let source_text = read(source)?;
    let xml = convert::apf_to_callisto(&apf_text, &source_text, config.munge_primary_mentions)
        .map_err(|e| e.in_file(apf))?;

    let out = out.map_or_else(|| with_suffix(apf, ".aif.xml"), Path::to_path_buf);
    let written = OutputGuard::write(out, &xml)?.commit();
    info!(input = %apf.display(), output = %written.display(), "wrote callisto");
    Ok(written)
}

/// Convert a Callisto/AIF file to an APF file and a source file.
///
/// Defaults are `<in>.apf` and `<in>.source`. The APF `URI` names the
/// input file. Neither output is kept unless both were written.
pub fn callisto_to_apf_file(
    callisto: &Path,
    out_apf: Option<&Path>,
    out_source: Option<&Path>,
) -> Result<(PathBuf, PathBuf)> {
    let xml = read(callisto)?;
    let name = callisto.to_string_lossy();
    let output = convert::callisto_to_apf_named(&xml, &name).map_err(|e| e.in_file(callisto))?;

    let apf_path = out_apf.map_or_else(|| with_suffix(callisto, ".apf"), Path::to_path_buf);
    let source_path = out_source.map_or_else(|| with_suffix(callisto, ".source"), Path::to_path_buf);

    let apf_guard = OutputGuard::write(apf_path, &output.apf)?;
    let source_guard = OutputGuard::write(source_path, &output.source)?;
    let written = (apf_guard.commit(), source_guard.commit());
    info!(input = %callisto.display(), apf = %written.0.display(), "wrote apf");
    Ok(written)
}

/// Render a Callisto/AIF file as SGML.
///
/// Writes `out`, or `<in>.coref` / `<in>.name` by annotation kind.
pub fn callisto_to_sgml_file(
    callisto: &Path,
    out: Option<&Path>,
    config: &ConvertConfig,
    transliterator: Option<&dyn Transliterate>,
) -> Result<PathBuf> {
    let xml = read(callisto)?;
    let document = convert::callisto_to_sgml(&xml, &config.sgml_options(), transliterator)
        .map_err(|e| e.in_file(callisto))?;

    let out = out.map_or_else(
        || with_suffix(callisto, &format!(".{}", document.kind.extension())),
        Path::to_path_buf,
    );
    let written = OutputGuard::write(out, &document.text)?.commit();
    info!(
        input = %callisto.display(),
        output = %written.display(),
        relocated = document.relocated,
        "wrote sgml"
    );
    Ok(written)
}

/// Chains of a Callisto/AIF file.
pub fn callisto_file_to_chain_lists(callisto: &Path, include_metadata: bool) -> Result<ChainList> {
    let xml = read(callisto)?;
    convert::callisto_to_chain_lists(&xml, include_metadata).map_err(|e| e.in_file(callisto))
}

/// B-cubed score of `response` against `key`.
pub fn score_files(key: &Path, response: &Path) -> Result<BCubed> {
    let key_xml = read(key)?;
    let response_xml = read(response)?;
    convert::score(&key_xml, &response_xml).map_err(|e| e.in_file(response))
}
