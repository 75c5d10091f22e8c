//! Run parameters for the file API and the binary.
//!
//! The conversion functions themselves take plain arguments; this struct
//! only collects them so a batch can record exactly what it ran with.
//!
//! ## Environment
//!
//! [`ConvertConfig::from_env`] overlays these variables on the defaults:
//!
//! - `AIF_MUNGE_PRIMARY`: make the earliest mention primary (default: false)
//! - `AIF_INCLUDE_METADATA`: attach entity id/type to chains (default: true)
//! - `AIF_OFFSET_NOTATIONS`: write `S_OFF`/`E_OFF` on moved tags (default: true)
//! - `AIF_DELETE_INTERRUPTED`: drop tags inside tokens (default: false)
//! - `AIF_WRAP_DOC`: wrap SGML output in `<DOC>` (default: true)
//! - `AIF_LANGUAGE`: language code of the corpus (default: unknown)

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::canonical::Fingerprinter;
use crate::desubtokenize::DesubtokenizeOptions;
use crate::sgml::SgmlOptions;

/// Language recorded when none is configured.
pub const DEFAULT_LANGUAGE: &str = "unknown";

/// Conversion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Reorder APF entities so the earliest mention is primary.
    pub munge_primary_mentions: bool,
    /// Resolve entity id and type for extracted chains.
    pub include_metadata: bool,
    /// Annotate moved SGML tags with their offsets.
    pub add_offset_notations: bool,
    /// Delete SGML tags that interrupt a token instead of moving them.
    pub delete_interrupted: bool,
    /// Wrap SGML output in a `<DOC DOCNO="...">` element.
    pub wrap_doc: bool,
    /// Corpus language, e.g. `en`, `ar`, `ch`.
    pub language: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            munge_primary_mentions: false,
            include_metadata: true,
            add_offset_notations: true,
            delete_interrupted: false,
            wrap_doc: true,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Parse a boolean environment value. Unrecognised values are `None`.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ConvertConfig {
    /// Defaults overlaid with the `AIF_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    ///
    /// A flag that cannot be parsed keeps its default and logs a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let flags: [(&str, &mut bool); 5] = [
            ("AIF_MUNGE_PRIMARY", &mut config.munge_primary_mentions),
            ("AIF_INCLUDE_METADATA", &mut config.include_metadata),
            ("AIF_OFFSET_NOTATIONS", &mut config.add_offset_notations),
            ("AIF_DELETE_INTERRUPTED", &mut config.delete_interrupted),
            ("AIF_WRAP_DOC", &mut config.wrap_doc),
        ];
        for (key, slot) in flags {
            let Some(raw) = lookup(key) else { continue };
            match parse_flag(&raw) {
                Some(value) => *slot = value,
                None => warn!(key, value = %raw, "ignoring unparsable flag"),
            }
        }
        if let Some(language) = lookup("AIF_LANGUAGE").filter(|l| !l.trim().is_empty()) {
            config.language = language.trim().to_string();
        }
        config
    }

    /// Desubtokenizer settings.
    pub fn desubtokenize_options(&self) -> DesubtokenizeOptions {
        DesubtokenizeOptions {
            add_offset_notations: self.add_offset_notations,
            delete_interrupted: self.delete_interrupted,
        }
    }

    /// SGML emitter settings.
    pub fn sgml_options(&self) -> SgmlOptions {
        SgmlOptions {
            desubtokenize: self.desubtokenize_options(),
            wrap_doc: self.wrap_doc,
        }
    }

    /// Stable hash of every parameter, for batch reports.
    pub fn params_hash(&self) -> String {
        Fingerprinter::new()
            .flag(self.munge_primary_mentions)
            .flag(self.include_metadata)
            .flag(self.add_offset_notations)
            .flag(self.delete_interrupted)
            .flag(self.wrap_doc)
            .text(&self.language)
            .finish()
    }
}
