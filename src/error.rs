//! Error types shared by every conversion stage.
//!
//! Each variant carries enough context (ids, offsets, text) to diagnose a
//! failure from the message alone. Nothing here is retried; callers that
//! process many documents isolate failures per document (see [`crate::batch`]).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Flat classification of a [`ConvertError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input could not be parsed as XML.
    MalformedXml,
    /// Well-formed XML that violates the expected schema.
    InvalidFormat,
    /// The document carries no name or coreference annotation.
    NoAnnotationFound,
    /// The document carries both name and coreference annotation.
    MixedAnnotationKinds,
    /// Two coreference spans partially overlap.
    CrossBracketing,
    /// Entity type resolution failed or a chain has an unexpected shape.
    BadFormat,
    /// Tag markers could not be moved to token boundaries.
    DesubtokenizationFailed,
    /// Two documents expected to share a source text do not.
    SourceMismatch,
    /// A mention belongs to two chains of the same chain set.
    SharedMention,
    /// Reading or writing a file failed.
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MalformedXml => "malformed_xml",
            Self::InvalidFormat => "invalid_format",
            Self::NoAnnotationFound => "no_annotation_found",
            Self::MixedAnnotationKinds => "mixed_annotation_kinds",
            Self::CrossBracketing => "cross_bracketing",
            Self::BadFormat => "bad_format",
            Self::DesubtokenizationFailed => "desubtokenization_failed",
            Self::SourceMismatch => "source_mismatch",
            Self::SharedMention => "shared_mention",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

/// A span that took part in a cross-bracketing violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketSide {
    /// Entity id of the chain the span belongs to.
    pub entity_id: String,
    /// Span start (inclusive).
    pub start: usize,
    /// Span end (exclusive).
    pub end: usize,
    /// Source text covered by the span.
    pub text: String,
}

impl std::fmt::Display for BracketSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}, {}) {:?}", self.entity_id, self.start, self.end, self.text)
    }
}

/// Errors raised while reading, validating, converting or scoring annotations.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Unparsable XML input.
    #[error("malformed xml at byte {position}: {message}")]
    MalformedXml {
        /// Byte position reported by the parser.
        position: u64,
        /// Parser message.
        message: String,
    },

    /// Well-formed input that violates the expected schema.
    #[error("invalid {format} document: {reason}")]
    InvalidFormat {
        /// Which format was being read ("apf", "callisto", ...).
        format: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// Neither name nor coreference annotation present.
    #[error("no annotation found")]
    NoAnnotationFound,

    /// Both name and coreference annotation present.
    #[error("document has both name and coreference annotation ({names} names, {chains} chains)")]
    MixedAnnotationKinds {
        /// Number of name annotations.
        names: usize,
        /// Number of coreference chains.
        chains: usize,
    },

    /// Partially overlapping coreference spans.
    #[error("cross bracketing between {first} and {second}")]
    CrossBracketing {
        /// The span that starts first.
        first: BracketSide,
        /// The span that starts inside `first` and ends after it.
        second: BracketSide,
    },

    /// Type resolution failure or unexpected chain shape.
    #[error("bad data: {0}")]
    BadFormat(String),

    /// The desubtokenizer could not realign the tags.
    #[error("desubtokenization failed: {0}")]
    DesubtokenizationFailed(String),

    /// Key and response were annotated over different source texts.
    #[error("files have different sources (sha256 {key_digest} vs {response_digest})")]
    SourceMismatch {
        /// Digest of the key source text.
        key_digest: String,
        /// Digest of the response source text.
        response_digest: String,
    },

    /// A mention occurs in two chains of one chain set.
    #[error("mention [{start}, {end}) appears in chains {first_chain} and {second_chain} of the {set} set")]
    SharedMention {
        /// "key" or "response".
        set: &'static str,
        /// Mention start.
        start: usize,
        /// Mention end.
        end: usize,
        /// Index of the first chain containing it.
        first_chain: usize,
        /// Index of the second chain containing it.
        second_chain: usize,
    },

    /// File system failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Any error, annotated with the file it came from.
    #[error("{}: {source}", path.display())]
    InFile {
        /// The offending file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: Box<ConvertError>,
    },
}

impl ConvertError {
    /// Classify this error, looking through [`ConvertError::InFile`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedXml { .. } => ErrorKind::MalformedXml,
            Self::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            Self::NoAnnotationFound => ErrorKind::NoAnnotationFound,
            Self::MixedAnnotationKinds { .. } => ErrorKind::MixedAnnotationKinds,
            Self::CrossBracketing { .. } => ErrorKind::CrossBracketing,
            Self::BadFormat(_) => ErrorKind::BadFormat,
            Self::DesubtokenizationFailed(_) => ErrorKind::DesubtokenizationFailed,
            Self::SourceMismatch { .. } => ErrorKind::SourceMismatch,
            Self::SharedMention { .. } => ErrorKind::SharedMention,
            Self::Io(_) => ErrorKind::Io,
            Self::InFile { source, .. } => source.kind(),
        }
    }

    /// Attach the file name this error was raised for.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            already @ Self::InFile { .. } => already,
            other => Self::InFile {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    pub(crate) fn apf(reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            format: "apf",
            reason: reason.into(),
        }
    }

    pub(crate) fn callisto(reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            format: "callisto",
            reason: reason.into(),
        }
    }
}
