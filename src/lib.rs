//! # aif-convert
//!
//! Offset-exact conversion of coreference and name annotations between
//! Callisto/AIF XML, APF XML and inline-tagged SGML.
//!
//! Every format is read into one in-memory span graph over the decoded
//! source text, and every writer renders from that graph, so character
//! offsets survive any chain of conversions.
//!
//! ## Core Contract
//!
//! 1. Offsets are half-open character (not byte) indices into the source
//! 2. APF `END` is inclusive; the conversion adds or subtracts exactly one
//! 3. Conversions are pure: one input in memory, one output rendered
//!
//! ## Architecture
//!
//! ```text
//! APF + source ──► apf::read_apf ──┐
//!                                  ├──► SpanGraph ──► chain::extract_chains ──► apf::write_apf
//! Callisto XML ──► read_callisto ──┘        │                   │
//!                                           │                   └──► score::b_cubed
//!                                           ├──► callisto::write_callisto
//!                                           └──► flat_markup ──► desubtokenize ──► SGML
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Graph elements are stored and written in id order
//! - Chains are ordered by primary mention id
//! - Fingerprints hash tagged field sequences in that order (see [`canonical`])

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod align;
pub mod apf;
pub mod batch;
pub mod callisto;
pub mod canonical;
pub mod chain;
pub mod config;
pub mod convert;
pub mod desubtokenize;
pub mod error;
pub mod files;
pub mod score;
pub mod sgml;
pub mod types;
pub mod xml;

// Re-exports
pub use align::{diff_align, AlignMethod, AlignOptions};
pub use apf::{read_apf, write_apf, ApfDocument};
pub use batch::{BatchOp, BatchOutcome, BatchReport, BatchRunner};
pub use callisto::{flat_markup, read_callisto, strip_sgml_tags, write_callisto, Markup, MarkupKind};
pub use canonical::{chain_list_fingerprint, graph_fingerprint, text_fingerprint, Fingerprinter};
pub use chain::{chain_list, extract_chains, Chain, ChainHead, ChainList, ChainMention};
pub use config::ConvertConfig;
pub use convert::{
    apf_to_callisto, callisto_to_apf, callisto_to_apf_named, callisto_to_chain_lists,
    callisto_to_sgml, score, ApfOutput,
};
pub use desubtokenize::{desubtokenize, DesubtokenizeOptions, Desubtokenized};
pub use error::{ConvertError, ErrorKind, Result};
pub use score::{b_cubed, score_chains, score_graphs, BCubed};
pub use sgml::{graph_to_sgml, render_sgml, SgmlDocument, SgmlOptions, Transliterate};
pub use types::{
    Annotation, Document, ElementId, EntityAttributes, MentionAttributes, Region, Span, SpanGraph,
    SpanGraphBuilder,
};
