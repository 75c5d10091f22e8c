//! Callisto/AIF annotation graphs.
//!
//! - `reader`: XML into a validated [`crate::types::SpanGraph`]
//! - `writer`: graph into the fixed AIF layout
//! - `markup`: name/coreference decision and flat tagged spans

pub mod markup;
pub mod reader;
pub mod writer;

pub use markup::{flat_markup, Markup, MarkupKind, Tag, TaggedSpan};
pub use reader::{read_callisto, strip_sgml_tags};
pub use writer::write_callisto;
