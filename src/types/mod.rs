//! Span model: character offsets and the id-indexed annotation graph.

pub mod id;
pub mod document;
pub mod region;
pub mod annotation;
pub mod graph;

pub use id::{ElementId, IdCounter, IdKind};
pub use document::{Document, Span};
pub use region::Region;
pub use annotation::{Annotation, EntityAttributes, MentionAttributes};
pub use graph::{SpanGraph, SpanGraphBuilder};
