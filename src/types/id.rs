//! Element identifiers and the per-conversion id allocator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of an anchor, region or annotation within one document graph.
///
/// Ids are opaque strings (`Anc0000`, `Reg0012`, whatever a Callisto file
/// carries). Ordering is plain string ordering, which is the order the
/// Callisto writer emits elements in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(String);

impl ElementId {
    /// Wrap an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ElementId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Kind of element an id is allocated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdKind {
    /// Text point.
    Anchor,
    /// Text-extent, head-full or entity region (one shared sequence).
    Region,
    /// Entity or entity-mention annotation (one shared sequence).
    Annotation,
}

impl IdKind {
    /// Prefix rendered in front of the counter.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Anchor => "Anc",
            Self::Region => "Reg",
            Self::Annotation => "Ann",
        }
    }
}

/// Monotonic id allocator owned by a single conversion.
///
/// Each kind has its own counter starting at zero; the numeral is padded
/// to four digits. Two conversions never share a counter.
#[derive(Debug, Clone, Default)]
pub struct IdCounter {
    next: BTreeMap<IdKind, usize>,
}

impl IdCounter {
    /// Create a counter with every sequence at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id of `kind`.
    pub fn next(&mut self, kind: IdKind) -> ElementId {
        let n = self.next.entry(kind).or_insert(0);
        let id = ElementId(format!("{}{:04}", kind.prefix(), n));
        *n += 1;
        id
    }

    /// Number of ids allocated so far for `kind`.
    pub fn allocated(&self, kind: IdKind) -> usize {
        self.next.get(&kind).copied().unwrap_or(0)
    }
}
