//! Source documents and character spans.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Half-open character span `[start, end)` over a [`Document`].
///
/// Offsets count Unicode scalar values, not bytes. APF stores an inclusive
/// end; use [`Span::from_inclusive`] and [`Span::inclusive_end`] at that
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// First character (inclusive).
    pub start: usize,
    /// One past the last character (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a span from a half-open range.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Create a span from APF's inclusive `START`/`END` pair.
    pub fn from_inclusive(start: usize, end_inclusive: usize) -> Self {
        Self {
            start,
            end: end_inclusive + 1,
        }
    }

    /// The APF-style inclusive end. Empty spans have no inclusive end.
    pub fn inclusive_end(&self) -> Option<usize> {
        self.end.checked_sub(1).filter(|_| self.end > self.start)
    }

    /// Number of characters covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True if the span covers nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `other` starts strictly inside `self` and ends strictly after it.
    pub fn cross_brackets(&self, other: &Span) -> bool {
        self.start < other.start && other.start < self.end && self.end < other.end
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// An immutable source text plus its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: String,
    text: String,
    chars: Vec<char>,
}

impl Document {
    /// Create a document. Offsets into it are character offsets into `text`.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let chars = text.chars().collect();
        Self {
            id: id.into(),
            text,
            chars,
        }
    }

    /// Document identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The full source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The source text as characters.
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// True for an empty source text.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Character at `offset`, if any.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.chars.get(offset).copied()
    }

    /// Text covered by `span`, clamped to the document.
    pub fn slice(&self, span: Span) -> String {
        let end = span.end.min(self.chars.len());
        let start = span.start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// True if `span` lies entirely inside the document.
    pub fn contains(&self, span: Span) -> bool {
        span.start <= span.end && span.end <= self.chars.len()
    }

    /// SHA-256 of the source text as lowercase hex.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        hex::encode(hasher.finalize())
    }
}
