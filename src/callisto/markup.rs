//! Flat open/close markup derived from a Callisto graph.
//!
//! A document carries either name annotation or coreference annotation.
//! This stage decides which, resolves coreference types and rejects
//! spans that cannot be expressed as properly nested inline tags.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain::{resolve_entity, APPOS, IDENT};
use crate::error::{BracketSide, ConvertError, Result};
use crate::types::{Document, Span, SpanGraph};

/// Which kind of annotation a document carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkupKind {
    /// Flat name spans.
    Name,
    /// Coreference chains.
    Coref,
}

impl MarkupKind {
    /// File extension used for inline-tagged output of this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Coref => "coref",
        }
    }
}

/// Label of one tagged span.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tag {
    /// A name of the given category.
    Name(String),
    /// A coreference mention of a resolved entity.
    Coref {
        /// Resolved entity id.
        entity_id: String,
        /// `IDENT` or `APPOS`.
        entity_type: String,
        /// Mention subtype; always absent for `IDENT`.
        subtype: Option<String>,
    },
}

impl Tag {
    /// Opening inline tag.
    pub fn open(&self) -> String {
        match self {
            Self::Name(kind) => format!("<{kind}>"),
            Self::Coref { entity_id, entity_type, subtype } => {
                let subtype = subtype
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .map(|s| format!(r#"-SUBTYPE="{s}""#))
                    .unwrap_or_default();
                format!(r#"<COREF-ID="{entity_id}"-TYPE="{entity_type}"{subtype}>"#)
            }
        }
    }

    /// Closing inline tag.
    pub fn close(&self) -> String {
        match self {
            Self::Name(kind) => format!("</{kind}>"),
            Self::Coref { .. } => "</COREF>".to_string(),
        }
    }

    fn entity_id(&self) -> &str {
        match self {
            Self::Name(kind) => kind,
            Self::Coref { entity_id, .. } => entity_id,
        }
    }
}

/// One tagged span.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaggedSpan {
    /// Covered characters.
    pub span: Span,
    /// What to tag it with.
    pub tag: Tag,
}

/// All tagged spans of a document, sorted by start, end, then label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markup {
    /// Annotation kind.
    pub kind: MarkupKind,
    /// Sorted spans.
    pub spans: Vec<TaggedSpan>,
}

fn side(document: &Document, span: &TaggedSpan) -> BracketSide {
    BracketSide {
        entity_id: span.tag.entity_id().to_string(),
        start: span.span.start,
        end: span.span.end,
        text: document.slice(span.span),
    }
}

fn is_space(document: &Document, offset: usize) -> bool {
    document.char_at(offset) == Some(' ')
}

/// True if `a` and `b` partially overlap in a way inline tags cannot
/// express.
///
/// A one-character overlap on a space is tolerated, as are the off-by-one
/// cases where `b` reaches one space past `a` or starts one space after it.
pub fn illegal_cross_bracket(document: &Document, a: Span, b: Span) -> bool {
    if !a.cross_brackets(&b) {
        return false;
    }
    let single_space_overlap = a.end - b.start == 1 && is_space(document, b.start);
    let trailing_space = a.end + 1 == b.end && is_space(document, a.end);
    let leading_space = a.start + 1 == b.start && is_space(document, a.start);
    !(single_space_overlap || trailing_space || leading_space)
}

/// Fail on the first illegally cross-bracketing pair.
pub fn check_cross_bracketing(document: &Document, spans: &[TaggedSpan]) -> Result<()> {
    for a in spans {
        for b in spans {
            if illegal_cross_bracket(document, a.span, b.span) {
                return Err(ConvertError::CrossBracketing {
                    first: side(document, a),
                    second: side(document, b),
                });
            }
        }
    }
    Ok(())
}

fn coref_spans(graph: &SpanGraph) -> Result<Vec<TaggedSpan>> {
    let entity_types = graph.entity_types();
    let mut spans = Vec::new();

    for (primary, members) in graph.entity_groups() {
        if members.len() == 1 {
            debug!(primary = %primary, "single-mention chain skipped");
            continue;
        }
        let head = resolve_entity(&graph.mention(primary)?.ace_id, &entity_types)?;
        if head.entity_type != IDENT && head.entity_type != APPOS {
            return Err(ConvertError::BadFormat(format!(
                "annotation type {:?} for id {} is neither IDENT nor APPOS",
                head.entity_type, head.entity_id
            )));
        }

        for member in members {
            let subtype = if head.entity_type == IDENT {
                None
            } else {
                graph.mention(member)?.kind.clone()
            };
            spans.push(TaggedSpan {
                span: graph.mention_span(member)?,
                tag: Tag::Coref {
                    entity_id: head.entity_id.clone(),
                    entity_type: head.entity_type.clone(),
                    subtype,
                },
            });
        }
    }
    Ok(spans)
}

/// Decide the annotation kind of `graph` and flatten it to tagged spans.
///
/// Errors: `MixedAnnotationKinds` when both name and coreference
/// annotation are present, `NoAnnotationFound` when neither is (or every
/// chain has a single mention), `CrossBracketing` for partially
/// overlapping coreference spans.
pub fn flat_markup(graph: &SpanGraph) -> Result<Markup> {
    let names = graph.names()?;
    let groups = graph.entity_groups().len();

    if !names.is_empty() && groups > 0 {
        return Err(ConvertError::MixedAnnotationKinds {
            names: names.len(),
            chains: groups,
        });
    }

    let (kind, mut spans) = if !names.is_empty() {
        let spans = names
            .into_iter()
            .map(|(span, kind)| TaggedSpan { span, tag: Tag::Name(kind.to_string()) })
            .collect();
        (MarkupKind::Name, spans)
    } else {
        let spans = coref_spans(graph)?;
        check_cross_bracketing(graph.document(), &spans)?;
        (MarkupKind::Coref, spans)
    };

    if spans.is_empty() {
        return Err(ConvertError::NoAnnotationFound);
    }
    spans.sort();
    spans.dedup();
    Ok(Markup { kind, spans })
}
