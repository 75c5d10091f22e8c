//! Inline-tagged text from flat markup.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::callisto::markup::{flat_markup, Markup, MarkupKind, TaggedSpan};
use crate::desubtokenize::{desubtokenize, DesubtokenizeOptions};
use crate::error::{ConvertError, Result};
use crate::types::{Document, SpanGraph};

/// Character transliteration applied to the finished text, e.g. Unicode
/// Arabic to a romanized encoding. Implementations must leave tag markup
/// intact.
pub trait Transliterate {
    /// Transliterate `text`.
    fn transliterate(&self, text: &str) -> String;
}

/// SGML output settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SgmlOptions {
    /// Desubtokenizer settings.
    pub desubtokenize: DesubtokenizeOptions,
    /// Wrap the text in `<DOC DOCNO="...">` ... `</DOC>`.
    pub wrap_doc: bool,
}

impl Default for SgmlOptions {
    fn default() -> Self {
        Self {
            desubtokenize: DesubtokenizeOptions {
                add_offset_notations: true,
                delete_interrupted: false,
            },
            wrap_doc: true,
        }
    }
}

/// Rendered inline-tagged document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SgmlDocument {
    /// Name or coreference markup; also picks the file extension.
    pub kind: MarkupKind,
    /// The full output text, newline terminated.
    pub text: String,
    /// Tag boundaries the desubtokenizer moved.
    pub relocated: usize,
}

/// Insert the tags of `markup` into the document text at their offsets.
///
/// At each offset closing tags come first, then empty spans, then opening
/// tags. Longer spans open outside shorter ones; spans over the same
/// characters open last-in-markup outermost and close in markup order, so
/// the result is always properly nested. Tags may sit after the last character.
pub fn insert_tags(document: &Document, markup: &Markup) -> String {
    let chars = document.chars();
    let last = chars.len();
    let mut opens: Vec<Vec<(usize, &TaggedSpan)>> = vec![Vec::new(); last + 1];
    let mut closes: Vec<Vec<(usize, &TaggedSpan)>> = vec![Vec::new(); last + 1];
    let mut empties: Vec<Vec<&TaggedSpan>> = vec![Vec::new(); last + 1];

    for (i, tagged) in markup.spans.iter().enumerate() {
        let start = tagged.span.start.min(last);
        let end = tagged.span.end.clamp(start, last);
        if start == end {
            empties[start].push(tagged);
        } else {
            opens[start].push((i, tagged));
            closes[end].push((i, tagged));
        }
    }

    let mut out = String::with_capacity(document.text().len());
    for offset in 0..=last {
        let closing = &mut closes[offset];
        closing.sort_by(|(ia, a), (ib, b)| b.span.start.cmp(&a.span.start).then(ia.cmp(ib)));
        for (_, tagged) in closing.iter() {
            out.push_str(&tagged.tag.close());
        }
        for tagged in &empties[offset] {
            out.push_str(&tagged.tag.open());
            out.push_str(&tagged.tag.close());
        }
        let opening = &mut opens[offset];
        opening.sort_by(|(ia, a), (ib, b)| b.span.end.cmp(&a.span.end).then(ib.cmp(ia)));
        for (_, tagged) in opening.iter() {
            out.push_str(&tagged.tag.open());
        }
        if let Some(c) = chars.get(offset) {
            out.push(*c);
        }
    }
    out
}

/// Render `markup` over `document` as inline-tagged text.
pub fn render_sgml(
    document: &Document,
    markup: &Markup,
    options: &SgmlOptions,
    transliterator: Option<&dyn Transliterate>,
) -> Result<SgmlDocument> {
    let tagged = insert_tags(document, markup);
    let moved = desubtokenize(&tagged, options.desubtokenize).map_err(|e| match e {
        ConvertError::DesubtokenizationFailed(msg) => ConvertError::DesubtokenizationFailed(
            format!("document {}: {msg}", document.id()),
        ),
        other => other,
    })?;

    let text = match transliterator {
        Some(t) => t.transliterate(&moved.text),
        None => moved.text,
    };
    let body = text.replace('\r', " ");
    let body = body.trim();

    let text = if options.wrap_doc {
        format!("<DOC DOCNO=\"{}\">\n{body}\n</DOC>\n", document.id())
    } else {
        format!("{body}\n")
    };
    Ok(SgmlDocument {
        kind: markup.kind,
        text,
        relocated: moved.changes,
    })
}

/// Flatten a Callisto graph and render it as inline-tagged text.
pub fn graph_to_sgml(
    graph: &SpanGraph,
    options: &SgmlOptions,
    transliterator: Option<&dyn Transliterate>,
) -> Result<SgmlDocument> {
    let markup = flat_markup(graph)?;
    let out = render_sgml(graph.document(), &markup, options, transliterator)?;
    info!(
        document = graph.document().id(),
        kind = out.kind.extension(),
        spans = markup.spans.len(),
        relocated = out.relocated,
        "sgml rendered"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callisto::markup::Tag;
    use crate::types::Span;

    fn name(start: usize, end: usize, kind: &str) -> TaggedSpan {
        TaggedSpan { span: Span::new(start, end), tag: Tag::Name(kind.into()) }
    }

    fn coref(start: usize, end: usize) -> TaggedSpan {
        TaggedSpan {
            span: Span::new(start, end),
            tag: Tag::Coref { entity_id: "E1".into(), entity_type: "IDENT".into(), subtype: None },
        }
    }

    #[test]
    fn test_insert_tags_nests_shared_offsets() {
        let doc = Document::new("d", "New York City");
        let markup = Markup {
            kind: MarkupKind::Name,
            spans: vec![name(0, 8, "GPE"), name(0, 13, "LOC")],
        };
        assert_eq!(insert_tags(&doc, &markup), "<LOC><GPE>New York</GPE> City</LOC>");
    }

    #[test]
    fn test_insert_tags_same_span_nests() {
        let doc = Document::new("d", "Paris is nice");
        let markup = Markup {
            kind: MarkupKind::Name,
            spans: vec![name(0, 5, "GPE"), name(0, 5, "LOC")],
        };
        assert_eq!(insert_tags(&doc, &markup), "<LOC><GPE>Paris</GPE></LOC> is nice");
    }

    #[test]
    fn test_insert_tags_shared_end_and_empty_span() {
        let doc = Document::new("d", "abcdef");
        let markup = Markup {
            kind: MarkupKind::Name,
            spans: vec![name(0, 6, "A"), name(3, 3, "E"), name(3, 6, "B")],
        };
        assert_eq!(insert_tags(&doc, &markup), "<A>abc<E></E><B>def</B></A>");
    }

    #[test]
    fn test_render_wraps_document() {
        let doc = Document::new("doc7", "He met\r John .  ");
        let markup = Markup { kind: MarkupKind::Coref, spans: vec![coref(0, 2), coref(8, 12)] };
        let out = render_sgml(&doc, &markup, &SgmlOptions::default(), None).unwrap();
        assert_eq!(
            out.text,
            "<DOC DOCNO=\"doc7\">\n<COREF-ID=\"E1\"-TYPE=\"IDENT\">He</COREF> met  <COREF-ID=\"E1\"-TYPE=\"IDENT\">John</COREF> .\n</DOC>\n"
        );
        assert_eq!(out.kind.extension(), "coref");
    }

    #[test]
    fn test_render_reports_relocations() {
        let doc = Document::new("d", "pre-Tuesday");
        let markup = Markup { kind: MarkupKind::Name, spans: vec![name(4, 11, "DATE")] };
        let options = SgmlOptions { wrap_doc: false, ..Default::default() };
        let out = render_sgml(&doc, &markup, &options, None).unwrap();
        assert_eq!(out.text, "<DATE-S_OFF=\"4\">pre-Tuesday</DATE>\n");
        assert_eq!(out.relocated, 1);
    }

    struct Upper;

    impl Transliterate for Upper {
        fn transliterate(&self, text: &str) -> String {
            text.replace("john", "JOHN")
        }
    }

    #[test]
    fn test_transliterator_is_applied() {
        let doc = Document::new("d", "john");
        let markup = Markup { kind: MarkupKind::Name, spans: vec![name(0, 4, "PER")] };
        let options = SgmlOptions { wrap_doc: false, ..Default::default() };
        let out = render_sgml(&doc, &markup, &options, Some(&Upper)).unwrap();
        assert_eq!(out.text, "<PER>JOHN</PER>\n");
    }
}
