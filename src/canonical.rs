//! Fingerprints of conversion results.
//!
//! A fingerprint is the xxh64 of a document's canonical field sequence,
//! rendered as 16 hex digits. Two conversions compare equal when they carry
//! the same annotation, however the XML they came from was laid out.
//!
//! ## Determinism Guarantees
//!
//! - Graph elements are fed in id order (the arenas are BTreeMaps)
//! - Chains and mentions are fed in list order
//! - Every field is tagged and strings are length-prefixed, so adjacent
//!   fields cannot run into each other

use xxhash_rust::xxh64::Xxh64;

use crate::chain::ChainList;
use crate::types::{Annotation, Region, SpanGraph};

/// Incremental hasher over typed fields.
pub struct Fingerprinter {
    hasher: Xxh64,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Fingerprinter {
    /// Start an empty fingerprint.
    pub fn new() -> Self {
        Self { hasher: Xxh64::new(0) }
    }

    /// Feed a string.
    pub fn text(&mut self, value: &str) -> &mut Self {
        self.hasher.update(b"s");
        self.hasher.update(&(value.len() as u64).to_le_bytes());
        self.hasher.update(value.as_bytes());
        self
    }

    /// Feed an offset or count.
    pub fn number(&mut self, value: usize) -> &mut Self {
        self.hasher.update(b"n");
        self.hasher.update(&(value as u64).to_le_bytes());
        self
    }

    /// Feed a flag.
    pub fn flag(&mut self, value: bool) -> &mut Self {
        self.hasher.update(&[b'b', u8::from(value)]);
        self
    }

    /// Feed an optional string; absent and empty differ.
    pub fn optional(&mut self, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) => {
                self.hasher.update(b"o");
                self.text(v)
            }
            None => {
                self.hasher.update(b"-");
                self
            }
        }
    }

    /// The fingerprint of everything fed so far.
    pub fn finish(&self) -> String {
        format!("{:016x}", self.hasher.digest())
    }
}

/// Fingerprint of raw output text, e.g. a written APF file.
pub fn text_fingerprint(text: &str) -> String {
    Fingerprinter::new().text(text).finish()
}

/// Fingerprint of a span graph: document, anchors, regions and annotations.
///
/// Element ids take part, so a graph read back from its own Callisto
/// rendering has the fingerprint of the original.
pub fn graph_fingerprint(graph: &SpanGraph) -> String {
    let mut fp = Fingerprinter::new();
    fp.text(graph.document().id()).text(graph.document().text());

    fp.number(graph.num_anchors());
    for (id, offset) in graph.anchors() {
        fp.text(id.as_str()).number(offset);
    }

    fp.number(graph.num_regions());
    for (id, region) in graph.regions() {
        fp.text(id.as_str()).text(region.contained_type());
        match region {
            Region::TextExtent { start, end } => {
                fp.text(start.as_str()).text(end.as_str());
            }
            Region::HeadFull { full, head } => {
                fp.text(full.as_str()).text(head.as_str());
            }
            Region::Entity { primary, mentions } => {
                fp.text(primary.as_str()).number(mentions.len());
                for mention in mentions {
                    fp.text(mention.as_str());
                }
            }
        }
    }

    fp.number(graph.num_annotations());
    for (id, annotation) in graph.annotations() {
        fp.text(id.as_str()).text(annotation.region().as_str());
        match annotation {
            Annotation::EntityMention { attrs, .. } => {
                fp.text("mention")
                    .text(&attrs.ace_id)
                    .flag(attrs.ldcatr)
                    .text(&attrs.ldctype)
                    .flag(attrs.metonymy)
                    .text(&attrs.reference)
                    .text(&attrs.role)
                    .optional(attrs.kind.as_deref());
            }
            Annotation::Entity { attrs, .. } => {
                fp.text("entity")
                    .text(&attrs.ace_id)
                    .text(&attrs.class)
                    .text(&attrs.entity_type)
                    .text(&attrs.subtype);
            }
            Annotation::Name { kind, .. } => {
                fp.text("name").text(kind);
            }
        }
    }
    fp.finish()
}

/// Fingerprint of extracted chains with their document id and source.
pub fn chain_list_fingerprint(list: &ChainList) -> String {
    let mut fp = Fingerprinter::new();
    fp.text(&list.document_id).text(&list.source).number(list.chains.len());
    for chain in &list.chains {
        let head = chain.head.as_ref();
        fp.optional(head.map(|h| h.entity_id.as_str()))
            .optional(head.map(|h| h.entity_type.as_str()))
            .number(chain.mentions.len());
        for m in &chain.mentions {
            fp.text(&m.id)
                .flag(m.primary)
                .number(m.start)
                .number(m.end)
                .optional(m.subtype.as_deref())
                .text(&m.text);
        }
    }
    fp.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Chain, ChainHead, ChainMention};
    use crate::types::{Document, MentionAttributes, Span, SpanGraphBuilder};

    fn chains(subtype: Option<&str>) -> ChainList {
        ChainList {
            document_id: "d".into(),
            chains: vec![Chain {
                head: Some(ChainHead { entity_id: "E1".into(), entity_type: "IDENT".into() }),
                mentions: vec![ChainMention {
                    id: "E1-1".into(),
                    primary: true,
                    start: 0,
                    end: 4,
                    subtype: subtype.map(str::to_string),
                    text: "John".into(),
                }],
            }],
            source: "John left.".into(),
        }
    }

    fn one_mention_graph(span: Span) -> SpanGraph {
        let mut b = SpanGraphBuilder::new(Document::new("d", "John left."));
        let region = b.mention_region(span);
        b.mention(region, MentionAttributes { ace_id: "E1-1".into(), ..Default::default() });
        b.build()
    }

    #[test]
    fn test_fingerprint_is_sixteen_hex_digits() {
        let fp = text_fingerprint("abc");
        assert_eq!(fp.len(), 16);
        assert!(fp.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(fp, text_fingerprint("abc"));
        assert_ne!(fp, text_fingerprint("abd"));
    }

    #[test]
    fn test_field_boundaries_are_kept() {
        let a = Fingerprinter::new().text("ab").text("c").finish();
        let b = Fingerprinter::new().text("a").text("bc").finish();
        assert_ne!(a, b);
        let absent = Fingerprinter::new().optional(None).finish();
        let empty = Fingerprinter::new().optional(Some("")).finish();
        assert_ne!(absent, empty);
    }

    #[test]
    fn test_chain_fingerprint_sees_subtype() {
        assert_eq!(chain_list_fingerprint(&chains(Some("NAM"))), chain_list_fingerprint(&chains(Some("NAM"))));
        assert_ne!(chain_list_fingerprint(&chains(Some("NAM"))), chain_list_fingerprint(&chains(None)));
    }

    #[test]
    fn test_graph_fingerprint_tracks_offsets() {
        let a = graph_fingerprint(&one_mention_graph(Span::new(0, 4)));
        assert_eq!(a, graph_fingerprint(&one_mention_graph(Span::new(0, 4))));
        assert_ne!(a, graph_fingerprint(&one_mention_graph(Span::new(5, 9))));
    }
}
