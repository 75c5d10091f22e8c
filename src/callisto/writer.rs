//! [`SpanGraph`] into the fixed Callisto/AIF layout.
//!
//! Callisto and the tools downstream of it read parts of this format
//! positionally. Element order, attribute order and indentation are
//! therefore fixed and must not be "tidied".

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::types::{Annotation, EntityAttributes, MentionAttributes, Region, SpanGraph};
use crate::xml::{escape_attr, escape_text};

const ATLAS_NS: &str = "http://www.nist.gov/speech/atlas";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const DC_NS: &str =
    "http://www.ukoln.ac.uk/interop-focus/activities/z3950/int_profile/bath/draft/stable1.html";
const SCHEME_LOCATION: &str = "http://callisto.mitre.org/maia/ace2004.maia.xml";

const EMPTY_REGION_SETS_BEFORE: [&str; 2] = ["ace_argument-mention_region", "ace_argument_region"];
const EMPTY_REGION_SETS_AFTER: [&str; 6] = [
    "ace_event-mention_region",
    "ace_event_region",
    "ace_quantity-mention_region",
    "ace_quantity_region",
    "ace_relation-mention_region",
    "ace_relation_region",
];
const EMPTY_ANNOTATION_SETS_BEFORE: [&str; 2] = ["ace_argument", "ace_argument-mention"];
const EMPTY_ANNOTATION_SETS_AFTER: [&str; 9] = [
    "ace_event",
    "ace_event-mention",
    "ace_event-mention-extent",
    "ace_quantity",
    "ace_quantity-mention",
    "ace_relation",
    "ace_relation-mention",
    "ace_relation-mention-extent",
    "timex2",
];

struct AifWriter {
    out: String,
}

impl AifWriter {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn param(&mut self, depth: usize, kind: &str, role: &str, value: &str) {
        let open = format!(r#"<Parameter type="{kind}" unit="NULL_UNIT" role="{role}""#);
        if value.is_empty() {
            self.line(depth, &format!("{open}/>"));
        } else {
            self.line(depth, &format!("{open}>{}</Parameter>", escape_text(value)));
        }
    }

    fn annotation_ref(&mut self, depth: usize, target: &str, role: &str) {
        self.line(
            depth,
            &format!(r##"<AnnotationRef xlink:href="#{target}" role="{role}" xlink:type="simple"/>"##),
        );
    }

    fn ref_to(&mut self, depth: usize, element: &str, target: &str, role: &str) {
        self.line(
            depth,
            &format!(r##"<{element} xlink:href="#{target}" role="{role}" xlink:type="simple"/>"##),
        );
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

fn write_entity_params(w: &mut AifWriter, attrs: &EntityAttributes) {
    w.param(5, "string", "ace_id", &attrs.ace_id);
    w.param(5, "string", "class", &attrs.class);
    w.param(5, "string", "type", &attrs.entity_type);
    w.param(5, "string", "subtype", &attrs.subtype);
}

fn write_mention_params(w: &mut AifWriter, attrs: &MentionAttributes) {
    w.param(5, "string", "ace_id", &attrs.ace_id);
    w.param(5, "boolean", "ldcatr", flag(attrs.ldcatr));
    w.param(5, "string", "ldctype", &attrs.ldctype);
    w.param(5, "boolean", "metonymy", flag(attrs.metonymy));
    w.param(5, "string", "reference", &attrs.reference);
    w.param(5, "string", "role", &attrs.role);
    w.param(5, "string", "type", attrs.kind.as_deref().unwrap_or_default());
}

/// Render `graph` as a Callisto/AIF document whose signal points at `uri`.
///
/// Anchors, regions and annotations are written sorted by id. Name
/// annotations have no place in this layout and are not written.
pub fn write_callisto(graph: &SpanGraph, uri: &str) -> String {
    let mut w = AifWriter { out: String::new() };

    w.line(0, r#"<?xml version="1.0" encoding="US-ASCII"?>"#);
    w.line(0, r#"<!DOCTYPE Corpus SYSTEM "http://www.nist.gov/speech/atlas/aif.dtd">"#);
    w.line(0, "");
    w.line(
        0,
        &format!(
            r#"<Corpus xmlns="{ATLAS_NS}" xmlns:xlink="{XLINK_NS}" xmlns:dc="{DC_NS}" id="Cor6" AIFVersion="1.1" type="ace_corpus" schemeLocation="{SCHEME_LOCATION}">"#
        ),
    );
    w.line(1, "<Metadata/>");
    w.line(
        1,
        &format!(
            r#"<SimpleSignal id="Sig6" type="text" mimeClass="text" mimeType="sgml" xlink:href="{}" encoding="UTF-8" track="ALL" xlink:type="simple">"#,
            escape_attr(uri)
        ),
    );
    w.line(
        2,
        &format!(
            r#"<body encoding="Base64">{}</body>"#,
            STANDARD.encode(graph.document().text().as_bytes())
        ),
    );
    w.line(1, "</SimpleSignal>");

    w.line(1, r#"<AnchorSet containedType="text-point">"#);
    for (id, offset) in graph.anchors() {
        w.line(2, &format!(r#"<Anchor id="{id}" type="text-point">"#));
        w.line(3, &format!(r#"<Parameter type="char" unit="NULL_UNIT" role="char">{offset}</Parameter>"#));
        w.line(3, r##"<SignalRef xlink:href="#Sig6" role="text" xlink:type="simple"/>"##);
        w.line(2, "</Anchor>");
    }
    w.line(1, "</AnchorSet>");

    for set in EMPTY_REGION_SETS_BEFORE {
        w.line(1, &format!(r#"<RegionSet containedType="{set}"/>"#));
    }

    w.line(1, r#"<RegionSet containedType="ace_entity_region">"#);
    for (id, region) in graph.regions() {
        if let Region::Entity { primary, mentions } = region {
            w.line(2, &format!(r#"<Region id="{id}" type="{}">"#, region.contained_type()));
            w.annotation_ref(3, primary.as_str(), "primary-mention");
            w.line(3, r#"<AnnotationRefSet containedType="ace_entity-mention">"#);
            for mention in mentions {
                w.annotation_ref(4, mention.as_str(), "null");
            }
            w.line(3, "</AnnotationRefSet>");
            w.line(2, "</Region>");
        }
    }
    w.line(1, "</RegionSet>");

    for set in EMPTY_REGION_SETS_AFTER {
        w.line(1, &format!(r#"<RegionSet containedType="{set}"/>"#));
    }

    w.line(1, r#"<RegionSet containedType="head-full">"#);
    for (id, region) in graph.regions() {
        if let Region::HeadFull { full, head } = region {
            w.line(2, &format!(r#"<Region id="{id}" type="{}">"#, region.contained_type()));
            w.ref_to(3, "RegionRef", full.as_str(), "full");
            w.ref_to(3, "RegionRef", head.as_str(), "head");
            w.line(2, "</Region>");
        }
    }
    w.line(1, "</RegionSet>");

    w.line(1, r#"<RegionSet containedType="text-extent">"#);
    for (id, region) in graph.regions() {
        if let Region::TextExtent { start, end } = region {
            w.line(2, &format!(r#"<Region id="{id}" type="{}">"#, region.contained_type()));
            w.ref_to(3, "AnchorRef", end.as_str(), "end");
            w.ref_to(3, "AnchorRef", start.as_str(), "start");
            w.line(2, "</Region>");
        }
    }
    w.line(1, "</RegionSet>");

    w.line(1, r#"<Analysis id="Ana6" type="ace_annotation-set" role="ace_annotation-set">"#);
    for set in EMPTY_ANNOTATION_SETS_BEFORE {
        w.line(2, &format!(r#"<AnnotationSet containedType="{set}"/>"#));
    }

    w.line(2, r#"<AnnotationSet containedType="ace_entity">"#);
    for (id, annotation) in graph.annotations() {
        if let Annotation::Entity { region, attrs } = annotation {
            w.line(3, &format!(r#"<Annotation id="{id}" type="ace_entity">"#));
            w.ref_to(4, "RegionRef", region.as_str(), "ace_entity-mentions");
            w.line(4, r#"<Content type="ace_entity_content">"#);
            write_entity_params(&mut w, attrs);
            w.line(4, "</Content>");
            w.line(3, "</Annotation>");
        }
    }
    w.line(2, "</AnnotationSet>");

    w.line(2, r#"<AnnotationSet containedType="ace_entity-mention">"#);
    for (id, annotation) in graph.annotations() {
        if let Annotation::EntityMention { region, attrs } = annotation {
            w.line(3, &format!(r#"<Annotation id="{id}" type="ace_entity-mention">"#));
            w.ref_to(4, "RegionRef", region.as_str(), "head-full");
            w.line(4, r#"<Content type="ace_entity-mention_content">"#);
            write_mention_params(&mut w, attrs);
            w.line(4, "</Content>");
            w.line(3, "</Annotation>");
        }
    }
    w.line(2, "</AnnotationSet>");

    for set in EMPTY_ANNOTATION_SETS_AFTER {
        w.line(2, &format!(r#"<AnnotationSet containedType="{set}"/>"#));
    }
    w.line(1, "</Analysis>");
    w.line(0, "</Corpus>");

    w.out
}
