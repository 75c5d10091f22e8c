//! Callisto/AIF XML into a [`SpanGraph`].

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex_lite::Regex;
use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::types::{
    Annotation, Document, ElementId, EntityAttributes, MentionAttributes, Region, SpanGraph,
};
use crate::xml::{self, XmlElement};

/// Entity type recorded when an `ace_entity` annotation has no `type`.
pub const TYPE_NOT_SPECIFIED: &str = "NOT_SPECIFIED";

fn sgml_tag() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"</?[A-Z]+[^>\n]*>").expect("static pattern"))
}

/// Remove uppercase SGML tags from a decoded signal body.
///
/// Callisto anchors count characters of the source with these tags
/// removed, so every offset is interpreted against the stripped text.
pub fn strip_sgml_tags(text: &str) -> String {
    sgml_tag().replace_all(text, "").into_owned()
}

/// Document id from a signal href: known extensions dropped, last path
/// component kept.
pub fn document_id_from_href(href: &str) -> String {
    let href = href.strip_prefix('#').unwrap_or(href);
    let cleaned = [".source", ".sgml", ".xml", ".aif"]
        .iter()
        .fold(href.to_string(), |acc, ext| acc.replace(ext, ""));
    cleaned
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Target of an `xlink:href` reference, without the leading `#`.
fn reference(element: &XmlElement) -> Result<ElementId> {
    let href = element.attr_local("href").ok_or_else(|| {
        ConvertError::callisto(format!("<{}> has no xlink:href", element.name))
    })?;
    Ok(ElementId::new(href.strip_prefix('#').unwrap_or(href)))
}

fn element_id(element: &XmlElement) -> Result<ElementId> {
    element
        .attr("id")
        .map(ElementId::new)
        .ok_or_else(|| ConvertError::callisto(format!("<{}> has no id", element.name)))
}

/// Id for a name annotation written without one. `#` and `:` cannot occur
/// in an XML `ID`, so it never collides with an id from the file.
fn unnamed_annotation_id(kind: &str, position: usize) -> ElementId {
    ElementId::new(format!("#{kind}:{position}"))
}

fn required<'a>(element: &'a XmlElement, key: &str) -> Result<&'a str> {
    element.attr(key).ok_or_else(|| {
        ConvertError::callisto(format!("<{}> has no {key} attribute", element.name))
    })
}

fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn source_text(signal: &XmlElement) -> Result<String> {
    let body = signal
        .child("body")
        .ok_or_else(|| ConvertError::callisto("SimpleSignal has no body"))?;
    if let Some(encoding) = body.attr("encoding") {
        if encoding != "Base64" {
            return Err(ConvertError::callisto(format!(
                "unsupported body encoding {encoding:?}"
            )));
        }
    }
    let compact: String = body.text.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ConvertError::callisto(format!("signal body is not base64: {e}")))?;
    let decoded = String::from_utf8(bytes)
        .map_err(|e| ConvertError::callisto(format!("signal body is not utf-8: {e}")))?;
    Ok(strip_sgml_tags(&decoded))
}

fn read_anchors(graph: &mut SpanGraph, set: &XmlElement) -> Result<()> {
    for anchor in set.children_named("Anchor") {
        let id = element_id(anchor)?;
        let param = anchor
            .child("Parameter")
            .ok_or_else(|| ConvertError::callisto(format!("anchor {id} has no offset")))?;
        let offset = param.text.trim().parse::<usize>().map_err(|_| {
            ConvertError::callisto(format!("anchor {id} has offset {:?}", param.text))
        })?;
        graph.insert_anchor(id, offset)?;
    }
    Ok(())
}

fn read_text_extent(region: &XmlElement, id: &ElementId) -> Result<Region> {
    let mut start = None;
    let mut end = None;
    for anchor_ref in &region.children {
        match anchor_ref.attr("role") {
            Some("start") => start = Some(reference(anchor_ref)?),
            Some("end") => end = Some(reference(anchor_ref)?),
            _ => {}
        }
    }
    match (start, end) {
        (Some(start), Some(end)) => Ok(Region::TextExtent { start, end }),
        _ => Err(ConvertError::callisto(format!(
            "text-extent region {id} needs a start and an end anchor"
        ))),
    }
}

fn read_head_full(region: &XmlElement, id: &ElementId) -> Result<Region> {
    let by_role = |role: &str| region.children.iter().find(|c| c.attr("role") == Some(role));
    let full = by_role("full")
        .or_else(|| region.children.first())
        .ok_or_else(|| ConvertError::callisto(format!("head-full region {id} is empty")))?;
    let head = by_role("head").or_else(|| region.children.get(1)).unwrap_or(full);
    Ok(Region::HeadFull {
        full: reference(full)?,
        head: reference(head)?,
    })
}

fn read_entity_region(region: &XmlElement) -> Result<Region> {
    let primary_ref = region
        .children
        .first()
        .ok_or_else(|| ConvertError::callisto("entity region without a primary mention"))?;
    let primary = reference(primary_ref)?;
    let mentions = match region.children.get(1) {
        Some(set) => set.children.iter().map(reference).collect::<Result<Vec<_>>>()?,
        None => {
            debug!(primary = %primary, "entity region without mention set skipped");
            Vec::new()
        }
    };
    Ok(Region::Entity { primary, mentions })
}

fn read_region_set(graph: &mut SpanGraph, set: &XmlElement) -> Result<()> {
    if set.is_leaf() {
        return Ok(());
    }
    let contained = set.attr("containedType").unwrap_or_default();
    for region in &set.children {
        let id = element_id(region)?;
        let parsed = match contained {
            "text-extent" => read_text_extent(region, &id)?,
            "head-full" => read_head_full(region, &id)?,
            "ace_entity_region" => read_entity_region(region)?,
            other => {
                return Err(ConvertError::callisto(format!(
                    "unsupported RegionSet containedType {other:?}"
                )))
            }
        };
        graph.insert_region(id, parsed)?;
    }
    Ok(())
}

/// Region reference and parameter list of an annotation.
fn annotation_parts(annotation: &XmlElement) -> Result<(ElementId, Vec<(&str, &str)>)> {
    let region_ref = annotation
        .children
        .first()
        .ok_or_else(|| ConvertError::callisto("annotation without a region reference"))?;
    let params = annotation
        .child("Content")
        .map(|content| {
            content
                .children_named("Parameter")
                .filter_map(|p| p.attr("role").map(|role| (role, p.text.as_str())))
                .collect()
        })
        .unwrap_or_default();
    Ok((reference(region_ref)?, params))
}

fn read_entity(annotation: &XmlElement) -> Result<Annotation> {
    let (region, params) = annotation_parts(annotation)?;
    let mut attrs = EntityAttributes::default();
    let mut ace_id = None;
    let mut entity_type = None;
    for (role, value) in params {
        match role {
            "ace_id" => ace_id = Some(value.to_string()),
            "type" => entity_type = Some(value.to_string()),
            "class" => attrs.class = value.to_string(),
            "subtype" => attrs.subtype = value.to_string(),
            _ => {}
        }
    }
    attrs.ace_id = ace_id.ok_or_else(|| {
        ConvertError::callisto(format!("ace_entity {region} has no ace_id parameter"))
    })?;
    attrs.entity_type = entity_type.unwrap_or_else(|| TYPE_NOT_SPECIFIED.to_string());
    Ok(Annotation::Entity { region, attrs })
}

fn read_mention(annotation: &XmlElement) -> Result<Annotation> {
    let (region, params) = annotation_parts(annotation)?;
    let mut attrs = MentionAttributes::default();
    let mut ace_id = None;
    for (role, value) in params {
        match role {
            "ace_id" => ace_id = Some(value.to_string()),
            "ldcatr" => attrs.ldcatr = parse_flag(value),
            "ldctype" => attrs.ldctype = value.to_string(),
            "metonymy" => attrs.metonymy = parse_flag(value),
            "reference" => attrs.reference = value.to_string(),
            "role" => attrs.role = value.to_string(),
            "type" => attrs.kind = Some(value.to_string()),
            _ => {}
        }
    }
    attrs.ace_id = ace_id.ok_or_else(|| {
        ConvertError::callisto(format!("entity mention on {region} has no ace_id parameter"))
    })?;
    Ok(Annotation::EntityMention { region, attrs })
}

fn read_analysis(graph: &mut SpanGraph, analysis: &XmlElement) -> Result<()> {
    match analysis.attr("type").unwrap_or_default() {
        "generic-set" => {
            for set in &analysis.children {
                let kind = required(set, "containedType")?;
                for (position, annotation) in set.children.iter().enumerate() {
                    let region_ref = annotation.children.first().ok_or_else(|| {
                        ConvertError::callisto(format!("{kind} annotation without a region"))
                    })?;
                    let id = annotation
                        .attr("id")
                        .map(ElementId::new)
                        .unwrap_or_else(|| unnamed_annotation_id(kind, position));
                    graph.insert_annotation(
                        id,
                        Annotation::Name {
                            region: reference(region_ref)?,
                            kind: kind.to_string(),
                        },
                    )?;
                }
            }
        }
        "ace_annotation-set" => {
            for set in &analysis.children {
                if set.is_leaf() {
                    continue;
                }
                let contained = set.attr("containedType").unwrap_or_default();
                for annotation in &set.children {
                    let parsed = match contained {
                        "ace_entity" => read_entity(annotation)?,
                        "ace_entity-mention" => read_mention(annotation)?,
                        other => {
                            return Err(ConvertError::callisto(format!(
                                "unsupported AnnotationSet containedType {other:?}"
                            )))
                        }
                    };
                    graph.insert_annotation(element_id(annotation)?, parsed)?;
                }
            }
        }
        other => {
            return Err(ConvertError::callisto(format!(
                "unsupported Analysis type {other:?}"
            )))
        }
    }
    Ok(())
}

/// Parse a Callisto/AIF document.
///
/// The returned graph has been validated: every reference resolves and
/// every text extent lies inside the (tag-stripped) source text.
pub fn read_callisto(input: &str) -> Result<SpanGraph> {
    let root = xml::parse(input)?;
    if root.name == "source_file" {
        return Err(ConvertError::callisto("it is apf, not callisto xml"));
    }
    if root.name != "Corpus" {
        return Err(ConvertError::callisto(format!(
            "root element is <{}>, expected <Corpus>",
            root.name
        )));
    }

    let signal = root
        .child("SimpleSignal")
        .ok_or_else(|| ConvertError::callisto("no SimpleSignal"))?;
    let href = signal
        .attr_local("href")
        .ok_or_else(|| ConvertError::callisto("SimpleSignal has no xlink:href"))?;
    let document = Document::new(document_id_from_href(href), source_text(signal)?);

    let mut graph = SpanGraph::new(document);
    if let Some(anchors) = root.child("AnchorSet") {
        read_anchors(&mut graph, anchors)?;
    }
    for set in root.children_named("RegionSet") {
        read_region_set(&mut graph, set)?;
    }
    for analysis in root.children_named("Analysis") {
        read_analysis(&mut graph, analysis)?;
    }

    graph.validate()?;
    debug!(
        document = graph.document().id(),
        anchors = graph.num_anchors(),
        regions = graph.num_regions(),
        annotations = graph.num_annotations(),
        "callisto document read"
    );
    Ok(graph)
}
