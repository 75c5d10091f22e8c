//! APF entity/mention XML into a [`SpanGraph`].

use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::types::{Document, ElementId, EntityAttributes, MentionAttributes, Span, SpanGraph, SpanGraphBuilder};
use crate::xml::{self, XmlElement};

/// A parsed APF file: the signal URI plus the annotation graph.
#[derive(Debug, Clone)]
pub struct ApfDocument {
    /// `source_file/@URI`, reused as the Callisto signal reference.
    pub uri: String,
    /// Anchors, regions and annotations built from the entities.
    pub graph: SpanGraph,
}

fn required<'a>(element: &'a XmlElement, key: &str) -> Result<&'a str> {
    element
        .attr(key)
        .ok_or_else(|| ConvertError::apf(format!("<{}> has no {key} attribute", element.name)))
}

fn offset(charseq: &XmlElement, key: &str) -> Result<usize> {
    let raw = required(charseq, key)?;
    raw.trim()
        .parse()
        .map_err(|_| ConvertError::apf(format!("charseq {key}={raw:?} is not an offset")))
}

fn is_true(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// The `charseq` of a mention: its extent, else its head.
fn charseq(mention: &XmlElement) -> Result<&XmlElement> {
    ["extent", "head"]
        .iter()
        .filter_map(|part| mention.child(part))
        .find_map(|part| part.child("charseq"))
        .ok_or_else(|| {
            ConvertError::apf(format!(
                "entity_mention {} has no charseq",
                mention.attr("ID").unwrap_or("?")
            ))
        })
}

/// Check a charseq against the source and return its half-open span.
fn mention_span(document: &Document, mention: &XmlElement) -> Result<Span> {
    let seq = charseq(mention)?;
    let span = Span::from_inclusive(offset(seq, "START")?, offset(seq, "END")?);
    if !document.contains(span) || document.slice(span) != seq.text {
        return Err(ConvertError::apf(format!(
            "source file doesn't match apf: s[{}:{}]={:?}, t={:?}",
            span.start,
            span.end,
            document.slice(span),
            seq.text
        )));
    }
    Ok(span)
}

fn read_entity(
    builder: &mut SpanGraphBuilder,
    entity: &XmlElement,
    munge_primary_mentions: bool,
) -> Result<()> {
    let entity_id = required(entity, "ID")?;
    let mut members: Vec<ElementId> = Vec::new();
    let mut earliest: Option<(usize, ElementId)> = None;

    for mention in &entity.children {
        if mention.name != "entity_mention" {
            debug!(entity = entity_id, element = %mention.name, "non-mention child skipped");
            continue;
        }
        let span = mention_span(builder.document(), mention)?;
        let attrs = MentionAttributes {
            ace_id: required(mention, "ID")?.to_string(),
            ldcatr: is_true(mention.attr("LDCATR")),
            ldctype: mention.attr("LDCTYPE").unwrap_or_default().to_string(),
            metonymy: is_true(mention.attr("METONYMY_MENTION")),
            reference: String::new(),
            role: String::new(),
            kind: Some(required(mention, "TYPE")?.to_string()),
        };
        let primary = match required(mention, "PRIMARY")? {
            "true" => true,
            "false" => false,
            other => {
                return Err(ConvertError::apf(format!(
                    "entity_mention {} has PRIMARY={other:?}",
                    attrs.ace_id
                )))
            }
        };

        let region = builder.mention_region(span);
        let id = builder.mention(region, attrs);
        if earliest.as_ref().map_or(true, |(start, _)| span.start < *start) {
            earliest = Some((span.start, id.clone()));
        }
        if primary {
            members.insert(0, id);
        } else {
            members.push(id);
        }
    }

    if munge_primary_mentions {
        if let Some((_, first)) = earliest {
            members.retain(|m| *m != first);
            members.insert(0, first);
        }
    }

    if members.is_empty() {
        debug!(entity = entity_id, "entity without mentions skipped");
        return Ok(());
    }

    let region = builder.entity_region(members)?;
    builder.entity(
        region,
        EntityAttributes {
            ace_id: entity_id.to_string(),
            class: String::new(),
            entity_type: required(entity, "TYPE")?.to_string(),
            subtype: entity.attr("SUBTYPE").unwrap_or_default().to_string(),
        },
    );
    Ok(())
}

/// Parse an APF document annotated over `source`.
///
/// Every mention's `charseq` must equal the source text at
/// `[START, END + 1)`. Mentions marked `PRIMARY="true"` lead their entity;
/// with `munge_primary_mentions` the earliest-starting mention leads
/// instead. Relations, events and other non-entity content are skipped.
pub fn read_apf(input: &str, source: &str, munge_primary_mentions: bool) -> Result<ApfDocument> {
    let root = xml::parse(input)?;
    if root.name != "source_file" {
        return Err(ConvertError::apf("does not start with 'source_file' tag"));
    }
    let uri = required(&root, "URI")?.to_string();
    let document = root
        .child("document")
        .ok_or_else(|| ConvertError::apf("source_file has no document"))?;
    let doc_id = required(document, "DOCID")?;

    let mut builder = SpanGraphBuilder::new(Document::new(doc_id, source));
    for entity in &document.children {
        if entity.name != "entity" {
            debug!(document = doc_id, element = %entity.name, "non-entity element skipped");
            continue;
        }
        read_entity(&mut builder, entity, munge_primary_mentions)?;
    }

    let graph = builder.build();
    debug!(
        document = doc_id,
        entities = graph.entity_groups().len(),
        annotations = graph.num_annotations(),
        "apf document read"
    );
    Ok(ApfDocument { uri, graph })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const SOURCE: &str = "John Smith met Mary. He left.";

    fn apf(mentions: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<source_file URI="doc.source" SOURCE="unknown" TYPE="text" VERSION="5.0">
  <document DOCID="doc">
    <entity ID="E1" TYPE="IDENT">
{mentions}
    </entity>
    <relation ID="R1"/>
  </document>
</source_file>
"#
        )
    }

    fn mention(id: &str, primary: bool, start: usize, end_incl: usize) -> String {
        format!(
            r#"      <entity_mention ID="{id}" TYPE="NAM" PRIMARY="{primary}" LDCATR="FALSE" METONYMY_MENTION="FALSE">
        <extent><charseq START="{start}" END="{end_incl}">{}</charseq></extent>
      </entity_mention>"#,
            &SOURCE[start..=end_incl]
        )
    }

    fn member_starts(doc: &ApfDocument) -> Vec<usize> {
        let groups = doc.graph.entity_groups();
        let (_, members) = groups.into_iter().next().unwrap();
        members.iter().map(|m| doc.graph.mention_span(m).unwrap().start).collect()
    }

    #[test]
    fn test_primary_marker_leads() {
        let input = apf(&[mention("E1-1", false, 0, 9), mention("E1-2", true, 21, 22)].join("\n"));
        let doc = read_apf(&input, SOURCE, false).unwrap();
        assert_eq!(doc.uri, "doc.source");
        assert_eq!(doc.graph.document().id(), "doc");
        assert_eq!(member_starts(&doc), vec![21, 0]);
    }

    #[test]
    fn test_munge_makes_earliest_primary() {
        let input = apf(&[mention("E1-1", false, 0, 9), mention("E1-2", true, 21, 22)].join("\n"));
        let doc = read_apf(&input, SOURCE, true).unwrap();
        assert_eq!(member_starts(&doc), vec![0, 21]);
    }

    #[test]
    fn test_inclusive_end_becomes_exclusive() {
        let input = apf(&mention("E1-1", true, 0, 9));
        let doc = read_apf(&input, SOURCE, false).unwrap();
        let groups = doc.graph.entity_groups();
        let (primary, _) = groups.into_iter().next().unwrap();
        assert_eq!(doc.graph.mention_span(primary).unwrap(), Span::new(0, 10));
    }

    #[test]
    fn test_charseq_mismatch_is_invalid() {
        let input = apf(&mention("E1-1", true, 0, 9));
        let err = read_apf(&input, "Jane Smith met Mary. He left.", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        assert!(err.to_string().contains("doesn't match"));
    }

    #[test]
    fn test_charseq_past_end_is_invalid() {
        let input = apf(&mention("E1-1", true, 0, 9));
        assert_eq!(read_apf(&input, "John", false).unwrap_err().kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn test_bad_primary_value_is_invalid() {
        let input = apf(&mention("E1-1", true, 0, 9)).replace(r#"PRIMARY="true""#, r#"PRIMARY="yes""#);
        assert_eq!(read_apf(&input, SOURCE, false).unwrap_err().kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn test_callisto_root_is_rejected() {
        let err = read_apf("<Corpus/>", SOURCE, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }
}
