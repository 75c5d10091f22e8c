//! In-memory annotation graph for one document.
//!
//! Anchors, regions and annotations live in id-keyed arenas and refer to
//! each other by [`ElementId`]. Nothing holds a pointer into anything
//! else, so the graph can be built in any order and checked afterwards
//! with [`SpanGraph::validate`].

use std::collections::BTreeMap;

use super::annotation::{Annotation, EntityAttributes, MentionAttributes};
use super::document::{Document, Span};
use super::id::{ElementId, IdCounter, IdKind};
use super::region::Region;
use crate::error::{ConvertError, Result};

fn unresolved(what: &str, id: &ElementId, from: &ElementId) -> ConvertError {
    ConvertError::InvalidFormat {
        format: "callisto",
        reason: format!("{what} {id} referenced from {from} does not exist"),
    }
}

/// The full annotation state of one document.
///
/// Uses BTreeMap for deterministic iteration order (sorted by id).
#[derive(Debug, Clone)]
pub struct SpanGraph {
    document: Document,
    /// Anchor id -> character offset.
    anchors: BTreeMap<ElementId, usize>,
    regions: BTreeMap<ElementId, Region>,
    annotations: BTreeMap<ElementId, Annotation>,
}

impl SpanGraph {
    /// Create an empty graph over `document`.
    pub fn new(document: Document) -> Self {
        Self {
            document,
            anchors: BTreeMap::new(),
            regions: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    /// The source document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Add an anchor. Fails on a duplicate id.
    pub fn insert_anchor(&mut self, id: ElementId, offset: usize) -> Result<()> {
        if self.anchors.contains_key(&id) {
            return Err(ConvertError::callisto(format!("duplicate anchor id {id}")));
        }
        self.anchors.insert(id, offset);
        Ok(())
    }

    /// Add a region. Fails on a duplicate id.
    pub fn insert_region(&mut self, id: ElementId, region: Region) -> Result<()> {
        if self.regions.contains_key(&id) {
            return Err(ConvertError::callisto(format!("duplicate region id {id}")));
        }
        self.regions.insert(id, region);
        Ok(())
    }

    /// Add an annotation. Fails on a duplicate id.
    pub fn insert_annotation(&mut self, id: ElementId, annotation: Annotation) -> Result<()> {
        if self.annotations.contains_key(&id) {
            return Err(ConvertError::callisto(format!("duplicate annotation id {id}")));
        }
        self.annotations.insert(id, annotation);
        Ok(())
    }

    /// All anchors, sorted by id.
    pub fn anchors(&self) -> impl Iterator<Item = (&ElementId, usize)> {
        self.anchors.iter().map(|(id, offset)| (id, *offset))
    }

    /// All regions, sorted by id.
    pub fn regions(&self) -> impl Iterator<Item = (&ElementId, &Region)> {
        self.regions.iter()
    }

    /// All annotations, sorted by id.
    pub fn annotations(&self) -> impl Iterator<Item = (&ElementId, &Annotation)> {
        self.annotations.iter()
    }

    /// Get number of anchors.
    pub fn num_anchors(&self) -> usize {
        self.anchors.len()
    }

    /// Get number of regions.
    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    /// Get number of annotations.
    pub fn num_annotations(&self) -> usize {
        self.annotations.len()
    }

    /// Look up a region.
    pub fn region(&self, id: &ElementId) -> Option<&Region> {
        self.regions.get(id)
    }

    /// Look up an annotation.
    pub fn annotation(&self, id: &ElementId) -> Option<&Annotation> {
        self.annotations.get(id)
    }

    /// Attributes of an entity-mention annotation.
    pub fn mention(&self, id: &ElementId) -> Result<&MentionAttributes> {
        match self.annotations.get(id) {
            Some(Annotation::EntityMention { attrs, .. }) => Ok(attrs),
            Some(_) => Err(ConvertError::callisto(format!(
                "annotation {id} is not an entity mention"
            ))),
            None => Err(ConvertError::callisto(format!(
                "entity mention {id} does not exist"
            ))),
        }
    }

    /// Entity id -> entity type, for every entity annotation.
    pub fn entity_types(&self) -> BTreeMap<&str, &str> {
        self.annotations
            .values()
            .filter_map(|a| match a {
                Annotation::Entity { attrs, .. } => {
                    Some((attrs.ace_id.as_str(), attrs.entity_type.as_str()))
                }
                _ => None,
            })
            .collect()
    }

    /// Primary mention id -> every mention of its entity, in container order.
    ///
    /// Sorted by primary id. Entity regions without members are left out;
    /// regions that share a primary collapse to the last one.
    pub fn entity_groups(&self) -> BTreeMap<&ElementId, &[ElementId]> {
        self.regions
            .values()
            .filter_map(|r| match r {
                Region::Entity { primary, mentions } if !mentions.is_empty() => {
                    Some((primary, mentions.as_slice()))
                }
                _ => None,
            })
            .collect()
    }

    /// Name annotations as `(span, kind)`, in annotation id order.
    pub fn names(&self) -> Result<Vec<(Span, &str)>> {
        let mut out = Vec::new();
        for (id, annotation) in &self.annotations {
            if let Annotation::Name { region, kind } = annotation {
                out.push((self.region_span(region, id)?, kind.as_str()));
            }
        }
        Ok(out)
    }

    /// Character offset of an anchor.
    pub fn anchor_offset(&self, id: &ElementId, from: &ElementId) -> Result<usize> {
        self.anchors
            .get(id)
            .copied()
            .ok_or_else(|| unresolved("anchor", id, from))
    }

    /// Span of a text-extent region, looking through a head-full region to
    /// its full extent.
    pub fn region_span(&self, id: &ElementId, from: &ElementId) -> Result<Span> {
        match self.regions.get(id) {
            Some(Region::TextExtent { start, end }) => Ok(Span::new(
                self.anchor_offset(start, id)?,
                self.anchor_offset(end, id)?,
            )),
            Some(Region::HeadFull { full, .. }) => match self.regions.get(full) {
                Some(Region::TextExtent { start, end }) => Ok(Span::new(
                    self.anchor_offset(start, full)?,
                    self.anchor_offset(end, full)?,
                )),
                Some(_) => Err(ConvertError::callisto(format!(
                    "full region {full} of {id} is not a text extent"
                ))),
                None => Err(unresolved("region", full, id)),
            },
            Some(Region::Entity { .. }) => Err(ConvertError::callisto(format!(
                "region {id} referenced from {from} is an entity region, not a text extent"
            ))),
            None => Err(unresolved("region", id, from)),
        }
    }

    /// Span of an entity-mention annotation.
    pub fn mention_span(&self, id: &ElementId) -> Result<Span> {
        match self.annotations.get(id) {
            Some(Annotation::EntityMention { region, .. }) => self.region_span(region, id),
            Some(_) => Err(ConvertError::callisto(format!(
                "annotation {id} is not an entity mention"
            ))),
            None => Err(ConvertError::callisto(format!(
                "entity mention {id} does not exist"
            ))),
        }
    }

    /// Check that every reference resolves and every span fits the document.
    pub fn validate(&self) -> Result<()> {
        for (id, region) in &self.regions {
            match region {
                Region::TextExtent { start, end } => {
                    let span = Span::new(self.anchor_offset(start, id)?, self.anchor_offset(end, id)?);
                    if !self.document.contains(span) {
                        return Err(ConvertError::callisto(format!(
                            "region {id} spans {span} outside a document of {} characters",
                            self.document.len()
                        )));
                    }
                }
                Region::HeadFull { full, head } => {
                    self.region_span(full, id)?;
                    self.region_span(head, id)?;
                }
                Region::Entity { primary, mentions } => {
                    self.mention(primary)?;
                    for mention in mentions {
                        self.mention(mention)?;
                    }
                }
            }
        }

        for (id, annotation) in &self.annotations {
            match annotation {
                Annotation::EntityMention { region, .. } | Annotation::Name { region, .. } => {
                    self.region_span(region, id)?;
                }
                Annotation::Entity { region, .. } => match self.regions.get(region) {
                    Some(Region::Entity { .. }) => {}
                    Some(_) => {
                        return Err(ConvertError::callisto(format!(
                            "entity {id} is attached to {region}, which is not an entity region"
                        )))
                    }
                    None => return Err(unresolved("region", region, id)),
                },
            }
        }
        Ok(())
    }
}

/// Builds a [`SpanGraph`] with freshly allocated ids.
///
/// The builder owns its [`IdCounter`], so concurrent conversions never
/// share id sequences.
#[derive(Debug)]
pub struct SpanGraphBuilder {
    graph: SpanGraph,
    ids: IdCounter,
}

impl SpanGraphBuilder {
    /// Start a graph over `document`.
    pub fn new(document: Document) -> Self {
        Self {
            graph: SpanGraph::new(document),
            ids: IdCounter::new(),
        }
    }

    /// The document being annotated.
    pub fn document(&self) -> &Document {
        self.graph.document()
    }

    /// Add an anchor at `offset`.
    pub fn anchor(&mut self, offset: usize) -> ElementId {
        let id = self.ids.next(IdKind::Anchor);
        self.graph.anchors.insert(id.clone(), offset);
        id
    }

    /// Add a text-extent region between two anchors.
    pub fn text_extent(&mut self, start: ElementId, end: ElementId) -> ElementId {
        self.region(Region::TextExtent { start, end })
    }

    /// Add a head-full region.
    pub fn head_full(&mut self, full: ElementId, head: ElementId) -> ElementId {
        self.region(Region::HeadFull { full, head })
    }

    /// Add an entity region; the first mention is the primary.
    pub fn entity_region(&mut self, mentions: Vec<ElementId>) -> Result<ElementId> {
        let primary = mentions
            .first()
            .cloned()
            .ok_or_else(|| ConvertError::BadFormat("entity region without mentions".into()))?;
        Ok(self.region(Region::Entity { primary, mentions }))
    }

    /// Add an entity-mention annotation.
    pub fn mention(&mut self, region: ElementId, attrs: MentionAttributes) -> ElementId {
        self.annotation(Annotation::EntityMention { region, attrs })
    }

    /// Add an entity annotation.
    pub fn entity(&mut self, region: ElementId, attrs: EntityAttributes) -> ElementId {
        self.annotation(Annotation::Entity { region, attrs })
    }

    /// Add the anchors, two identical text extents and the head-full region
    /// for one mention span, returning the head-full region id.
    pub fn mention_region(&mut self, span: Span) -> ElementId {
        let start = self.anchor(span.start);
        let end = self.anchor(span.end);
        let full = self.text_extent(start.clone(), end.clone());
        let head = self.text_extent(start, end);
        self.region(Region::HeadFull { full, head })
    }

    /// Finish building.
    pub fn build(self) -> SpanGraph {
        self.graph
    }

    fn region(&mut self, region: Region) -> ElementId {
        let id = self.ids.next(IdKind::Region);
        self.graph.regions.insert(id.clone(), region);
        id
    }

    fn annotation(&mut self, annotation: Annotation) -> ElementId {
        let id = self.ids.next(IdKind::Annotation);
        self.graph.annotations.insert(id.clone(), annotation);
        id
    }
}
