//! Regions: groupings of anchors or of other regions and annotations.

use serde::{Deserialize, Serialize};

use super::id::ElementId;

/// A region of the annotation graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Region {
    /// A stretch of text between two anchors.
    TextExtent {
        /// Anchor at the first character.
        start: ElementId,
        /// Anchor one past the last character.
        end: ElementId,
    },
    /// A mention's full and head text extents. The source formats never
    /// distinguish the two, so both normally point at identical extents.
    HeadFull {
        /// Text-extent region of the full mention.
        full: ElementId,
        /// Text-extent region of the head.
        head: ElementId,
    },
    /// The mentions of one entity. `primary` is the representative mention;
    /// `mentions` lists every member (primary included) in container order.
    Entity {
        /// The primary mention annotation.
        primary: ElementId,
        /// All member annotations.
        mentions: Vec<ElementId>,
    },
}

impl Region {
    /// Callisto `containedType` of the region set this region belongs to.
    pub fn contained_type(&self) -> &'static str {
        match self {
            Self::TextExtent { .. } => "text-extent",
            Self::HeadFull { .. } => "head-full",
            Self::Entity { .. } => "ace_entity_region",
        }
    }
}
