//! Annotations: typed attribute sets attached to regions.

use serde::{Deserialize, Serialize};

use super::id::ElementId;

/// Attributes of an entity mention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionAttributes {
    /// Mention id as written in the source annotation.
    pub ace_id: String,
    /// Annotator-attribution flag.
    pub ldcatr: bool,
    /// Free-form LDC mention type.
    pub ldctype: String,
    /// Metonymy flag.
    pub metonymy: bool,
    /// Reference string (unused by the source formats, kept for fidelity).
    pub reference: String,
    /// Role string (unused by the source formats, kept for fidelity).
    pub role: String,
    /// Mention type, which chains report as the mention subtype.
    pub kind: Option<String>,
}

/// Attributes of an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAttributes {
    /// Entity id.
    pub ace_id: String,
    /// Entity class.
    pub class: String,
    /// Entity type: `IDENT` or `APPOS` for coreference data.
    pub entity_type: String,
    /// Entity subtype.
    pub subtype: String,
}

/// An annotation of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    /// One mention, attached to a head-full (or text-extent) region.
    EntityMention {
        /// The mention's region.
        region: ElementId,
        /// Mention attributes.
        attrs: MentionAttributes,
    },
    /// One entity, attached to an entity region.
    Entity {
        /// The entity's region.
        region: ElementId,
        /// Entity attributes.
        attrs: EntityAttributes,
    },
    /// A flat name annotation over a text-extent region.
    Name {
        /// The named text extent.
        region: ElementId,
        /// Name category (the annotation set's `containedType`).
        kind: String,
    },
}

impl Annotation {
    /// The region this annotation is attached to.
    pub fn region(&self) -> &ElementId {
        match self {
            Self::EntityMention { region, .. }
            | Self::Entity { region, .. }
            | Self::Name { region, .. } => region,
        }
    }
}
