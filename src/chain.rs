//! Coreference chains extracted from a Callisto graph.
//!
//! A chain is one entity region: an optional head naming the entity and
//! its type, followed by every member mention in container order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::types::{Span, SpanGraph};

/// Identity relation type, also given to machine-generated entities.
pub const IDENT: &str = "IDENT";
/// Appositive relation type.
pub const APPOS: &str = "APPOS";

/// Prefixes tried, in order, when a mention id names no known entity.
const ANNOTATOR_PREFIXES: [&str; 2] = ["ann1-", "ann2-"];

/// Resolved identity of a chain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainHead {
    /// Entity id after suffix stripping and prefix resolution.
    pub entity_id: String,
    /// Entity type.
    pub entity_type: String,
}

/// One mention of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainMention {
    /// Mention id as written in the source annotation.
    pub id: String,
    /// True for the entity's primary mention.
    pub primary: bool,
    /// First character.
    pub start: usize,
    /// One past the last character.
    pub end: usize,
    /// Mention type, reported as the subtype.
    pub subtype: Option<String>,
    /// Covered source text.
    pub text: String,
}

impl ChainMention {
    /// The mention's span.
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// An ordered list of co-referring mentions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Entity id and type; absent when metadata was not requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<ChainHead>,
    /// Members in container order.
    pub mentions: Vec<ChainMention>,
}

impl Chain {
    /// Spans of every mention, in chain order.
    pub fn spans(&self) -> Vec<Span> {
        self.mentions.iter().map(ChainMention::span).collect()
    }
}

/// Chains of one document plus its source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainList {
    /// Document identifier.
    pub document_id: String,
    /// Chains sorted by primary mention id.
    pub chains: Vec<Chain>,
    /// Source text the offsets refer to.
    pub source: String,
}

/// Drop a trailing `-<digits>` mention counter from an id.
pub fn strip_mention_suffix(id: &str) -> &str {
    match id.rsplit_once('-') {
        Some((stem, digits)) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            stem
        }
        _ => id,
    }
}

/// Resolve the entity a primary mention id belongs to.
///
/// The mention counter is stripped first. An id still unknown is retried
/// with the `ann1-` and `ann2-` annotator prefixes. Ids starting with `m_`
/// are machine generated and always `IDENT`; an unknown id containing
/// `-m_` is treated the same way. Anything else unknown is `BadFormat`.
pub fn resolve_entity(mention_id: &str, entity_types: &BTreeMap<&str, &str>) -> Result<ChainHead> {
    let stem = strip_mention_suffix(mention_id);
    let entity_id = if entity_types.contains_key(stem) {
        stem.to_string()
    } else {
        ANNOTATOR_PREFIXES
            .iter()
            .map(|prefix| format!("{prefix}{stem}"))
            .find(|candidate| entity_types.contains_key(candidate.as_str()))
            .unwrap_or_else(|| stem.to_string())
    };

    let entity_type = if entity_id.starts_with("m_") {
        IDENT.to_string()
    } else if let Some(t) = entity_types.get(entity_id.as_str()) {
        (*t).to_string()
    } else if entity_id.contains("-m_") {
        IDENT.to_string()
    } else {
        return Err(ConvertError::BadFormat(format!(
            "missing type entry for entity id {entity_id} (mention {mention_id})"
        )));
    };

    Ok(ChainHead {
        entity_id,
        entity_type,
    })
}

/// Extract every chain of `graph`, sorted by primary mention id.
///
/// With `include_metadata` each chain carries its resolved [`ChainHead`].
/// Fails with `NoAnnotationFound` when the graph has no entity regions.
pub fn extract_chains(graph: &SpanGraph, include_metadata: bool) -> Result<Vec<Chain>> {
    let groups = graph.entity_groups();
    if groups.is_empty() {
        return Err(ConvertError::NoAnnotationFound);
    }
    let entity_types = graph.entity_types();
    let document = graph.document();

    let mut chains = Vec::with_capacity(groups.len());
    for (primary, members) in groups {
        let head = if include_metadata {
            Some(resolve_entity(&graph.mention(primary)?.ace_id, &entity_types)?)
        } else {
            None
        };

        let mut mentions = Vec::with_capacity(members.len());
        for member in members {
            let span = graph.mention_span(member)?;
            let attrs = graph.mention(member)?;
            mentions.push(ChainMention {
                id: attrs.ace_id.clone(),
                primary: member == primary,
                start: span.start,
                end: span.end,
                subtype: attrs.kind.clone(),
                text: document.slice(span),
            });
        }
        chains.push(Chain { head, mentions });
    }

    debug!(document = document.id(), chains = chains.len(), "chains extracted");
    Ok(chains)
}

/// Extract chains together with the document id and source text.
pub fn chain_list(graph: &SpanGraph, include_metadata: bool) -> Result<ChainList> {
    Ok(ChainList {
        document_id: graph.document().id().to_string(),
        chains: extract_chains(graph, include_metadata)?,
        source: graph.document().text().to_string(),
    })
}
