//! B-cubed agreement between two chain sets.
//!
//! Mentions are identified by their span. Each response mention
//! contributes `|k ∩ r| / |r|` to precision and `|k ∩ r| / |k|` to recall,
//! where `r` is its response chain and `k` the key chain containing it (or
//! the empty chain). The sums are divided by the number of response and
//! key mentions respectively.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::error::{ConvertError, Result};
use crate::types::{SpanGraph, Span};

/// Precision and recall of a response against a key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BCubed {
    /// Averaged over response mentions.
    pub precision: f64,
    /// Averaged over key mentions.
    pub recall: f64,
}

impl BCubed {
    /// Harmonic mean of precision and recall.
    pub fn f1(&self) -> f64 {
        if self.precision + self.recall > 0.0 {
            2.0 * self.precision * self.recall / (self.precision + self.recall)
        } else {
            0.0
        }
    }
}

/// Mention -> index of its chain. Fails if a mention is in two chains.
fn mention_index(chains: &[BTreeSet<Span>], set: &'static str) -> Result<BTreeMap<Span, usize>> {
    let mut index = BTreeMap::new();
    for (i, chain) in chains.iter().enumerate() {
        for span in chain {
            if let Some(first) = index.insert(*span, i) {
                return Err(ConvertError::SharedMention {
                    set,
                    start: span.start,
                    end: span.end,
                    first_chain: first,
                    second_chain: i,
                });
            }
        }
    }
    Ok(index)
}

/// Each chain as the set of mentions it identifies; a span listed twice
/// is one mention.
fn mention_sets(chains: &[Vec<Span>]) -> Vec<BTreeSet<Span>> {
    chains.iter().map(|c| c.iter().copied().collect()).collect()
}

/// Score `response` chains against `key` chains.
///
/// An empty key or response scores 0 on the side it divides.
pub fn b_cubed(key: &[Vec<Span>], response: &[Vec<Span>]) -> Result<BCubed> {
    let key_sets = mention_sets(key);
    let response_sets = mention_sets(response);
    let key_index = mention_index(&key_sets, "key")?;
    mention_index(&response_sets, "response")?;

    let mut precision = 0.0;
    let mut recall = 0.0;
    for r_chain in &response_sets {
        for mention in r_chain {
            let Some(&k) = key_index.get(mention) else {
                continue;
            };
            let k_chain = &key_sets[k];
            let common = r_chain.intersection(k_chain).count() as f64;
            precision += common / r_chain.len() as f64;
            recall += common / k_chain.len() as f64;
        }
    }

    let n_response: usize = response_sets.iter().map(BTreeSet::len).sum();
    let n_key: usize = key_sets.iter().map(BTreeSet::len).sum();
    Ok(BCubed {
        precision: if n_response > 0 { precision / n_response as f64 } else { 0.0 },
        recall: if n_key > 0 { recall / n_key as f64 } else { 0.0 },
    })
}

/// Score two extracted chain lists.
pub fn score_chains(key: &[Chain], response: &[Chain]) -> Result<BCubed> {
    let spans = |chains: &[Chain]| chains.iter().map(Chain::spans).collect::<Vec<_>>();
    b_cubed(&spans(key), &spans(response))
}

/// Score two Callisto graphs annotated over the same source.
///
/// Fails with `SourceMismatch` if the source texts differ.
pub fn score_graphs(key: &SpanGraph, response: &SpanGraph) -> Result<BCubed> {
    if key.document().text() != response.document().text() {
        return Err(ConvertError::SourceMismatch {
            key_digest: key.document().digest(),
            response_digest: response.document().digest(),
        });
    }
    let key_chains = crate::chain::extract_chains(key, false)?;
    let response_chains = crate::chain::extract_chains(response, false)?;
    score_chains(&key_chains, &response_chains)
}
