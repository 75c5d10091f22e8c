//! String-level conversions between the three formats.
//!
//! Each function parses its whole input, converts in memory and returns
//! the rendered output. The file API in [`crate::files`] wraps these.

use tracing::info;

use crate::apf::{read_apf, write_apf};
use crate::callisto::{read_callisto, write_callisto};
use crate::canonical::graph_fingerprint;
use crate::chain::{chain_list, extract_chains, ChainList};
use crate::error::Result;
use crate::score::{score_graphs, BCubed};
use crate::sgml::{graph_to_sgml, SgmlDocument, SgmlOptions, Transliterate};

/// APF text plus the source text it annotates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApfOutput {
    /// Rendered APF document.
    pub apf: String,
    /// Decoded source text.
    pub source: String,
}

/// Convert an APF document over `source` into Callisto/AIF XML.
///
/// The signal reference of the output is the APF `URI`.
pub fn apf_to_callisto(apf: &str, source: &str, munge_primary_mentions: bool) -> Result<String> {
    let document = read_apf(apf, source, munge_primary_mentions)?;
    let xml = write_callisto(&document.graph, &document.uri);
    info!(
        document = document.graph.document().id(),
        annotations = document.graph.num_annotations(),
        fingerprint = %graph_fingerprint(&document.graph),
        "apf converted to callisto"
    );
    Ok(xml)
}

/// Convert Callisto/AIF XML into APF, naming the source file after the
/// document id.
pub fn callisto_to_apf(callisto: &str) -> Result<ApfOutput> {
    let graph = read_callisto(callisto)?;
    let name = graph.document().id().to_string();
    callisto_graph_to_apf(&graph, &name)
}

/// Like [`callisto_to_apf`] with an explicit source file name for the URI.
pub fn callisto_to_apf_named(callisto: &str, name: &str) -> Result<ApfOutput> {
    callisto_graph_to_apf(&read_callisto(callisto)?, name)
}

fn callisto_graph_to_apf(graph: &crate::types::SpanGraph, name: &str) -> Result<ApfOutput> {
    let document = graph.document();
    let chains = extract_chains(graph, true)?;
    let apf = write_apf(document.id(), name, &chains)?;
    info!(document = document.id(), chains = chains.len(), "callisto converted to apf");
    Ok(ApfOutput {
        apf,
        source: document.text().to_string(),
    })
}

/// Extract the coreference chains of a Callisto/AIF document.
pub fn callisto_to_chain_lists(callisto: &str, include_metadata: bool) -> Result<ChainList> {
    chain_list(&read_callisto(callisto)?, include_metadata)
}

/// Render a Callisto/AIF document as inline-tagged SGML.
pub fn callisto_to_sgml(
    callisto: &str,
    options: &SgmlOptions,
    transliterator: Option<&dyn Transliterate>,
) -> Result<SgmlDocument> {
    graph_to_sgml(&read_callisto(callisto)?, options, transliterator)
}

/// B-cubed score of a response Callisto document against a key.
pub fn score(key: &str, response: &str) -> Result<BCubed> {
    let key = read_callisto(key)?;
    let response = read_callisto(response)?;
    let result = score_graphs(&key, &response)?;
    info!(
        document = key.document().id(),
        precision = result.precision,
        recall = result.recall,
        "scored"
    );
    Ok(result)
}
