//! Golden tests for aif-convert.
//!
//! End-to-end conversions over small fixture documents, checking offsets,
//! primary ordering, chain output, SGML rendering and scoring.

use std::collections::BTreeSet;

use aif_convert::{
    apf_to_callisto, b_cubed, callisto_to_apf, callisto_to_chain_lists, callisto_to_sgml,
    chain_list_fingerprint, desubtokenize, extract_chains, flat_markup, graph_fingerprint,
    read_apf, read_callisto, score, write_callisto, DesubtokenizeOptions, Document, ErrorKind, MarkupKind, SgmlOptions,
    Span, SpanGraph,
};

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

const SOURCE: &str = "John Smith met Mary Jones in Paris. He said she would call him later.";

fn charseq(start: usize, end_incl: usize) -> String {
    format!(
        r#"<charseq START="{start}" END="{end_incl}">{}</charseq>"#,
        &SOURCE[start..=end_incl]
    )
}

fn mention(id: &str, kind: &str, primary: bool, start: usize, end_incl: usize) -> String {
    // attribute order differs from what the writer produces
    format!(
        r#"      <entity_mention LDCATR="FALSE" TYPE="{kind}" ID="{id}" PRIMARY="{primary}">
        <extent>{seq}</extent>
        <head>{seq}</head>
      </entity_mention>
"#,
        seq = charseq(start, end_incl)
    )
}

type MentionSpec = (&'static str, &'static str, bool, usize, usize);

fn apf_document(entities: &[(&str, &[MentionSpec])]) -> String {
    let mut apf = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE source_file SYSTEM "apf.v5.1.5.dtd">
<source_file TYPE="text" URI="file://doc1.source" SOURCE="newswire">
  <document DOCID="doc1">
"#,
    );
    for (id, mentions) in entities {
        apf.push_str(&format!("    <entity TYPE=\"IDENT\" ID=\"{id}\">\n"));
        for &(mention_id, kind, primary, start, end_incl) in mentions.iter() {
            apf.push_str(&mention(mention_id, kind, primary, start, end_incl));
        }
        apf.push_str("      <entity_attributes/>\n    </entity>\n");
    }
    apf.push_str("    <relation ID=\"R1\" TYPE=\"LOC\"/>\n  </document>\n</source_file>\n");
    apf
}

/// Three entities. The primary of E2 is not its earliest mention and E3
/// has a single mention.
fn fixture_apf() -> String {
    apf_document(&[
        ("E1", &[("E1-1", "NAM", true, 0, 9), ("E1-2", "PRO", false, 36, 37), ("E1-3", "PRO", false, 59, 61)]),
        ("E2", &[("E2-1", "NAM", false, 15, 24), ("E2-2", "PRO", true, 44, 46)]),
        ("E3", &[("E3-1", "NAM", true, 29, 33)]),
    ])
}

/// The fixture with `she` moved from E2 into E1.
fn merged_response_apf() -> String {
    apf_document(&[
        (
            "E1",
            &[
                ("E1-1", "NAM", true, 0, 9),
                ("E1-2", "PRO", false, 36, 37),
                ("E1-3", "PRO", false, 59, 61),
                ("E1-4", "PRO", false, 44, 46),
            ],
        ),
        ("E2", &[("E2-1", "NAM", true, 15, 24)]),
        ("E3", &[("E3-1", "NAM", true, 29, 33)]),
    ])
}

fn fixture_callisto() -> String {
    apf_to_callisto(&fixture_apf(), SOURCE, false).unwrap()
}

type Tuple = (String, String, String, usize, usize, Option<String>);

/// `(entity_id, entity_type, mention_id, start, end, subtype)` of every
/// mention in an APF document.
fn apf_tuples(apf: &str, source: &str) -> BTreeSet<Tuple> {
    let graph = read_apf(apf, source, false).unwrap().graph;
    extract_chains(&graph, true)
        .unwrap()
        .into_iter()
        .flat_map(|chain| {
            let head = chain.head.unwrap();
            chain.mentions.into_iter().map(move |m| {
                (
                    head.entity_id.clone(),
                    head.entity_type.clone(),
                    m.id,
                    m.start,
                    m.end,
                    m.subtype,
                )
            })
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// APF ⇄ Callisto
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_round_trip_preserves_mention_tuples() {
    let output = callisto_to_apf(&fixture_callisto()).unwrap();
    assert_eq!(output.source, SOURCE);

    let expected: BTreeSet<Tuple> = [
        ("E1", "E1-1", 0, 10, "NAM"),
        ("E1", "E1-2", 36, 38, "PRO"),
        ("E1", "E1-3", 59, 62, "PRO"),
        ("E2", "E2-1", 15, 25, "NAM"),
        ("E2", "E2-2", 44, 47, "PRO"),
        ("E3", "E3-1", 29, 34, "NAM"),
    ]
    .into_iter()
    .map(|(e, m, s, t, k)| (e.into(), "IDENT".into(), m.into(), s, t, Some(k.into())))
    .collect();

    assert_eq!(apf_tuples(&fixture_apf(), SOURCE), expected);
    assert_eq!(apf_tuples(&output.apf, &output.source), expected);
}

#[test]
fn test_callisto_end_is_apf_end_plus_one() {
    let chains = callisto_to_chain_lists(&fixture_callisto(), true).unwrap();
    let john = &chains.chains[0].mentions[0];
    assert_eq!((john.start, john.end), (0, 10));
    assert_eq!(john.text, "John Smith");

    let apf = callisto_to_apf(&fixture_callisto()).unwrap().apf;
    assert!(apf.contains(r#"<charseq START="0" END="9">John Smith</charseq>"#));
    assert!(apf.contains(r#"<charseq START="59" END="61">him</charseq>"#));
}

#[test]
fn test_apf_writer_header_and_mentions() {
    let apf = callisto_to_apf(&fixture_callisto()).unwrap().apf;
    assert!(apf.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
    assert!(apf.contains(
        r#"<source_file URI="file://doc1" SOURCE="unknown" TYPE="text" VERSION="5.0" AUTHOR="unknown" ENCODING="UTF-8">"#
    ));
    assert!(apf.contains(r#"<document DOCID="doc1">"#));
    assert!(apf.contains(
        r#"<entity_mention ID="E2-2" TYPE="PRO" PRIMARY="true" METONYMY_MENTION="FALSE" LDCATR="FALSE">"#
    ));
    assert!(!apf.contains("relation"));
}

#[test]
fn test_primary_follows_marker_without_munging() {
    let chains = callisto_to_chain_lists(&fixture_callisto(), true).unwrap();
    let e2 = chains
        .chains
        .iter()
        .find(|c| c.head.as_ref().is_some_and(|h| h.entity_id == "E2"))
        .unwrap();
    assert_eq!(e2.mentions[0].text, "she");
    assert!(e2.mentions[0].primary);
}

#[test]
fn test_munged_primary_is_earliest_mention() {
    let xml = apf_to_callisto(&fixture_apf(), SOURCE, true).unwrap();
    let chains = callisto_to_chain_lists(&xml, true).unwrap();
    for chain in &chains.chains {
        let earliest = chain.mentions.iter().map(|m| m.start).min().unwrap();
        assert_eq!(chain.mentions[0].start, earliest);
        assert!(chain.mentions[0].primary);
    }
    let e2 = &chains.chains[1];
    assert_eq!(e2.head.as_ref().unwrap().entity_id, "E2");
    assert_eq!(e2.mentions[0].text, "Mary Jones");
}

#[test]
fn test_callisto_rewrite_is_stable() {
    let first = fixture_callisto();
    let graph = read_callisto(&first).unwrap();
    assert_eq!(graph.document().id(), "doc1");
    assert_eq!(write_callisto(&graph, "file://doc1.source"), first);
}

#[test]
fn test_source_mismatch_is_reported_with_offsets() {
    let err = apf_to_callisto(&fixture_apf(), &SOURCE.replace("Paris", "Rome!"), false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    assert!(err.to_string().contains("source file doesn't match apf"));
}

#[test]
fn test_apf_given_as_callisto_is_rejected() {
    let err = callisto_to_apf(&fixture_apf()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    assert!(err.to_string().contains("it is apf"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Chains
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_chain_lists_are_ordered_and_complete() {
    let chains = callisto_to_chain_lists(&fixture_callisto(), true).unwrap();
    assert_eq!(chains.document_id, "doc1");
    assert_eq!(chains.source, SOURCE);

    let ids: Vec<&str> = chains
        .chains
        .iter()
        .map(|c| c.head.as_ref().unwrap().entity_id.as_str())
        .collect();
    assert_eq!(ids, ["E1", "E2", "E3"]);

    let texts: Vec<&str> = chains.chains[0].mentions.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["John Smith", "He", "him"]);
}

#[test]
fn test_chain_fingerprint_ignores_xml_layout() {
    let a = callisto_to_chain_lists(&fixture_callisto(), false).unwrap();
    let reindented = fixture_callisto().replace("\n  ", "\n    ");
    let b = callisto_to_chain_lists(&reindented, false).unwrap();
    assert_eq!(chain_list_fingerprint(&a), chain_list_fingerprint(&b));

    let graph_a = read_callisto(&fixture_callisto()).unwrap();
    let graph_b = read_callisto(&reindented).unwrap();
    assert_eq!(graph_fingerprint(&graph_a), graph_fingerprint(&graph_b));
}

// ─────────────────────────────────────────────────────────────────────────────
// SGML
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_coref_sgml_golden() {
    let out = callisto_to_sgml(&fixture_callisto(), &SgmlOptions::default(), None).unwrap();
    assert_eq!(out.kind, MarkupKind::Coref);
    assert_eq!(out.relocated, 0);
    assert_eq!(
        out.text,
        concat!(
            "<DOC DOCNO=\"doc1\">\n",
            "<COREF-ID=\"E1\"-TYPE=\"IDENT\">John Smith</COREF> met ",
            "<COREF-ID=\"E2\"-TYPE=\"IDENT\">Mary Jones</COREF> in Paris. ",
            "<COREF-ID=\"E1\"-TYPE=\"IDENT\">He</COREF> said ",
            "<COREF-ID=\"E2\"-TYPE=\"IDENT\">she</COREF> would call ",
            "<COREF-ID=\"E1\"-TYPE=\"IDENT\">him</COREF> later.\n",
            "</DOC>\n"
        )
    );
}

#[test]
fn test_unwrapped_sgml_ends_with_newline() {
    let options = SgmlOptions { wrap_doc: false, ..Default::default() };
    let out = callisto_to_sgml(&fixture_callisto(), &options, None).unwrap();
    assert!(out.text.starts_with("<COREF-ID=\"E1\""));
    assert!(out.text.ends_with("later.\n"));
}

fn with_name_annotation(callisto: &str) -> String {
    let names = r##"  <Analysis id="Ana7" type="generic-set" role="generic-set">
    <AnnotationSet containedType="PERSON">
      <Annotation id="Name0000" type="PERSON">
        <RegionRef xlink:href="#Reg0000" role="extent" xlink:type="simple"/>
      </Annotation>
    </AnnotationSet>
  </Analysis>
</Corpus>"##;
    callisto.replace("</Corpus>", names)
}

#[test]
fn test_mixed_annotation_kinds_are_rejected() {
    let err = callisto_to_sgml(&with_name_annotation(&fixture_callisto()), &SgmlOptions::default(), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MixedAnnotationKinds);
}

/// A Callisto document with no chains and one text extent, `Reg0000`,
/// over "John Smith" for name annotations to point at.
fn name_extent_callisto() -> String {
    let empty = SpanGraph::new(Document::new("doc1", SOURCE));
    write_callisto(&empty, "doc1.source")
        .replace(
            "<AnchorSet containedType=\"text-point\">\n",
            concat!(
                "<AnchorSet containedType=\"text-point\">\n",
                "    <Anchor id=\"Anc0000\" type=\"text-point\"><Parameter type=\"char\" unit=\"NULL_UNIT\" role=\"char\">0</Parameter></Anchor>\n",
                "    <Anchor id=\"Anc0001\" type=\"text-point\"><Parameter type=\"char\" unit=\"NULL_UNIT\" role=\"char\">10</Parameter></Anchor>\n",
            ),
        )
        .replace(
            "<RegionSet containedType=\"text-extent\">\n",
            concat!(
                "<RegionSet containedType=\"text-extent\">\n",
                "    <Region id=\"Reg0000\" type=\"text-extent\">",
                "<AnchorRef xlink:href=\"#Anc0001\" role=\"end\"/>",
                "<AnchorRef xlink:href=\"#Anc0000\" role=\"start\"/></Region>\n",
            ),
        )
}

#[test]
fn test_name_markup_uses_name_tags() {
    let xml = with_name_annotation(&name_extent_callisto());

    let options = SgmlOptions { wrap_doc: false, ..Default::default() };
    let out = callisto_to_sgml(&xml, &options, None).unwrap();
    assert_eq!(out.kind, MarkupKind::Name);
    assert!(out.text.starts_with("<PERSON>John Smith</PERSON> met"));
}

#[test]
fn test_names_on_one_span_nest() {
    let names = r##"  <Analysis id="Ana7" type="generic-set" role="generic-set">
    <AnnotationSet containedType="PERSON">
      <Annotation id="Name0000" type="PERSON"><RegionRef xlink:href="#Reg0000"/></Annotation>
    </AnnotationSet>
    <AnnotationSet containedType="NAME">
      <Annotation id="Name0001" type="NAME"><RegionRef xlink:href="#Reg0000"/></Annotation>
    </AnnotationSet>
  </Analysis>
</Corpus>"##;
    let xml = name_extent_callisto().replace("</Corpus>", names);

    let options = SgmlOptions { wrap_doc: false, ..Default::default() };
    let out = callisto_to_sgml(&xml, &options, None).unwrap();
    assert_eq!(
        out.text,
        "<PERSON><NAME>John Smith</NAME></PERSON> met Mary Jones in Paris. He said she would call him later.\n"
    );
    assert_eq!(out.relocated, 0);
}

#[test]
fn test_no_annotation_found() {
    let empty = SpanGraph::new(Document::new("doc1", SOURCE));
    let xml = write_callisto(&empty, "doc1.source");
    let err = callisto_to_sgml(&xml, &SgmlOptions::default(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoAnnotationFound);
    let err = callisto_to_apf(&xml).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoAnnotationFound);
}

// ─────────────────────────────────────────────────────────────────────────────
// Cross-bracketing
// ─────────────────────────────────────────────────────────────────────────────

fn two_entity_apf(a: (usize, usize), b: (usize, usize), source: &str) -> String {
    let seq = |(s, e): (usize, usize)| {
        format!(r#"<charseq START="{s}" END="{e}">{}</charseq>"#, &source[s..=e])
    };
    let len = source.len();
    format!(
        r#"<source_file URI="x.source"><document DOCID="x">
<entity ID="E1" TYPE="IDENT">
<entity_mention ID="E1-1" TYPE="NAM" PRIMARY="true"><extent>{}</extent></entity_mention>
<entity_mention ID="E1-2" TYPE="PRO" PRIMARY="false"><extent>{}</extent></entity_mention>
</entity>
<entity ID="E2" TYPE="IDENT">
<entity_mention ID="E2-1" TYPE="NAM" PRIMARY="true"><extent>{}</extent></entity_mention>
<entity_mention ID="E2-2" TYPE="PRO" PRIMARY="false"><extent>{}</extent></entity_mention>
</entity>
</document></source_file>"#,
        seq(a),
        seq((len - 5, len - 4)),
        seq(b),
        seq((len - 2, len - 1)),
    )
}

#[test]
fn test_partial_overlap_raises_cross_bracketing() {
    let source = "abcdefgh ij kl";
    // [0, 5) and [3, 8)
    let xml = apf_to_callisto(&two_entity_apf((0, 4), (3, 7), source), source, false).unwrap();
    let err = callisto_to_sgml(&xml, &SgmlOptions::default(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CrossBracketing);
    assert!(err.to_string().contains("abcde"));
}

#[test]
fn test_overlap_on_single_space_is_accepted() {
    let source = "abcd efgh ij kl";
    // [0, 5) and [4, 8); offset 4 is a space
    let xml = apf_to_callisto(&two_entity_apf((0, 4), (4, 7), source), source, false).unwrap();
    let markup = flat_markup(&read_callisto(&xml).unwrap()).unwrap();
    assert_eq!(markup.kind, MarkupKind::Coref);
    assert_eq!(markup.spans.len(), 4);
}

// ─────────────────────────────────────────────────────────────────────────────
// Desubtokenizer
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_desubtokenizer_golden() {
    let options = DesubtokenizeOptions { add_offset_notations: true, delete_interrupted: false };
    let out = desubtokenize("pre-<X>Tuesday</X>", options).unwrap();
    assert_eq!(out.text, r#"<X-S_OFF="4">pre-Tuesday</X>"#);
    assert_eq!(out.changes, 1);
}

#[test]
fn test_desubtokenizer_leaves_aligned_tags() {
    let options = DesubtokenizeOptions { add_offset_notations: true, delete_interrupted: false };
    let text = "<A>Mary</A> and <B>John <C>Smith</C></B> left .";
    let out = desubtokenize(text, options).unwrap();
    assert_eq!(out.text, text);
    assert_eq!(out.changes, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Scoring
// ─────────────────────────────────────────────────────────────────────────────

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_bcubed_split_chain() {
    let spans = |raw: &[&[usize]]| -> Vec<Vec<Span>> {
        raw.iter()
            .map(|c| c.iter().map(|&m| Span::new(m, m + 1)).collect())
            .collect()
    };
    let result = b_cubed(&spans(&[&[1, 2, 3]]), &spans(&[&[1, 2], &[3]])).unwrap();
    assert!(close(result.precision, 1.0));
    // per-mention recall: (2/3 + 2/3 + 1/3) / 3
    assert!(close(result.recall, 5.0 / 9.0));
}

#[test]
fn test_score_identical_documents() {
    let key = fixture_callisto();
    let result = score(&key, &key).unwrap();
    assert!(close(result.precision, 1.0));
    assert!(close(result.recall, 1.0));
}

#[test]
fn test_score_merged_response() {
    let key = fixture_callisto();
    let response = apf_to_callisto(&merged_response_apf(), SOURCE, false).unwrap();
    let result = score(&key, &response).unwrap();
    // response {John, He, him, she} {Mary} {Paris} against
    // key {John, He, him} {Mary, she} {Paris}
    assert!(close(result.precision, 4.5 / 6.0));
    assert!(close(result.recall, 5.0 / 6.0));
}

#[test]
fn test_score_rejects_different_sources() {
    let key = fixture_callisto();
    let other = SOURCE.replace("later", "LATER");
    let response = apf_to_callisto(&fixture_apf(), &other, false).unwrap();
    let err = score(&key, &response).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceMismatch);
}
