//! File API and batch driver tests over a temporary directory.

use std::fs;
use std::path::Path;

use aif_convert::files::{
    apf_to_callisto_file, callisto_file_to_chain_lists, callisto_to_apf_file, callisto_to_sgml_file,
    score_files,
};
use aif_convert::{BatchOp, BatchRunner, ConvertConfig, ErrorKind};

const SOURCE: &str = "Ann met Bo. She smiled.";

const APF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<source_file URI="file://story.source" SOURCE="unknown" TYPE="text">
  <document DOCID="story">
    <entity ID="E1" TYPE="IDENT">
      <entity_mention ID="E1-1" TYPE="NAM" PRIMARY="true">
        <extent><charseq START="0" END="2">Ann</charseq></extent>
      </entity_mention>
      <entity_mention ID="E1-2" TYPE="PRO" PRIMARY="false">
        <extent><charseq START="12" END="14">She</charseq></extent>
      </entity_mention>
    </entity>
  </document>
</source_file>
"#;

/// Write the APF pair into `dir` and convert it, returning the Callisto path.
fn callisto_in(dir: &Path) -> std::path::PathBuf {
    let apf = dir.join("story.apf");
    let source = dir.join("story.source");
    fs::write(&apf, APF).unwrap();
    fs::write(&source, SOURCE).unwrap();
    apf_to_callisto_file(&apf, &source, None, &ConvertConfig::default()).unwrap()
}

#[test]
fn test_default_output_names() {
    let dir = tempfile::tempdir().unwrap();
    let callisto = callisto_in(dir.path());
    assert_eq!(callisto, dir.path().join("story.apf.aif.xml"));

    let (apf, source) = callisto_to_apf_file(&callisto, None, None).unwrap();
    assert_eq!(apf, dir.path().join("story.apf.aif.xml.apf"));
    assert_eq!(source, dir.path().join("story.apf.aif.xml.source"));
    assert_eq!(fs::read_to_string(&source).unwrap(), SOURCE);
    assert!(fs::read_to_string(&apf).unwrap().contains(r#"<charseq START="12" END="14">She</charseq>"#));

    let sgml = callisto_to_sgml_file(&callisto, None, &ConvertConfig::default(), None).unwrap();
    assert_eq!(sgml, dir.path().join("story.apf.aif.xml.coref"));
    assert_eq!(
        fs::read_to_string(&sgml).unwrap(),
        "<DOC DOCNO=\"story\">\n<COREF-ID=\"E1\"-TYPE=\"IDENT\">Ann</COREF> met Bo. <COREF-ID=\"E1\"-TYPE=\"IDENT\">She</COREF> smiled.\n</DOC>\n"
    );
}

#[test]
fn test_explicit_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let apf = dir.path().join("story.apf");
    let source = dir.path().join("story.source");
    fs::write(&apf, APF).unwrap();
    fs::write(&source, SOURCE).unwrap();

    let out = dir.path().join("custom.xml");
    let written = apf_to_callisto_file(&apf, &source, Some(&out), &ConvertConfig::default()).unwrap();
    assert_eq!(written, out);
    assert!(!dir.path().join("story.apf.aif.xml").exists());
}

#[test]
fn test_chain_lists_and_score_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let callisto = callisto_in(dir.path());

    let chains = callisto_file_to_chain_lists(&callisto, true).unwrap();
    assert_eq!(chains.document_id, "story");
    assert_eq!(chains.chains.len(), 1);
    assert_eq!(chains.chains[0].mentions[1].text, "She");

    let score = score_files(&callisto, &callisto).unwrap();
    assert!((score.f1() - 1.0).abs() < 1e-9);
}

#[test]
fn test_conversion_error_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let apf = dir.path().join("story.apf");
    let source = dir.path().join("story.source");
    fs::write(&apf, APF).unwrap();
    fs::write(&source, "Bob met Al. He smiled.").unwrap();

    let err = apf_to_callisto_file(&apf, &source, None, &ConvertConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    assert!(err.to_string().contains("story.apf"));
    assert!(!dir.path().join("story.apf.aif.xml").exists());
}

#[test]
fn test_batch_continues_past_failures() {
    let dir = tempfile::tempdir().unwrap();
    let good = callisto_in(dir.path());
    let bad = dir.path().join("bad.aif.xml");
    fs::write(&bad, "<Corpus>").unwrap();

    let runner = BatchRunner::new(ConvertConfig::default());
    let report = runner.run(&[&bad, &good], BatchOp::CallistoToSgml);

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.outcomes[0].error_kind, Some(ErrorKind::MalformedXml));
    assert!(report.outcomes[1].is_ok());
    assert_eq!(report.outcomes[1].outputs, vec![dir.path().join("story.apf.aif.xml.coref")]);
    assert_eq!(report.outcomes[1].fingerprint.as_ref().map(String::len), Some(16));

    // same inputs, same fingerprint
    let again = runner.run(&[&good], BatchOp::CallistoToSgml);
    assert_eq!(again.outcomes[0].fingerprint, report.outcomes[1].fingerprint);
}
