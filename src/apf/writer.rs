//! Chains into APF XML.

use crate::chain::Chain;
use crate::error::{ConvertError, Result};
use crate::types::Span;
use crate::xml::{escape_attr, escape_text};

/// Render chains as an APF document.
///
/// `name` becomes the `file://` URI of the source file element. Every
/// chain must carry its resolved head. `END` attributes are written
/// inclusive, and the charseq text only has `&`, `<` and `>` escaped.
pub fn write_apf(document_id: &str, name: &str, chains: &[Chain]) -> Result<String> {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<!DOCTYPE source_file PUBLIC \"SYSTEM\" \"apf.v5.1.5.dtd\">\n");
    out.push('\n');
    out.push_str(&format!(
        "<source_file URI=\"file://{}\" SOURCE=\"unknown\" TYPE=\"text\" VERSION=\"5.0\" AUTHOR=\"unknown\" ENCODING=\"UTF-8\">\n",
        escape_attr(name)
    ));
    out.push_str(&format!("  <document DOCID=\"{}\">\n", escape_attr(document_id)));

    for chain in chains {
        let head = chain
            .head
            .as_ref()
            .ok_or_else(|| ConvertError::BadFormat("chain without entity metadata".into()))?;
        out.push_str(&format!(
            "    <entity ID=\"{}\" TYPE=\"{}\">\n",
            escape_attr(&head.entity_id),
            escape_attr(&head.entity_type)
        ));

        for mention in &chain.mentions {
            let end = Span::new(mention.start, mention.end).inclusive_end().ok_or_else(|| {
                ConvertError::BadFormat(format!(
                    "mention {} of entity {} is empty at offset {}",
                    mention.id, head.entity_id, mention.start
                ))
            })?;
            let charseq = format!(
                "          <charseq START=\"{}\" END=\"{}\">{}</charseq>\n",
                mention.start,
                end,
                escape_text(&mention.text)
            );

            out.push_str(&format!(
                "      <entity_mention ID=\"{}\" TYPE=\"{}\" PRIMARY=\"{}\" METONYMY_MENTION=\"FALSE\" LDCATR=\"FALSE\">\n",
                escape_attr(&mention.id),
                escape_attr(mention.subtype.as_deref().unwrap_or_default()),
                mention.primary
            ));
            out.push_str("        <extent>\n");
            out.push_str(&charseq);
            out.push_str("        </extent>\n");
            out.push_str("        <head>\n");
            out.push_str(&charseq);
            out.push_str("        </head>\n");
            out.push_str("      </entity_mention>\n");
        }
        out.push_str("    </entity>\n");
    }

    out.push_str("  </document>\n");
    out.push_str("</source_file>\n");
    Ok(out)
}
