//! Prompt rendering (spec §4.3 step 5): preface, one `<record>` per
//! distinct virtual record, closing instructions.

use crate::model::{AssembledPayload, RenderedContent};

/// Render the assembled payload into the final message-content string. The
/// preface (user context + query) and closing instructions are the
/// caller's own copy — this crate only owns the `<record>` block shape.
pub fn render_prompt(preface: &str, payload: &AssembledPayload, closing_instructions: &str) -> String {
    let mut out = String::new();
    out.push_str(preface);
    out.push('\n');

    for record in &payload.records {
        out.push_str("<record>\n");
        out.push_str(&serde_json::to_string(&record.metadata).unwrap_or_default());
        out.push('\n');
        for block in &record.blocks {
            render_block(&mut out, &block.citation, &block.content);
        }
        out.push_str("</record>\n");
    }

    out.push_str(closing_instructions);
    out
}

fn render_block(out: &mut String, citation: &str, content: &RenderedContent) {
    match content {
        RenderedContent::Text { text } => {
            out.push_str(&format!("[{citation}] {text}\n"));
        }
        RenderedContent::ImageUrl { data_uri } => {
            out.push_str(&format!("[{citation}] <image: {data_uri}>\n"));
        }
        RenderedContent::TableSummary { summary, truncated } => {
            let suffix = if *truncated { " (rows omitted, large table)" } else { "" };
            out.push_str(&format!("[{citation}] {summary}{suffix}\n"));
        }
        RenderedContent::TableRow { text } => {
            out.push_str(&format!("[{citation}] {text}\n"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RenderedBlock, RenderedRecord};
    use uuid::Uuid;

    #[test]
    fn wraps_each_record_and_includes_citations() {
        let payload = AssembledPayload {
            records: vec![RenderedRecord {
                record_number: 1,
                virtual_record_id: Uuid::new_v4(),
                metadata: serde_json::json!({"title": "doc"}),
                blocks: vec![RenderedBlock { citation: "R1-0".into(), block_index: 0, content: RenderedContent::Text { text: "hello".into() } }],
            }],
            surfaced_record_ids: vec![],
            token_count: 3,
        };
        let rendered = render_prompt("Context + query", &payload, "Answer using the citations above.");
        assert!(rendered.contains("<record>"));
        assert!(rendered.contains("[R1-0] hello"));
        assert!(rendered.contains("Answer using the citations above."));
    }
}
