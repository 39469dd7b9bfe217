use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::core::geometry::TextLine;
use crate::core::model::{DocumentLayout, Page};
use crate::error::{ExtractError, Result};
use crate::parser::text_normalize::normalize_line_text;
use crate::parser::LayoutSource;

fn default_extractable() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct LayoutDump {
    #[serde(default = "default_extractable")]
    extractable: bool,
    pages: Vec<Value>,
}

/// Pre-extracted layouts stored as JSON.
///
/// ```json
/// {"extractable": true, "pages": [[{"left": 108, "right": 300, "top": 700, "text": "INT. HOUSE"}]]}
/// ```
///
/// A node is a line, a `{"children": [...]}` group, or a plain array of nodes.
#[derive(Debug, Clone, Default)]
pub struct JsonLayout;

impl JsonLayout {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(data: &str, path: &Path) -> Result<DocumentLayout> {
        let dump: LayoutDump = serde_json::from_str(data)?;
        if !dump.extractable {
            return Err(ExtractError::ExtractionDenied(path.to_path_buf()));
        }

        let mut skipped = 0;
        let pages = dump
            .pages
            .iter()
            .enumerate()
            .map(|(idx, node)| {
                let mut lines = Vec::new();
                collect_lines(node, &mut lines, &mut skipped);
                Page::new(idx + 1, lines)
            })
            .collect();

        Ok(DocumentLayout {
            extractable: true,
            pages,
            skipped_nodes: skipped,
        })
    }
}

impl LayoutSource for JsonLayout {
    fn load(&self, path: &Path) -> Result<DocumentLayout> {
        let data = fs::read_to_string(path)?;
        Self::parse(&data, path)
    }
}

fn collect_lines(node: &Value, lines: &mut Vec<TextLine>, skipped: &mut usize) {
    match node {
        Value::Array(children) => {
            for child in children {
                collect_lines(child, lines, skipped);
            }
        }
        Value::Object(map) if map.contains_key("children") => match map.get("children") {
            Some(Value::Array(children)) => {
                for child in children {
                    collect_lines(child, lines, skipped);
                }
            }
            _ => {
                warn!("skipping layout group whose children are not a list");
                *skipped += 1;
            }
        },
        Value::Object(_) => match TextLine::deserialize(node) {
            Ok(line) => {
                let text = normalize_line_text(&line.text);
                if !text.is_empty() {
                    lines.push(TextLine { text, ..line });
                }
            }
            Err(err) => {
                warn!(%err, "skipping layout node that is not a text line");
                *skipped += 1;
            }
        },
        other => {
            warn!(node = %other, "skipping layout node that is not a text line");
            *skipped += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flattens_nested_nodes() -> Result<()> {
        let data = r#"{
            "pages": [
                [{"left": 108, "right": 300, "top": 700, "text": " INT. HOUSE - DAY "}],
                {"children": [
                    {"children": [{"left": 252, "right": 280.8, "top": 650, "text": "JOHN"}]},
                    [{"left": 180, "right": 320, "top": 630, "text": "Hello."}]
                ]}
            ]
        }"#;
        let layout = JsonLayout::parse(data, Path::new("script.json"))?;
        assert_eq!(layout.page_count(), 2);
        assert_eq!(
            layout.pages[0].lines,
            vec![TextLine::new(108.0, 300.0, 700.0, "INT. HOUSE - DAY")]
        );
        let texts: Vec<&str> = layout.pages[1].lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["JOHN", "Hello."]);
        assert_eq!(layout.skipped_nodes, 0);
        Ok(())
    }

    #[test]
    fn skips_malformed_nodes_and_blank_lines() -> Result<()> {
        let data = r#"{
            "pages": [[
                {"left": 108, "top": 700, "text": "no right edge"},
                {"kind": "figure"},
                42,
                {"children": "nope"},
                {"left": 108, "right": 120, "top": 690, "text": "   "},
                {"left": 108, "right": 200, "top": 680, "text": "Kept."}
            ]]
        }"#;
        let layout = JsonLayout::parse(data, Path::new("script.json"))?;
        assert_eq!(layout.skipped_nodes, 4);
        assert_eq!(
            layout.pages[0].lines,
            vec![TextLine::new(108.0, 200.0, 680.0, "Kept.")]
        );
        Ok(())
    }

    #[test]
    fn refuses_locked_documents() {
        let err = JsonLayout::parse(r#"{"extractable": false, "pages": []}"#, Path::new("locked.json"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionDenied(_)));
    }
}
