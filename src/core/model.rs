use serde::{Deserialize, Serialize};

use crate::core::geometry::TextLine;

/// Structural role of a screenplay line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Scene,
    Dialogue,
    Speaker,
    /// No calibrated cluster claims the line. Treated as scene text.
    Unassigned,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    /// 1-based page number within the document.
    pub number: usize,
    pub lines: Vec<TextLine>,
}

impl Page {
    pub fn new(number: usize, lines: Vec<TextLine>) -> Self {
        Self { number, lines }
    }

    /// Lines top of page first. Lines sharing a vertical position keep their source order.
    pub fn reading_order(&self) -> Vec<&TextLine> {
        let mut lines: Vec<&TextLine> = self.lines.iter().collect();
        lines.sort_by(|a, b| b.top.total_cmp(&a.top));
        lines
    }
}

/// Everything the layout engine produced for one document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentLayout {
    pub extractable: bool,
    pub pages: Vec<Page>,
    /// Layout nodes that could not be decomposed into lines.
    #[serde(default)]
    pub skipped_nodes: usize,
}

impl DocumentLayout {
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            extractable: true,
            pages,
            skipped_nodes: 0,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn line_count(&self) -> usize {
        self.pages.iter().map(|page| page.lines.len()).sum()
    }
}

/// One committed output row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptRecord {
    pub scene_description: String,
    pub speaker: String,
    pub dialogue: String,
}

impl TranscriptRecord {
    pub fn new(
        scene_description: impl Into<String>,
        speaker: impl Into<String>,
        dialogue: impl Into<String>,
    ) -> Self {
        Self {
            scene_description: scene_description.into(),
            speaker: speaker.into(),
            dialogue: dialogue.into(),
        }
    }
}
