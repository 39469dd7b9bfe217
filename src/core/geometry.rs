use serde::{Deserialize, Serialize};

/// How a line is measured against a cluster anchor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
}

/// One visually distinct line of text as reported by the layout engine.
///
/// `top` grows upwards, so the first line of a page has the largest value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextLine {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub text: String,
}

impl TextLine {
    pub fn new(left: f64, right: f64, top: f64, text: impl Into<String>) -> Self {
        Self {
            left,
            right,
            top,
            text: text.into(),
        }
    }

    pub fn center(&self) -> f64 {
        (self.left + self.right) * 0.5
    }

    /// Horizontal coordinate used when measuring against an anchor of the given alignment.
    pub fn position(&self, alignment: Alignment) -> f64 {
        match alignment {
            Alignment::Left => self.left,
            Alignment::Center => self.center(),
        }
    }

    pub fn left_key(&self) -> i64 {
        position_key(self.left)
    }

    pub fn center_key(&self) -> i64 {
        position_key(self.center())
    }

    pub fn key(&self, alignment: Alignment) -> i64 {
        match alignment {
            Alignment::Left => self.left_key(),
            Alignment::Center => self.center_key(),
        }
    }
}

/// Histogram bucket for a coordinate. Halves round to even.
pub fn position_key(x: f64) -> i64 {
    x.round_ties_even() as i64
}
