use crate::core::model::Role;

/// Markers that open a scene or mark a transition, matched case-insensitively.
pub const SCENE_MARKERS: &[&str] = &[
    "INT.",
    "EXT.",
    "INT./EXT.",
    "I/E.",
    "FADE IN:",
    "FADE OUT:",
    "DISSOLVE TO:",
    "CUT TO:",
    "SMASH CUT TO:",
    "MATCH CUT TO:",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct HeadingDetector;

impl HeadingDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn is_heading(&self, text: &str) -> bool {
        is_scene_heading(text)
    }
}

pub fn is_scene_heading(text: &str) -> bool {
    let text = text.trim().to_uppercase();
    SCENE_MARKERS
        .iter()
        .any(|marker| text.starts_with(marker) || text.contains(marker))
}

/// Applies the heading override on top of positional classification.
///
/// A heading is scene text wherever it sits, and the line right after it is
/// scene text too.
#[derive(Debug, Default, Clone)]
pub struct HeadingOverride {
    detector: HeadingDetector,
    inside_heading: bool,
}

impl HeadingOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, text: &str, positional: Role) -> Role {
        if self.detector.is_heading(text) {
            self.inside_heading = true;
            return Role::Scene;
        }
        if self.inside_heading {
            self.inside_heading = false;
            return Role::Scene;
        }
        positional
    }

    pub fn inside_heading(&self) -> bool {
        self.inside_heading
    }
}
