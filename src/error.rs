use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the layout adapters that a caller may want to tell apart.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The document forbids copying its text.
    #[error("text extraction is not permitted for {}", .0.display())]
    ExtractionDenied(PathBuf),

    #[error("no layout source handles {}", .0.display())]
    UnsupportedInput(PathBuf),

    #[error("layout engine failed: {0}")]
    LayoutEngine(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid layout dump: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
