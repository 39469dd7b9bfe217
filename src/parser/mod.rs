pub mod json_layout;
pub mod layout_builder;
pub mod pdf_reader;
pub mod text_normalize;

pub use json_layout::JsonLayout;
pub use layout_builder::PopplerLayout;
pub use pdf_reader::PdfReader;

use std::path::Path;

use crate::core::model::DocumentLayout;
use crate::error::{ExtractError, Result};

/// Produces the positioned lines of every page of a document.
pub trait LayoutSource {
    fn load(&self, path: &Path) -> Result<DocumentLayout>;
}

pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Picks the layout source for a file by extension. `last_page` bounds how
/// much of a PDF gets decoded.
pub fn source_for(path: &Path, last_page: Option<usize>) -> Result<Box<dyn LayoutSource>> {
    if has_extension(path, "pdf") {
        Ok(Box::new(PopplerLayout::new().with_last_page(last_page)))
    } else if has_extension(path, "json") {
        Ok(Box::new(JsonLayout::new()))
    } else {
        Err(ExtractError::UnsupportedInput(path.to_path_buf()))
    }
}
