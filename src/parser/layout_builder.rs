use std::path::{Path, PathBuf};
use std::process::Command;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

use crate::core::geometry::TextLine;
use crate::core::model::{DocumentLayout, Page};
use crate::error::{ExtractError, Result};
use crate::parser::pdf_reader::{PdfInfo, PdfReader};
use crate::parser::text_normalize::normalize_line_text;
use crate::parser::LayoutSource;

/// poppler tools exit with this status when the document forbids the operation.
const PERMISSION_EXIT_CODE: i32 = 3;

/// Line layout from poppler's `pdftotext -bbox-layout`.
#[derive(Debug, Clone, Default)]
pub struct PopplerLayout {
    last_page: Option<usize>,
}

impl PopplerLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop decoding after this 1-based page.
    pub fn with_last_page(mut self, last_page: Option<usize>) -> Self {
        self.last_page = last_page;
        self
    }

    fn run_pdftotext(&self, path: &Path) -> Result<String> {
        let mut command = Command::new("pdftotext");
        command.arg("-bbox-layout").arg("-enc").arg("UTF-8");
        if let Some(last_page) = self.last_page {
            command.arg("-l").arg(last_page.to_string());
        }
        let output = command.arg(path).arg("-").output().map_err(|err| {
            ExtractError::LayoutEngine(format!(
                "failed to invoke pdftotext; is poppler-utils installed? ({err})"
            ))
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if output.status.code() == Some(PERMISSION_EXIT_CODE) || stderr.contains("not allowed") {
            return Err(ExtractError::ExtractionDenied(path.to_path_buf()));
        }
        if !output.status.success() {
            return Err(ExtractError::LayoutEngine(format!(
                "pdftotext failed with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Decodes the layout and hands back what `pdfinfo` reported alongside it.
    pub fn load_with_info(&self, path: &Path) -> Result<(PdfInfo, DocumentLayout)> {
        let info = PdfReader::new(PathBuf::from(path)).info()?;
        ensure_copy_allowed(&info, path)?;
        debug!(path = %path.display(), pages = info.pages, "decoding layout");
        let xhtml = self.run_pdftotext(path)?;
        Ok((info, parse_bbox_layout(&xhtml)?))
    }
}

impl LayoutSource for PopplerLayout {
    fn load(&self, path: &Path) -> Result<DocumentLayout> {
        self.load_with_info(path).map(|(_, layout)| layout)
    }
}

fn ensure_copy_allowed(info: &PdfInfo, path: &Path) -> Result<()> {
    if info.copy_allowed {
        Ok(())
    } else {
        Err(ExtractError::ExtractionDenied(path.to_path_buf()))
    }
}

struct PendingPage {
    height: Option<f64>,
    lines: Vec<TextLine>,
}

struct PendingLine {
    bounds: Option<(f64, f64, f64)>,
    words: Vec<String>,
    malformed: bool,
}

impl PendingLine {
    fn start(element: &BytesStart) -> Self {
        let bounds = match (
            attr_f64(element, b"xMin"),
            attr_f64(element, b"xMax"),
            attr_f64(element, b"yMin"),
        ) {
            (Some(left), Some(right), Some(y_min)) => Some((left, right, y_min)),
            _ => None,
        };
        Self {
            bounds,
            words: Vec::new(),
            malformed: false,
        }
    }
}

fn attr_f64(element: &BytesStart, name: &[u8]) -> Option<f64> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .and_then(|attr| attr.unescape_value().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Reads the XHTML emitted by `pdftotext -bbox-layout`.
///
/// Each `<line>` becomes one [`TextLine`] whose words are joined by a single
/// space. poppler measures `yMin` from the top edge; it is flipped with the
/// page height so that larger values sit higher on the page. Lines without
/// usable coordinates are skipped and counted.
pub fn parse_bbox_layout(xhtml: &str) -> Result<DocumentLayout> {
    let mut reader = Reader::from_str(xhtml);
    reader.trim_text(true);

    let mut pages: Vec<Page> = Vec::new();
    let mut page: Option<PendingPage> = None;
    let mut line: Option<PendingLine> = None;
    let mut in_word = false;
    let mut skipped = 0;

    loop {
        match reader.read_event()? {
            Event::Start(element) => match element.local_name().as_ref() {
                b"page" => {
                    page = Some(PendingPage {
                        height: attr_f64(&element, b"height"),
                        lines: Vec::new(),
                    });
                }
                b"line" => line = Some(PendingLine::start(&element)),
                b"word" => in_word = true,
                _ => {}
            },
            Event::Empty(element) => {
                if element.local_name().as_ref() == b"page" {
                    pages.push(Page::new(pages.len() + 1, Vec::new()));
                }
            }
            Event::Text(text) if in_word => {
                if let Some(pending) = line.as_mut() {
                    match text.unescape() {
                        Ok(word) => pending.words.push(word.into_owned()),
                        Err(err) => {
                            warn!(%err, "unreadable word in layout");
                            pending.malformed = true;
                        }
                    }
                }
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"word" => in_word = false,
                b"line" => {
                    let (Some(pending), Some(current)) = (line.take(), page.as_mut()) else {
                        continue;
                    };
                    let text = normalize_line_text(&pending.words.join(" "));
                    match (pending.bounds, pending.malformed) {
                        (Some((left, right, y_min)), false) => {
                            if !text.is_empty() {
                                let top = current.height.map_or(-y_min, |h| h - y_min);
                                current.lines.push(TextLine::new(left, right, top, text));
                            }
                        }
                        _ => {
                            warn!(page = pages.len() + 1, text = %text, "skipping malformed layout line");
                            skipped += 1;
                        }
                    }
                }
                b"page" => {
                    if let Some(done) = page.take() {
                        pages.push(Page::new(pages.len() + 1, done.lines));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(DocumentLayout {
        extractable: true,
        pages,
        skipped_nodes: skipped,
    })
}
