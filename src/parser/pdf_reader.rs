use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::error::{ExtractError, Result};

/// What `pdfinfo` says about a document.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PdfInfo {
    pub pages: usize,
    pub encrypted: bool,
    pub copy_allowed: bool,
}

#[derive(Debug, Clone)]
pub struct PdfReader {
    path: PathBuf,
}

impl PdfReader {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn info(&self) -> Result<PdfInfo> {
        let output = Command::new("pdfinfo")
            .arg(&self.path)
            .output()
            .map_err(|err| {
                ExtractError::LayoutEngine(format!(
                    "failed to invoke pdfinfo on {}: {err}",
                    self.path.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::LayoutEngine(format!(
                "pdfinfo failed with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        parse_pdfinfo(&String::from_utf8_lossy(&output.stdout), &self.path)
    }
}

pub fn parse_pdfinfo(stdout: &str, path: &Path) -> Result<PdfInfo> {
    let mut pages = None;
    let mut encrypted = false;
    let mut copy_allowed = true;

    for line in stdout.lines() {
        if let Some(rest) = line.strip_prefix("Pages:") {
            let num_str = rest.trim();
            let count = num_str.parse().map_err(|_| {
                ExtractError::LayoutEngine(format!(
                    "failed to parse page count from 'Pages:' line: {num_str}"
                ))
            })?;
            pages = Some(count);
        } else if let Some(rest) = line.strip_prefix("Encrypted:") {
            let rest = rest.trim();
            encrypted = rest.starts_with("yes");
            copy_allowed = !rest.contains("copy:no");
        }
    }

    let pages = pages.ok_or_else(|| {
        ExtractError::LayoutEngine(format!(
            "pdfinfo output did not contain a 'Pages:' line for {}",
            path.display()
        ))
    })?;

    Ok(PdfInfo {
        pages,
        encrypted,
        copy_allowed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_plain_document() -> Result<()> {
        let stdout = "Title:          Draft\nPages:          112\nEncrypted:      no\nPage size:      612 x 792 pts (letter)\n";
        let info = parse_pdfinfo(stdout, Path::new("draft.pdf"))?;
        assert_eq!(
            info,
            PdfInfo {
                pages: 112,
                encrypted: false,
                copy_allowed: true,
            }
        );
        Ok(())
    }

    #[test]
    fn detects_copy_restriction() -> Result<()> {
        let stdout = "Pages:          3\nEncrypted:      yes (print:yes copy:no change:no addNotes:no algorithm:AES)\n";
        let info = parse_pdfinfo(stdout, Path::new("locked.pdf"))?;
        assert!(info.encrypted);
        assert!(!info.copy_allowed);
        Ok(())
    }

    #[test]
    fn missing_page_line_is_an_error() {
        let err = parse_pdfinfo("Title: x\n", Path::new("x.pdf")).unwrap_err();
        assert!(matches!(err, ExtractError::LayoutEngine(_)));
    }
}
