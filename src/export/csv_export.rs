use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::core::model::TranscriptRecord;
use crate::export::{RecordSink, HEADER};

/// Writes records as fully quoted, comma separated rows under a fixed header.
pub struct CsvExporter<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvExporter<File> {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        Self::from_writer(file)
    }
}

impl<W: Write> CsvExporter<W> {
    pub fn from_writer(inner: W) -> Result<Self> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(inner);
        writer.write_record(HEADER)?;
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| anyhow::anyhow!("failed to flush CSV output: {}", err.error()))
    }
}

impl<W: Write> RecordSink for CsvExporter<W> {
    fn write_record(&mut self, record: &TranscriptRecord) -> Result<()> {
        self.writer.write_record([
            record.scene_description.as_str(),
            record.speaker.as_str(),
            record.dialogue.as_str(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(records: &[TranscriptRecord]) -> Result<String> {
        let mut exporter = CsvExporter::from_writer(Vec::new())?;
        for record in records {
            exporter.write_record(record)?;
        }
        exporter.finish()?;
        Ok(String::from_utf8(exporter.into_inner()?)?)
    }

    #[test]
    fn writes_quoted_header_and_rows() -> Result<()> {
        let out = render(&[
            TranscriptRecord::new("INT. HOUSE - DAY ", "JOHN", "Hello there."),
            TranscriptRecord::new("", "JANE", "Hi John."),
        ])?;
        assert_eq!(
            out,
            "\"Scene Description\",\"Character\",\"Dialogue\"\n\
             \"INT. HOUSE - DAY \",\"JOHN\",\"Hello there.\"\n\
             \"\",\"JANE\",\"Hi John.\"\n"
        );
        Ok(())
    }

    #[test]
    fn doubles_embedded_quotes() -> Result<()> {
        let out = render(&[TranscriptRecord::new(
            "A sign reads \"CLOSED\". ",
            "MAX",
            "Say \"please\", then.",
        )])?;
        let row = out.lines().nth(1).unwrap_or_default();
        assert_eq!(
            row,
            "\"A sign reads \"\"CLOSED\"\". \",\"MAX\",\"Say \"\"please\"\", then.\""
        );
        Ok(())
    }

    #[test]
    fn empty_transcript_still_has_header() -> Result<()> {
        let out = render(&[])?;
        assert_eq!(out, "\"Scene Description\",\"Character\",\"Dialogue\"\n");
        Ok(())
    }
}
