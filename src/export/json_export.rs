use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::model::TranscriptRecord;
use crate::export::RecordSink;

/// Collects records and writes them as one pretty-printed JSON array on finish.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    path: PathBuf,
    records: Vec<TranscriptRecord>,
}

impl JsonExporter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            records: Vec::new(),
        }
    }
}

impl RecordSink for JsonExporter {
    fn write_record(&mut self, record: &TranscriptRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn writes_records_array() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested/script.json");
        let mut exporter = JsonExporter::new(path.clone());
        exporter.write_record(&TranscriptRecord::new("A room. ", "ANA", "Hi."))?;
        exporter.finish()?;

        let parsed: Vec<TranscriptRecord> = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(parsed, vec![TranscriptRecord::new("A room. ", "ANA", "Hi.")]);
        Ok(())
    }
}
