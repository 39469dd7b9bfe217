pub mod csv_export;
pub mod json_export;

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::model::TranscriptRecord;

pub use csv_export::CsvExporter;
pub use json_export::JsonExporter;

/// Column titles of the tabular output.
pub const HEADER: [&str; 3] = ["Scene Description", "Character", "Dialogue"];

/// Destination for committed records.
pub trait RecordSink {
    fn write_record(&mut self, record: &TranscriptRecord) -> Result<()>;

    /// Flushes whatever the sink buffered. Called once, after the last record.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl RecordSink for Vec<TranscriptRecord> {
    fn write_record(&mut self, record: &TranscriptRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn write_record(&mut self, record: &TranscriptRecord) -> Result<()> {
        (**self).write_record(record)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Csv,
    Json,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
        }
    }
}
