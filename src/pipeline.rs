use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calibrate::cluster::{CalibrationParams, ClusterSet};
use crate::classify::{HeadingOverride, RoleClassifier};
use crate::core::geometry::TextLine;
use crate::core::model::{DocumentLayout, Page};
use crate::export::{CsvExporter, Format, JsonExporter, RecordSink};
use crate::parser::{has_extension, source_for};
use crate::transcript::{SceneCarryOver, TranscriptBuilder};

/// The cover page never contributes lines.
pub const COVER_PAGE: usize = 1;

/// Inclusive, 1-based page range whose lines calibrate the clusters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalibrationWindow {
    pub first_page: usize,
    pub last_page: usize,
}

impl Default for CalibrationWindow {
    fn default() -> Self {
        Self {
            first_page: 4,
            last_page: 20,
        }
    }
}

impl CalibrationWindow {
    pub fn contains(&self, page_number: usize) -> bool {
        page_number != COVER_PAGE && (self.first_page..=self.last_page).contains(&page_number)
    }
}

impl FromStr for CalibrationWindow {
    type Err = String;

    /// Parses `FIRST-LAST`, e.g. `4-20`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (first, last) = s
            .split_once('-')
            .ok_or_else(|| format!("expected FIRST-LAST, got '{s}'"))?;
        let first_page: usize = first
            .trim()
            .parse()
            .map_err(|_| format!("invalid first page '{first}'"))?;
        let last_page: usize = last
            .trim()
            .parse()
            .map_err(|_| format!("invalid last page '{last}'"))?;
        if first_page == 0 || last_page < first_page {
            return Err(format!("page range '{s}' is empty"));
        }
        Ok(Self {
            first_page,
            last_page,
        })
    }
}

impl fmt::Display for CalibrationWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first_page, self.last_page)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: Format,
    pub window: CalibrationWindow,
    pub params: CalibrationParams,
    pub carry_over: SceneCarryOver,
    /// Pages to replay after the cover page.
    pub max_pages: Option<usize>,
}

impl PipelineConfig {
    pub fn new(input: PathBuf, output: PathBuf) -> Self {
        Self {
            input,
            output,
            format: Format::default(),
            window: CalibrationWindow::default(),
            params: CalibrationParams::default(),
            carry_over: SceneCarryOver::default(),
            max_pages: None,
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_window(mut self, window: CalibrationWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_params(mut self, params: CalibrationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_carry_over(mut self, carry_over: SceneCarryOver) -> Self {
        self.carry_over = carry_over;
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Same settings, different document.
    pub fn for_document(&self, input: PathBuf, output: PathBuf) -> Self {
        Self {
            input,
            output,
            ..self.clone()
        }
    }

    /// Last PDF page worth decoding, cover page included.
    pub fn last_page(&self) -> Option<usize> {
        self.max_pages.map(|pages| pages + COVER_PAGE)
    }
}

/// `script.pdf` becomes `script.csv` (or `.json`) next to it.
pub fn default_output(input: &Path, format: Format) -> PathBuf {
    input.with_extension(format.extension())
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DocumentReport {
    pub pages: usize,
    pub lines: usize,
    pub calibration_lines: usize,
    pub clusters: usize,
    pub roles_resolved: bool,
    pub records: usize,
    pub skipped_nodes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

/// Drives one document: calibrate on the sample window, then replay every
/// page after the cover in reading order.
#[derive(Debug, Clone, Default)]
pub struct PageOrchestrator {
    window: CalibrationWindow,
    params: CalibrationParams,
    carry_over: SceneCarryOver,
    max_pages: Option<usize>,
}

impl PageOrchestrator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            window: config.window,
            params: config.params,
            carry_over: config.carry_over,
            max_pages: config.max_pages,
        }
    }

    pub fn replay_pages<'a>(&self, layout: &'a DocumentLayout) -> impl Iterator<Item = &'a Page> {
        layout
            .pages
            .iter()
            .filter(|page| page.number != COVER_PAGE)
            .take(self.max_pages.unwrap_or(usize::MAX))
    }

    pub fn calibration_sample(&self, layout: &DocumentLayout) -> Vec<TextLine> {
        self.replay_pages(layout)
            .filter(|page| self.window.contains(page.number))
            .flat_map(|page| page.lines.iter().cloned())
            .collect()
    }

    pub fn calibrate(&self, layout: &DocumentLayout) -> ClusterSet {
        self.calibrate_sample(&self.calibration_sample(layout))
    }

    /// Builds the cluster set from an already collected sample.
    pub fn calibrate_sample(&self, sample: &[TextLine]) -> ClusterSet {
        if sample.is_empty() {
            warn!(
                window = %self.window,
                "calibration sample is empty; all text will be treated as scene description"
            );
            return ClusterSet::empty(&self.params);
        }

        let clusters = ClusterSet::calibrate(sample, &self.params);
        if !clusters.has_roles() {
            warn!(
                clusters = clusters.len(),
                "fewer than three layout clusters; roles cannot be assigned"
            );
        }
        clusters
    }

    pub fn transcribe<S: RecordSink>(
        &self,
        layout: &DocumentLayout,
        sink: S,
    ) -> Result<(S, DocumentReport)> {
        let sample = self.calibration_sample(layout);
        let classifier = RoleClassifier::new(self.calibrate_sample(&sample));
        let mut headings = HeadingOverride::new();
        let mut builder = TranscriptBuilder::with_carry_over(sink, self.carry_over);

        let mut pages = 0;
        let mut lines = 0;
        for page in self.replay_pages(layout) {
            pages += 1;
            for line in page.reading_order() {
                let text = line.text.trim();
                if text.is_empty() {
                    continue;
                }
                let role = headings.resolve(text, classifier.role(line));
                builder.push(role, text)?;
                lines += 1;
            }
        }

        let (sink, records) = builder.finish()?;
        let report = DocumentReport {
            pages,
            lines,
            calibration_lines: sample.len(),
            clusters: classifier.cluster_set().len(),
            roles_resolved: classifier.cluster_set().has_roles(),
            records,
            skipped_nodes: layout.skipped_nodes,
            output: None,
        };
        Ok((sink, report))
    }
}

pub fn load_layout(config: &PipelineConfig) -> Result<DocumentLayout> {
    let source = source_for(&config.input, config.last_page())?;
    let layout = source
        .load(&config.input)
        .with_context(|| format!("failed to read layout of {}", config.input.display()))?;
    if layout.skipped_nodes > 0 {
        warn!(
            document = %config.input.display(),
            skipped = layout.skipped_nodes,
            "skipped layout nodes that could not be split into lines"
        );
    }
    Ok(layout)
}

fn open_sink(format: Format, output: &Path) -> Result<Box<dyn RecordSink>> {
    Ok(match format {
        Format::Csv => Box::new(CsvExporter::create(output)?),
        Format::Json => Box::new(JsonExporter::new(output.to_path_buf())),
    })
}

/// Converts one document. The output file is only created once the layout
/// has been read, so a refused document leaves nothing behind.
pub fn convert_document(config: &PipelineConfig) -> Result<DocumentReport> {
    let layout = load_layout(config)?;
    let sink = open_sink(config.format, &config.output)
        .with_context(|| format!("failed to open {}", config.output.display()))?;

    let (_, mut report) = PageOrchestrator::new(config).transcribe(&layout, sink)?;
    report.output = Some(config.output.clone());

    info!(
        document = %config.input.display(),
        pages = report.pages,
        lines = report.lines,
        clusters = report.clusters,
        records = report.records,
        "transcribed document"
    );
    Ok(report)
}

/// Files in `dir` with the given extension, in path order.
pub fn discover_documents(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, extension) {
            documents.push(path);
        }
    }
    documents.sort();
    Ok(documents)
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub document: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<(PathBuf, DocumentReport)>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Converts every matching document in `dir`. A failing document is recorded
/// and the batch moves on.
pub fn run_batch(
    dir: &Path,
    extension: &str,
    output_dir: Option<&Path>,
    template: &PipelineConfig,
) -> Result<BatchReport> {
    let documents = discover_documents(dir, extension)?;
    info!(dir = %dir.display(), documents = documents.len(), "starting batch");

    let mut report = BatchReport::default();
    for input in documents {
        let beside_input = default_output(&input, template.format);
        let output = match (output_dir, beside_input.file_name()) {
            (Some(out_dir), Some(name)) => out_dir.join(name),
            _ => beside_input.clone(),
        };
        let config = template.for_document(input.clone(), output);

        match convert_document(&config) {
            Ok(document) => report.succeeded.push((input, document)),
            Err(err) => {
                warn!(document = %input.display(), error = %format!("{err:#}"), "document failed");
                report.failed.push(BatchFailure {
                    document: input,
                    reason: format!("{err:#}"),
                });
            }
        }
    }
    Ok(report)
}
