use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use scriptextract::calibrate::{CalibrationParams, RoledCluster};
use scriptextract::export::Format;
use scriptextract::parser::pdf_reader::PdfInfo;
use scriptextract::parser::{has_extension, PopplerLayout};
use scriptextract::pipeline::{
    convert_document, default_output, load_layout, run_batch, CalibrationWindow,
    PageOrchestrator, PipelineConfig,
};
use scriptextract::transcript::SceneCarryOver;

#[derive(Parser, Debug)]
#[command(name = "scriptextract")]
#[command(version, about = "Screenplay PDF to scene/character/dialogue tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert one screenplay (PDF or JSON layout dump)
    Convert {
        /// Input document path
        input: PathBuf,

        /// Output file (default: input path with the format's extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,

        /// Only print errors
        #[arg(short, long)]
        quiet: bool,
    },

    /// Convert every matching document in a directory
    Batch {
        /// Directory to scan
        dir: PathBuf,

        /// Output directory (default: next to each input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Extension of the documents to pick up
        #[arg(long, default_value = "pdf")]
        extension: String,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Show page count and the calibrated layout clusters of a document
    Info {
        /// Input document path
        input: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        extract: ExtractArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct ExtractArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// Pages whose lines calibrate the layout clusters
    #[arg(long, default_value_t = CalibrationWindow::default())]
    calibration_pages: CalibrationWindow,

    /// Distance within which positions merge and lines join a cluster
    #[arg(long, default_value_t = 4)]
    radius: u32,

    /// Stop after this many pages following the cover page
    #[arg(long)]
    max_pages: Option<usize>,

    /// Give speaker cues without scene text the last written scene
    #[arg(long)]
    inherit_scene: bool,
}

impl ExtractArgs {
    fn config(&self, input: PathBuf, output: Option<PathBuf>) -> PipelineConfig {
        let output = output.unwrap_or_else(|| default_output(&input, self.format));
        let carry_over = if self.inherit_scene {
            SceneCarryOver::LastCommitted
        } else {
            SceneCarryOver::Never
        };
        PipelineConfig::new(input, output)
            .with_format(self.format)
            .with_window(self.calibration_pages)
            .with_params(CalibrationParams {
                radius: self.radius,
                ..CalibrationParams::default()
            })
            .with_carry_over(carry_over)
            .with_max_pages(self.max_pages)
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            extract,
            quiet,
        } => convert_single(input, output, extract, quiet),
        Commands::Batch {
            dir,
            output,
            extension,
            extract,
        } => convert_batch(dir, output, extension, extract),
        Commands::Info {
            input,
            json,
            extract,
        } => show_info(input, json, extract),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scriptextract=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn convert_single(
    input: PathBuf,
    output: Option<PathBuf>,
    extract: ExtractArgs,
    quiet: bool,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }
    if !input.is_file() {
        anyhow::bail!("Input is not a file: {}", input.display());
    }

    let config = extract.config(input.clone(), output);

    if !quiet {
        println!("[*] Processing: {}", input.display());
        println!("[*] Output: {}", config.output.display());
        println!("[*] Calibration pages: {}", config.window);
    }

    let report = convert_document(&config)
        .with_context(|| format!("Failed to process: {}", input.display()))?;

    if !quiet {
        println!(
            "[+] {} page(s), {} line(s), {} cluster(s)",
            report.pages, report.lines, report.clusters
        );
        if !report.roles_resolved {
            println!("[!] Layout roles could not be calibrated; text was kept as scene description");
        }
        println!(
            "\n[✓] Done! {} record(s) saved to: {}",
            report.records,
            config.output.display()
        );
    }

    Ok(())
}

fn convert_batch(
    dir: PathBuf,
    output: Option<PathBuf>,
    extension: String,
    extract: ExtractArgs,
) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Input is not a directory: {}", dir.display());
    }

    let template = extract.config(PathBuf::new(), Some(PathBuf::new()));

    println!("[*] Batch processing *.{} in {}", extension, dir.display());
    if let Some(out) = &output {
        println!("[*] Base output: {}\n", out.display());
    }

    let report = run_batch(&dir, &extension, output.as_deref(), &template)?;

    for (document, result) in &report.succeeded {
        println!(
            "  [✓] {} ({} record(s))",
            document.display(),
            result.records
        );
    }
    for failure in &report.failed {
        eprintln!("  [✗] {}: {}", failure.document.display(), failure.reason);
    }

    println!(
        "\n[*] Summary: {} succeeded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );

    if !report.failed.is_empty() {
        anyhow::bail!("{} file(s) failed to process", report.failed.len());
    }

    Ok(())
}

#[derive(Serialize)]
struct InfoReport {
    document: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pdf: Option<PdfInfo>,
    pages: usize,
    lines: usize,
    skipped_nodes: usize,
    calibration_lines: usize,
    roles_resolved: bool,
    clusters: Vec<RoledCluster>,
}

fn show_info(input: PathBuf, json: bool, extract: ExtractArgs) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let config = extract.config(input.clone(), None);
    let (pdf, layout) = if has_extension(&input, "pdf") {
        let (info, layout) = PopplerLayout::new()
            .with_last_page(config.last_page())
            .load_with_info(&input)
            .with_context(|| format!("failed to read layout of {}", input.display()))?;
        (Some(info), layout)
    } else {
        (None, load_layout(&config)?)
    };
    let orchestrator = PageOrchestrator::new(&config);
    let sample = orchestrator.calibration_sample(&layout);
    let clusters = orchestrator.calibrate_sample(&sample);

    let report = InfoReport {
        document: input,
        pdf,
        pages: layout.page_count(),
        lines: layout.line_count(),
        skipped_nodes: layout.skipped_nodes,
        calibration_lines: sample.len(),
        roles_resolved: clusters.has_roles(),
        clusters: clusters.describe(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Screenplay Information");
    println!("======================");
    println!("File: {}", report.document.display());
    println!("Pages: {}", report.pages);
    if let Some(pdf) = &report.pdf {
        println!("Encrypted: {}", if pdf.encrypted { "yes" } else { "no" });
    }
    println!("Lines: {}", report.lines);
    if report.skipped_nodes > 0 {
        println!("Skipped layout nodes: {}", report.skipped_nodes);
    }
    println!(
        "Calibration: {} line(s) from pages {}",
        report.calibration_lines, config.window
    );
    println!("Clusters:");
    for cluster in &report.clusters {
        let role = cluster
            .role
            .map(|role| format!("{role:?}").to_lowercase())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>5} {:<6} weight {:>4}  {}",
            cluster.anchor,
            format!("{:?}", cluster.alignment).to_lowercase(),
            cluster.weight,
            role
        );
    }

    Ok(())
}
