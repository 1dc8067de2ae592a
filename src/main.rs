use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

mod charts;
mod config;
mod dashboard;
mod error;
mod loader;
mod metrics;
mod models;
mod report;
mod session;
mod template;

use config::{LoadOptions, SourceFormat};
use session::Session;

#[derive(Parser)]
#[command(name = "risk-dashboard")]
#[command(about = "Risk register dashboard: metrics and chart data from a CSV or Excel upload", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Upload {
    /// Risk register to load (.csv or .xlsx)
    #[arg(long)]
    file: PathBuf,
    /// Override the format inferred from the file extension
    #[arg(long)]
    format: Option<SourceFormat>,
    /// Worksheet to read from a workbook (defaults to the first)
    #[arg(long)]
    sheet: Option<String>,
    /// CSV field delimiter
    #[arg(long, default_value_t = ',')]
    delimiter: char,
}

#[derive(Subcommand)]
enum Commands {
    /// Print metrics and per-work risk counts
    Summary {
        #[command(flatten)]
        upload: Upload,
        /// Print the full dashboard as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        upload: Upload,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write the example upload with the expected columns
    Template {
        #[arg(long, default_value = "risk_template.csv")]
        out: PathBuf,
    },
}

/// Logs go to stderr. With `--json` nothing is logged so stdout stays parseable.
fn init_logging(level: &str, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let json_output = matches!(cli.command, Commands::Summary { json: true, .. });
    init_logging(&cli.log_level, json_output);

    match cli.command {
        Commands::Summary { upload, json } => {
            let session = load_session(&upload)?;
            let dashboard = session
                .dashboard()
                .context("no dataset loaded")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                print!("{}", report::build_overview(&dashboard));
            }
        }
        Commands::Report { upload, out } => {
            let session = load_session(&upload)?;
            let dashboard = session
                .dashboard()
                .context("no dataset loaded")?;
            std::fs::write(&out, report::build_report(&dashboard))
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Template { out } => {
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            template::write_template(file)?;
            println!("Template written to {}.", out.display());
        }
    }

    Ok(())
}

fn load_session(upload: &Upload) -> anyhow::Result<Session> {
    let format = match upload.format {
        Some(format) => format,
        None => SourceFormat::from_path(&upload.file)?,
    };
    let delimiter =
        u8::try_from(upload.delimiter).context("CSV delimiter must be a single ASCII character")?;
    let mut options = LoadOptions::builder().delimiter(delimiter);
    if let Some(sheet) = &upload.sheet {
        options = options.sheet(sheet);
    }
    let options = options.build();

    let bytes = std::fs::read(&upload.file)
        .with_context(|| format!("failed to read {}", upload.file.display()))?;
    let mut session = Session::new();
    session
        .upload(source_name(&upload.file), &bytes, format, &options)
        .with_context(|| format!("could not load {}", upload.file.display()))?;
    let dataset = session.dataset().context("no dataset loaded")?;
    info!("Loaded upload {} with {} risks", dataset.id, dataset.table.len());

    Ok(session)
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
