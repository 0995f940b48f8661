//! CLI commands implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;

use crate::backends::{FakeNlpBackend, FakeOcrBackend};
use crate::config::Config;
use crate::models::Document;
use crate::notify::{LogNotifier, StatusNotifier};
use crate::processing::{
    CompletionEvaluator, NlpJobExecutor, OcrJobExecutor, Pipeline, ProcessorRegistry,
};
use crate::repository::{MemoryRepository, PipelineRepository};
use crate::storage::{MemoryStore, ObjectStore};

use super::helpers::{mime_for_path, title_for_path};

#[derive(Parser)]
#[command(name = "docpipe")]
#[command(about = "Document analysis pipeline")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a file and run its full analysis
    Process {
        /// File to process
        file: PathBuf,
        /// Document title (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,
        /// Owning user id
        #[arg(short, long, default_value = "cli")]
        user: String,
        /// Print full analysis results as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the job plan for a file without executing it
    Plan {
        /// File to plan for
        file: PathBuf,
    },

    /// List supported document types
    Supported,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Process {
            file,
            title,
            user,
            json,
        } => cmd_process(&config, &file, title.as_deref(), &user, json).await,
        Commands::Plan { file } => cmd_plan(&config, &file),
        Commands::Supported => cmd_supported(&config),
    }
}

/// Assemble an in-memory pipeline backed by the fake analysis backends.
fn build_pipeline(config: &Config) -> (Pipeline, Arc<MemoryRepository>) {
    let repo = Arc::new(MemoryRepository::new());
    let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new(config.storage.bucket.clone()));
    let notifier: Arc<dyn StatusNotifier> = Arc::new(LogNotifier);
    let completion = Arc::new(CompletionEvaluator::new(repo.clone(), notifier.clone()));

    let ocr = Arc::new(OcrJobExecutor::new(
        repo.clone(),
        Arc::new(FakeOcrBackend::new()),
        completion.clone(),
        config.processing.clone(),
    ));
    let nlp = Arc::new(NlpJobExecutor::new(
        repo.clone(),
        Arc::new(FakeNlpBackend::new()),
        store.clone(),
        completion,
        config.processing.clone(),
    ));

    let registry = ProcessorRegistry::with_defaults(&config.processing);
    let pipeline = Pipeline::new(
        repo.clone(),
        store,
        registry,
        ocr,
        nlp,
        notifier,
        config.clone(),
    );
    (pipeline, repo)
}

async fn cmd_process(
    config: &Config,
    file: &Path,
    title: Option<&str>,
    user: &str,
    json: bool,
) -> anyhow::Result<()> {
    let content = std::fs::read(file)?;
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let mime_type = mime_for_path(file);
    let title = title
        .map(str::to_string)
        .unwrap_or_else(|| title_for_path(file));

    let (pipeline, repo) = build_pipeline(config);
    let document = pipeline
        .ingest(user, &title, filename, mime_type, &content)
        .await?;
    println!(
        "{} Ingested {} ({}, {})",
        style("✓").green(),
        style(&document.title).bold(),
        mime_type,
        document.human_readable_size()
    );

    let document = match pipeline.run_to_completion(&document.id).await {
        Ok(doc) => doc,
        Err(err) => {
            println!("{} Processing failed: {}", style("✗").red(), err);
            return Err(err.into());
        }
    };

    let jobs = repo.jobs_for_document(&document.id).await?;
    println!(
        "\n{} ({} jobs)",
        style(document.processing_status.as_str()).bold(),
        jobs.len()
    );
    for job in &jobs {
        let mark = if job.status.is_terminal() && job.error_message.is_none() {
            style("✓").green()
        } else {
            style("✗").red()
        };
        let duration = job
            .processing_duration()
            .map(|d| format!(" ({:.2}s)", d.num_milliseconds() as f64 / 1_000.0))
            .unwrap_or_default();
        println!(
            "  {} {}{}{}",
            mark,
            job.kind.analysis_type(),
            duration,
            job.error_message
                .as_deref()
                .map(|m| format!(": {m}"))
                .unwrap_or_default()
        );
    }

    let results = repo.results_for_document(&document.id).await?;
    if json {
        println!("\n{}", serde_json::to_string_pretty(&results)?);
    } else {
        println!();
        for result in &results {
            let confidence = result
                .confidence
                .map(|c| format!("{:.1}%", c * 100.0))
                .unwrap_or_else(|| "n/a".to_string());
            println!(
                "  {} confidence {}",
                style(&result.analysis_type).cyan(),
                if result.has_high_confidence() {
                    style(confidence).green()
                } else {
                    style(confidence).yellow()
                }
            );
        }
    }

    Ok(())
}

fn cmd_plan(config: &Config, file: &Path) -> anyhow::Result<()> {
    let size = std::fs::metadata(file)?.len();
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let mime_type = mime_for_path(file);

    // A transient document record; nothing is stored.
    let document = Document::new(
        "cli".to_string(),
        title_for_path(file),
        filename.to_string(),
        mime_type.to_string(),
        size,
        config.storage.bucket.clone(),
        String::new(),
        serde_json::json!({}),
    );

    let registry = ProcessorRegistry::with_defaults(&config.processing);
    let processor = match registry.find_processor(&document) {
        Some(p) => p,
        None => {
            println!(
                "{} No processor available for {}",
                style("✗").red(),
                mime_type
            );
            anyhow::bail!("unsupported document type: {mime_type}");
        }
    };

    println!(
        "{} {} ({}, {}) → {}",
        style("✓").green(),
        filename,
        mime_type,
        document.human_readable_size(),
        style(processor.name()).bold()
    );
    for kind in processor.plan(&document) {
        println!("  • {}", serde_json::to_string(&kind)?);
    }
    Ok(())
}

fn cmd_supported(config: &Config) -> anyhow::Result<()> {
    let registry = ProcessorRegistry::with_defaults(&config.processing);

    println!("{}", style("Processors (selection order):").bold());
    for info in registry.processor_info() {
        println!(
            "  {} (priority {})",
            style(info.name).cyan(),
            info.priority
        );
        for mime in info.supported_mime_types {
            println!("    {mime}");
        }
    }

    println!("\n{}", style("All supported MIME types:").bold());
    for mime in registry.supported_mime_types() {
        println!("  {mime}");
    }
    Ok(())
}
