// src/main.rs
mod config;
mod extractors;
mod llm;
mod pdf;
mod storage;
mod utils;

use clap::Parser;
use config::{ExtractorConfig, PageRange, RowLayout};
use extractors::{DocumentResult, SectionExtractor};
use llm::LlmClient;
use pdf::RawPages;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::{FailedDocument, RunSummary, StorageManager};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use utils::AppError;

/// Command Line Interface for the findings section extractor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing the PDF reports
    #[arg(short, long)]
    input_dir: PathBuf,

    /// Output directory for the result table and section files
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// JSON config file (vocabulary, heading phrases, limits)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum characters per output cell (default: 32000)
    #[arg(long)]
    max_chunk_length: Option<usize>,

    /// First page scanned for a table of contents (default: 2)
    #[arg(long)]
    toc_start: Option<u32>,

    /// Last page scanned for a table of contents (default: 12)
    #[arg(long)]
    toc_end: Option<u32>,

    /// Added to TOC page numbers to reach physical PDF pages
    #[arg(long, allow_negative_numbers = true)]
    page_offset: Option<i32>,

    /// Treat sections shorter than this many characters as not found
    #[arg(long)]
    min_section_chars: Option<usize>,

    /// Output row layout
    #[arg(long, value_enum)]
    layout: Option<RowLayout>,

    /// Number of documents processed in parallel
    #[arg(short, long, default_value = "4")]
    jobs: usize,

    /// Ask a local Ollama model when the heuristics find nothing
    #[arg(long)]
    llm: bool,

    /// Ollama base URL
    #[arg(long)]
    llm_url: Option<String>,

    /// Ollama model name
    #[arg(long)]
    llm_model: Option<String>,

    /// Debug mode - save a per-line classification trace for each document
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    /// CLI flags win over the config file.
    fn apply_overrides(&self, mut config: ExtractorConfig) -> ExtractorConfig {
        if let Some(n) = self.max_chunk_length {
            config.max_chunk_length = n;
        }
        config.toc_pages = PageRange {
            first: self.toc_start.unwrap_or(config.toc_pages.first),
            last: self.toc_end.unwrap_or(config.toc_pages.last),
        };
        if let Some(offset) = self.page_offset {
            config.page_offset = offset;
        }
        if let Some(n) = self.min_section_chars {
            config.min_section_chars = n;
        }
        if let Some(layout) = self.layout {
            config.layout = layout;
        }
        if self.llm {
            config.llm.enabled = true;
        }
        if let Some(url) = &self.llm_url {
            config.llm.base_url = url.clone();
        }
        if let Some(model) = &self.llm_model {
            config.llm.model = model.clone();
        }
        config
    }
}

/// PDF files directly inside `dir`, sorted by name.
fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

fn document_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Runs one document through the pipeline. Only a document that cannot be
/// opened at all counts as failed; everything else ends in a result row.
async fn process_document(
    path: PathBuf,
    extractor: Arc<SectionExtractor>,
    config: Arc<ExtractorConfig>,
    llm_client: Option<Arc<LlmClient>>,
    debug_dir: Option<PathBuf>,
) -> Result<DocumentResult, FailedDocument> {
    let id = document_id(&path);
    tracing::info!("Processing: {}", id);

    let blocking_extractor = extractor.clone();
    let blocking_id = id.clone();
    let joined = tokio::task::spawn_blocking(move || -> Result<(RawPages, DocumentResult), AppError> {
        let pages = pdf::load_pages(&path)?;

        if let Some(dir) = debug_dir {
            let trace_path = dir.join(format!("{}.lines.tsv", blocking_id));
            if let Err(e) = utils::debug::write_line_trace(&pages.all(), blocking_extractor.matcher(), &trace_path) {
                tracing::warn!("Failed to write line trace for {}: {}", blocking_id, e);
            }
        }

        let result = blocking_extractor.extract_document(&blocking_id, &pages);
        Ok((pages, result))
    })
    .await;

    let (pages, result) = match joined {
        Ok(Ok(done)) => done,
        Ok(Err(e)) => {
            tracing::error!("Failed to read {}: {}", id, e);
            return Err(FailedDocument { document_id: id, error: e.to_string() });
        }
        Err(e) => {
            tracing::error!("Extraction task for {} aborted: {}", id, e);
            return Err(FailedDocument { document_id: id, error: e.to_string() });
        }
    };

    if result.is_found() {
        return Ok(result);
    }

    if let Some(client) = llm_client {
        tracing::info!("{}: asking {} for boundaries", id, config.llm.model);
        let sections =
            llm::llm_fallback(&client, &id, &pages, &config, extractor.matcher().vocabulary()).await;
        if !sections.is_empty() {
            return Ok(DocumentResult::new(&id, sections));
        }
    }

    Ok(result)
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments
    let args = Args::parse();

    // 2. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging(args.debug);
    tracing::info!("Starting processing for args: {:?}", args);

    // 3. Build configuration: file, then CLI overrides, then validation
    let config = args.apply_overrides(ExtractorConfig::load(args.config.as_deref())?);
    config.validate()?;
    let config = Arc::new(config);

    // 4. Initialize storage and the shared extractor
    let storage = StorageManager::new(&args.output_dir)?;
    let extractor = Arc::new(SectionExtractor::new(&config)?);
    let llm_client = if config.llm.enabled {
        Some(Arc::new(LlmClient::new(&config.llm)?))
    } else {
        None
    };
    let debug_dir = if args.debug {
        let dir = storage.base_dir().join("debug");
        std::fs::create_dir_all(&dir)?;
        Some(dir)
    } else {
        None
    };

    // 5. Find the documents
    let files = list_pdfs(&args.input_dir)?;
    tracing::info!("Found {} PDF files in {}", files.len(), args.input_dir.display());
    if files.is_empty() {
        return Err(AppError::Config(format!("No PDF files found in {}", args.input_dir.display())));
    }

    // 6. Fan out over a bounded worker pool
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut tasks = JoinSet::new();
    for path in files {
        let semaphore = semaphore.clone();
        let extractor = extractor.clone();
        let config = config.clone();
        let llm_client = llm_client.clone();
        let debug_dir = debug_dir.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            process_document(path, extractor, config, llm_client, debug_dir).await
        });
    }

    let mut results = Vec::new();
    let mut failed = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(result)) => results.push(result),
            Ok(Err(failure)) => failed.push(failure),
            Err(e) => tracing::error!("Document task failed to complete: {}", e),
        }
    }
    // Completion order is arbitrary; output order is not
    results.sort_by(|a, b| a.document_id.cmp(&b.document_id));
    failed.sort_by(|a, b| a.document_id.cmp(&b.document_id));

    // 7. Save results
    let table_path = storage.save_rows(&results, config.layout, config.max_chunk_length)?;
    tracing::info!("Results saved to {}", table_path.display());

    for result in results.iter().filter(|r| r.is_found()) {
        for (index, section) in result.sections.iter().enumerate() {
            if let Err(e) = storage.save_section_text(&result.document_id, index, section) {
                tracing::error!("Failed to save section text for {}: {}", result.document_id, e);
            }
        }
    }

    let summary = RunSummary::new(&results, failed, &config);
    storage.save_run_metadata(&summary)?;

    tracing::info!(
        "Processing finished. Found: {}, Not found: {}, Failures: {}",
        summary.found,
        summary.not_found,
        summary.failed.len()
    );

    if results.is_empty() && !summary.failed.is_empty() {
        return Err(AppError::Processing(format!(
            "Failed to read any of the {} documents",
            summary.failed.len()
        )));
    }

    Ok(())
}
