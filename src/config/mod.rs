// src/config/mod.rs
use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::utils::AppError;

/// Largest number of characters a spreadsheet cell accepts.
pub const SPREADSHEET_CELL_LIMIT: usize = 32_767;
pub const DEFAULT_MAX_CHUNK_LENGTH: usize = 32_000;

/// Heading strings that denote the target section, across languages.
pub const DEFAULT_ALIASES: &[&str] = &[
    "FINDINGS",
    "MAIN FINDINGS",
    "FINDINGS OF THE EVALUATION",
    "FINDINGS AND ANALYSIS",
    "CROSS-CUTTING ISSUES",
    "HALLAZGOS Y ANÁLISIS DE DATOS",
    "HALLAZGOS DE LA EVALUACIÓN",
    "HALLAZGOS",
    "CRITÈRES DE L’ÉVALUATION",
    "RESULTADOS O HALLAZGOS DE LA EVALUACIÓN",
    "UM PANORAMA DAS PERCEPÇÕES E DESCOBERTAS",
    "EM DESTAQUE",
    "RESULTADOS E CONCLUSÕES PRELIMINARES",
    "CADRE DE L’ÉVALUATION ET MÉTHODES",
    "CONSTATATIONS",
];

/// Phrases that open the section when they start a line, even with trailing text.
pub const DEFAULT_START_PHRASES: &[&str] = &[
    "main findings",
    "key findings",
    "principal hallazgos",
    "principales hallazgos",
    "findings and analysis",
    "evaluation results",
];

/// Phrases that close the section when they start a line.
pub const DEFAULT_END_PHRASES: &[&str] = &[
    "recommendations",
    "recommendation",
    "conclusions",
    "conclusion",
    "methodology",
    "approach",
    "next steps",
    "references",
    "appendix",
    "annex",
];

/// Inclusive, 1-based page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub first: u32,
    pub last: u32,
}

/// How result rows are laid out in the output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum RowLayout {
    /// One row per chunk.
    PerChunk,
    /// One row per section, chunks spread across `part_N` columns.
    PerDocument,
}

/// Ollama connection settings for the optional fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Maximum characters of document text sent with a findings prompt.
    pub text_limit: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:11434".to_string(),
            model: "deepseek-r1:8b".to_string(),
            timeout_secs: 120,
            text_limit: 24_000,
        }
    }
}

/// Everything the extraction pipeline needs, shared read-only across documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub aliases: Vec<String>,
    pub start_phrases: Vec<String>,
    pub end_phrases: Vec<String>,
    pub toc_pages: PageRange,
    /// Added to every page number read from a table of contents.
    pub page_offset: i32,
    pub max_chunk_length: usize,
    /// Sections shorter than this (in characters) are treated as misses.
    pub min_section_chars: usize,
    pub layout: RowLayout,
    pub llm: LlmConfig,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            aliases: DEFAULT_ALIASES.iter().map(|s| s.to_string()).collect(),
            start_phrases: DEFAULT_START_PHRASES.iter().map(|s| s.to_string()).collect(),
            end_phrases: DEFAULT_END_PHRASES.iter().map(|s| s.to_string()).collect(),
            toc_pages: PageRange { first: 2, last: 12 },
            page_offset: 0,
            max_chunk_length: DEFAULT_MAX_CHUNK_LENGTH,
            min_section_chars: 0,
            layout: RowLayout::PerChunk,
            llm: LlmConfig::default(),
        }
    }
}

impl ExtractorConfig {
    /// Loads a JSON config file, or returns the defaults when no path is given.
    /// Missing keys in the file fall back to their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = path else {
            tracing::debug!("No config file given, using defaults");
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            AppError::Config(format!("Invalid config file {}: {}", path.display(), e))
        })?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.aliases.iter().all(|a| a.trim().is_empty()) {
            return Err(AppError::Config("Alias vocabulary is empty".to_string()));
        }
        if self.max_chunk_length == 0 || self.max_chunk_length > SPREADSHEET_CELL_LIMIT {
            return Err(AppError::Config(format!(
                "max_chunk_length must be between 1 and {}, got {}",
                SPREADSHEET_CELL_LIMIT, self.max_chunk_length
            )));
        }
        if self.toc_pages.first == 0 || self.toc_pages.first > self.toc_pages.last {
            return Err(AppError::Config(format!(
                "TOC page range {}-{} is not a valid 1-based range",
                self.toc_pages.first, self.toc_pages.last
            )));
        }
        if self.llm.enabled && !(self.llm.base_url.starts_with("http://") || self.llm.base_url.starts_with("https://")) {
            return Err(AppError::Config(format!("LLM base URL must be http(s), got '{}'", self.llm.base_url)));
        }
        Ok(())
    }
}
