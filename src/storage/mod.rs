// src/storage/mod.rs
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use serde::Serialize;
use crate::config::{ExtractorConfig, RowLayout};
use crate::extractors::chunker::chunk;
use crate::extractors::section::{DocumentResult, ExtractedSection, StrategyKind};
use crate::utils::error::StorageError;

pub const RESULTS_FILE: &str = "findings_extracted.csv";
pub const METADATA_FILE: &str = "run_metadata.json";

pub const STATUS_FOUND: &str = "found";
pub const STATUS_NOT_FOUND: &str = "not_found";

/// One output row in the per-chunk layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub document_id: String,
    pub section_title: String,
    pub status: &'static str,
    pub chunk_index: usize,
    pub text: String,
}

/// Flattens results into rows, splitting long sections to fit the cell limit.
/// A not-found document contributes one row with empty text.
pub fn build_rows(results: &[DocumentResult], max_chunk_length: usize) -> Vec<ResultRow> {
    let mut rows = Vec::new();
    for result in results {
        for section in &result.sections {
            if !section.is_found() {
                rows.push(ResultRow {
                    document_id: result.document_id.clone(),
                    section_title: section.source_title.clone(),
                    status: STATUS_NOT_FOUND,
                    chunk_index: 0,
                    text: String::new(),
                });
                continue;
            }
            for piece in chunk(&section.text, max_chunk_length) {
                rows.push(ResultRow {
                    document_id: result.document_id.clone(),
                    section_title: section.source_title.clone(),
                    status: STATUS_FOUND,
                    chunk_index: piece.index,
                    text: piece.text,
                });
            }
        }
    }
    rows
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedDocument {
    pub document_id: String,
    pub error: String,
}

/// Where one found section came from, for checking results against the PDF.
#[derive(Debug, Clone, Serialize)]
pub struct SectionRecord {
    pub document_id: String,
    pub section: String,
    pub strategy: Option<StrategyKind>,
    pub start_page: Option<u32>,
    pub end_page: Option<u32>,
    pub chars: usize,
}

/// What happened in one batch run, saved next to the result table.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub documents: usize,
    pub found: usize,
    pub not_found: usize,
    pub failed: Vec<FailedDocument>,
    pub sections_by_strategy: BTreeMap<String, usize>,
    pub sections: Vec<SectionRecord>,
    pub max_chunk_length: usize,
    pub layout: RowLayout,
    pub aliases: Vec<String>,
    pub extraction_timestamp: String,
}

impl RunSummary {
    pub fn new(results: &[DocumentResult], failed: Vec<FailedDocument>, config: &ExtractorConfig) -> Self {
        let found = results.iter().filter(|r| r.is_found()).count();
        let mut sections_by_strategy = BTreeMap::new();
        let mut sections = Vec::new();
        for result in results {
            for section in result.sections.iter().filter(|s| s.is_found()) {
                if let Some(kind) = section.strategy {
                    *sections_by_strategy.entry(kind.as_str().to_string()).or_insert(0) += 1;
                }
                sections.push(SectionRecord {
                    document_id: result.document_id.clone(),
                    section: section.source_title.clone(),
                    strategy: section.strategy,
                    start_page: section.start_page,
                    end_page: section.end_page,
                    chars: section.text.chars().count(),
                });
            }
        }

        Self {
            documents: results.len() + failed.len(),
            found,
            not_found: results.len() - found,
            failed,
            sections_by_strategy,
            sections,
            max_chunk_length: config.max_chunk_length,
            layout: config.layout,
            aliases: config.aliases.clone(),
            extraction_timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// Keeps the extension so "a.pdf" and "a.PDF" never share a file.
fn section_file_name(document_id: &str, index: usize) -> String {
    let name = Path::new(document_id)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| document_id.to_string());
    format!("{}_{}.txt", name, index + 1)
}

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Writes the result table in the requested layout.
    pub fn save_rows(
        &self,
        results: &[DocumentResult],
        layout: RowLayout,
        max_chunk_length: usize,
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(RESULTS_FILE);
        let rows = build_rows(results, max_chunk_length);
        let mut writer = csv::Writer::from_path(&file_path)?;

        match layout {
            RowLayout::PerChunk => {
                writer.write_record(["document", "section", "status", "chunk_index", "text"])?;
                for row in &rows {
                    let index = row.chunk_index.to_string();
                    writer.write_record([
                        row.document_id.as_str(),
                        row.section_title.as_str(),
                        row.status,
                        index.as_str(),
                        row.text.as_str(),
                    ])?;
                }
            }
            RowLayout::PerDocument => {
                // Group consecutive chunks of the same section back into one line
                let mut lines: Vec<(&ResultRow, Vec<&str>)> = Vec::new();
                for row in &rows {
                    let continues = matches!(
                        lines.last(),
                        Some((first, _)) if row.chunk_index > 0
                            && first.document_id == row.document_id
                            && first.section_title == row.section_title
                    );
                    match lines.last_mut() {
                        Some((_, parts)) if continues => parts.push(row.text.as_str()),
                        _ => lines.push((row, vec![row.text.as_str()])),
                    }
                }

                let width = lines.iter().map(|(_, parts)| parts.len()).max().unwrap_or(1);
                let mut header = vec!["document".to_string(), "section".to_string(), "status".to_string()];
                header.extend((1..=width).map(|i| format!("part_{}", i)));
                writer.write_record(&header)?;

                for (first, parts) in &lines {
                    let mut record: Vec<&str> = vec![
                        first.document_id.as_str(),
                        first.section_title.as_str(),
                        first.status,
                    ];
                    record.extend(parts.iter().copied());
                    record.resize(3 + width, "");
                    writer.write_record(&record)?;
                }
            }
        }

        writer.flush().map_err(StorageError::IoError)?;
        tracing::info!("Saved {} result rows to {}", rows.len(), file_path.display());
        Ok(file_path)
    }

    /// Saves one section's full text to `sections/<document file name>_<n>.txt`.
    pub fn save_section_text(
        &self,
        document_id: &str,
        index: usize,
        section: &ExtractedSection,
    ) -> Result<PathBuf, StorageError> {
        let target_dir = self.base_dir.join("sections");
        fs::create_dir_all(&target_dir).map_err(StorageError::IoError)?;

        let file_path = target_dir.join(section_file_name(document_id, index));
        fs::write(&file_path, &section.text).map_err(StorageError::IoError)?;

        tracing::debug!("Saved section to {}", file_path.display());
        Ok(file_path)
    }

    /// Saves metadata about the run in JSON format
    pub fn save_run_metadata(&self, summary: &RunSummary) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(METADATA_FILE);

        let metadata_str = serde_json::to_string_pretty(summary)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, metadata_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved metadata to {}", file_path.display());
        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(title: &str, text: &str) -> ExtractedSection {
        ExtractedSection {
            source_title: title.to_string(),
            text: text.to_string(),
            strategy: Some(StrategyKind::BodyScan),
            start_page: Some(1),
            end_page: Some(2),
        }
    }

    fn sample_results() -> Vec<DocumentResult> {
        vec![
            DocumentResult::new("a.pdf", vec![found("FINDINGS", "abcdefgh")]),
            DocumentResult::not_found("b.pdf"),
        ]
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new().has_headers(false).from_path(path).unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn rows_chunk_long_sections_and_mark_misses() {
        let rows = build_rows(&sample_results(), 3);
        let summary: Vec<_> = rows
            .iter()
            .map(|r| (r.document_id.as_str(), r.status, r.chunk_index, r.text.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a.pdf", STATUS_FOUND, 0, "abc"),
                ("a.pdf", STATUS_FOUND, 1, "def"),
                ("a.pdf", STATUS_FOUND, 2, "gh"),
                ("b.pdf", STATUS_NOT_FOUND, 0, ""),
            ]
        );
    }

    #[test]
    fn per_chunk_csv() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path().join("out")).unwrap();
        let path = storage.save_rows(&sample_results(), RowLayout::PerChunk, 5).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows[0], vec!["document", "section", "status", "chunk_index", "text"]);
        assert_eq!(rows[1], vec!["a.pdf", "FINDINGS", "found", "0", "abcde"]);
        assert_eq!(rows[2], vec!["a.pdf", "FINDINGS", "found", "1", "fgh"]);
        assert_eq!(rows[3], vec!["b.pdf", "", "not_found", "0", ""]);
    }

    #[test]
    fn per_document_csv_spreads_chunks_across_columns() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let path = storage.save_rows(&sample_results(), RowLayout::PerDocument, 3).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows[0], vec!["document", "section", "status", "part_1", "part_2", "part_3"]);
        assert_eq!(rows[1], vec!["a.pdf", "FINDINGS", "found", "abc", "def", "gh"]);
        assert_eq!(rows[2], vec!["b.pdf", "", "not_found", "", "", ""]);
    }

    #[test]
    fn section_files_differ_by_extension_case() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();

        let lower = storage.save_section_text("a.pdf", 0, &found("FINDINGS", "lower")).unwrap();
        let upper = storage.save_section_text("a.PDF", 0, &found("FINDINGS", "upper")).unwrap();

        assert_ne!(lower, upper);
        assert_eq!(fs::read_to_string(lower).unwrap(), "lower");
        assert_eq!(fs::read_to_string(upper).unwrap(), "upper");
    }

    #[test]
    fn section_text_and_metadata_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let results = sample_results();

        let text_path = storage.save_section_text("reports/a.pdf", 0, &results[0].sections[0]).unwrap();
        assert!(text_path.ends_with("sections/a.pdf_1.txt"));
        assert_eq!(fs::read_to_string(text_path).unwrap(), "abcdefgh");

        let failed = vec![FailedDocument { document_id: "c.pdf".to_string(), error: "corrupt".to_string() }];
        let summary = RunSummary::new(&results, failed, &ExtractorConfig::default());
        let meta_path = storage.save_run_metadata(&summary).unwrap();

        let meta: serde_json::Value = serde_json::from_str(&fs::read_to_string(meta_path).unwrap()).unwrap();
        assert_eq!(meta["documents"], 3);
        assert_eq!(meta["found"], 1);
        assert_eq!(meta["not_found"], 1);
        assert_eq!(meta["sections_by_strategy"]["body_scan"], 1);
        assert_eq!(meta["layout"], "per_chunk");
        assert_eq!(meta["failed"][0]["document_id"], "c.pdf");
        assert_eq!(meta["sections"].as_array().unwrap().len(), 1);
        assert_eq!(meta["sections"][0]["document_id"], "a.pdf");
        assert_eq!(meta["sections"][0]["strategy"], "body_scan");
        assert_eq!(meta["sections"][0]["start_page"], 1);
        assert_eq!(meta["sections"][0]["end_page"], 2);
        assert_eq!(meta["sections"][0]["chars"], 8);
    }
}
