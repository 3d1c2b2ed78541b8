// src/extractors/section.rs

// --- Imports ---
use crate::config::{ExtractorConfig, PageRange};
use crate::extractors::boundary::{resolve_from_body, resolve_from_toc, BodyCapture, SectionBoundary};
use crate::extractors::heading::HeadingMatcher;
use crate::extractors::toc::parse_toc;
use crate::pdf::PageSource;
use crate::utils::error::ExtractError;
use serde::Serialize;
use std::sync::Arc;

// --- Data Structures ---

/// Which path located a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Toc,
    BodyScan,
    Llm,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Toc => "toc",
            Self::BodyScan => "body_scan",
            Self::Llm => "llm",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSection {
    pub source_title: String, // Heading as the document (or model) named it
    pub text: String,         // Cleaned body of the section, empty when nothing matched
    pub strategy: Option<StrategyKind>,
    pub start_page: Option<u32>,
    pub end_page: Option<u32>,
}

impl ExtractedSection {
    pub fn not_found() -> Self {
        Self {
            source_title: String::new(),
            text: String::new(),
            strategy: None,
            start_page: None,
            end_page: None,
        }
    }

    pub fn is_found(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Everything extracted from one document. A document without a match holds a
/// single empty section so it still shows up in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentResult {
    pub document_id: String,
    pub sections: Vec<ExtractedSection>,
}

impl DocumentResult {
    pub fn new(document_id: &str, sections: Vec<ExtractedSection>) -> Self {
        let sections: Vec<_> = sections.into_iter().filter(|s| s.is_found()).collect();
        if sections.is_empty() {
            return Self::not_found(document_id);
        }
        Self { document_id: document_id.to_string(), sections }
    }

    pub fn not_found(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            sections: vec![ExtractedSection::not_found()],
        }
    }

    pub fn is_found(&self) -> bool {
        self.sections.iter().any(ExtractedSection::is_found)
    }
}

// --- Text assembly ---

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn is_page_number(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
}

/// Strips leading/trailing blank lines, trailing whitespace on each line, and
/// collapses runs of three or more blank lines into one.
pub fn tidy_text(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let first = lines.iter().position(|l| !is_blank(l));
    let last = lines.iter().rposition(|l| !is_blank(l));
    let (Some(first), Some(last)) = (first, last) else {
        return String::new();
    };

    let mut out: Vec<&str> = Vec::with_capacity(last - first + 1);
    let mut blank_run = 0usize;
    for line in &lines[first..=last] {
        if is_blank(line) {
            blank_run += 1;
            continue;
        }
        match blank_run {
            0 => {}
            1 | 2 => out.extend(std::iter::repeat("").take(blank_run)),
            _ => out.push(""),
        }
        blank_run = 0;
        out.push(line.trim_end());
    }
    out.join("\n")
}

/// Drops a running page number from the first and last non-empty line.
fn strip_page_furniture(page_text: &str) -> String {
    let mut lines: Vec<&str> = page_text.lines().collect();
    if let Some(i) = lines.iter().rposition(|l| !is_blank(l)) {
        if is_page_number(lines[i]) {
            lines.remove(i);
        }
    }
    if let Some(i) = lines.iter().position(|l| !is_blank(l)) {
        if is_page_number(lines[i]) {
            lines.remove(i);
        }
    }
    lines.join("\n").trim().to_string()
}

/// Assembles the text of a page-range boundary: pages `start..=end`, clamped
/// to the document, one blank line between pages.
///
/// Pure in its inputs, so extracting the same boundary twice gives the same text.
pub fn extract_boundary(boundary: &SectionBoundary, pages: &dyn PageSource) -> ExtractedSection {
    let count = pages.page_count();
    let start = boundary.start_page.unwrap_or(1).max(1);
    let end = boundary.end_page.unwrap_or(count).min(count);

    let body = pages
        .pages(start, end)
        .iter()
        .map(|p| strip_page_furniture(&p.text))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    ExtractedSection {
        source_title: boundary.title.clone(),
        text: tidy_text(&body),
        strategy: Some(StrategyKind::Toc),
        start_page: Some(start),
        end_page: Some(end.max(start)),
    }
}

/// Final trimming of text captured by the body scanner.
pub fn finalize_capture(capture: BodyCapture) -> ExtractedSection {
    ExtractedSection {
        source_title: capture.boundary.title,
        text: tidy_text(&capture.text),
        strategy: Some(StrategyKind::BodyScan),
        start_page: capture.boundary.start_page,
        end_page: capture.boundary.end_page,
    }
}

// --- Strategies ---

pub trait ExtractionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// `Ok(None)` when this strategy finds nothing; the next one gets a turn.
    fn extract(&self, pages: &dyn PageSource) -> Result<Option<ExtractedSection>, ExtractError>;
}

/// Reads the table of contents from the front pages and cuts the section by page.
pub struct TocExtractionStrategy {
    matcher: Arc<HeadingMatcher>,
    toc_pages: PageRange,
    page_offset: i32,
}

impl TocExtractionStrategy {
    pub fn new(matcher: Arc<HeadingMatcher>, toc_pages: PageRange, page_offset: i32) -> Self {
        Self { matcher, toc_pages, page_offset }
    }
}

impl ExtractionStrategy for TocExtractionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Toc
    }

    fn extract(&self, pages: &dyn PageSource) -> Result<Option<ExtractedSection>, ExtractError> {
        let toc_text = pages.text_range(self.toc_pages.first, self.toc_pages.last);
        let entries = parse_toc(&toc_text);
        if entries.is_empty() {
            tracing::debug!("No TOC entries on pages {}-{}", self.toc_pages.first, self.toc_pages.last);
            return Ok(None);
        }

        let Some(boundary) = resolve_from_toc(&entries, self.matcher.vocabulary()) else {
            tracing::debug!("TOC has {} entries, none in the vocabulary", entries.len());
            return Ok(None);
        };

        let count = pages.page_count();
        let boundary = boundary.shifted(self.page_offset).with_page_count(count);
        boundary.validate(Some(count))?;

        tracing::info!(
            "TOC places '{}' on pages {:?}-{:?}",
            boundary.title,
            boundary.start_page,
            boundary.end_page
        );
        Ok(Some(extract_boundary(&boundary, pages)))
    }
}

/// Walks every line of the document looking for a start heading.
pub struct BodyScanExtractionStrategy {
    matcher: Arc<HeadingMatcher>,
}

impl BodyScanExtractionStrategy {
    pub fn new(matcher: Arc<HeadingMatcher>) -> Self {
        Self { matcher }
    }
}

impl ExtractionStrategy for BodyScanExtractionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BodyScan
    }

    fn extract(&self, pages: &dyn PageSource) -> Result<Option<ExtractedSection>, ExtractError> {
        let all = pages.pages(1, pages.page_count());
        Ok(resolve_from_body(&all, &self.matcher).map(finalize_capture))
    }
}

// --- Main Extractor Structure ---
pub struct SectionExtractor {
    matcher: Arc<HeadingMatcher>,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    min_section_chars: usize,
}

impl SectionExtractor {
    /// Builds the TOC strategy followed by the body-scan fallback.
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractError> {
        let matcher = Arc::new(HeadingMatcher::from_config(config)?);
        let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(TocExtractionStrategy::new(matcher.clone(), config.toc_pages, config.page_offset)),
            Box::new(BodyScanExtractionStrategy::new(matcher.clone())),
        ];
        Ok(Self { matcher, strategies, min_section_chars: config.min_section_chars })
    }

    pub fn matcher(&self) -> &HeadingMatcher {
        &self.matcher
    }

    /// Runs the strategies in order and keeps the first usable section.
    ///
    /// Errors and invalid boundaries are logged and the next strategy is
    /// tried; a document that defeats all of them comes back as not found.
    pub fn extract_document(&self, document_id: &str, pages: &dyn PageSource) -> DocumentResult {
        for strategy in &self.strategies {
            let kind = strategy.kind().as_str();
            match strategy.extract(pages) {
                Ok(Some(section)) if section.is_found() => {
                    let chars = section.text.chars().count();
                    if chars < self.min_section_chars {
                        tracing::warn!(
                            "{}: {} section '{}' is too small ({} chars, required {})",
                            document_id,
                            kind,
                            section.source_title,
                            chars,
                            self.min_section_chars
                        );
                        continue;
                    }
                    tracing::info!(
                        "{}: extracted '{}' via {} ({} chars)",
                        document_id,
                        section.source_title,
                        kind,
                        chars
                    );
                    return DocumentResult::new(document_id, vec![section]);
                }
                Ok(_) => tracing::debug!("{}: {} strategy found nothing", document_id, kind),
                Err(e) => tracing::warn!("{}: {} strategy rejected: {}", document_id, kind, e),
            }
        }

        tracing::info!("{}: no findings section detected", document_id);
        DocumentResult::not_found(document_id)
    }
}
