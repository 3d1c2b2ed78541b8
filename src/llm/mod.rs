// src/llm/mod.rs
pub mod client;
pub mod models;

pub use client::LlmClient;

use crate::config::ExtractorConfig;
use crate::extractors::heading::Vocabulary;
use crate::extractors::section::{extract_boundary, tidy_text, ExtractedSection, StrategyKind};
use crate::pdf::PageSource;

/// Last resort for a document the heuristics could not crack.
///
/// First asks for page ranges from the TOC pages; if that yields nothing,
/// asks for the findings text directly. Every failure mode ends in an empty
/// list, never an error, so one bad reply cannot stop the batch.
pub async fn llm_fallback(
    client: &LlmClient,
    document_id: &str,
    pages: &(dyn PageSource + Sync),
    config: &ExtractorConfig,
    vocabulary: &Vocabulary,
) -> Vec<ExtractedSection> {
    let count = pages.page_count();
    let toc_text = pages.text_range(config.toc_pages.first, config.toc_pages.last);

    if !toc_text.trim().is_empty() {
        match client.infer_boundaries(&toc_text, vocabulary).await {
            Ok(boundaries) => {
                let sections: Vec<ExtractedSection> = boundaries
                    .into_iter()
                    .map(|b| b.shifted(config.page_offset))
                    .filter(|b| match b.validate(Some(count)) {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::warn!("{}: {}", document_id, e);
                            false
                        }
                    })
                    .map(|b| ExtractedSection {
                        strategy: Some(StrategyKind::Llm),
                        ..extract_boundary(&b, pages)
                    })
                    .filter(ExtractedSection::is_found)
                    .collect();
                if !sections.is_empty() {
                    tracing::info!("{}: model located {} section(s)", document_id, sections.len());
                    return sections;
                }
            }
            Err(e) => {
                tracing::error!("{}: boundary query failed: {}", document_id, e);
                return Vec::new();
            }
        }
    }

    let full_text = pages.text_range(1, count);
    match client.extract_findings(&full_text, vocabulary).await {
        Ok(findings) if !findings.is_empty() => {
            let title = vocabulary.aliases().first().cloned().unwrap_or_default();
            vec![ExtractedSection {
                source_title: title,
                text: tidy_text(&findings.join("\n\n")),
                strategy: Some(StrategyKind::Llm),
                start_page: None,
                end_page: None,
            }]
        }
        Ok(_) => {
            tracing::info!("{}: model found no findings text", document_id);
            Vec::new()
        }
        Err(e) => {
            tracing::error!("{}: findings query failed: {}", document_id, e);
            Vec::new()
        }
    }
}
