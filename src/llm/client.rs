// src/llm/client.rs
use crate::config::LlmConfig;
use crate::extractors::boundary::SectionBoundary;
use crate::extractors::heading::Vocabulary;
use crate::llm::models::{parse_reply, GenerateRequest, GenerateResponse, LlmBoundary, LlmReply};
use crate::utils::error::LlmError;
use std::time::Duration;

/// Thin client for a local Ollama server.
///
/// No retries: a failed or slow call is reported once and the caller decides
/// what "not found" means for that document.
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    text_limit: usize,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            text_limit: config.text_limit,
        })
    }

    /// Sends one prompt and returns the model's raw text.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        tracing::debug!("Querying {} at {} ({} prompt chars)", self.model, url, prompt.len());

        let response = self
            .http
            .post(&url)
            .json(&GenerateRequest { model: &self.model, prompt, stream: false })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for URL: {}", status, url);
            return Err(LlmError::Http(status));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;
        Ok(body.response)
    }

    /// Asks the model for section page ranges in a table of contents and keeps
    /// only the usable ones. An unparseable reply is an empty result.
    pub async fn infer_boundaries(
        &self,
        toc_text: &str,
        vocabulary: &Vocabulary,
    ) -> Result<Vec<SectionBoundary>, LlmError> {
        let raw = self.generate(&boundary_prompt(toc_text, vocabulary)).await?;
        match parse_reply(&raw) {
            Some(LlmReply::Boundaries(items)) => Ok(select_boundaries(items, vocabulary)),
            Some(LlmReply::Findings(_)) => {
                tracing::warn!("Model answered a boundary prompt with findings text; ignoring");
                Ok(Vec::new())
            }
            None => {
                tracing::warn!("Unable to parse model reply as boundary JSON");
                Ok(Vec::new())
            }
        }
    }

    /// Asks the model to lift the findings out of raw document text.
    pub async fn extract_findings(
        &self,
        text: &str,
        vocabulary: &Vocabulary,
    ) -> Result<Vec<String>, LlmError> {
        let excerpt: String = text.chars().take(self.text_limit).collect();
        let raw = self.generate(&findings_prompt(&excerpt, vocabulary)).await?;
        match parse_reply(&raw) {
            Some(LlmReply::Findings(reply)) => Ok(reply
                .findings
                .into_iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect()),
            _ => {
                tracing::warn!("Unable to parse model reply as findings JSON");
                Ok(Vec::new())
            }
        }
    }
}

fn heading_list(vocabulary: &Vocabulary) -> String {
    vocabulary.aliases().join(", ")
}

pub fn boundary_prompt(toc_text: &str, vocabulary: &Vocabulary) -> String {
    format!(
        "Below is the table of contents of a report, extracted from a PDF.\n\
         Find every section whose heading corresponds to one of: {}.\n\
         For each, give the heading as written, the page it starts on, and the page it ends on \
         (the page before the next section starts).\n\
         Answer with a JSON array only, for example \
         [{{\"section\": \"3. FINDINGS\", \"start_page\": 12, \"end_page\": 30}}].\n\n\
         Table of contents:\n\"\"\"\n{}\n\"\"\"\n",
        heading_list(vocabulary),
        toc_text
    )
}

pub fn findings_prompt(text: &str, vocabulary: &Vocabulary) -> String {
    format!(
        "Below is text extracted from a report.\n\
         Copy out the parts belonging to a section headed by one of: {}.\n\
         Answer with a JSON object only: {{\"findings\": [\"...\"]}}. \
         Use an empty list if there is no such section.\n\n\
         Text:\n\"\"\"\n{}\n\"\"\"\n",
        heading_list(vocabulary),
        text
    )
}

/// Keeps boundaries that name a vocabulary heading and have a usable page range.
pub fn select_boundaries(items: Vec<LlmBoundary>, vocabulary: &Vocabulary) -> Vec<SectionBoundary> {
    items
        .into_iter()
        .filter_map(|item| {
            if vocabulary.contained_in(&item.section).is_none() {
                tracing::debug!("Model section '{}' is not in the vocabulary", item.section);
                return None;
            }
            match (item.start_page, item.end_page) {
                (Some(start), Some(end)) if start > 0 && start <= end => Some(SectionBoundary {
                    title: item.section.trim().to_string(),
                    start_page: Some(start),
                    end_page: Some(end),
                }),
                _ => {
                    tracing::warn!(
                        "Invalid boundaries for section '{}': {:?}-{:?}; skipping",
                        item.section,
                        item.start_page,
                        item.end_page
                    );
                    None
                }
            }
        })
        .collect()
}
