// src/llm/models.rs
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

// Reasoning models wrap their chain of thought in <think> tags before answering
static THINK_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<think>.*?</think>").expect("Failed to compile THINK_BLOCK_RE")
});

/// Body of an Ollama `/api/generate` call.
#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

/// Non-streaming reply from `/api/generate`; only the text matters here.
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
}

/// One section the model claims to have found in a table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LlmBoundary {
    #[serde(default)]
    pub section: String,
    #[serde(default, deserialize_with = "lenient_page")]
    pub start_page: Option<u32>,
    #[serde(default, deserialize_with = "lenient_page")]
    pub end_page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FindingsReply {
    pub findings: Vec<String>,
}

/// The two reply shapes the prompts ask for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LlmReply {
    Boundaries(Vec<LlmBoundary>),
    Findings(FindingsReply),
}

// Models write pages as 12, "12" or 12.0; anything else counts as missing.
fn lenient_page<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let page = match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(page.and_then(|p| u32::try_from(p).ok()))
}

/// Pulls a JSON reply out of free-form model output.
///
/// Strips reasoning blocks and code fences, then tries the whole text and
/// finally the outermost `[...]` or `{...}` span. `None` for anything that
/// is not one of the expected shapes.
pub fn parse_reply(raw: &str) -> Option<LlmReply> {
    let without_think = THINK_BLOCK_RE.replace_all(raw, "");
    let cleaned = without_think
        .replace("```json", "")
        .replace("```", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(reply) = serde_json::from_str::<LlmReply>(cleaned) {
        return Some(reply);
    }

    [('[', ']'), ('{', '}')]
        .iter()
        .filter_map(|(open, close)| {
            let start = cleaned.find(*open)?;
            let end = cleaned.rfind(*close)?;
            (start < end).then(|| &cleaned[start..=end])
        })
        .find_map(|candidate| serde_json::from_str::<LlmReply>(candidate).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_boundary_array() {
        let raw = r#"[{"section": "3. FINDINGS", "start_page": 12, "end_page": "20"}]"#;
        assert_eq!(
            parse_reply(raw),
            Some(LlmReply::Boundaries(vec![LlmBoundary {
                section: "3. FINDINGS".to_string(),
                start_page: Some(12),
                end_page: Some(20),
            }]))
        );
    }

    #[test]
    fn parses_findings_object() {
        let raw = r#"{"findings": ["Coverage improved.", "Costs fell."]}"#;
        assert_eq!(
            parse_reply(raw),
            Some(LlmReply::Findings(FindingsReply {
                findings: vec!["Coverage improved.".to_string(), "Costs fell.".to_string()],
            }))
        );
    }

    #[test]
    fn strips_reasoning_and_fences() {
        let raw = "<think>\nThe TOC lists [Findings] on 5...\n</think>\nHere you go:\n```json\n[{\"section\": \"FINDINGS\", \"start_page\": 5, \"end_page\": 8.0}]\n```";
        let Some(LlmReply::Boundaries(items)) = parse_reply(raw) else {
            panic!("expected boundaries");
        };
        assert_eq!(items[0].start_page, Some(5));
        assert_eq!(items[0].end_page, Some(8));
    }

    #[test]
    fn bad_pages_become_missing() {
        let raw = r#"[{"section": "FINDINGS", "start_page": "five", "end_page": -3}]"#;
        let Some(LlmReply::Boundaries(items)) = parse_reply(raw) else {
            panic!("expected boundaries");
        };
        assert_eq!((items[0].start_page, items[0].end_page), (None, None));
    }

    #[test]
    fn non_json_is_none() {
        assert_eq!(parse_reply(""), None);
        assert_eq!(parse_reply("I could not find a findings section."), None);
        assert_eq!(parse_reply(r#"{"answer": 42}"#), None);
        assert_eq!(parse_reply("<think>hmm</think>"), None);
    }
}
