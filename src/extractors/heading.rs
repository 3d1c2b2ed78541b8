// src/extractors/heading.rs

use crate::config::ExtractorConfig;
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;

// Optional leading section numbering: "3", "3.", "3.1", "3.1."
const NUMBERING: &str = r"(?:\d+(?:\.\d+)*\.?\s*)?";

// --- Regex Patterns for TOC artifacts (Lazy Static) ---
// A line matching any of these is never a heading and never section content.
static TOC_NOISE_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Entry with dot-leaders (or ellipsis glyphs) and a page number, numbered or not
        r"(?i)^\s*(?:\d+(?:\.\d+)*\.?\s+)?\S.*?(?:\.{3,}|…+)\s*\d+\s*$",
        // Page number references
        r"(?i)^\s*.*?\b(?:page|pg|pág)\.?\s+\d+\s*$",
        // TOC headers
        r"(?i)^\s*(?:table\s+of\s+contents|contents)\b",
        // Line of dots
        r"^\s*\.{4,}\s*$",
        // Standalone page numbers
        r"^\s*\d+\s*$",
        // Annex/appendix cross-references
        r"(?i)^\s*(?:annex|appendix)\s+[a-z0-9]+\b",
    ]
    .iter()
    .filter_map(|pat| Regex::new(pat).ok())
    .collect()
});

// Top-level numbered chapter heading such as "4. RECOMMENDATIONS"
static CHAPTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\.\s+\p{Lu}{2,}").expect("Failed to compile CHAPTER_RE")
});

/// What a single line of page text looks like to the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    TocNoise,
    /// Carries the alias or start phrase that matched.
    SectionStart(String),
    SectionEnd,
    Body,
}

/// Folds case, apostrophe variants and whitespace so headings compare equal
/// regardless of how the PDF text layer spelled them.
pub fn normalize_title(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('’', "'")
        .to_lowercase()
}

/// Turns a configured phrase into a regex fragment: words escaped, any run of
/// whitespace allowed between them, both apostrophe forms accepted.
fn phrase_fragment(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|word| {
            word.chars()
                .map(|c| match c {
                    '\'' | '’' => "['’]".to_string(),
                    other => regex::escape(&other.to_string()),
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(r"\s+")
}

fn compile(pattern: &str) -> Result<Regex, ExtractError> {
    Regex::new(pattern).map_err(|e| ExtractError::RegexError(format!("'{}': {}", pattern, e)))
}

/// The configured set of headings that name the target section.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    aliases: Vec<String>,
    normalized: Vec<String>,
}

impl Vocabulary {
    pub fn new<S: AsRef<str>>(aliases: &[S]) -> Self {
        let aliases: Vec<String> = aliases
            .iter()
            .map(|a| a.as_ref().trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        let normalized = aliases.iter().map(|a| normalize_title(a)).collect();
        Self { aliases, normalized }
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Returns the alias equal to `title`, ignoring case and spacing.
    pub fn matches_exactly(&self, title: &str) -> Option<&str> {
        let wanted = normalize_title(title);
        self.normalized
            .iter()
            .position(|n| *n == wanted)
            .map(|i| self.aliases[i].as_str())
    }

    /// Returns the first alias that occurs anywhere inside `text`.
    pub fn contained_in(&self, text: &str) -> Option<&str> {
        let haystack = normalize_title(text);
        self.normalized
            .iter()
            .position(|n| haystack.contains(n.as_str()))
            .map(|i| self.aliases[i].as_str())
    }
}

/// Classifies lines as TOC noise, section start, section end or body text.
pub struct HeadingMatcher {
    vocabulary: Vocabulary,
    alias_patterns: Vec<(String, Regex)>,
    start_patterns: Vec<(String, Regex)>,
    end_patterns: Vec<Regex>,
}

impl HeadingMatcher {
    pub fn new<S: AsRef<str>>(
        aliases: &[S],
        start_phrases: &[S],
        end_phrases: &[S],
    ) -> Result<Self, ExtractError> {
        let vocabulary = Vocabulary::new(aliases);

        // An alias must be the whole line, otherwise "Findings from the survey..."
        // in running text would open the section.
        let alias_patterns = vocabulary
            .aliases()
            .iter()
            .map(|alias| {
                let pattern = format!(r"(?i)^\s*{}{}\s*:?\s*$", NUMBERING, phrase_fragment(alias));
                compile(&pattern).map(|re| (alias.clone(), re))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let start_patterns = start_phrases
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .map(|phrase| {
                let pattern = format!(r"(?i)^\s*{}{}\b", NUMBERING, phrase_fragment(phrase));
                compile(&pattern).map(|re| (phrase.to_string(), re))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let end_patterns = end_phrases
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .map(|phrase| compile(&format!(r"(?i)^\s*{}{}\b", NUMBERING, phrase_fragment(phrase))))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "Compiled heading matcher: {} aliases, {} start phrases, {} end phrases",
            alias_patterns.len(),
            start_patterns.len(),
            end_patterns.len()
        );

        Ok(Self { vocabulary, alias_patterns, start_patterns, end_patterns })
    }

    pub fn from_config(config: &ExtractorConfig) -> Result<Self, ExtractError> {
        Self::new(&config.aliases[..], &config.start_phrases[..], &config.end_phrases[..])
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// TOC noise wins over a start heading, so "3.1 Findings ..... 12" inside a
    /// table of contents never opens the section.
    pub fn classify(&self, line: &str) -> LineClass {
        if self.is_toc_noise(line) {
            return LineClass::TocNoise;
        }
        if let Some(label) = self.section_start(line) {
            return LineClass::SectionStart(label.to_string());
        }
        if self.is_section_end(line) {
            return LineClass::SectionEnd;
        }
        LineClass::Body
    }

    pub fn is_toc_noise(&self, line: &str) -> bool {
        TOC_NOISE_RE.iter().any(|re| re.is_match(line))
    }

    pub fn is_section_end(&self, line: &str) -> bool {
        self.end_patterns.iter().any(|re| re.is_match(line))
    }

    fn section_start(&self, line: &str) -> Option<&str> {
        self.alias_patterns
            .iter()
            .chain(self.start_patterns.iter())
            .find(|(_, re)| re.is_match(line))
            .map(|(label, _)| label.as_str())
    }

    /// Number of a top-level "N. TITLE" heading, if the line is one.
    pub fn chapter_number(&self, line: &str) -> Option<u32> {
        CHAPTER_RE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> HeadingMatcher {
        HeadingMatcher::from_config(&ExtractorConfig::default()).unwrap()
    }

    #[test]
    fn toc_entry_is_noise_not_start() {
        let m = matcher();
        assert_eq!(m.classify("3.1 Findings ..... 12"), LineClass::TocNoise);
        assert_eq!(m.classify("2 Key findings ………… 7"), LineClass::TocNoise);
        assert_eq!(m.classify("3. FINDINGS .......... 12"), LineClass::TocNoise);
    }

    #[test]
    fn unnumbered_toc_entry_is_noise() {
        let m = matcher();
        assert_eq!(m.classify("KEY FINDINGS ........ 5"), LineClass::TocNoise);
        assert_eq!(m.classify("Main findings …… 14"), LineClass::TocNoise);
        assert_eq!(m.classify("FINDINGS .... 9"), LineClass::TocNoise);
        assert_eq!(m.classify("RECOMMENDATIONS ..... 9"), LineClass::TocNoise);
        assert_eq!(m.classify("KEY FINDINGS"), LineClass::SectionStart("key findings".to_string()));
    }

    #[test]
    fn recognises_noise_shapes() {
        let m = matcher();
        for line in [
            "Table of Contents",
            "CONTENTS",
            "See the discussion on page 14",
            "pág 3",
            "..........",
            "  42  ",
            "Annex 3 lists the interviewees",
            "APPENDIX B",
        ] {
            assert_eq!(m.classify(line), LineClass::TocNoise, "line: {:?}", line);
        }
    }

    #[test]
    fn alias_headings_start_the_section() {
        let m = matcher();
        assert_eq!(m.classify("FINDINGS"), LineClass::SectionStart("FINDINGS".to_string()));
        assert_eq!(m.classify("3. Findings:"), LineClass::SectionStart("FINDINGS".to_string()));
        assert_eq!(
            m.classify("4.2 Hallazgos de la evaluación"),
            LineClass::SectionStart("HALLAZGOS DE LA EVALUACIÓN".to_string())
        );
        assert_eq!(
            m.classify("CRITÈRES DE L'ÉVALUATION"),
            LineClass::SectionStart("CRITÈRES DE L’ÉVALUATION".to_string())
        );
    }

    #[test]
    fn alias_inside_running_text_is_body() {
        let m = matcher();
        assert_eq!(m.classify("Findings from the survey were mixed."), LineClass::Body);
    }

    #[test]
    fn start_phrases_match_with_trailing_text() {
        let m = matcher();
        assert_eq!(
            m.classify("2. Key findings of the review"),
            LineClass::SectionStart("key findings".to_string())
        );
        assert_eq!(
            m.classify("EVALUATION RESULTS"),
            LineClass::SectionStart("evaluation results".to_string())
        );
    }

    #[test]
    fn end_headings() {
        let m = matcher();
        assert_eq!(m.classify("RECOMMENDATIONS"), LineClass::SectionEnd);
        assert_eq!(m.classify("5. Conclusions"), LineClass::SectionEnd);
        assert_eq!(m.classify("6.1 Next steps"), LineClass::SectionEnd);
        assert_eq!(m.classify("Recommended actions"), LineClass::Body);
        // "Annex A" is a cross-reference shape, so noise wins in classify()
        assert_eq!(m.classify("Annex A"), LineClass::TocNoise);
        assert!(m.is_section_end("Annex A"));
    }

    #[test]
    fn ordinary_text_is_body() {
        let m = matcher();
        assert_eq!(m.classify("The programme reached 4,000 households."), LineClass::Body);
        assert_eq!(m.classify(""), LineClass::Body);
    }

    #[test]
    fn chapter_numbers() {
        let m = matcher();
        assert_eq!(m.chapter_number("3. FINDINGS"), Some(3));
        assert_eq!(m.chapter_number("  12. LESSONS LEARNED"), Some(12));
        assert_eq!(m.chapter_number("3.1 FINDINGS"), None);
        assert_eq!(m.chapter_number("4. the project was late"), None);
    }

    #[test]
    fn vocabulary_comparisons() {
        let vocab = Vocabulary::new(&["FINDINGS", "CADRE DE L’ÉVALUATION ET MÉTHODES"]);
        assert_eq!(vocab.matches_exactly("findings"), Some("FINDINGS"));
        assert_eq!(vocab.matches_exactly("  Findings  "), Some("FINDINGS"));
        assert_eq!(vocab.matches_exactly("KEY FINDINGS"), None);
        assert_eq!(
            vocab.matches_exactly("cadre de l'évaluation  et méthodes"),
            Some("CADRE DE L’ÉVALUATION ET MÉTHODES")
        );
        assert_eq!(vocab.contained_in("3. Main Findings"), Some("FINDINGS"));
        assert_eq!(vocab.contained_in("Introduction"), None);
    }

    #[test]
    fn bad_phrase_never_panics() {
        // Phrases are escaped, so regex metacharacters are literal
        let m = HeadingMatcher::new(&["RESULTS (PART 1)"], &["a+b"], &["[end]"]).unwrap();
        assert_eq!(
            m.classify("RESULTS (PART 1)"),
            LineClass::SectionStart("RESULTS (PART 1)".to_string())
        );
    }
}
