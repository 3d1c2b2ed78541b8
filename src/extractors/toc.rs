// src/extractors/toc.rs

use once_cell::sync::Lazy;
use regex::Regex;

// [numbering] TITLE [leaders] PAGE
// Numbering is "3", "3.", "3.1" or a roman numeral with a dot ("IV.").
// Titles are uppercase in any script; leaders tolerate OCR'd ellipsis glyphs.
static TOC_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:(?:\d+(?:\.\d+)*\.?|[IVXLC]+\.)\s*)?(?P<title>\p{Lu}[\p{Lu}\s\-'’]*?)[\s\.…·_]*(?P<page>\d+)\s*$",
    )
    .expect("Failed to compile TOC_LINE_RE")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub title: String,
    pub page: u32,
}

/// Parses table-of-contents text into entries, in the order they appear.
///
/// Entries are never sorted by page: front matter often restarts numbering,
/// and the TOC's own ordering is what decides which entry follows which.
/// Lines that don't look like entries are skipped; an empty result means the
/// text held no usable TOC.
pub fn parse_toc(text: &str) -> Vec<TocEntry> {
    let entries: Vec<TocEntry> = text
        .lines()
        .filter_map(parse_line)
        .collect();

    tracing::debug!("Parsed {} TOC entries", entries.len());
    entries
}

fn parse_line(line: &str) -> Option<TocEntry> {
    let caps = TOC_LINE_RE.captures(line)?;
    let title = caps.name("title")?.as_str().trim();
    let page: u32 = caps.name("page")?.as_str().parse().ok()?;

    // A title needs at least two letters; "A 3" is a list marker, not a chapter
    if page == 0 || title.chars().filter(|c| c.is_alphabetic()).count() < 2 {
        tracing::trace!("Skipping TOC-like line: '{}'", line.trim());
        return None;
    }

    Some(TocEntry { title: title.to_string(), page })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, page: u32) -> TocEntry {
        TocEntry { title: title.to_string(), page }
    }

    #[test]
    fn parses_dot_leader_entries() {
        let toc = "\
TABLE OF CONTENTS
1. INTRODUCTION ........................ 1
2. METHODOLOGY ......................... 3
3. FINDINGS ............................ 5
3.1 Relevance .......................... 5
4. CONCLUSIONS ......................... 9
";
        assert_eq!(
            parse_toc(toc),
            vec![
                entry("INTRODUCTION", 1),
                entry("METHODOLOGY", 3),
                entry("FINDINGS", 5),
                entry("CONCLUSIONS", 9),
            ]
        );
    }

    #[test]
    fn tolerates_ellipsis_glyphs_and_plain_spacing() {
        let toc = "EXECUTIVE SUMMARY …… 2\nMAIN FINDINGS      14\nCROSS-CUTTING ISSUES · · · 21";
        assert_eq!(
            parse_toc(toc),
            vec![
                entry("EXECUTIVE SUMMARY", 2),
                entry("MAIN FINDINGS", 14),
                entry("CROSS-CUTTING ISSUES", 21),
            ]
        );
    }

    #[test]
    fn accepts_accented_titles_and_roman_numbering() {
        let toc = "II. HALLAZGOS DE LA EVALUACIÓN .... 12\nIII. CRITÈRES DE L’ÉVALUATION 30";
        assert_eq!(
            parse_toc(toc),
            vec![
                entry("HALLAZGOS DE LA EVALUACIÓN", 12),
                entry("CRITÈRES DE L’ÉVALUATION", 30),
            ]
        );
    }

    #[test]
    fn keeps_document_order_when_pages_go_backwards() {
        let toc = "ACRONYMS .... 4\nINTRODUCTION .... 1\nFINDINGS .... 6";
        let pages: Vec<_> = parse_toc(toc).into_iter().map(|e| e.page).collect();
        assert_eq!(pages, vec![4, 1, 6]);
    }

    #[test]
    fn skips_non_entries() {
        let toc = "The evaluation covered 2019\nlowercase title .... 4\nFOREWORD\n\nANNEX .... 0";
        assert!(parse_toc(toc).is_empty());
        assert!(parse_toc("").is_empty());
    }
}
