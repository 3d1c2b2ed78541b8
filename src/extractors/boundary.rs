// src/extractors/boundary.rs

use crate::extractors::heading::{HeadingMatcher, LineClass, Vocabulary};
use crate::extractors::toc::TocEntry;
use crate::pdf::PageText;
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;

// Page number left dangling at the end of a body line: "Finding two. 7"
static TRAILING_PAGE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+\d+\s*$").expect("Failed to compile TRAILING_PAGE_NUMBER_RE")
});

/// Page extent of the target section, 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionBoundary {
    pub title: String,
    pub start_page: Option<u32>,
    pub end_page: Option<u32>,
}

impl SectionBoundary {
    /// Fills an unresolved end page with the document's last page.
    pub fn with_page_count(mut self, page_count: u32) -> Self {
        if self.end_page.is_none() {
            self.end_page = Some(page_count);
        }
        self
    }

    /// Shifts printed TOC page numbers onto physical PDF pages.
    pub fn shifted(mut self, offset: i32) -> Self {
        let shift = |p: u32| u32::try_from(i64::from(p) + i64::from(offset)).unwrap_or(0);
        self.start_page = self.start_page.map(shift);
        self.end_page = self.end_page.map(shift);
        self
    }

    /// Rejects boundaries that would produce an empty or negative page range.
    pub fn validate(&self, page_count: Option<u32>) -> Result<(), ExtractError> {
        let invalid = |reason: String| ExtractError::InvalidBoundary {
            title: self.title.clone(),
            reason,
        };

        let start = self.start_page.ok_or_else(|| invalid("no start page".to_string()))?;
        if start == 0 {
            return Err(invalid("start page is 0".to_string()));
        }
        if let Some(end) = self.end_page {
            if start > end {
                return Err(invalid(format!("start page {} is after end page {}", start, end)));
            }
        }
        if let Some(count) = page_count {
            if start > count {
                return Err(invalid(format!("start page {} is beyond the last page {}", start, count)));
            }
        }
        Ok(())
    }
}

/// Finds the section in a parsed table of contents.
///
/// The first entry whose title is a vocabulary alias starts the section; it
/// ends the page before the next entry. The last entry's end stays open.
/// `None` means the TOC never names the section.
pub fn resolve_from_toc(entries: &[TocEntry], vocabulary: &Vocabulary) -> Option<SectionBoundary> {
    let (index, entry) = entries
        .iter()
        .enumerate()
        .find(|(_, e)| vocabulary.matches_exactly(&e.title).is_some())?;

    let end_page = entries.get(index + 1).map(|next| next.page.saturating_sub(1));

    tracing::debug!(
        "TOC entry '{}' starts at page {}, ends at {:?}",
        entry.title,
        entry.page,
        end_page
    );

    Some(SectionBoundary {
        title: entry.title.clone(),
        start_page: Some(entry.page),
        end_page,
    })
}

/// Byte offset into one page's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPosition {
    pub page: u32,
    pub offset: usize,
}

/// Section found by scanning body text, with its captured lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyCapture {
    pub boundary: SectionBoundary,
    /// Right after the start heading line.
    pub start: TextPosition,
    /// Start of the end heading line, when one was seen.
    pub end: Option<TextPosition>,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Seeking,
    /// `chapter` is the number of an "N. TITLE" start heading, if it had one.
    InSection { chapter: Option<u32> },
    Done,
}

/// Line-by-line state machine over a document's pages.
///
/// Takes the first matching section only. Once an end heading is seen the
/// scanner stops consulting lines, even if the vocabulary matches again later.
pub struct BodyScanner<'m> {
    matcher: &'m HeadingMatcher,
    state: ScanState,
    title: Option<String>,
    start: Option<TextPosition>,
    end: Option<TextPosition>,
    last_page: u32,
    lines: Vec<String>,
}

impl<'m> BodyScanner<'m> {
    pub fn new(matcher: &'m HeadingMatcher) -> Self {
        Self {
            matcher,
            state: ScanState::Seeking,
            title: None,
            start: None,
            end: None,
            last_page: 0,
            lines: Vec::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == ScanState::Done
    }

    pub fn feed_page(&mut self, page: u32, text: &str) {
        if self.is_done() {
            return;
        }
        self.last_page = page;

        let mut offset = 0;
        for raw_line in text.split_inclusive('\n') {
            let line_start = offset;
            offset += raw_line.len();
            self.feed_line(raw_line.trim(), TextPosition { page, offset: line_start }, offset);
            if self.is_done() {
                return;
            }
        }
    }

    fn feed_line(&mut self, line: &str, at: TextPosition, line_end: usize) {
        match self.state {
            ScanState::Seeking => {
                if let LineClass::SectionStart(title) = self.matcher.classify(line) {
                    tracing::debug!("Section '{}' starts on page {} ('{}')", title, at.page, line);
                    self.state = ScanState::InSection { chapter: self.matcher.chapter_number(line) };
                    self.title = Some(title);
                    self.start = Some(TextPosition { page: at.page, offset: line_end });
                }
            }
            ScanState::InSection { chapter } => {
                let next_chapter = chapter.and_then(|current| {
                    self.matcher.chapter_number(line).filter(|n| *n > current)
                });
                if self.matcher.is_section_end(line) || next_chapter.is_some() {
                    tracing::debug!("Section ends on page {} at '{}'", at.page, line);
                    self.end = Some(at);
                    self.state = ScanState::Done;
                    return;
                }
                if self.matcher.is_toc_noise(line) {
                    tracing::trace!("Dropping noise line inside section: '{}'", line);
                    return;
                }
                let cleaned = TRAILING_PAGE_NUMBER_RE.replace(line, "");
                self.lines.push(cleaned.into_owned());
            }
            ScanState::Done => {}
        }
    }

    /// `None` if no start heading was ever seen. A section still open at the
    /// end of the stream runs to the end of the document.
    pub fn finish(self) -> Option<BodyCapture> {
        let title = self.title?;
        let start = self.start?;
        let end_page = self.end.map(|e| e.page).unwrap_or(self.last_page);

        Some(BodyCapture {
            boundary: SectionBoundary {
                title,
                start_page: Some(start.page),
                end_page: Some(end_page),
            },
            start,
            end: self.end,
            text: self.lines.join("\n"),
        })
    }
}

/// Scans pages in order for the first section whose heading the matcher
/// recognises.
pub fn resolve_from_body(pages: &[PageText], matcher: &HeadingMatcher) -> Option<BodyCapture> {
    let mut scanner = BodyScanner::new(matcher);
    for page in pages {
        scanner.feed_page(page.page, &page.text);
        if scanner.is_done() {
            break;
        }
    }
    scanner.finish()
}
