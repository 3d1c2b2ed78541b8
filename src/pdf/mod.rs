// src/pdf/mod.rs
pub mod reader;

pub use reader::load_pages;

/// One page of extracted text, 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page: u32,
    pub text: String,
}

/// Read-only access to a document's per-page text.
///
/// Missing or unreadable pages come back as an empty string so callers can
/// keep making progress on the rest of the document.
pub trait PageSource {
    fn page_count(&self) -> u32;

    fn page_text(&self, page: u32) -> &str;

    /// Pages `first..=last`, clamped to what the document has.
    fn pages(&self, first: u32, last: u32) -> Vec<PageText> {
        let first = first.max(1);
        let last = last.min(self.page_count());
        (first..=last)
            .map(|page| PageText { page, text: self.page_text(page).to_string() })
            .collect()
    }

    /// Text of pages `first..=last` joined by a blank line.
    fn text_range(&self, first: u32, last: u32) -> String {
        self.pages(first, last)
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Page text held in memory, as produced by the PDF reader.
#[derive(Debug, Clone, Default)]
pub struct RawPages {
    pages: Vec<String>,
}

impl RawPages {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }

    #[cfg(test)]
    pub fn from_texts<S: AsRef<str>>(pages: &[S]) -> Self {
        Self::new(pages.iter().map(|p| p.as_ref().to_string()).collect())
    }

    pub fn all(&self) -> Vec<PageText> {
        self.pages(1, self.page_count())
    }
}

impl PageSource for RawPages {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page: u32) -> &str {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_pages_are_empty() {
        let doc = RawPages::from_texts(&["one", "two"]);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_text(1), "one");
        assert_eq!(doc.page_text(0), "");
        assert_eq!(doc.page_text(3), "");
    }

    #[test]
    fn ranges_are_clamped() {
        let doc = RawPages::from_texts(&["a", "b", "c"]);
        assert_eq!(doc.text_range(2, 10), "b\n\nc");
        assert_eq!(doc.text_range(0, 1), "a");
        assert!(doc.pages(5, 8).is_empty());
        assert_eq!(doc.all().len(), 3);
    }
}
