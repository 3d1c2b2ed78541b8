// src/pdf/reader.rs
use crate::pdf::RawPages;
use crate::utils::error::PdfError;
use lopdf::Document;
use std::path::Path;

/// Opens a PDF and extracts the text of every page.
///
/// A page that fails to decode is kept as an empty string (and logged) so the
/// boundary resolver can still work with the rest of the document.
pub fn load_pages(path: &Path) -> Result<RawPages, PdfError> {
    let doc = Document::load(path).map_err(|e| PdfError::Load {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Err(PdfError::Empty(path.display().to_string()));
    }

    let mut pages = Vec::with_capacity(page_numbers.len());
    let mut failed = 0usize;
    for page_num in page_numbers {
        match doc.extract_text(&[page_num]) {
            Ok(text) => pages.push(text),
            Err(e) => {
                tracing::warn!("Failed to extract page {} of {}: {}", page_num, path.display(), e);
                failed += 1;
                pages.push(String::new());
            }
        }
    }

    tracing::debug!(
        "Loaded {} pages from {} ({} unreadable)",
        pages.len(),
        path.display(),
        failed
    );
    Ok(RawPages::new(pages))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_load_error() {
        let err = load_pages(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, PdfError::Load { .. }));
    }

    #[test]
    fn garbage_bytes_are_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();
        assert!(load_pages(&path).is_err());
    }
}
