// src/utils/debug.rs
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use crate::extractors::heading::{HeadingMatcher, LineClass};
use crate::pdf::PageText;
use crate::utils::error::AppError;

fn class_label(class: &LineClass) -> String {
    match class {
        LineClass::TocNoise => "toc_noise".to_string(),
        LineClass::SectionStart(alias) => format!("start({})", alias),
        LineClass::SectionEnd => "end".to_string(),
        LineClass::Body => "body".to_string(),
    }
}

/// Writes every non-empty line with its page and classification, tab separated,
/// to show why a heading did or did not open the section.
pub fn write_line_trace(pages: &[PageText], matcher: &HeadingMatcher, filename: &Path) -> Result<usize, AppError> {
    let mut out = BufWriter::new(File::create(filename)?);
    writeln!(out, "page\tclass\tline")?;

    let mut written = 0;
    for page in pages {
        for line in page.text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let label = class_label(&matcher.classify(line));
            writeln!(out, "{}\t{}\t{}", page.page, label, line.replace('\t', " "))?;
            written += 1;
        }
    }
    out.flush()?;

    tracing::info!("Saved line trace ({} lines) to {}", written, filename.display());
    Ok(written)
}
