// src/extractors/mod.rs
pub mod boundary;
pub mod chunker;
pub mod heading;
pub mod section;
pub mod toc;

// Re-export key extraction types for convenience
#[allow(unused_imports)]
pub use section::{
    DocumentResult,
    ExtractedSection,
    SectionExtractor,
    StrategyKind,
    ExtractionStrategy,
    TocExtractionStrategy,
    BodyScanExtractionStrategy,
};
