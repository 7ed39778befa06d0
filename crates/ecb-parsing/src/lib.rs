use std::path::Path;

pub mod classify;
pub mod config;
pub mod document;
pub mod extractor;
pub mod fuzzy;
pub mod line_mid;
pub mod pages;
pub mod strategy;
pub mod terminator;

pub use classify::DefectClassifier;
pub use config::{FuzzyParams, ListOverride, ParsingConfig, ParsingConfigBuilder};
pub use document::{DocumentParts, split_document};
pub use extractor::{VolumeExtractor, VolumeMetrics, VolumeResult};
pub use fuzzy::FuzzyLocator;
pub use line_mid::{LineMidCorrector, LineMidOutcome, MONTH_ABBREVIATIONS};
pub use pages::{DEFAULT_HEADER_PATTERNS, PAGE_BREAK, PageSegmenter};
pub use strategy::{BoundaryStrategy, slice_page};
pub use terminator::TerminatorMatcher;
// Re-export domain types from core (canonical definitions live there)
pub use ecb_core::{
    BoundaryMode, CutoffPoint, Defect, Entry, ExtractError, Page, Volume, YearRecord,
};

/// Extract entries from one volume file with default settings.
///
/// Pipeline:
/// 1. Read the OCR text, dropping invalid UTF-8
/// 2. Cut away front matter and appendix using the year's markers
/// 3. Split the body into pages and strip running headers
/// 4. Cut pages into entries with the year's boundary strategy
/// 5. Split entries that carry a mid-line date
/// 6. Flag defects and route entries to buckets
pub fn extract_volume(path: &Path, record: &YearRecord) -> Result<VolumeResult, ExtractError> {
    VolumeExtractor::new().extract_file(path, record)
}
