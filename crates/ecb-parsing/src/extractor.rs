use std::path::Path;

use tracing::{debug, info};

use ecb_core::{
    BoundaryMode, ConfigError, Defect, Entry, ExtractError, Page, Volume, YearRecord,
    decode_ignoring_invalid,
};

use crate::classify::DefectClassifier;
use crate::config::ParsingConfig;
use crate::document::{self, DocumentParts};
use crate::fuzzy::FuzzyLocator;
use crate::line_mid::{LineMidCorrector, LineMidOutcome};
use crate::pages::PageSegmenter;
use crate::strategy::BoundaryStrategy;
use crate::terminator::TerminatorMatcher;

/// A configurable entry extraction pipeline.
///
/// Holds a [`ParsingConfig`] and exposes each pipeline step as a method.
/// The default constructor uses built-in defaults; use [`VolumeExtractor::with_config`]
/// to supply custom header patterns and thresholds.
pub struct VolumeExtractor {
    config: ParsingConfig,
}

impl Default for VolumeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeExtractor {
    /// Create an extractor with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParsingConfig::default(),
        }
    }

    /// Create an extractor with a custom configuration.
    pub fn with_config(config: ParsingConfig) -> Self {
        Self { config }
    }

    /// Get a reference to the current config.
    pub fn config(&self) -> &ParsingConfig {
        &self.config
    }

    /// Read a volume's OCR text, dropping undecodable bytes (step 1).
    pub fn read_volume(&self, path: &Path, record: &YearRecord) -> Result<Volume, ExtractError> {
        let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Volume::new(
            record.year.clone(),
            decode_ignoring_invalid(&bytes),
            record.year_tokens.clone(),
        ))
    }

    /// Cut away front matter and appendix (step 2).
    pub fn split_document<'a>(
        &self,
        text: &'a str,
        record: &YearRecord,
    ) -> Result<DocumentParts<'a>, ExtractError> {
        document::split_document(text, record)
    }

    /// Split the body into header-stripped pages (step 3).
    pub fn segment_pages(
        &self,
        year: &str,
        parts: &DocumentParts<'_>,
    ) -> Result<Vec<Page>, ConfigError> {
        let segmenter = PageSegmenter::with_config(year, &self.config)?;
        Ok(segmenter.segment(parts.body, parts.doc_page_delta))
    }

    /// The boundary strategy for `volume` under `mode` (step 4).
    pub fn boundary_strategy(
        &self,
        volume: &Volume,
        mode: BoundaryMode,
    ) -> Result<Box<dyn BoundaryStrategy>, ConfigError> {
        Ok(match mode {
            BoundaryMode::Exact => Box::new(TerminatorMatcher::new(&volume.year_tokens)?),
            BoundaryMode::Fuzzy => Box::new(FuzzyLocator::new(&volume.year, self.config.fuzzy())),
        })
    }

    /// Split entries carrying a mid-line date (step 5).
    pub fn correct_line_mid(
        &self,
        volume: &Volume,
        entries: Vec<Entry>,
    ) -> Result<LineMidOutcome, ConfigError> {
        let corrector = LineMidCorrector::new(&volume.year, &volume.year_tokens)?;
        Ok(corrector.correct(entries))
    }

    /// Flag defects on every entry (step 6).
    pub fn classify(&self, volume: &Volume, entries: &mut [Entry]) -> Result<(), ConfigError> {
        let classifier = DefectClassifier::with_config(&volume.year, &volume.year_tokens, &self.config)?;
        classifier.classify_all(entries);
        Ok(())
    }

    /// Run the full pipeline on a volume file.
    pub fn extract_file(&self, path: &Path, record: &YearRecord) -> Result<VolumeResult, ExtractError> {
        let volume = self.read_volume(path, record)?;
        self.extract(&volume, record)
    }

    /// Run the full pipeline on an already-loaded volume.
    pub fn extract(&self, volume: &Volume, record: &YearRecord) -> Result<VolumeResult, ExtractError> {
        let parts = self.split_document(&volume.text, record)?;
        let pages = self.segment_pages(&volume.year, &parts)?;

        let mode = self.config.strategy_for(record.strategy);
        let strategy = self.boundary_strategy(volume, mode)?;
        let raw_entries = strategy.segment(&pages);
        debug!(
            year = %volume.year,
            strategy = strategy.name(),
            pages = pages.len(),
            entries = raw_entries.len(),
            "segmented entries"
        );

        let entries_before_correction = raw_entries.len();
        let LineMidOutcome {
            mut entries,
            flagged,
        } = self.correct_line_mid(volume, raw_entries)?;
        self.classify(volume, &mut entries)?;

        let mut line_mid = flagged;
        self.classify(volume, &mut line_mid)?;

        let result = VolumeResult {
            year: volume.year.clone(),
            strategy: mode,
            pages: pages.len(),
            doc_page_delta: parts.doc_page_delta,
            entries,
            line_mid,
            entries_before_correction,
            header_patterns: self.config.header_patterns(),
            front_marker: record.front_pattern().to_string(),
        };

        let metrics = result.metrics();
        info!(
            year = %result.year,
            entries = metrics.total_entries,
            line_mid = metrics.line_mid,
            front_truncated = metrics.front_truncated,
            clean = metrics.clean,
            "extracted volume"
        );
        Ok(result)
    }
}

/// Everything extracted from one volume.
#[derive(Debug, Clone)]
pub struct VolumeResult {
    pub year: String,
    pub strategy: BoundaryMode,
    pub pages: usize,
    pub doc_page_delta: usize,
    /// All entries after line-mid correction, classified, in page order.
    pub entries: Vec<Entry>,
    /// Entries as they were before the line-mid split, classified.
    pub line_mid: Vec<Entry>,
    pub entries_before_correction: usize,
    /// Header pattern templates in effect for this run.
    pub header_patterns: Vec<String>,
    /// Front-matter marker the body was cut at.
    pub front_marker: String,
}

impl VolumeResult {
    pub fn clean(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.is_clean())
    }

    pub fn front_truncated(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.is_front_truncated())
    }

    pub fn with_defect(&self, defect: Defect) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |e| e.has(defect))
    }

    pub fn metrics(&self) -> VolumeMetrics {
        let total = self.entries.len();
        let line_mid = self.line_mid.len();
        let front_truncated = self.front_truncated().count();
        let clean = self.clean().count();
        VolumeMetrics {
            line_mid,
            line_mid_share: share(line_mid, self.entries_before_correction),
            front_truncated,
            front_truncated_share: share(front_truncated, total),
            clean,
            clean_share: share(clean, total),
            entries_before_correction: self.entries_before_correction,
            total_entries: total,
        }
    }
}

/// Per-volume counts. Shares are fractions in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeMetrics {
    pub line_mid: usize,
    /// Of the entries before correction.
    pub line_mid_share: f64,
    pub front_truncated: usize,
    pub front_truncated_share: f64,
    pub clean: usize,
    pub clean_share: f64,
    pub entries_before_correction: usize,
    pub total_entries: usize,
}

fn share(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
