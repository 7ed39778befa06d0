use std::fmt;
use std::ops::Range;
use std::path::PathBuf;

use thiserror::Error;

pub mod config_file;
pub mod text_utils;
pub mod years;

// Re-export for convenience
pub use config_file::{ConfigFile, load_config, load_from_path};
pub use text_utils::{collapse_newlines, decode_ignoring_invalid};
pub use years::{BoundaryMode, YearRecord, YearTable};

/// One year's catalogue OCR text.
#[derive(Debug, Clone)]
pub struct Volume {
    /// Two-digit year key, e.g. `"08"` for the 1908 volume.
    pub year: String,
    pub text: String,
    /// Accepted OCR renderings of the year at the end of an entry.
    pub year_tokens: Vec<String>,
}

impl Volume {
    pub fn new(year: impl Into<String>, text: impl Into<String>, year_tokens: Vec<String>) -> Self {
        Self {
            year: year.into(),
            text: text.into(),
            year_tokens,
        }
    }

    /// Four-digit catalogue year (`"08"` -> 1908).
    pub fn catalogue_year(&self) -> Option<u16> {
        self.year.parse::<u16>().ok().map(|y| 1900 + y)
    }
}

/// A form-feed delimited slice of the catalogue body.
#[derive(Debug, Clone)]
pub struct Page {
    /// 0-based position within the body.
    pub index: usize,
    /// Page text after header stripping.
    pub text: String,
    /// Physical scan pages consumed by front matter, when known.
    pub doc_page_delta: Option<usize>,
}

impl Page {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            doc_page_delta: None,
        }
    }

    /// 1-based catalogue page number.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Page number in the scanned document, recovered from the front-matter delta.
    pub fn doc_page(&self) -> Option<usize> {
        self.doc_page_delta.map(|delta| self.number() + delta)
    }
}

/// A byte offset in a page believed to mark the end of an entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutoffPoint {
    /// Byte offset into the page text.
    pub offset: usize,
    /// Evidence strength; exact terminator matches score 1.0.
    pub score: f64,
}

impl CutoffPoint {
    pub fn exact(offset: usize) -> Self {
        Self { offset, score: 1.0 }
    }
}

/// A defect signature observed on an entry. Defects are not mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Defect {
    TooShort,
    NotCapitalized,
    Blank,
    LineMid,
    SeeReference,
    MultipleNet,
    EllipsisRun,
    DoubleAuthor,
    DoublePublisher,
    LeadingDigit,
}

impl Defect {
    pub const ALL: [Defect; 10] = [
        Defect::TooShort,
        Defect::NotCapitalized,
        Defect::Blank,
        Defect::LineMid,
        Defect::SeeReference,
        Defect::MultipleNet,
        Defect::EllipsisRun,
        Defect::DoubleAuthor,
        Defect::DoublePublisher,
        Defect::LeadingDigit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Defect::TooShort => "too_short",
            Defect::NotCapitalized => "not_capitalized",
            Defect::Blank => "blank",
            Defect::LineMid => "line_mid",
            Defect::SeeReference => "see_reference",
            Defect::MultipleNet => "multiple_net",
            Defect::EllipsisRun => "ellipsis_run",
            Defect::DoubleAuthor => "double_author",
            Defect::DoublePublisher => "double_publisher",
            Defect::LeadingDigit => "leading_digit",
        }
    }

    /// Whether the defect marks the entry as front-truncated.
    pub fn is_truncation(&self) -> bool {
        matches!(self, Defect::TooShort | Defect::NotCapitalized)
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate bibliographic record.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Trimmed text with embedded newlines collapsed to spaces.
    pub text: String,
    /// Byte range of the raw slice within its page, when cut from a page.
    pub span: Option<Range<usize>>,
    /// 1-based catalogue page the entry was cut from.
    pub page: Option<usize>,
    /// Page number in the scanned document.
    pub doc_page: Option<usize>,
    pub defects: Vec<Defect>,
    /// Publisher and date sit in the canonical closing position.
    pub main_entry: bool,
}

impl Entry {
    /// An entry with no page provenance.
    pub fn untagged(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            span: None,
            page: None,
            doc_page: None,
            defects: Vec::new(),
            main_entry: false,
        }
    }

    /// Cut from `page` at `span`, with `text` already cleaned.
    pub fn from_page(page: &Page, span: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            span: Some(span),
            page: Some(page.number()),
            doc_page: page.doc_page(),
            defects: Vec::new(),
            main_entry: false,
        }
    }

    pub fn is_tagged(&self) -> bool {
        self.page.is_some()
    }

    pub fn has(&self, defect: Defect) -> bool {
        self.defects.contains(&defect)
    }

    pub fn is_clean(&self) -> bool {
        self.defects.is_empty()
    }

    pub fn is_front_truncated(&self) -> bool {
        self.defects.iter().any(Defect::is_truncation)
    }
}

/// Which boundary marker a split was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Front,
    Appendix,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Front => f.write_str("front-matter"),
            Marker::Appendix => f.write_str("appendix"),
        }
    }
}

/// Problems with the year table or parser parameters.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("year {year}: no {table} configured")]
    MissingYear { year: String, table: &'static str },
    #[error("invalid year key {0:?} (expected two digits, e.g. \"08\")")]
    InvalidYearKey(String),
    #[error("{context}: invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        context: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("year {0}: year_tokens must not be empty")]
    EmptyYearTokens(String),
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Fatal, per-volume extraction failures.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("year {year}: {marker} marker {pattern:?} not found{}", nearest_hint(.nearest))]
    BoundaryNotFound {
        year: String,
        marker: Marker,
        pattern: String,
        /// Closest line in the text, to help correct the year table.
        nearest: Option<String>,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn nearest_hint(nearest: &Option<String>) -> String {
    match nearest {
        Some(line) => format!(" (closest line: {:?})", line),
        None => String::new(),
    }
}

impl ExtractError {
    /// Year the failure belongs to, when known.
    pub fn year(&self) -> Option<&str> {
        match self {
            ExtractError::BoundaryNotFound { year, .. } => Some(year),
            ExtractError::Config(ConfigError::MissingYear { year, .. }) => Some(year),
            ExtractError::Config(ConfigError::EmptyYearTokens(year)) => Some(year),
            _ => None,
        }
    }
}
