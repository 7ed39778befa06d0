use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use ecb_core::{ExtractError, Marker, YearRecord};

use crate::pages::PAGE_BREAK;

/// The catalogue body of a volume, with the front matter it followed.
#[derive(Debug, Clone, Copy)]
pub struct DocumentParts<'a> {
    pub front_matter: &'a str,
    pub body: &'a str,
    /// Page breaks in the front matter; body page N is scan page N + delta.
    pub doc_page_delta: usize,
}

/// Isolate the main catalogue section of a volume.
///
/// The body is the text between the first and second matches of the front
/// marker (or to the end when it matches once), cut at the first appendix
/// marker. Either marker missing is fatal for the volume.
pub fn split_document<'a>(
    text: &'a str,
    record: &YearRecord,
) -> Result<DocumentParts<'a>, ExtractError> {
    let mut pieces = record.front_marker.split(text);
    let front_matter = pieces.next().unwrap_or_default();
    let after_front = pieces.next().ok_or_else(|| ExtractError::BoundaryNotFound {
        year: record.year.clone(),
        marker: Marker::Front,
        pattern: record.front_pattern().to_string(),
        nearest: nearest_line(text, record.front_pattern()),
    })?;

    let mut pieces = record.appendix_marker.split(after_front);
    let body = pieces.next().unwrap_or_default();
    if pieces.next().is_none() {
        return Err(ExtractError::BoundaryNotFound {
            year: record.year.clone(),
            marker: Marker::Appendix,
            pattern: record.appendix_pattern().to_string(),
            nearest: nearest_line(after_front, record.appendix_pattern()),
        });
    }

    let doc_page_delta = front_matter.matches(PAGE_BREAK).count();
    debug!(
        year = %record.year,
        front_bytes = front_matter.len(),
        body_bytes = body.len(),
        doc_page_delta,
        "split document"
    );

    Ok(DocumentParts {
        front_matter,
        body,
        doc_page_delta,
    })
}

/// Closest line in `text` to the literal part of a marker pattern.
///
/// Used to make a missing-marker error actionable: the marker is usually
/// present with an OCR variation the year table does not cover.
pub fn nearest_line(text: &str, pattern: &str) -> Option<String> {
    const MIN_RATIO: f64 = 0.6;

    let needle = literal_fragment(pattern)?;
    let mut best: Option<(f64, &str)> = None;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let ratio = rapidfuzz::fuzz::ratio(needle.chars(), line.chars());
        if best.is_none_or(|(b, _)| ratio > b) {
            best = Some((ratio, line));
        }
    }

    best.filter(|(ratio, _)| *ratio >= MIN_RATIO)
        .map(|(_, line)| line.to_string())
}

/// Longest line of plain text in a regex pattern.
fn literal_fragment(pattern: &str) -> Option<String> {
    static META_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\\[a-zA-Z]|[.*+?()\[\]{}|^$\\]").unwrap());

    pattern
        .split(r"\n")
        .map(|part| META_RE.replace_all(part, "").trim().to_string())
        .filter(|part| part.chars().count() >= 4)
        .max_by_key(|part| part.chars().count())
}
