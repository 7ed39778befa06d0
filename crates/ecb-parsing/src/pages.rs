use regex::Regex;
use tracing::trace;

use ecb_core::years::substitute_year;
use ecb_core::{ConfigError, Page};

use crate::config::ParsingConfig;

/// Form feed separating scanned pages in the OCR text.
pub const PAGE_BREAK: char = '\x0c';

/// Running-header lines removed from every page, applied in order.
///
/// `{year}` is replaced by the volume's two-digit key. Every pattern is
/// compiled in multi-line mode.
pub const DEFAULT_HEADER_PATTERNS: [&str; 5] = [
    // All-caps headword lines ("ACHARD", "THE ENGLISH CATALOGUE")
    r"^\b[A-Z ]+\b\s?\n",
    // OCR annotations
    r"##(?s:.*?)$",
    // Running year line ("1908", "-1908.")
    r"^.?19{year}.?\n",
    // Bare page numbers
    r"^\d+\n",
    // Bracketed running titles ("[JAN.-DEC.]")
    r"^\[[^\]\n]*\]\s*\n",
];

/// Splits a catalogue body into pages and strips running headers.
#[derive(Debug, Clone)]
pub struct PageSegmenter {
    patterns: Vec<Regex>,
}

impl PageSegmenter {
    /// Compile `templates` for `year`.
    pub fn new(year: &str, templates: &[String]) -> Result<Self, ConfigError> {
        let patterns = templates
            .iter()
            .map(|template| {
                let pattern = format!("(?m){}", substitute_year(template, year));
                Regex::new(&pattern).map_err(|source| ConfigError::InvalidPattern {
                    context: format!("year {} header pattern", year),
                    pattern: template.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn with_config(year: &str, config: &ParsingConfig) -> Result<Self, ConfigError> {
        Self::new(year, &config.header_patterns())
    }

    /// Remove every header pattern match from one page.
    pub fn strip_headers(&self, page: &str) -> String {
        let mut text = page.to_string();
        for re in &self.patterns {
            text = re.replace_all(&text, "").into_owned();
        }
        text
    }

    /// Split `body` on form feeds and strip headers from each page.
    ///
    /// Pages keep their body order; `doc_page_delta` tags each with its
    /// position in the scanned document.
    pub fn segment(&self, body: &str, doc_page_delta: usize) -> Vec<Page> {
        body.split(PAGE_BREAK)
            .enumerate()
            .map(|(index, raw)| {
                let mut page = Page::new(index, self.strip_headers(raw));
                page.doc_page_delta = Some(doc_page_delta);
                trace!(page = page.number(), bytes = page.text.len(), "segmented page");
                page
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_segmenter(year: &str) -> PageSegmenter {
        PageSegmenter::with_config(year, &ParsingConfig::default()).unwrap()
    }

    #[test]
    fn test_strips_caps_headword_and_page_number() {
        let s = default_segmenter("08");
        let page = "ACHARD\n12\nAchard (A.) Title. 8vo, 3s. 6d. LONGMANS, Jan. 08.\n";
        assert_eq!(
            s.strip_headers(page),
            "Achard (A.) Title. 8vo, 3s. 6d. LONGMANS, Jan. 08.\n"
        );
    }

    #[test]
    fn test_strips_year_line_for_volume_year_only() {
        let s = default_segmenter("08");
        assert_eq!(s.strip_headers("-1908.\nBody.\n"), "Body.\n");
        assert_eq!(s.strip_headers("In 1909\nBody.\n"), "In 1909\nBody.\n");
    }

    #[test]
    fn test_strips_annotations_and_bracketed_titles() {
        let s = default_segmenter("08");
        assert_eq!(s.strip_headers("Body ## scan note\nMore.\n"), "Body \nMore.\n");
        assert_eq!(s.strip_headers("[JAN.-DEC.]\nBody.\n"), "Body.\n");
    }

    #[test]
    fn test_segment_preserves_order_and_delta() {
        let s = default_segmenter("08");
        let pages = s.segment("First page.\n\x0cSecond page.\n\x0c", 4);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].text, "First page.\n");
        assert_eq!(pages[1].text, "Second page.\n");
        assert_eq!(pages[1].number(), 2);
        assert_eq!(pages[1].doc_page(), Some(6));
        assert_eq!(pages[2].text, "");
    }

    #[test]
    fn test_empty_body_is_one_empty_page() {
        let s = default_segmenter("08");
        let pages = s.segment("", 0);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].text.is_empty());
    }

    #[test]
    fn test_replaced_patterns() {
        let s = PageSegmenter::new("10", &[r"^CAT 19{year}\n".to_string()]).unwrap();
        assert_eq!(s.strip_headers("CAT 1910\nACHARD\n"), "ACHARD\n");
    }
}
