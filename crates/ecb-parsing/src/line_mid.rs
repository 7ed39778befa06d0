use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use ecb_core::{ConfigError, Entry};

/// Month abbreviations as printed in catalogue dates.
pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "June", "July", "Aug", "Sept", "Oct", "Nov", "Dec",
];

/// Regex alternation of the two-digit year key and its OCR spellings.
pub(crate) fn year_alternation(year: &str, year_tokens: &[String]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(year_tokens.len() + 1);
    for token in std::iter::once(year).chain(year_tokens.iter().map(String::as_str)) {
        let escaped = regex::escape(token);
        if !parts.contains(&escaped) {
            parts.push(escaped);
        }
    }
    parts.join("|")
}

/// Result of one correction pass.
#[derive(Debug, Clone, Default)]
pub struct LineMidOutcome {
    /// All entries in order, with flagged entries replaced by their halves.
    pub entries: Vec<Entry>,
    /// The flagged entries as they were before splitting.
    pub flagged: Vec<Entry>,
}

/// Finds and splits entries that carry a closing date in their middle.
///
/// A date such as `"Dec. 08"` followed by more text means two records were
/// merged, or the boundary was missed. The entry is cut right after the
/// first such date.
#[derive(Debug, Clone)]
pub struct LineMidCorrector {
    date_re: Regex,
}

impl LineMidCorrector {
    pub fn new(year: &str, year_tokens: &[String]) -> Result<Self, ConfigError> {
        let pattern = format!(
            r"(?:{})\.?\W(?:{})\.?",
            MONTH_ABBREVIATIONS.join("|"),
            year_alternation(year, year_tokens)
        );
        let date_re = Regex::new(&pattern).map_err(|source| ConfigError::InvalidPattern {
            context: format!("year {} line-mid date", year),
            pattern,
            source,
        })?;
        Ok(Self { date_re })
    }

    /// Byte offset just past the first date that is followed by more text.
    pub fn find_mid_date(&self, text: &str) -> Option<usize> {
        self.date_re
            .find_iter(text)
            .map(|m| m.end())
            .find(|&end| text[end..].chars().next().is_some_and(|c| c != '.'))
    }

    pub fn is_line_mid(&self, text: &str) -> bool {
        self.find_mid_date(text).is_some()
    }

    /// Split `text` after its first mid-line date.
    ///
    /// Leading non-word noise before a capital is dropped from the second
    /// half. Returns `None` when there is nothing to split.
    pub fn split(&self, text: &str) -> Option<(String, String)> {
        static LEADING_NOISE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\W+[A-Z]").unwrap());

        let at = self.find_mid_date(text)?;
        let (head, tail) = text.split_at(at);
        let tail = match LEADING_NOISE_RE.find(tail) {
            // keep the capital the pattern consumed
            Some(m) => &tail[m.end() - 1..],
            None => tail,
        };
        Some((head.trim().to_string(), tail.trim().to_string()))
    }

    /// One pass over `entries`: each flagged entry is replaced by its two
    /// halves in place. Halves are not re-examined.
    pub fn correct(&self, entries: Vec<Entry>) -> LineMidOutcome {
        let mut outcome = LineMidOutcome {
            entries: Vec::with_capacity(entries.len()),
            flagged: Vec::new(),
        };

        for entry in entries {
            let Some((head, tail)) = self.split(&entry.text) else {
                outcome.entries.push(entry);
                continue;
            };

            if !entry.is_tagged() {
                warn!(entry = %entry.text, "line-mid entry has no page tag, splitting untagged");
            }
            debug!(page = ?entry.page, head = %head, "split line-mid entry");

            outcome.entries.push(half(&entry, head));
            outcome.entries.push(half(&entry, tail));
            outcome.flagged.push(entry);
        }

        outcome
    }
}

/// A piece of a split entry. The raw span no longer maps onto the cleaned
/// text, so only the page tags carry over.
fn half(original: &Entry, text: String) -> Entry {
    let mut entry = Entry::untagged(text);
    entry.page = original.page;
    entry.doc_page = original.doc_page;
    entry
}
