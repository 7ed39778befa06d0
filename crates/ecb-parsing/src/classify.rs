use once_cell::sync::Lazy;
use regex::Regex;

use ecb_core::{ConfigError, Defect, Entry};

use crate::config::ParsingConfig;
use crate::line_mid::{LineMidCorrector, year_alternation};

/// Uppercase letters including Latin-1 and Latin Extended-A.
const UPPER: &str = r"A-Z\x{C0}-\x{17E}";

static NOT_CAPITALIZED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^[^A-ZÆÅ"“]"#).unwrap());
static SEE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bsee\b").unwrap());
static NET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bnet\b").unwrap());
static ELLIPSIS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(?:\s?\.){3,}|…(?:\s?…)+").unwrap());
/// `Surname (Forename)`, surname of up to three capitalised words.
static AUTHOR_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[A-Z][^()—\s.]*\s){1,3}\(([^)]+)\)").unwrap());

/// Flags defect signatures on entries.
///
/// Every predicate is evaluated independently from the entry text, so
/// classifying an entry again yields the same flags.
#[derive(Debug, Clone)]
pub struct DefectClassifier {
    short_entry_chars: usize,
    line_mid: LineMidCorrector,
    publisher_date_re: Regex,
    main_entry_re: Regex,
}

impl DefectClassifier {
    pub fn new(
        year: &str,
        year_tokens: &[String],
        short_entry_chars: usize,
    ) -> Result<Self, ConfigError> {
        let publisher_date = format!(
            r"[{u}][{u}\.\s&,'\-]+,\W\w[^{u}]+(?:\.|,)?\W(?:{y})\.?",
            u = UPPER,
            y = year_alternation(year, year_tokens)
        );
        let compile = |pattern: String, what: &str| {
            Regex::new(&pattern).map_err(|source| ConfigError::InvalidPattern {
                context: format!("year {} {}", year, what),
                pattern,
                source,
            })
        };
        Ok(Self {
            short_entry_chars,
            line_mid: LineMidCorrector::new(year, year_tokens)?,
            main_entry_re: compile(format!("{}$", publisher_date), "main entry")?,
            publisher_date_re: compile(publisher_date, "publisher date")?,
        })
    }

    pub fn with_config(
        year: &str,
        year_tokens: &[String],
        config: &ParsingConfig,
    ) -> Result<Self, ConfigError> {
        Self::new(year, year_tokens, config.short_entry_chars())
    }

    /// Defects present in `text`, in [`Defect::ALL`] order.
    pub fn defects(&self, text: &str) -> Vec<Defect> {
        Defect::ALL
            .into_iter()
            .filter(|d| self.has_defect(*d, text))
            .collect()
    }

    fn has_defect(&self, defect: Defect, text: &str) -> bool {
        match defect {
            Defect::TooShort => text.chars().count() <= self.short_entry_chars,
            Defect::NotCapitalized => NOT_CAPITALIZED_RE.is_match(text),
            Defect::Blank => text.trim().is_empty(),
            Defect::LineMid => self.line_mid.is_line_mid(text),
            Defect::SeeReference => SEE_RE.is_match(text),
            Defect::MultipleNet => NET_RE.find_iter(text).nth(1).is_some(),
            Defect::EllipsisRun => ELLIPSIS_RE.is_match(text),
            Defect::DoubleAuthor => independent_headings(text) >= 2,
            Defect::DoublePublisher => self.publisher_date_re.find_iter(text).nth(1).is_some(),
            Defect::LeadingDigit => text.starts_with(|c: char| c.is_ascii_digit()),
        }
    }

    /// Publisher and date close the entry.
    pub fn is_main_entry(&self, text: &str) -> bool {
        self.main_entry_re.is_match(text)
    }

    pub fn classify(&self, entry: &mut Entry) {
        entry.defects = self.defects(&entry.text);
        entry.main_entry = self.is_main_entry(&entry.text);
    }

    pub fn classify_all(&self, entries: &mut [Entry]) {
        for entry in entries {
            self.classify(entry);
        }
    }
}

/// Author headings that open a sentence, i.e. start a record of their own.
///
/// A heading joined to the previous one by "and" or a comma belongs to the
/// same record and is not counted.
fn independent_headings(text: &str) -> usize {
    AUTHOR_HEADING_RE
        .captures_iter(text)
        .filter(|caps| {
            let forename = &caps[1];
            if forename.starts_with("The")
                || forename.starts_with("the")
                || forename.starts_with("post free")
            {
                return false;
            }
            let start = caps.get(0).map_or(0, |m| m.start());
            let before = text[..start].trim_end();
            before.is_empty() || before.ends_with('.')
        })
        .count()
}
