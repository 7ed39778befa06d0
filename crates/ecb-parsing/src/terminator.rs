use regex::Regex;

use ecb_core::{ConfigError, CutoffPoint, Page};

use crate::strategy::BoundaryStrategy;

/// Finds entry ends by a year token closing a line.
///
/// An entry ends wherever a non-word character, one of the volume's year
/// tokens and an optional period sit at the end of a line
/// (`"... LONGMANS, Jan. 08."`). The cut goes right after the period.
#[derive(Debug, Clone)]
pub struct TerminatorMatcher {
    re: Regex,
}

impl TerminatorMatcher {
    /// Build the terminator pattern from literal year tokens.
    pub fn new(year_tokens: &[String]) -> Result<Self, ConfigError> {
        let alternation = year_tokens
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"(?m)\W(?:{})\.?$", alternation);
        let re = Regex::new(&pattern).map_err(|source| ConfigError::InvalidPattern {
            context: "entry terminator".to_string(),
            pattern,
            source,
        })?;
        Ok(Self { re })
    }

    /// Whether `text` contains at least one terminator.
    pub fn is_match(&self, text: &str) -> bool {
        self.re.is_match(text)
    }
}

impl BoundaryStrategy for TerminatorMatcher {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn cutoffs(&self, page: &Page) -> Vec<CutoffPoint> {
        self.re
            .find_iter(&page.text)
            .map(|m| CutoffPoint::exact(m.end()))
            .collect()
    }
}
