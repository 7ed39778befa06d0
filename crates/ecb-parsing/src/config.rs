use regex::Regex;

use ecb_core::config_file::ConfigFile;
use ecb_core::years::substitute_year;
use ecb_core::{BoundaryMode, ConfigError};

use crate::pages::DEFAULT_HEADER_PATTERNS;

/// Controls how a list of patterns/values is overridden from its defaults.
#[derive(Debug, Clone, Default)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    #[default]
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }
}

/// Tuning for the similarity-based boundary locator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyParams {
    /// Sliding window width in characters.
    pub segment_length: usize,
    /// Cutoffs closer than this many characters are merged.
    pub closeness: usize,
    /// Minimum peak similarity for a window to be considered (inclusive).
    pub acceptance_threshold: f64,
}

impl Default for FuzzyParams {
    fn default() -> Self {
        Self {
            segment_length: 10,
            closeness: 5,
            acceptance_threshold: 0.40,
        }
    }
}

/// Configuration for the entry extraction pipeline.
///
/// Header patterns are kept as templates because they may contain `{year}`;
/// they are compiled per volume by the page segmenter.
/// Use [`ParsingConfigBuilder`] to construct with validation.
#[derive(Debug, Clone)]
pub struct ParsingConfig {
    // ── pages.rs ──
    /// Running-header patterns removed from every page.
    pub(crate) header_patterns: ListOverride<String>,

    // ── classify.rs ──
    /// Entries of at most this many characters are treated as truncated (default: 25).
    pub(crate) short_entry_chars: usize,

    // ── fuzzy ──
    pub(crate) fuzzy: FuzzyParams,

    // ── extractor.rs ──
    /// Forces one boundary strategy for every volume.
    pub(crate) strategy_override: Option<BoundaryMode>,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            header_patterns: ListOverride::Default,
            short_entry_chars: 25,
            fuzzy: FuzzyParams::default(),
            strategy_override: None,
        }
    }
}

impl ParsingConfig {
    /// Header pattern templates after applying overrides.
    pub fn header_patterns(&self) -> Vec<String> {
        let defaults: Vec<String> = DEFAULT_HEADER_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .collect();
        self.header_patterns.resolve(&defaults)
    }

    pub fn short_entry_chars(&self) -> usize {
        self.short_entry_chars
    }

    pub fn fuzzy(&self) -> FuzzyParams {
        self.fuzzy
    }

    /// The strategy to use for a volume whose year record asks for `configured`.
    pub fn strategy_for(&self, configured: BoundaryMode) -> BoundaryMode {
        self.strategy_override.unwrap_or(configured)
    }
}

/// Builder for [`ParsingConfig`].
///
/// Header patterns are test-compiled in [`build()`](Self::build) so a typo
/// fails before any volume is read.
#[derive(Debug, Clone, Default)]
pub struct ParsingConfigBuilder {
    header_patterns: ListOverride<String>,
    short_entry_chars: Option<usize>,
    segment_length: Option<usize>,
    closeness: Option<usize>,
    acceptance_threshold: Option<f64>,
    strategy_override: Option<BoundaryMode>,
}

impl ParsingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a builder from the `[fuzzy]`, `[classifier]` and `[pages]` tables.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        let mut builder = Self::new();
        if let Some(pages) = &config.pages {
            if let Some(patterns) = &pages.header_patterns {
                builder = builder.set_header_patterns(patterns.clone());
            }
            for pattern in pages.extra_header_patterns.iter().flatten() {
                builder = builder.add_header_pattern(pattern.clone());
            }
        }
        if let Some(n) = config.classifier.as_ref().and_then(|c| c.short_entry_chars) {
            builder = builder.short_entry_chars(n);
        }
        if let Some(fuzzy) = &config.fuzzy {
            if let Some(n) = fuzzy.segment_length {
                builder = builder.segment_length(n);
            }
            if let Some(n) = fuzzy.closeness {
                builder = builder.closeness(n);
            }
            if let Some(t) = fuzzy.acceptance_threshold {
                builder = builder.acceptance_threshold(t);
            }
        }
        builder
    }

    // ── Header patterns ──

    pub fn set_header_patterns(mut self, patterns: Vec<String>) -> Self {
        self.header_patterns = ListOverride::Replace(patterns);
        self
    }

    pub fn add_header_pattern(mut self, pattern: String) -> Self {
        match &mut self.header_patterns {
            ListOverride::Extend(v) | ListOverride::Replace(v) => v.push(pattern),
            ListOverride::Default => self.header_patterns = ListOverride::Extend(vec![pattern]),
        }
        self
    }

    // ── Classifier ──

    pub fn short_entry_chars(mut self, n: usize) -> Self {
        self.short_entry_chars = Some(n);
        self
    }

    // ── Fuzzy locator ──

    pub fn segment_length(mut self, n: usize) -> Self {
        self.segment_length = Some(n);
        self
    }

    pub fn closeness(mut self, n: usize) -> Self {
        self.closeness = Some(n);
        self
    }

    pub fn acceptance_threshold(mut self, t: f64) -> Self {
        self.acceptance_threshold = Some(t);
        self
    }

    // ── Strategy ──

    pub fn strategy(mut self, mode: BoundaryMode) -> Self {
        self.strategy_override = Some(mode);
        self
    }

    /// Build the config, validating patterns and numeric parameters.
    pub fn build(self) -> Result<ParsingConfig, ConfigError> {
        let defaults = ParsingConfig::default();

        let templates = self.header_patterns.resolve(
            &DEFAULT_HEADER_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>(),
        );
        for template in &templates {
            let pattern = substitute_year(template, "00");
            Regex::new(&pattern).map_err(|source| ConfigError::InvalidPattern {
                context: "header pattern".to_string(),
                pattern: template.clone(),
                source,
            })?;
        }

        let mut fuzzy = defaults.fuzzy;
        if let Some(n) = self.segment_length {
            if n < 2 {
                return Err(ConfigError::InvalidParameter {
                    name: "segment_length",
                    reason: format!("{} is shorter than one bigram", n),
                });
            }
            fuzzy.segment_length = n;
        }
        if let Some(n) = self.closeness {
            fuzzy.closeness = n;
        }
        if let Some(t) = self.acceptance_threshold {
            if !(t > 0.0 && t <= 1.0) {
                return Err(ConfigError::InvalidParameter {
                    name: "acceptance_threshold",
                    reason: format!("{} is outside (0, 1]", t),
                });
            }
            fuzzy.acceptance_threshold = t;
        }

        Ok(ParsingConfig {
            header_patterns: self.header_patterns,
            short_entry_chars: self.short_entry_chars.unwrap_or(defaults.short_entry_chars),
            fuzzy,
            strategy_override: self.strategy_override,
        })
    }
}
