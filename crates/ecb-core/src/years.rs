use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::config_file::{ConfigFile, YearConfig};

/// How entry boundaries are located within a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    /// Year-token terminators at end of line.
    #[default]
    Exact,
    /// Bigram-similarity search for "Month YY" strings.
    Fuzzy,
}

impl fmt::Display for BoundaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryMode::Exact => f.write_str("exact"),
            BoundaryMode::Fuzzy => f.write_str("fuzzy"),
        }
    }
}

/// Fully resolved, compiled configuration for one volume.
#[derive(Debug, Clone)]
pub struct YearRecord {
    pub year: String,
    pub front_marker: Regex,
    pub appendix_marker: Regex,
    pub year_tokens: Vec<String>,
    pub file: String,
    pub strategy: BoundaryMode,
}

impl YearRecord {
    /// The front marker as written in the config (after `{year}` substitution).
    pub fn front_pattern(&self) -> &str {
        self.front_marker.as_str()
    }

    /// The appendix marker without the dot-matches-newline prefix.
    pub fn appendix_pattern(&self) -> &str {
        self.appendix_marker
            .as_str()
            .strip_prefix(DOTALL)
            .unwrap_or(self.appendix_marker.as_str())
    }
}

const DOTALL: &str = "(?s)";
const DEFAULT_FILE: &str = "ecb_19{year}.txt";

/// Year -> record lookup built from a [`ConfigFile`].
///
/// Keys are checked up front; records are resolved against `[defaults]` and
/// compiled on lookup so a broken year only fails its own volume.
#[derive(Debug, Clone, Default)]
pub struct YearTable {
    defaults: YearConfig,
    years: BTreeMap<String, YearConfig>,
}

impl YearTable {
    pub fn from_config(config: &ConfigFile) -> Result<Self, ConfigError> {
        let years = config.years.clone().unwrap_or_default();
        for key in years.keys() {
            if !is_year_key(key) {
                return Err(ConfigError::InvalidYearKey(key.clone()));
            }
        }
        Ok(Self {
            defaults: config.defaults.clone().unwrap_or_default(),
            years,
        })
    }

    /// Configured year keys in ascending order.
    pub fn years(&self) -> impl Iterator<Item = &str> {
        self.years.keys().map(String::as_str)
    }

    pub fn contains(&self, year: &str) -> bool {
        self.years.contains_key(year)
    }

    /// Resolve and compile the record for `year`.
    pub fn record(&self, year: &str) -> Result<YearRecord, ConfigError> {
        let entry = self.years.get(year).ok_or_else(|| ConfigError::MissingYear {
            year: year.to_string(),
            table: "year record",
        })?;

        let front = entry
            .front_marker
            .as_ref()
            .or(self.defaults.front_marker.as_ref())
            .ok_or_else(|| ConfigError::MissingYear {
                year: year.to_string(),
                table: "front_marker",
            })?;
        let appendix = entry
            .appendix_marker
            .as_ref()
            .or(self.defaults.appendix_marker.as_ref())
            .ok_or_else(|| ConfigError::MissingYear {
                year: year.to_string(),
                table: "appendix_marker",
            })?;
        let tokens = entry
            .year_tokens
            .as_ref()
            .or(self.defaults.year_tokens.as_ref())
            .ok_or_else(|| ConfigError::MissingYear {
                year: year.to_string(),
                table: "year_tokens",
            })?;

        let year_tokens: Vec<String> = tokens
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if year_tokens.is_empty() {
            return Err(ConfigError::EmptyYearTokens(year.to_string()));
        }

        let front_pattern = substitute_year(front, year);
        let appendix_pattern = substitute_year(appendix, year);
        let front_marker =
            Regex::new(&front_pattern).map_err(|source| ConfigError::InvalidPattern {
                context: format!("year {} front_marker", year),
                pattern: front_pattern.clone(),
                source,
            })?;
        let appendix_marker = Regex::new(&format!("{}{}", DOTALL, appendix_pattern)).map_err(
            |source| ConfigError::InvalidPattern {
                context: format!("year {} appendix_marker", year),
                pattern: appendix_pattern.clone(),
                source,
            },
        )?;

        let file = entry
            .file
            .as_deref()
            .or(self.defaults.file.as_deref())
            .unwrap_or(DEFAULT_FILE);

        Ok(YearRecord {
            year: year.to_string(),
            front_marker,
            appendix_marker,
            year_tokens,
            file: substitute_year(file, year),
            strategy: entry.strategy.or(self.defaults.strategy).unwrap_or_default(),
        })
    }

    /// Resolve every configured year, collecting all failures.
    pub fn validate_all(&self) -> Vec<ConfigError> {
        self.years()
            .filter_map(|year| self.record(year).err())
            .collect()
    }
}

/// Replace `{year}` with the two-digit key.
pub fn substitute_year(template: &str, year: &str) -> String {
    template.replace("{year}", year)
}

fn is_year_key(key: &str) -> bool {
    key.len() == 2 && key.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(toml_str: &str) -> YearTable {
        let config: ConfigFile = toml::from_str(toml_str).unwrap();
        YearTable::from_config(&config).unwrap()
    }

    const BASE: &str = r#"
[defaults]
front_marker = 'centimetres.\n.*\n'
appendix_marker = 'WITH LISTS OF THEIR\nPUBLICATIONS, 19{year}'

[years."08"]
year_tokens = ["08", "O8"]

[years."19"]
appendix_marker = 'WITH LISTS OF THEIR\nPUBLICATIONS, 1918'
year_tokens = ["19"]
file = "ecb_1919_nypl_070724.txt"
strategy = "fuzzy"
"#;

    #[test]
    fn record_resolves_defaults_and_substitutes_year() {
        let t = table(BASE);
        let r = t.record("08").unwrap();
        assert_eq!(r.front_pattern(), r"centimetres.\n.*\n");
        assert_eq!(r.appendix_pattern(), r"WITH LISTS OF THEIR\nPUBLICATIONS, 1908");
        assert_eq!(r.file, "ecb_1908.txt");
        assert_eq!(r.strategy, BoundaryMode::Exact);
        assert_eq!(r.year_tokens, vec!["08", "O8"]);
    }

    #[test]
    fn record_per_year_overrides() {
        let t = table(BASE);
        let r = t.record("19").unwrap();
        assert_eq!(r.appendix_pattern(), r"WITH LISTS OF THEIR\nPUBLICATIONS, 1918");
        assert_eq!(r.file, "ecb_1919_nypl_070724.txt");
        assert_eq!(r.strategy, BoundaryMode::Fuzzy);
    }

    #[test]
    fn appendix_marker_matches_across_lines() {
        let t = table(BASE);
        let r = t.record("08").unwrap();
        assert!(r.appendix_marker.is_match("WITH LISTS OF THEIR\nPUBLICATIONS, 1908"));
    }

    #[test]
    fn missing_year_is_config_error() {
        let t = table(BASE);
        match t.record("21") {
            Err(ConfigError::MissingYear { year, .. }) => assert_eq!(year, "21"),
            other => panic!("expected MissingYear, got {:?}", other),
        }
    }

    #[test]
    fn missing_tokens_names_table() {
        let t = table("[defaults]\nfront_marker = 'a'\nappendix_marker = 'b'\n[years.\"05\"]\n");
        match t.record("05") {
            Err(ConfigError::MissingYear { table, .. }) => assert_eq!(table, "year_tokens"),
            other => panic!("expected MissingYear, got {:?}", other),
        }
    }

    #[test]
    fn empty_tokens_rejected() {
        let t = table(
            "[defaults]\nfront_marker = 'a'\nappendix_marker = 'b'\n[years.\"05\"]\nyear_tokens = [\" \"]\n",
        );
        assert!(matches!(t.record("05"), Err(ConfigError::EmptyYearTokens(_))));
    }

    #[test]
    fn invalid_pattern_reports_context() {
        let t = table(
            "[years.\"05\"]\nfront_marker = '[broken'\nappendix_marker = 'b'\nyear_tokens = [\"05\"]\n",
        );
        let err = t.record("05").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("year 05 front_marker"), "{}", msg);
        assert!(msg.contains("[broken"), "{}", msg);
    }

    #[test]
    fn invalid_year_key_rejected() {
        let config: ConfigFile = toml::from_str("[years.\"1908\"]\n").unwrap();
        assert!(matches!(
            YearTable::from_config(&config),
            Err(ConfigError::InvalidYearKey(_))
        ));
    }

    #[test]
    fn validate_all_collects_failures() {
        let t = table(
            "[defaults]\nfront_marker = 'a'\nappendix_marker = 'b'\n[years.\"05\"]\nyear_tokens = [\"05\"]\n[years.\"06\"]\n[years.\"07\"]\n",
        );
        assert_eq!(t.validate_all().len(), 2);
        assert_eq!(t.years().collect::<Vec<_>>(), vec!["05", "06", "07"]);
    }

    #[test]
    fn shipped_catalogue_validates() {
        let config: ConfigFile = toml::from_str(include_str!("../../../catalogue.toml")).unwrap();
        let t = YearTable::from_config(&config).unwrap();
        assert!(t.validate_all().is_empty(), "{:?}", t.validate_all());
        assert_eq!(t.years().count(), 22);
        assert!(!t.contains("21"));
        assert_eq!(t.record("05").unwrap().file, "ecb_1905_princeton_070724.txt");
        assert_eq!(
            t.record("00").unwrap().appendix_pattern(),
            r"ENGLISH CATALOGUE APPENDIX\nAN\nBI"
        );
    }
}
