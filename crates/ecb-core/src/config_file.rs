use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::years::BoundaryMode;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub defaults: Option<YearConfig>,
    pub years: Option<BTreeMap<String, YearConfig>>,
    pub fuzzy: Option<FuzzyConfig>,
    pub classifier: Option<ClassifierConfig>,
    pub pages: Option<PagesConfig>,
}

/// Per-year boundary markers and year-token spellings.
///
/// `{year}` inside a marker or file name is replaced by the two-digit key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YearConfig {
    pub front_marker: Option<String>,
    pub appendix_marker: Option<String>,
    pub year_tokens: Option<Vec<String>>,
    pub file: Option<String>,
    pub strategy: Option<BoundaryMode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuzzyConfig {
    pub segment_length: Option<usize>,
    pub closeness: Option<usize>,
    pub acceptance_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub short_entry_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagesConfig {
    /// Replace the built-in header patterns.
    pub header_patterns: Option<Vec<String>>,
    /// Append to the built-in (or replaced) header patterns.
    pub extra_header_patterns: Option<Vec<String>>,
}

/// Platform config path: `<config_dir>/ecb/catalogue.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ecb").join("catalogue.toml"))
}

/// Year table shipped alongside the binary, looked up in the CWD.
pub const SHIPPED_FILE: &str = "catalogue.toml";

/// Per-directory overrides, looked up in the CWD.
pub const LOCAL_FILE: &str = ".ecb.toml";

/// Load configuration.
///
/// An explicit path is loaded on its own. Otherwise the platform config,
/// `./catalogue.toml` and `./.ecb.toml` are cascaded in that order, later
/// files taking precedence; missing files are skipped.
pub fn load_config(explicit: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }
    load_cascade(Path::new("."), config_path().as_deref())
}

/// The discovery cascade rooted at `dir` instead of the CWD.
pub fn load_cascade(dir: &Path, platform: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let candidates = platform
        .map(Path::to_path_buf)
        .into_iter()
        .chain([dir.join(SHIPPED_FILE), dir.join(LOCAL_FILE)]);

    let mut config: Option<ConfigFile> = None;
    for path in candidates {
        if !path.exists() {
            continue;
        }
        let layer = load_from_path(&path)?;
        config = Some(match config {
            Some(base) => merge(base, layer),
            None => layer,
        });
    }
    Ok(config.unwrap_or_default())
}

/// Load and parse a config from a specific path.
pub fn load_from_path(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge two configs: `overlay` values take precedence over `base`.
///
/// Year records merge field by field, so an overlay may patch a single marker.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let mut years = base.years.unwrap_or_default();
    for (key, over) in overlay.years.unwrap_or_default() {
        let merged = match years.remove(&key) {
            Some(under) => merge_year(under, over),
            None => over,
        };
        years.insert(key, merged);
    }

    ConfigFile {
        defaults: match (base.defaults, overlay.defaults) {
            (Some(b), Some(o)) => Some(merge_year(b, o)),
            (b, o) => o.or(b),
        },
        years: if years.is_empty() { None } else { Some(years) },
        fuzzy: Some(FuzzyConfig {
            segment_length: overlay
                .fuzzy
                .as_ref()
                .and_then(|f| f.segment_length)
                .or_else(|| base.fuzzy.as_ref().and_then(|f| f.segment_length)),
            closeness: overlay
                .fuzzy
                .as_ref()
                .and_then(|f| f.closeness)
                .or_else(|| base.fuzzy.as_ref().and_then(|f| f.closeness)),
            acceptance_threshold: overlay
                .fuzzy
                .as_ref()
                .and_then(|f| f.acceptance_threshold)
                .or_else(|| base.fuzzy.as_ref().and_then(|f| f.acceptance_threshold)),
        }),
        classifier: Some(ClassifierConfig {
            short_entry_chars: overlay
                .classifier
                .as_ref()
                .and_then(|c| c.short_entry_chars)
                .or_else(|| base.classifier.as_ref().and_then(|c| c.short_entry_chars)),
        }),
        pages: Some(PagesConfig {
            header_patterns: overlay
                .pages
                .as_ref()
                .and_then(|p| p.header_patterns.clone())
                .or_else(|| base.pages.as_ref().and_then(|p| p.header_patterns.clone())),
            extra_header_patterns: overlay
                .pages
                .as_ref()
                .and_then(|p| p.extra_header_patterns.clone())
                .or_else(|| {
                    base.pages
                        .as_ref()
                        .and_then(|p| p.extra_header_patterns.clone())
                }),
        }),
    }
}

fn merge_year(base: YearConfig, overlay: YearConfig) -> YearConfig {
    YearConfig {
        front_marker: overlay.front_marker.or(base.front_marker),
        appendix_marker: overlay.appendix_marker.or(base.appendix_marker),
        year_tokens: overlay.year_tokens.or(base.year_tokens),
        file: overlay.file.or(base.file),
        strategy: overlay.strategy.or(base.strategy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[defaults]
front_marker = 'centimetres.\n.*\n'
appendix_marker = 'WITH LISTS OF THEIR\nPUBLICATIONS, 19{year}'
file = "ecb_19{year}.txt"

[years."08"]
year_tokens = ["08", "O8"]

[years."10"]
front_marker = 'THE ENGLISH CATALOGUE\nACHARD\nACTS'
year_tokens = ["10", "IO"]
strategy = "fuzzy"

[fuzzy]
acceptance_threshold = 0.35
"#;

    #[test]
    fn parses_year_tables() {
        let parsed: ConfigFile = toml::from_str(SAMPLE).unwrap();
        let years = parsed.years.unwrap();
        assert_eq!(years.len(), 2);
        assert_eq!(
            years["10"].front_marker.as_deref(),
            Some(r"THE ENGLISH CATALOGUE\nACHARD\nACTS")
        );
        assert_eq!(years["10"].strategy, Some(BoundaryMode::Fuzzy));
        assert!(years["08"].front_marker.is_none());
        assert_eq!(parsed.fuzzy.unwrap().acceptance_threshold, Some(0.35));
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let toml_str = "[years.\"08\"]\nstrategy = \"regex\"\n";
        assert!(toml::from_str::<ConfigFile>(toml_str).is_err());
    }

    #[test]
    fn merge_overlay_patches_single_field() {
        let base: ConfigFile = toml::from_str(SAMPLE).unwrap();
        let overlay: ConfigFile =
            toml::from_str("[years.\"08\"]\nfront_marker = 'centin etres.\\n.*\\n'\n").unwrap();
        let merged = merge(base, overlay);
        let years = merged.years.unwrap();
        let y08 = &years["08"];
        assert_eq!(y08.front_marker.as_deref(), Some(r"centin etres.\n.*\n"));
        assert_eq!(
            y08.year_tokens.as_deref(),
            Some(&["08".to_string(), "O8".to_string()][..])
        );
        assert!(years.contains_key("10"));
        assert_eq!(merged.fuzzy.unwrap().acceptance_threshold, Some(0.35));
    }

    #[test]
    fn load_from_path_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[years\nbroken").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{}", err);
    }

    #[test]
    fn load_from_missing_path_is_read_error() {
        let err = load_from_path(Path::new("/nonexistent/ecb.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn cascade_layers_local_over_shipped_over_platform() {
        let dir = tempfile::tempdir().unwrap();
        let platform = dir.path().join("platform.toml");
        std::fs::write(&platform, "[classifier]\nshort_entry_chars = 30\n").unwrap();
        std::fs::write(dir.path().join(SHIPPED_FILE), SAMPLE).unwrap();
        std::fs::write(
            dir.path().join(LOCAL_FILE),
            "[years.\"08\"]\nfront_marker = 'centin etres.\\n.*\\n'\n",
        )
        .unwrap();

        let config = load_cascade(dir.path(), Some(&platform)).unwrap();
        let years = config.years.unwrap();
        assert_eq!(years["08"].front_marker.as_deref(), Some(r"centin etres.\n.*\n"));
        assert!(years.contains_key("10"));
        assert_eq!(config.classifier.unwrap().short_entry_chars, Some(30));
    }

    #[test]
    fn cascade_finds_shipped_table_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SHIPPED_FILE), SAMPLE).unwrap();
        let missing = dir.path().join("nope.toml");

        let config = load_cascade(dir.path(), Some(&missing)).unwrap();
        assert_eq!(config.years.unwrap().len(), 2);
    }

    #[test]
    fn empty_cascade_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_cascade(dir.path(), None).unwrap();
        assert!(config.years.is_none());
    }
}
