use std::path::{Path, PathBuf};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{info, warn};

use ecb_core::{BoundaryMode, YearTable};
use ecb_parsing::{VolumeExtractor, VolumeMetrics};
use ecb_reporting::{OutputLayout, write_volume};

/// What to run and where to put it.
pub struct BatchPlan<'a> {
    pub table: &'a YearTable,
    pub years: Vec<String>,
    pub input_dir: PathBuf,
    /// `None` for a dry run: metrics only, no files.
    pub layout: Option<OutputLayout>,
    pub jobs: usize,
}

/// A volume that made it through the pipeline.
#[derive(Debug, Clone)]
pub struct Completed {
    pub strategy: BoundaryMode,
    pub pages: usize,
    pub metrics: VolumeMetrics,
    pub files_written: usize,
}

#[derive(Debug)]
pub struct VolumeOutcome {
    pub year: String,
    pub outcome: anyhow::Result<Completed>,
}

impl VolumeOutcome {
    pub fn failed(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Process every planned volume, isolating failures per volume.
///
/// Outcomes come back in plan order whether or not volumes ran in parallel.
pub fn run(plan: &BatchPlan<'_>, extractor: &VolumeExtractor) -> anyhow::Result<Vec<VolumeOutcome>> {
    let bar = progress_bar(plan.years.len() as u64);

    let process = |year: &String| {
        bar.set_message(format!("19{}", year));
        let outcome = process_volume(plan, extractor, year);
        match &outcome {
            Ok(done) => info!(
                year = %year,
                entries = done.metrics.total_entries,
                clean = done.metrics.clean,
                "volume done"
            ),
            Err(err) => warn!(year = %year, error = %format!("{:#}", err), "volume failed"),
        }
        bar.inc(1);
        VolumeOutcome {
            year: year.clone(),
            outcome,
        }
    };

    let outcomes: Vec<VolumeOutcome> = if plan.jobs <= 1 {
        plan.years.iter().map(process).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(plan.jobs)
            .build()
            .context("failed to start worker pool")?;
        pool.install(|| plan.years.par_iter().map(process).collect())
    };

    bar.finish_and_clear();
    Ok(outcomes)
}

fn process_volume(
    plan: &BatchPlan<'_>,
    extractor: &VolumeExtractor,
    year: &str,
) -> anyhow::Result<Completed> {
    let record = plan.table.record(year)?;
    let path = input_path(&plan.input_dir, &record.file);
    let result = extractor.extract_file(&path, &record)?;

    let files_written = match &plan.layout {
        Some(layout) => write_volume(layout, &result)
            .with_context(|| format!("year {}: writing outputs", year))?
            .len(),
        None => 0,
    };

    Ok(Completed {
        strategy: result.strategy,
        pages: result.pages,
        metrics: result.metrics(),
        files_written,
    })
}

/// Input file for a record, relative to `input_dir` unless absolute.
pub fn input_path(input_dir: &Path, file: &str) -> PathBuf {
    input_dir.join(file)
}

fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} volumes {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");
    bar.set_style(style);
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecb_core::ConfigFile;

    const CONFIG: &str = r#"
[defaults]
front_marker = 'centimetres.\n.*\n'
appendix_marker = 'WITH LISTS OF THEIR\nPUBLICATIONS, 19{year}'

[years."08"]
year_tokens = ["1908"]

[years."09"]
year_tokens = ["1909"]

[years."10"]
front_marker = 'THE ENGLISH CATALOGUE\nACHARD\nACTS'
year_tokens = ["1910"]
"#;

    fn volume(year: &str) -> String {
        format!(
            "Front\x0cSizes in centimetres.\nKey\n\
Smith (John) A History of the Parish. 8vo, 5s. LONGMANS, Jan. 19{y}.\n\
Jones (Mary) Verses and Songs. 12mo, 2s. MURRAY, Feb. 19{y}.\n\
WITH LISTS OF THEIR\nPUBLICATIONS, 19{y}\n",
            y = year
        )
    }

    fn setup() -> (tempfile::TempDir, YearTable) {
        let dir = tempfile::tempdir().unwrap();
        for year in ["08", "09", "10"] {
            std::fs::write(dir.path().join(format!("ecb_19{}.txt", year)), volume(year)).unwrap();
        }
        let config: ConfigFile = toml::from_str(CONFIG).unwrap();
        (dir, YearTable::from_config(&config).unwrap())
    }

    fn plan<'a>(table: &'a YearTable, dir: &Path, jobs: usize) -> BatchPlan<'a> {
        BatchPlan {
            table,
            years: vec!["08".into(), "09".into(), "10".into(), "21".into()],
            input_dir: dir.to_path_buf(),
            layout: Some(OutputLayout::new(dir.join("out"))),
            jobs,
        }
    }

    #[test]
    fn test_failures_are_isolated() {
        let (dir, table) = setup();
        let outcomes = run(&plan(&table, dir.path(), 1), &VolumeExtractor::new()).unwrap();

        let years: Vec<&str> = outcomes.iter().map(|o| o.year.as_str()).collect();
        assert_eq!(years, vec!["08", "09", "10", "21"]);
        assert!(!outcomes[0].failed());
        assert!(!outcomes[1].failed());
        // 1910's front marker is absent from the synthetic text
        let err = outcomes[2].outcome.as_ref().unwrap_err();
        assert!(format!("{:#}", err).contains("ACHARD"), "{:#}", err);
        // no record for 1921
        assert!(outcomes[3].failed());

        let done = outcomes[0].outcome.as_ref().unwrap();
        assert_eq!(done.metrics.clean, 2);
        assert!(done.files_written > 0);
        assert!(dir.path().join("out/clean_entries/entries_1908.csv").exists());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (dir, table) = setup();
        let extractor = VolumeExtractor::new();
        let seq = run(&plan(&table, dir.path(), 1), &extractor).unwrap();
        let par = run(&plan(&table, dir.path(), 3), &extractor).unwrap();

        assert_eq!(seq.len(), par.len());
        for (a, b) in seq.iter().zip(&par) {
            assert_eq!(a.year, b.year);
            assert_eq!(a.failed(), b.failed());
            if let (Ok(x), Ok(y)) = (&a.outcome, &b.outcome) {
                assert_eq!(x.metrics, y.metrics);
            }
        }
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let (dir, table) = setup();
        let mut p = plan(&table, dir.path(), 1);
        p.layout = None;
        p.years = vec!["08".into()];
        let outcomes = run(&p, &VolumeExtractor::new()).unwrap();
        assert_eq!(outcomes[0].outcome.as_ref().unwrap().files_written, 0);
        assert!(!dir.path().join("out").exists());
    }
}
