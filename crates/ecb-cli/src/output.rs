use std::io::Write;

use owo_colors::OwoColorize;

use ecb_core::{ConfigError, Entry, YearTable};
use ecb_parsing::VolumeResult;
use ecb_reporting::{Bucket, format_metrics};

use crate::batch::VolumeOutcome;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print one row per completed volume, then a line of totals.
pub fn print_batch_summary(
    w: &mut dyn Write,
    outcomes: &[VolumeOutcome],
    dry_run: bool,
    color: ColorMode,
) -> std::io::Result<()> {
    let header = format!(
        "{:<6}{:<10}{:>7}{:>10}{:>10}{:>10}{:>13}",
        "Year", "Strategy", "Pages", "Entries", "Clean", "Line-mid", "Front-trunc"
    );
    if color.enabled() {
        writeln!(w, "{}", header.bold())?;
    } else {
        writeln!(w, "{}", header)?;
    }

    for outcome in outcomes {
        let Ok(done) = &outcome.outcome else {
            continue;
        };
        let m = &done.metrics;
        writeln!(
            w,
            "{:<6}{:<10}{:>7}{:>10}{:>10}{:>10}{:>13}",
            format!("19{}", outcome.year),
            done.strategy.to_string(),
            done.pages,
            m.total_entries,
            m.clean,
            m.line_mid,
            m.front_truncated
        )?;
    }

    let failed = outcomes.iter().filter(|o| o.failed()).count();
    let succeeded = outcomes.len() - failed;
    writeln!(w)?;
    let msg = format!(
        "Processed {} volumes: {} succeeded, {} failed",
        outcomes.len(),
        succeeded,
        failed
    );
    if !color.enabled() {
        writeln!(w, "{}", msg)?;
    } else if failed > 0 {
        writeln!(w, "{}", msg.yellow())?;
    } else {
        writeln!(w, "{}", msg.green())?;
    }
    if dry_run {
        if color.enabled() {
            writeln!(w, "{}", "(dry run: no files written)".dimmed())?;
        } else {
            writeln!(w, "(dry run: no files written)")?;
        }
    }
    Ok(())
}

/// Print every failed volume with its full error chain.
pub fn print_failures(
    w: &mut dyn Write,
    outcomes: &[VolumeOutcome],
    color: ColorMode,
) -> std::io::Result<()> {
    let failures: Vec<_> = outcomes
        .iter()
        .filter_map(|o| o.outcome.as_ref().err().map(|e| (&o.year, e)))
        .collect();
    if failures.is_empty() {
        return Ok(());
    }

    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", "Failed volumes:".red().bold())?;
    } else {
        writeln!(w, "Failed volumes:")?;
    }
    for (year, err) in failures {
        if color.enabled() {
            writeln!(w, "  {}  {:#}", format!("19{}", year).red(), err)?;
        } else {
            writeln!(w, "  19{}  {:#}", year, err)?;
        }
    }
    Ok(())
}

/// Print a volume's metrics report followed by the first entries of the
/// main buckets.
pub fn print_volume(
    w: &mut dyn Write,
    result: &VolumeResult,
    preview: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    let title = format!("Volume 19{} ({} boundaries)", result.year, result.strategy);
    if color.enabled() {
        writeln!(w, "{}", title.bold())?;
    } else {
        writeln!(w, "{}", title)?;
    }
    writeln!(w, "{}", "-".repeat(title.len()))?;
    writeln!(w, "{}", format_metrics(result).trim_end())?;

    if preview == 0 {
        return Ok(());
    }
    for (label, bucket) in [
        ("Clean", Bucket::Clean),
        ("Line-mid", Bucket::LineMid),
        ("Front-truncated", Bucket::FrontTruncated),
    ] {
        let entries = bucket.entries(result);
        writeln!(w)?;
        let heading = format!("{} ({} total)", label, entries.len());
        if color.enabled() {
            writeln!(w, "{}", heading.cyan())?;
        } else {
            writeln!(w, "{}", heading)?;
        }
        for entry in entries.into_iter().take(preview) {
            print_entry(w, entry, color)?;
        }
    }
    Ok(())
}

fn print_entry(w: &mut dyn Write, entry: &Entry, color: ColorMode) -> std::io::Result<()> {
    let page = entry
        .page
        .map(|p| format!("p.{}", p))
        .unwrap_or_else(|| "p.?".to_string());
    let text = shorten(&entry.text, 100);
    if color.enabled() {
        writeln!(w, "  {} {}", page.dimmed(), text)?;
    } else {
        writeln!(w, "  {} {}", page, text)?;
    }
    Ok(())
}

/// Cut `s` to at most `max` characters, marking the cut with "...".
fn shorten(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((at, _)) => format!("{}...", &s[..at]),
        None => s.to_string(),
    }
}

/// Print the result of validating every year record.
pub fn print_config_check(
    w: &mut dyn Write,
    table: &YearTable,
    parser_error: Option<&ConfigError>,
    color: ColorMode,
) -> std::io::Result<usize> {
    let mut invalid = 0;

    for year in table.years() {
        match table.record(year) {
            Ok(record) => {
                let detail = format!(
                    "{}  {}  tokens: {}",
                    record.file,
                    record.strategy,
                    record.year_tokens.join(", ")
                );
                if color.enabled() {
                    writeln!(w, "  19{}  {}  {}", year, "ok".green(), detail.dimmed())?;
                } else {
                    writeln!(w, "  19{}  ok  {}", year, detail)?;
                }
            }
            Err(err) => {
                invalid += 1;
                if color.enabled() {
                    writeln!(w, "  19{}  {}  {}", year, "INVALID".red(), err)?;
                } else {
                    writeln!(w, "  19{}  INVALID  {}", year, err)?;
                }
            }
        }
    }

    if let Some(err) = parser_error {
        invalid += 1;
        if color.enabled() {
            writeln!(w, "  {}  {}", "parser settings".red(), err)?;
        } else {
            writeln!(w, "  parser settings  {}", err)?;
        }
    }

    writeln!(w)?;
    let total = table.years().count();
    writeln!(w, "{} year records, {} problems", total, invalid)?;
    Ok(invalid)
}
