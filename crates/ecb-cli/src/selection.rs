use anyhow::{Context, bail};
use tracing::info;

use ecb_core::YearTable;

/// Years named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearSelection {
    /// Named one by one; a missing record is an error for that year.
    pub explicit: Vec<String>,
    /// Covered by a range; years without a record are skipped.
    pub ranged: Vec<String>,
}

/// Parse `"02-22"`, `"08,09"` or a mix such as `"00-04,08"`.
pub fn parse_years(spec: &str) -> anyhow::Result<YearSelection> {
    let mut selection = YearSelection {
        explicit: Vec::new(),
        ranged: Vec::new(),
    };

    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((from, to)) => {
                let from = year_number(from)?;
                let to = year_number(to)?;
                if from > to {
                    bail!("year range {:?} runs backwards", part);
                }
                selection
                    .ranged
                    .extend((from..=to).map(|y| format!("{:02}", y)));
            }
            None => {
                year_number(part)?;
                selection.explicit.push(part.to_string());
            }
        }
    }

    if selection.explicit.is_empty() && selection.ranged.is_empty() {
        bail!("no years in selection {:?}", spec);
    }
    Ok(selection)
}

fn year_number(key: &str) -> anyhow::Result<u8> {
    let key = key.trim();
    if key.len() != 2 || !key.bytes().all(|b| b.is_ascii_digit()) {
        bail!("invalid year {:?} (expected two digits, e.g. 08)", key);
    }
    key.parse()
        .with_context(|| format!("invalid year {:?}", key))
}

/// Resolve the years to process, in ascending order without duplicates.
///
/// With no selection every configured year is processed.
pub fn select_years(table: &YearTable, spec: Option<&str>) -> anyhow::Result<Vec<String>> {
    let Some(spec) = spec else {
        return Ok(table.years().map(str::to_string).collect());
    };

    let selection = parse_years(spec)?;
    let mut years = selection.explicit;
    for year in selection.ranged {
        if table.contains(&year) {
            years.push(year);
        } else {
            info!(year = %year, "no year record, skipping");
        }
    }
    years.sort();
    years.dedup();
    Ok(years)
}
