use std::io::Write;
use std::path::Path;

use ecb_core::Defect;
use ecb_parsing::VolumeResult;

use crate::ReportError;
use crate::export::create_file;

/// Render the human-readable metrics report for one volume.
///
/// The first block keeps the labels of the historical `entries_measures`
/// files so existing comparisons keep working. Shares are fractions.
pub fn format_metrics(result: &VolumeResult) -> String {
    let m = result.metrics();
    let mut out = String::new();

    out.push_str(&format!("Total Line Mid Entries: {}\n", m.line_mid));
    out.push_str(&format!("Percent of Line Mid Entries: {}\n\n", m.line_mid_share));
    out.push_str(&format!("Total Front Trunc Entries: {}\n", m.front_truncated));
    out.push_str(&format!("Percent Front Trunc Entries: {}\n\n", m.front_truncated_share));
    out.push_str(&format!("Total Clean Entries: {}\n", m.clean));
    out.push_str(&format!("Percent Clean Entries: {}\n\n", m.clean_share));
    out.push_str(&format!("Total Full Entries: {}\n\n", m.total_entries));

    out.push_str(&format!("Entries Before Correction: {}\n", m.entries_before_correction));
    out.push_str(&format!("Boundary Strategy: {}\n", result.strategy));
    out.push_str(&format!("Pages: {}\n", result.pages));
    out.push_str(&format!("Front Matter Pages: {}\n", result.doc_page_delta));
    out.push_str(&format!("Front Marker: {}\n\n", result.front_marker));

    out.push_str("Defects:\n");
    for defect in Defect::ALL {
        out.push_str(&format!("  {}: {}\n", defect, result.with_defect(defect).count()));
    }

    // header patterns close the report, as in the historical files
    if !result.header_patterns.is_empty() {
        out.push_str(&format!("\nPattern: {}", result.header_patterns.join(" | ")));
    }
    out
}

/// Write [`format_metrics`] output to `path`, creating parent directories.
pub fn write_metrics(path: &Path, result: &VolumeResult) -> Result<(), ReportError> {
    let mut file = create_file(path)?;
    file.write_all(format_metrics(result).as_bytes())
        .map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
}
