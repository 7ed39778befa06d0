use std::path::PathBuf;

use thiserror::Error;

pub mod export;
pub mod metrics;

pub use export::{Bucket, OutputLayout, write_entry_list, write_entry_table, write_volume};
pub use metrics::{format_metrics, write_metrics};

/// Failures while writing a volume's output files.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
