use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use ecb_core::{Defect, Entry};
use ecb_parsing::VolumeResult;

use crate::ReportError;
use crate::metrics::write_metrics;

/// A list of entries written to its own file per volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Full,
    Clean,
    /// Entries as they were before the line-mid split.
    LineMid,
    FrontTruncated,
    Defect(Defect),
}

impl Bucket {
    /// Every bucket written for a volume, fixed buckets first.
    pub fn all() -> Vec<Bucket> {
        let mut buckets = vec![
            Bucket::Full,
            Bucket::Clean,
            Bucket::LineMid,
            Bucket::FrontTruncated,
        ];
        buckets.extend(Defect::ALL.into_iter().map(Bucket::Defect));
        buckets
    }

    /// Directory of this bucket relative to the output root.
    pub fn dir(&self) -> PathBuf {
        match self {
            Bucket::Full => PathBuf::from("full_entries"),
            Bucket::Clean => PathBuf::from("clean_entries"),
            Bucket::LineMid => PathBuf::from("line_mid_entries"),
            Bucket::FrontTruncated => PathBuf::from("front_trunc_entries"),
            Bucket::Defect(defect) => Path::new("defect_entries").join(defect.as_str()),
        }
    }

    pub fn entries<'a>(&self, result: &'a VolumeResult) -> Vec<&'a Entry> {
        match self {
            Bucket::Full => result.entries.iter().collect(),
            Bucket::Clean => result.clean().collect(),
            Bucket::LineMid => result.line_mid.iter().collect(),
            Bucket::FrontTruncated => result.front_truncated().collect(),
            Bucket::Defect(defect) => result.with_defect(*defect).collect(),
        }
    }
}

/// Where a volume's files go under the output root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bucket_path(&self, bucket: Bucket, year: &str) -> PathBuf {
        self.root.join(bucket.dir()).join(entries_file_name(year))
    }

    pub fn table_path(&self, year: &str) -> PathBuf {
        self.root.join("entry_tables").join(entries_file_name(year))
    }

    pub fn measures_path(&self, year: &str) -> PathBuf {
        self.root
            .join("entries_measures")
            .join(format!("entries_measures_19{}.txt", year))
    }
}

fn entries_file_name(year: &str) -> String {
    format!("entries_19{}.csv", year)
}

/// Create `path`, making its parent directories first.
pub(crate) fn create_file(path: &Path) -> Result<File, ReportError> {
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    File::create(path).map_err(io_err)
}

/// Write one entry per row, quoting where the text needs it.
pub fn write_entry_list<'a, W, I>(writer: W, entries: I) -> csv::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Entry>,
{
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for entry in entries {
        wtr.write_record([entry.text.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct EntryRow<'a> {
    entry: &'a str,
    page: Option<usize>,
    doc_page: Option<usize>,
    main_entry: bool,
    defects: String,
}

impl<'a> From<&'a Entry> for EntryRow<'a> {
    fn from(entry: &'a Entry) -> Self {
        EntryRow {
            entry: &entry.text,
            page: entry.page,
            doc_page: entry.doc_page,
            main_entry: entry.main_entry,
            defects: entry
                .defects
                .iter()
                .map(Defect::as_str)
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

const TABLE_HEADER: [&str; 5] = ["entry", "page", "doc_page", "main_entry", "defects"];

/// Write entries as a table with page tags and defect flags.
///
/// The header row is written even when there are no entries.
pub fn write_entry_table<'a, W, I>(writer: W, entries: I) -> csv::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Entry>,
{
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(TABLE_HEADER)?;
    for entry in entries {
        wtr.serialize(EntryRow::from(entry))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write every bucket, the entry table and the metrics report for one volume.
///
/// Returns the paths written, in order.
pub fn write_volume(
    layout: &OutputLayout,
    result: &VolumeResult,
) -> Result<Vec<PathBuf>, ReportError> {
    let mut written = Vec::new();

    for bucket in Bucket::all() {
        let path = layout.bucket_path(bucket, &result.year);
        let file = create_file(&path)?;
        write_entry_list(file, bucket.entries(result)).map_err(|source| ReportError::Csv {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }

    let table = layout.table_path(&result.year);
    let file = create_file(&table)?;
    write_entry_table(file, &result.entries).map_err(|source| ReportError::Csv {
        path: table.clone(),
        source,
    })?;
    written.push(table);

    let measures = layout.measures_path(&result.year);
    write_metrics(&measures, result)?;
    written.push(measures);

    debug!(
        year = %result.year,
        files = written.len(),
        root = %layout.root().display(),
        "wrote volume outputs"
    );
    Ok(written)
}
