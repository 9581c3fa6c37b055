use crate::error::{HarnessError, Result};
use crate::sampler::Sample;
use chrono::{DateTime, Local};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use log::debug;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const KEY_COLUMNS: [&str; 3] = ["timestamp", "operation", "run"];

/// One observed run of a wrapped operation.
#[derive(Debug, Clone)]
pub struct RunRecord<S> {
    /// When the run started
    pub timestamp: DateTime<Local>,
    pub operation: String,
    /// 1-based index within its session
    pub run: u32,
    pub sample: S,
}

impl<S: Sample> RunRecord<S> {
    pub fn header() -> Vec<&'static str> {
        KEY_COLUMNS.iter().chain(S::COLUMNS).copied().collect()
    }

    fn fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.operation.clone(),
            self.run.to_string(),
        ];
        fields.extend(self.sample.values());
        fields
    }
}

pub fn log_path(folder: &Path, base_name: &str) -> PathBuf {
    folder.join(format!("{}.csv", base_name))
}

/// Appends one record to `folder/base_name.csv`, writing the header first
/// when the file is empty. The file is synced and closed before returning.
///
/// A non-empty file whose header differs from `S`'s columns is left
/// untouched and reported as [`HarnessError::SchemaMismatch`].
pub fn append<S: Sample>(folder: &Path, base_name: &str, record: &RunRecord<S>) -> Result<()> {
    let path = log_path(folder, base_name);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let needs_header = file.metadata()?.len() == 0;
    if !needs_header {
        check_header::<S>(&path)?;
    }

    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(&file);
    if needs_header {
        wtr.write_record(RunRecord::<S>::header())?;
    }
    wtr.write_record(record.fields())?;
    wtr.flush()?;
    drop(wtr);
    file.sync_data()?;

    debug!(
        "[{}] run {} appended to {}",
        record.operation,
        record.run,
        path.display()
    );
    Ok(())
}

fn check_header<S: Sample>(path: &Path) -> Result<()> {
    let expected = RunRecord::<S>::header();
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let found = rdr.headers()?;
    if found.iter().eq(expected.iter().copied()) {
        return Ok(());
    }
    Err(HarnessError::SchemaMismatch {
        path: path.to_path_buf(),
        expected: expected.join(","),
        found: found.iter().collect::<Vec<_>>().join(","),
    })
}

/// Reads a log back as its header and data rows.
pub fn read_log(path: &Path) -> Result<(StringRecord, Vec<StringRecord>)> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let header = rdr.headers()?.clone();
    let rows = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((header, rows))
}
