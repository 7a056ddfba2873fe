//! Output directory handling and append-only CSV writing.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::error::{ReportError, Result};
use crate::records::{
    ReplicationFailureRecord, ReplicationPartnerRecord, ReplicationVectorRecord, VersionRecord,
};

/// A record type with a fixed CSV column layout.
///
/// `HEADERS` must list the serialized field names in declaration order; the
/// header row is written from it so that an empty batch still produces a
/// header-only file.
pub trait CsvRecord: Serialize {
    const HEADERS: &'static [&'static str];
}

impl CsvRecord for VersionRecord {
    const HEADERS: &'static [&'static str] = &[
        "Schema PSPath",
        "Forest PSPath",
        "Domain PSPath",
        "Schema Version",
        "Forest Version",
        "Domain Version",
        "Forest Function",
        "Domain Function",
        "Date",
    ];
}

impl CsvRecord for ReplicationPartnerRecord {
    const HEADERS: &'static [&'static str] = &[
        "Server",
        "Partner",
        "LastReplicationAttempt",
        "LastReplicationResult",
        "LastReplicationSuccess",
        "Partition",
        "PartnerType",
        "ConsecutiveReplicationFailures",
    ];
}

impl CsvRecord for ReplicationVectorRecord {
    const HEADERS: &'static [&'static str] =
        &["LastReplicationSuccess", "Partition", "Partner", "Server", "UsnFilter"];
}

impl CsvRecord for ReplicationFailureRecord {
    const HEADERS: &'static [&'static str] = &["FailureCount", "FailureType", "Partner", "LastError"];
}

/// Make sure `dir` exists as a directory, creating it and its parents if needed.
///
/// Calling this again on a directory it created is a no-op.
pub fn ensure_path(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        tracing::debug!(path = %dir.display(), "output directory exists");
        return Ok(());
    }

    if dir.exists() {
        return Err(ReportError::filesystem(
            dir,
            io::Error::new(io::ErrorKind::AlreadyExists, "path exists and is not a directory"),
        ));
    }

    fs::create_dir_all(dir).map_err(|e| ReportError::filesystem(dir, e))?;
    tracing::info!(path = %dir.display(), "created output directory");
    Ok(())
}

/// Append `records` to the CSV file at `path`, creating it if absent.
///
/// The header row is written only when the file is new or empty, never on
/// append to a file that already has content. Returns the number of data rows
/// written.
pub fn append_records<T: CsvRecord>(path: &Path, records: &[T]) -> Result<usize> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ReportError::filesystem(path, e))?;

    let needs_header = file
        .metadata()
        .map_err(|e| ReportError::filesystem(path, e))?
        .len()
        == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if needs_header {
        writer.write_record(T::HEADERS)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush().map_err(|e| ReportError::filesystem(path, e))?;

    tracing::debug!(path = %path.display(), rows = records.len(), header = needs_header, "appended CSV rows");
    Ok(records.len())
}
