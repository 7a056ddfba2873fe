//! The three reports and the settings they share.

pub mod dc_replication;
pub mod forest_version;
pub mod repl_metadata;

use std::path::{Path, PathBuf};

pub use dc_replication::{report_dc_replication, DcReplicationSummary};
pub use forest_version::report_forest_version;
pub use repl_metadata::report_repl_metadata;

/// Settings passed explicitly to every reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContext {
    /// Directory the CSV files are written to.
    pub output_dir: PathBuf,
    /// Keep going when one domain controller cannot be queried.
    pub continue_on_error: bool,
}

impl ReportContext {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            continue_on_error: false,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of report file `name` inside the output directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}
