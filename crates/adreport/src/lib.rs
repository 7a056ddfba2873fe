#![warn(missing_docs)]

//! Active Directory reporting: schema and update versions, replication partner
//! metadata and per-controller replication status, written as CSV files.

pub mod cli;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod output;
pub mod records;
pub mod report;

pub use config::DirectoryConfig;
pub use directory::{DirectoryClient, DirectoryError, LdapDirectoryClient};
pub use dispatch::{dispatch, ReportAction, ReportOutcome, ReportRequest};
pub use error::ReportError;
pub use report::ReportContext;
