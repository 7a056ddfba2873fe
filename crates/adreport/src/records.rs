//! Flat report records written to CSV.
//!
//! Each record is built by a reporter, appended to its CSV file and dropped.
//! Field renames carry the column headers of the report files.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema, forest-update and domain-update versions of a forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    #[serde(rename = "Schema PSPath")]
    pub schema_path: String,
    #[serde(rename = "Forest PSPath")]
    pub forest_path: String,
    #[serde(rename = "Domain PSPath")]
    pub domain_path: String,
    #[serde(rename = "Schema Version")]
    pub schema_version: u32,
    #[serde(rename = "Forest Version")]
    pub forest_version: u32,
    #[serde(rename = "Domain Version")]
    pub domain_version: u32,
    #[serde(rename = "Forest Function")]
    pub forest_function_level: String,
    #[serde(rename = "Domain Function")]
    pub domain_function_level: String,
    #[serde(rename = "Date")]
    pub timestamp: String,
}

/// Direction of a replication link relative to the reporting server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartnerType {
    Inbound,
    Outbound,
    Both,
}

impl PartnerType {
    /// True when links of type `other` are selected by this filter.
    pub fn includes(self, other: PartnerType) -> bool {
        self == PartnerType::Both || self == other
    }
}

impl fmt::Display for PartnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PartnerType::Inbound => "Inbound",
            PartnerType::Outbound => "Outbound",
            PartnerType::Both => "Both",
        };
        f.write_str(s)
    }
}

/// Replication statistics for one (server, partner, partition) link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationPartnerRecord {
    #[serde(rename = "Server")]
    pub server: String,
    #[serde(rename = "Partner")]
    pub partner: String,
    #[serde(rename = "LastReplicationAttempt")]
    pub last_attempt: Option<DateTime<Utc>>,
    #[serde(rename = "LastReplicationResult")]
    pub last_result: u32,
    #[serde(rename = "LastReplicationSuccess")]
    pub last_success: Option<DateTime<Utc>>,
    #[serde(rename = "Partition")]
    pub partition: String,
    #[serde(rename = "PartnerType")]
    pub partner_type: PartnerType,
    #[serde(rename = "ConsecutiveReplicationFailures")]
    pub consecutive_failures: u32,
}

/// One up-to-dateness vector cursor: the highest USN `server` has seen from
/// `partner` for `partition`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationVectorRecord {
    #[serde(rename = "LastReplicationSuccess")]
    pub last_success: Option<DateTime<Utc>>,
    #[serde(rename = "Partition")]
    pub partition: String,
    #[serde(rename = "Partner")]
    pub partner: String,
    #[serde(rename = "Server")]
    pub server: String,
    #[serde(rename = "UsnFilter")]
    pub usn_filter: i64,
}

/// Kind of failure tracked by the knowledge consistency checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureType {
    Link,
    Connection,
}

/// A replication failure recorded by a domain controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationFailureRecord {
    #[serde(rename = "FailureCount")]
    pub failure_count: u32,
    #[serde(rename = "FailureType")]
    pub failure_type: FailureType,
    #[serde(rename = "Partner")]
    pub partner: String,
    #[serde(rename = "LastError")]
    pub last_error: u32,
}
