//! Directory service access.
//!
//! The reporters only see the [`DirectoryClient`] trait. [`LdapDirectoryClient`]
//! implements it against Active Directory over LDAP; tests supply an in-memory
//! implementation.

mod error;
pub mod ldap;
mod repl_xml;

use async_trait::async_trait;

use crate::records::{
    PartnerType, ReplicationFailureRecord, ReplicationPartnerRecord, ReplicationVectorRecord,
};

pub use error::DirectoryError;
pub use ldap::LdapDirectoryClient;

/// Result type for directory operations.
pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Forest or domain functionality level as published on the root DSE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionalLevel(pub u32);

impl FunctionalLevel {
    fn release(self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "Windows2000",
            1 => "Windows2003Interim",
            2 => "Windows2003",
            3 => "Windows2008",
            4 => "Windows2008R2",
            5 => "Windows2012",
            6 => "Windows2012R2",
            7 => "Windows2016",
            10 => "Windows2025",
            _ => return None,
        };
        Some(name)
    }

    /// Forest mode name, e.g. `Windows2016Forest`. Unknown levels are
    /// rendered as their number.
    pub fn forest_mode(self) -> String {
        match self.release() {
            Some(release) => format!("{release}Forest"),
            None => self.0.to_string(),
        }
    }

    /// Domain mode name, e.g. `Windows2016Domain`.
    pub fn domain_mode(self) -> String {
        match self.release() {
            Some(release) => format!("{release}Domain"),
            None => self.0.to_string(),
        }
    }
}

/// The subset of root DSE attributes the reporters use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDse {
    pub root_domain_naming_context: String,
    pub default_naming_context: String,
    pub configuration_naming_context: String,
    pub forest_functionality: FunctionalLevel,
    pub domain_functionality: FunctionalLevel,
    pub dns_host_name: Option<String>,
    pub naming_contexts: Vec<String>,
}

/// Target of a replication query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationScope {
    /// A single domain controller, by host name.
    Server(String),
    /// Every domain controller of the named domain.
    Domain(String),
    /// Every domain controller of the current forest.
    Forest,
}

/// Which naming contexts a partner metadata query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionFilter {
    All,
    Named(Vec<String>),
}

impl PartitionFilter {
    pub fn matches(&self, partition: &str) -> bool {
        match self {
            PartitionFilter::All => true,
            PartitionFilter::Named(names) => names.iter().any(|n| n.eq_ignore_ascii_case(partition)),
        }
    }
}

/// Read access to a directory service.
///
/// Connection, authentication and transport are the implementation's
/// concern. Every call is a single query; implementations do not retry.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Fetch the root DSE of the default server.
    async fn root_dse(&self) -> Result<RootDse>;

    /// Read one single-valued attribute of the object at `dn`.
    async fn read_attribute(&self, dn: &str, attribute: &str) -> Result<String>;

    /// Replication partner metadata for every controller in `scope`.
    async fn replication_partner_metadata(
        &self,
        scope: &ReplicationScope,
        partitions: &PartitionFilter,
        partner_type: PartnerType,
    ) -> Result<Vec<ReplicationPartnerRecord>>;

    /// Up-to-dateness vector cursors for every controller in `scope`.
    async fn up_to_dateness_vector(
        &self,
        scope: &ReplicationScope,
    ) -> Result<Vec<ReplicationVectorRecord>>;

    /// Replication failures recorded by every controller in `scope`.
    async fn replication_failures(
        &self,
        scope: &ReplicationScope,
    ) -> Result<Vec<ReplicationFailureRecord>>;

    /// Host names of all domain controllers in the current forest.
    async fn domain_controllers(&self) -> Result<Vec<String>>;
}
