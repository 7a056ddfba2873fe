//! In-memory directory used by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use adreport::directory::{
    DirectoryClient, DirectoryError, FunctionalLevel, PartitionFilter, ReplicationScope, Result,
    RootDse,
};
use adreport::records::{
    FailureType, PartnerType, ReplicationFailureRecord, ReplicationPartnerRecord,
    ReplicationVectorRecord,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};

pub const ROOT: &str = "DC=contoso,DC=com";

/// A directory whose answers are fixed up front and whose calls are recorded.
#[derive(Default)]
pub struct MockDirectory {
    pub root_dse: Option<RootDse>,
    pub attributes: HashMap<(String, String), String>,
    pub known_domain: Option<String>,
    pub partners: Vec<ReplicationPartnerRecord>,
    pub vectors: Vec<ReplicationVectorRecord>,
    pub failures: HashMap<String, Vec<ReplicationFailureRecord>>,
    pub controllers: Vec<String>,
    pub unreachable: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl MockDirectory {
    /// A forest rooted at `DC=contoso,DC=com` with the given version markers.
    pub fn forest(schema: u32, forest_revision: u32, domain_revision: u32, level: u32) -> Self {
        let mut mock = MockDirectory {
            root_dse: Some(RootDse {
                root_domain_naming_context: ROOT.to_string(),
                default_naming_context: ROOT.to_string(),
                configuration_naming_context: format!("CN=Configuration,{ROOT}"),
                forest_functionality: FunctionalLevel(level),
                domain_functionality: FunctionalLevel(level),
                dns_host_name: Some("dc1.contoso.com".to_string()),
                naming_contexts: vec![ROOT.to_string()],
            }),
            ..MockDirectory::default()
        };
        mock.set_attribute(&format!("CN=Schema,CN=Configuration,{ROOT}"), "objectVersion", &schema.to_string());
        mock.set_attribute(
            &format!("CN=ActiveDirectoryUpdate,CN=ForestUpdates,CN=Configuration,{ROOT}"),
            "revision",
            &forest_revision.to_string(),
        );
        mock.set_attribute(
            &format!("CN=ActiveDirectoryUpdate,CN=DomainUpdates,CN=System,{ROOT}"),
            "revision",
            &domain_revision.to_string(),
        );
        mock
    }

    /// A forest with the given controllers, each with an empty failure list,
    /// and a two-entry vector table.
    pub fn with_controllers(hosts: &[&str]) -> Self {
        let mut mock = MockDirectory {
            controllers: hosts.iter().map(|h| h.to_string()).collect(),
            vectors: vec![vector("dc1.contoso.com", "dc2.contoso.com", 4711), vector("dc2.contoso.com", "dc1.contoso.com", 5120)],
            ..MockDirectory::default()
        };
        for host in hosts {
            mock.failures.insert(host.to_string(), Vec::new());
        }
        mock
    }

    pub fn set_attribute(&mut self, dn: &str, attribute: &str, value: &str) {
        self.attributes
            .insert((dn.to_string(), attribute.to_string()), value.to_string());
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls whose name starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[async_trait]
impl DirectoryClient for MockDirectory {
    async fn root_dse(&self) -> Result<RootDse> {
        self.record("root_dse");
        self.root_dse.clone().ok_or_else(|| DirectoryError::Unreachable {
            server: "mock".to_string(),
            msg: "no root DSE".to_string(),
        })
    }

    async fn read_attribute(&self, dn: &str, attribute: &str) -> Result<String> {
        self.record("read_attribute");
        self.attributes
            .get(&(dn.to_string(), attribute.to_string()))
            .cloned()
            .ok_or_else(|| DirectoryError::ObjectNotFound { dn: dn.to_string() })
    }

    async fn replication_partner_metadata(
        &self,
        scope: &ReplicationScope,
        partitions: &PartitionFilter,
        partner_type: PartnerType,
    ) -> Result<Vec<ReplicationPartnerRecord>> {
        self.record("replication_partner_metadata");
        if let ReplicationScope::Domain(domain) = scope {
            if self.known_domain.as_deref() != Some(domain.as_str()) {
                return Err(DirectoryError::Unreachable {
                    server: domain.clone(),
                    msg: "domain not found".to_string(),
                });
            }
        }
        Ok(self
            .partners
            .iter()
            .filter(|p| partitions.matches(&p.partition) && partner_type.includes(p.partner_type))
            .cloned()
            .collect())
    }

    async fn up_to_dateness_vector(&self, _scope: &ReplicationScope) -> Result<Vec<ReplicationVectorRecord>> {
        self.record("up_to_dateness_vector");
        Ok(self.vectors.clone())
    }

    async fn replication_failures(&self, scope: &ReplicationScope) -> Result<Vec<ReplicationFailureRecord>> {
        let host = match scope {
            ReplicationScope::Server(host) => host.clone(),
            other => panic!("unexpected failure scope {:?}", other),
        };
        self.record(format!("replication_failures:{host}"));
        if self.unreachable.contains(&host) {
            return Err(DirectoryError::Unreachable {
                server: host,
                msg: "connection refused".to_string(),
            });
        }
        Ok(self.failures.get(&host).cloned().unwrap_or_default())
    }

    async fn domain_controllers(&self) -> Result<Vec<String>> {
        self.record("domain_controllers");
        Ok(self.controllers.clone())
    }
}

pub fn partner(server: &str, partner: &str, partition: &str, partner_type: PartnerType, failures: u32) -> ReplicationPartnerRecord {
    ReplicationPartnerRecord {
        server: server.to_string(),
        partner: format!("CN=NTDS Settings,CN={partner},CN=Servers,CN=HQ,CN=Sites,CN=Configuration,{ROOT}"),
        last_attempt: Some(Utc.with_ymd_and_hms(2026, 10, 16, 7, 45, 12).unwrap()),
        last_result: if failures == 0 { 0 } else { 1722 },
        last_success: Some(Utc.with_ymd_and_hms(2026, 10, 16, 7, 30, 0).unwrap()),
        partition: partition.to_string(),
        partner_type,
        consecutive_failures: failures,
    }
}

pub fn vector(server: &str, partner: &str, usn: i64) -> ReplicationVectorRecord {
    ReplicationVectorRecord {
        last_success: Some(Utc.with_ymd_and_hms(2026, 10, 16, 6, 0, 0).unwrap()),
        partition: ROOT.to_string(),
        partner: partner.to_string(),
        server: server.to_string(),
        usn_filter: usn,
    }
}

pub fn failure(partner: &str, count: u32, error: u32) -> ReplicationFailureRecord {
    ReplicationFailureRecord {
        failure_count: count,
        failure_type: FailureType::Link,
        partner: partner.to_string(),
        last_error: error,
    }
}
