//! [`DirectoryClient`] over LDAP, for Active Directory domain controllers.
//!
//! Replication state is read from the constructed attributes domain
//! controllers publish: `msDS-ReplAll{Inbound,Outbound}Neighbors`,
//! `msDS-ReplConnectionFailures` and `msDS-ReplLinkFailures` on the root DSE,
//! and `msDS-NCReplCursors` on every naming context head.
//!
//! Each call opens its own session and closes it when done.

use std::collections::HashSet;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};

use super::repl_xml;
use super::{
    DirectoryClient, DirectoryError, FunctionalLevel, PartitionFilter, ReplicationScope, Result,
    RootDse,
};
use crate::config::DirectoryConfig;
use crate::records::{
    FailureType, PartnerType, ReplicationFailureRecord, ReplicationPartnerRecord,
    ReplicationVectorRecord,
};

const INBOUND_NEIGHBORS: &str = "msDS-ReplAllInboundNeighbors";
const OUTBOUND_NEIGHBORS: &str = "msDS-ReplAllOutboundNeighbors";
const CONNECTION_FAILURES: &str = "msDS-ReplConnectionFailures";
const LINK_FAILURES: &str = "msDS-ReplLinkFailures";
const NC_CURSORS: &str = "msDS-NCReplCursors";

/// Writable (516) and read-only (521) domain controller computer accounts.
const DC_COMPUTER_FILTER: &str = "(&(objectCategory=computer)(|(primaryGroupID=516)(primaryGroupID=521)))";

const ROOT_DSE_ATTRS: &[&str] = &[
    "rootDomainNamingContext",
    "defaultNamingContext",
    "configurationNamingContext",
    "forestFunctionality",
    "domainFunctionality",
    "dnsHostName",
    "namingContexts",
];

pub struct LdapDirectoryClient {
    config: DirectoryConfig,
}

impl LdapDirectoryClient {
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }

    async fn connect(&self, host: &str) -> Result<Session> {
        let url = self.config.url_for(host);
        let settings = LdapConnSettings::new().set_starttls(self.config.starttls && !self.config.use_ldaps);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| DirectoryError::Unreachable {
                server: url.clone(),
                msg: e.to_string(),
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!(error = %e, "LDAP connection closed with error");
            }
        });

        match self.config.bind_dn.as_deref() {
            Some(bind_dn) => {
                let password = self.config.bind_password.as_deref().unwrap_or_default();
                ldap.simple_bind(bind_dn, password)
                    .await
                    .and_then(|r| r.success())
                    .map_err(|e| classify(e, bind_dn))?;
            }
            None => {
                #[cfg(feature = "gssapi")]
                ldap.sasl_gssapi_bind(host)
                    .await
                    .and_then(|r| r.success())
                    .map_err(|e| classify(e, host))?;
            }
        }

        tracing::debug!(%url, "LDAP session established");
        Ok(Session {
            host: host.to_string(),
            ldap,
        })
    }

    async fn connect_default(&self) -> Result<Session> {
        let server = self.config.default_server()?;
        self.connect(&server).await
    }

    async fn hosts_for(&self, scope: &ReplicationScope) -> Result<Vec<String>> {
        match scope {
            ReplicationScope::Server(host) => Ok(vec![host.clone()]),
            ReplicationScope::Domain(domain) => self.domain_controllers_of(domain).await,
            ReplicationScope::Forest => self.domain_controllers().await,
        }
    }

    /// Domain controllers of `domain`, located through the domain's own DNS name.
    async fn domain_controllers_of(&self, domain: &str) -> Result<Vec<String>> {
        let mut session = self.connect(domain).await?;
        let dse = session.base_entry("", &["defaultNamingContext"]).await?;
        let base = required(&dse, "RootDSE", "defaultNamingContext")?;

        let computers = session.subtree(&base, DC_COMPUTER_FILTER, &["dNSHostName"]).await?;
        session.close().await;

        let mut hosts: Vec<String> = computers
            .iter()
            .filter_map(|entry| first(entry, "dNSHostName").map(str::to_string))
            .collect();
        hosts.sort();
        hosts.dedup();
        Ok(hosts)
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectoryClient {
    async fn root_dse(&self) -> Result<RootDse> {
        let mut session = self.connect_default().await?;
        let entry = session.base_entry("", ROOT_DSE_ATTRS).await?;
        session.close().await;
        root_dse_from(&entry)
    }

    async fn read_attribute(&self, dn: &str, attribute: &str) -> Result<String> {
        let mut session = self.connect_default().await?;
        let entry = session.base_entry(dn, &[attribute]).await?;
        session.close().await;
        required(&entry, dn, attribute)
    }

    async fn replication_partner_metadata(
        &self,
        scope: &ReplicationScope,
        partitions: &PartitionFilter,
        partner_type: PartnerType,
    ) -> Result<Vec<ReplicationPartnerRecord>> {
        let directions = [
            (INBOUND_NEIGHBORS, PartnerType::Inbound),
            (OUTBOUND_NEIGHBORS, PartnerType::Outbound),
        ];
        let attrs: Vec<&str> = directions
            .iter()
            .filter(|(_, direction)| partner_type.includes(*direction))
            .map(|(attr, _)| *attr)
            .collect();

        let mut records = Vec::new();
        for host in self.hosts_for(scope).await? {
            let mut session = self.connect(&host).await?;
            let entry = session.base_entry("", &attrs).await?;
            session.close().await;

            for (attr, direction) in directions {
                if !partner_type.includes(direction) {
                    continue;
                }
                for value in values(&entry, attr) {
                    let neighbor = repl_xml::parse_neighbor(attr, value)?;
                    if !partitions.matches(&neighbor.naming_context) {
                        continue;
                    }
                    records.push(ReplicationPartnerRecord {
                        server: host.clone(),
                        partner: neighbor.source_dsa,
                        last_attempt: neighbor.last_attempt,
                        last_result: neighbor.last_result,
                        last_success: neighbor.last_success,
                        partition: neighbor.naming_context,
                        partner_type: direction,
                        consecutive_failures: neighbor.consecutive_failures,
                    });
                }
            }
        }
        Ok(records)
    }

    async fn up_to_dateness_vector(
        &self,
        scope: &ReplicationScope,
    ) -> Result<Vec<ReplicationVectorRecord>> {
        let mut records = Vec::new();
        for host in self.hosts_for(scope).await? {
            let mut session = self.connect(&host).await?;
            let dse = session.base_entry("", &["namingContexts"]).await?;
            for partition in values(&dse, "namingContexts") {
                let head = session.base_entry(partition, &[NC_CURSORS]).await?;
                for value in values(&head, NC_CURSORS) {
                    let cursor = repl_xml::parse_cursor(NC_CURSORS, value)?;
                    records.push(ReplicationVectorRecord {
                        last_success: cursor.last_success,
                        partition: partition.clone(),
                        partner: cursor.source_dsa,
                        server: host.clone(),
                        usn_filter: cursor.usn_filter,
                    });
                }
            }
            session.close().await;
        }
        Ok(records)
    }

    async fn replication_failures(
        &self,
        scope: &ReplicationScope,
    ) -> Result<Vec<ReplicationFailureRecord>> {
        let kinds = [
            (CONNECTION_FAILURES, FailureType::Connection),
            (LINK_FAILURES, FailureType::Link),
        ];

        let mut records = Vec::new();
        for host in self.hosts_for(scope).await? {
            let mut session = self.connect(&host).await?;
            let entry = session
                .base_entry("", &[CONNECTION_FAILURES, LINK_FAILURES])
                .await?;
            session.close().await;

            for (attr, failure_type) in kinds {
                for value in values(&entry, attr) {
                    let failure = repl_xml::parse_kcc_failure(attr, value)?;
                    records.push(ReplicationFailureRecord {
                        failure_count: failure.failure_count,
                        failure_type,
                        partner: failure.dsa,
                        last_error: failure.last_result,
                    });
                }
            }
        }
        Ok(records)
    }

    async fn domain_controllers(&self) -> Result<Vec<String>> {
        let mut session = self.connect_default().await?;
        let dse = session.base_entry("", &["configurationNamingContext"]).await?;
        let sites = format!(
            "CN=Sites,{}",
            required(&dse, "RootDSE", "configurationNamingContext")?
        );

        // A server object hosts a domain controller when it has an nTDSDSA child.
        let dsas = session.subtree(&sites, "(objectClass=nTDSDSA)", &["cn"]).await?;
        let dsa_parents: HashSet<String> = dsas
            .iter()
            .filter_map(|entry| parent_dn(&entry.dn))
            .map(str::to_ascii_lowercase)
            .collect();

        let servers = session
            .subtree(&sites, "(objectClass=server)", &["dNSHostName"])
            .await?;
        session.close().await;

        let mut hosts: Vec<String> = servers
            .iter()
            .filter(|entry| dsa_parents.contains(&entry.dn.to_ascii_lowercase()))
            .filter_map(|entry| first(entry, "dNSHostName").map(str::to_string))
            .collect();
        hosts.sort();
        hosts.dedup();
        tracing::debug!(count = hosts.len(), "enumerated forest domain controllers");
        Ok(hosts)
    }
}

struct Session {
    host: String,
    ldap: Ldap,
}

impl Session {
    /// Base-scope read of the object at `dn` (`""` is the root DSE).
    async fn base_entry(&mut self, dn: &str, attrs: &[&str]) -> Result<SearchEntry> {
        let (entries, _) = self
            .ldap
            .search(dn, Scope::Base, "(objectClass=*)", attrs.to_vec())
            .await
            .and_then(|r| r.success())
            .map_err(|e| classify(e, dn))?;

        entries
            .into_iter()
            .next()
            .map(SearchEntry::construct)
            .ok_or_else(|| DirectoryError::ObjectNotFound { dn: dn.to_string() })
    }

    async fn subtree(&mut self, base: &str, filter: &str, attrs: &[&str]) -> Result<Vec<SearchEntry>> {
        let (entries, _) = self
            .ldap
            .search(base, Scope::Subtree, filter, attrs.to_vec())
            .await
            .and_then(|r| r.success())
            .map_err(|e| classify(e, base))?;
        Ok(entries.into_iter().map(SearchEntry::construct).collect())
    }

    async fn close(mut self) {
        if let Err(e) = self.ldap.unbind().await {
            tracing::debug!(host = %self.host, error = %e, "LDAP unbind failed");
        }
    }
}

fn classify(err: LdapError, dn: &str) -> DirectoryError {
    match err {
        LdapError::LdapResult { result } if result.rc == 32 => DirectoryError::ObjectNotFound {
            dn: dn.to_string(),
        },
        LdapError::LdapResult { result } if result.rc == 49 || result.rc == 50 => {
            DirectoryError::AccessDenied {
                msg: format!("{} (rc={})", result.text, result.rc),
            }
        }
        other => DirectoryError::Ldap(other),
    }
}

// TODO: follow `;range=` continuations so controllers with more than 1000
// neighbors or cursors are reported in full.
fn values<'a>(entry: &'a SearchEntry, name: &str) -> &'a [String] {
    entry
        .attrs
        .iter()
        .find(|(key, _)| {
            key.split(';')
                .next()
                .is_some_and(|base| base.eq_ignore_ascii_case(name))
        })
        .map(|(_, v)| v.as_slice())
        .unwrap_or(&[])
}

fn first<'a>(entry: &'a SearchEntry, name: &str) -> Option<&'a str> {
    values(entry, name).first().map(String::as_str)
}

fn required(entry: &SearchEntry, dn: &str, attribute: &str) -> Result<String> {
    first(entry, attribute)
        .map(str::to_string)
        .ok_or_else(|| DirectoryError::MissingAttribute {
            dn: dn.to_string(),
            attribute: attribute.to_string(),
        })
}

fn level(entry: &SearchEntry, attribute: &str) -> Result<FunctionalLevel> {
    let raw = required(entry, "RootDSE", attribute)?;
    raw.trim()
        .parse()
        .map(FunctionalLevel)
        .map_err(|_| DirectoryError::invalid(attribute, &raw))
}

fn root_dse_from(entry: &SearchEntry) -> Result<RootDse> {
    Ok(RootDse {
        root_domain_naming_context: required(entry, "RootDSE", "rootDomainNamingContext")?,
        default_naming_context: required(entry, "RootDSE", "defaultNamingContext")?,
        configuration_naming_context: required(entry, "RootDSE", "configurationNamingContext")?,
        forest_functionality: level(entry, "forestFunctionality")?,
        domain_functionality: level(entry, "domainFunctionality")?,
        dns_host_name: first(entry, "dnsHostName").map(str::to_string),
        naming_contexts: values(entry, "namingContexts").to_vec(),
    })
}

/// Strip the leading RDN, honouring `\,` escapes.
fn parent_dn(dn: &str) -> Option<&str> {
    let mut escaped = false;
    for (i, b) in dn.bytes().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b',' => return Some(&dn[i + 1..]),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entry(attrs: &[(&str, &[&str])]) -> SearchEntry {
        SearchEntry {
            dn: String::new(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
                .collect(),
            bin_attrs: HashMap::new(),
        }
    }

    #[test]
    fn test_parent_dn() {
        assert_eq!(
            parent_dn("CN=NTDS Settings,CN=DC1,CN=Servers,CN=HQ,CN=Sites,CN=Configuration,DC=contoso,DC=com"),
            Some("CN=DC1,CN=Servers,CN=HQ,CN=Sites,CN=Configuration,DC=contoso,DC=com")
        );
        assert_eq!(parent_dn(r"CN=Smith\, J,OU=Users,DC=x"), Some("OU=Users,DC=x"));
        assert_eq!(parent_dn("DC=com"), None);
    }

    #[test]
    fn test_values_case_insensitive_and_ranged() {
        let e = entry(&[
            ("dNSHostName", &["dc1.contoso.com"]),
            ("msDS-NCReplCursors;range=0-999", &["<a/>", "<b/>"]),
        ]);
        assert_eq!(first(&e, "dnshostname"), Some("dc1.contoso.com"));
        assert_eq!(values(&e, NC_CURSORS).len(), 2);
        assert!(values(&e, "missing").is_empty());
    }

    #[test]
    fn test_root_dse_from_entry() {
        let e = entry(&[
            ("rootDomainNamingContext", &["DC=contoso,DC=com"]),
            ("defaultNamingContext", &["DC=emea,DC=contoso,DC=com"]),
            ("configurationNamingContext", &["CN=Configuration,DC=contoso,DC=com"]),
            ("forestFunctionality", &["7"]),
            ("domainFunctionality", &["6"]),
            ("dnsHostName", &["dc1.emea.contoso.com"]),
            ("namingContexts", &["DC=emea,DC=contoso,DC=com", "CN=Configuration,DC=contoso,DC=com"]),
        ]);
        let dse = root_dse_from(&e).unwrap();
        assert_eq!(dse.root_domain_naming_context, "DC=contoso,DC=com");
        assert_eq!(dse.forest_functionality.forest_mode(), "Windows2016Forest");
        assert_eq!(dse.domain_functionality.domain_mode(), "Windows2012R2Domain");
        assert_eq!(dse.dns_host_name.as_deref(), Some("dc1.emea.contoso.com"));
        assert_eq!(dse.naming_contexts.len(), 2);
    }

    #[test]
    fn test_root_dse_missing_attribute() {
        let e = entry(&[("rootDomainNamingContext", &["DC=contoso,DC=com"])]);
        let err = root_dse_from(&e).unwrap_err();
        assert!(matches!(err, DirectoryError::MissingAttribute { ref attribute, .. } if attribute == "defaultNamingContext"));
    }

    #[test]
    fn test_root_dse_bad_level() {
        let e = entry(&[
            ("rootDomainNamingContext", &["DC=contoso,DC=com"]),
            ("defaultNamingContext", &["DC=contoso,DC=com"]),
            ("configurationNamingContext", &["CN=Configuration,DC=contoso,DC=com"]),
            ("forestFunctionality", &["seven"]),
            ("domainFunctionality", &["7"]),
        ]);
        assert!(matches!(
            root_dse_from(&e).unwrap_err(),
            DirectoryError::InvalidValue { .. }
        ));
    }

    #[tokio::test]
    async fn test_no_server_configured() {
        std::env::remove_var("USERDNSDOMAIN");
        let client = LdapDirectoryClient::new(DirectoryConfig::default());
        let err = client.root_dse().await.unwrap_err();
        assert!(matches!(err, DirectoryError::Config(_)));
    }
}
