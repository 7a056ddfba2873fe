//! Schema, forest-update and domain-update version report.

use chrono::Local;

use super::ReportContext;
use crate::directory::{DirectoryClient, DirectoryError};
use crate::error::Result;
use crate::output::append_records;
use crate::records::VersionRecord;

pub const FOREST_UPDATE_FILE: &str = "ForestUpdateInfo.csv";

/// Provider-qualified path prefix the ActiveDirectory PowerShell drive reports.
const PS_PATH_PREFIX: &str = r"Microsoft.ActiveDirectory.Management.dll\ActiveDirectory:://RootDSE/";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Distinguished names of the containers whose versions are reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionContainers {
    pub schema: String,
    pub forest_updates: String,
    pub domain_updates: String,
}

impl VersionContainers {
    pub fn for_root(root_naming_context: &str) -> Self {
        Self {
            schema: format!("CN=Schema,CN=Configuration,{root_naming_context}"),
            forest_updates: format!(
                "CN=ActiveDirectoryUpdate,CN=ForestUpdates,CN=Configuration,{root_naming_context}"
            ),
            domain_updates: format!(
                "CN=ActiveDirectoryUpdate,CN=DomainUpdates,CN=System,{root_naming_context}"
            ),
        }
    }
}

pub fn ps_path(dn: &str) -> String {
    format!("{PS_PATH_PREFIX}{dn}")
}

async fn read_version<C>(client: &C, dn: &str, attribute: &str) -> Result<u32>
where
    C: DirectoryClient + ?Sized,
{
    let raw = client.read_attribute(dn, attribute).await?;
    let version = raw
        .trim()
        .parse()
        .map_err(|_| DirectoryError::invalid(attribute, &raw))?;
    Ok(version)
}

/// Read the version markers of the current forest and append one row to
/// `ForestUpdateInfo.csv`.
///
/// All reads happen before anything is written, so a missing container
/// leaves the file untouched.
pub async fn report_forest_version<C>(client: &C, ctx: &ReportContext) -> Result<VersionRecord>
where
    C: DirectoryClient + ?Sized,
{
    let dse = client.root_dse().await?;
    let containers = VersionContainers::for_root(&dse.root_domain_naming_context);

    let schema_version = read_version(client, &containers.schema, "objectVersion").await?;
    let forest_version = read_version(client, &containers.forest_updates, "revision").await?;
    let domain_version = read_version(client, &containers.domain_updates, "revision").await?;

    let record = VersionRecord {
        schema_path: ps_path(&containers.schema),
        forest_path: ps_path(&containers.forest_updates),
        domain_path: ps_path(&containers.domain_updates),
        schema_version,
        forest_version,
        domain_version,
        forest_function_level: dse.forest_functionality.forest_mode(),
        domain_function_level: dse.domain_functionality.domain_mode(),
        timestamp: Local::now().format(DATE_FORMAT).to_string(),
    };

    append_records(&ctx.file(FOREST_UPDATE_FILE), std::slice::from_ref(&record))?;
    tracing::info!(
        schema = schema_version,
        forest = forest_version,
        domain = domain_version,
        forest_mode = %record.forest_function_level,
        "wrote forest update info"
    );
    Ok(record)
}
