//! Replication partner metadata report for one domain.

use super::ReportContext;
use crate::directory::{DirectoryClient, PartitionFilter, ReplicationScope};
use crate::error::Result;
use crate::output::append_records;
use crate::records::PartnerType;

pub const REPL_METADATA_FILE: &str = "ADReplMetaData.csv";

/// Append partner metadata for every controller of `domain`, all partitions,
/// inbound and outbound, to `ADReplMetaData.csv`. Returns the number of rows
/// written.
pub async fn report_repl_metadata<C>(client: &C, domain: &str, ctx: &ReportContext) -> Result<usize>
where
    C: DirectoryClient + ?Sized,
{
    let records = client
        .replication_partner_metadata(
            &ReplicationScope::Domain(domain.to_string()),
            &PartitionFilter::All,
            PartnerType::Both,
        )
        .await?;

    let written = append_records(&ctx.file(REPL_METADATA_FILE), &records)?;
    tracing::info!(domain, rows = written, "wrote replication partner metadata");
    Ok(written)
}
