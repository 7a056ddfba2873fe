//! Per-controller replication status report for the whole forest.
//!
//! For every domain controller two files are written:
//! `<host>_ForestVectorTable.csv` with the forest's up-to-dateness vector and
//! `<host>_ForestReplFailures.csv` with the failures that controller records.
//! The vector table is forest scoped but is queried again for every
//! controller, so each file reflects the moment that controller was visited.

use std::path::PathBuf;

use super::ReportContext;
use crate::directory::{DirectoryClient, DirectoryError, ReplicationScope};
use crate::error::{ReportError, Result};
use crate::output::append_records;

pub const VECTOR_TABLE_SUFFIX: &str = "_ForestVectorTable.csv";
pub const REPL_FAILURES_SUFFIX: &str = "_ForestReplFailures.csv";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DcReplicationSummary {
    /// Controllers that were reported, in visit order.
    pub controllers: Vec<String>,
    /// Every file appended to.
    pub files: Vec<PathBuf>,
}

fn controller_file(ctx: &ReportContext, host: &str, suffix: &str) -> Result<PathBuf> {
    if host.is_empty() || host.contains(['/', '\\']) || host == "." || host == ".." {
        return Err(DirectoryError::invalid("dNSHostName", host).into());
    }
    Ok(ctx.file(&format!("{host}{suffix}")))
}

async fn report_controller<C>(client: &C, host: &str, ctx: &ReportContext) -> Result<Vec<PathBuf>>
where
    C: DirectoryClient + ?Sized,
{
    let vector_path = controller_file(ctx, host, VECTOR_TABLE_SUFFIX)?;
    let failures_path = controller_file(ctx, host, REPL_FAILURES_SUFFIX)?;

    let vectors = client.up_to_dateness_vector(&ReplicationScope::Forest).await?;
    let failures = client
        .replication_failures(&ReplicationScope::Server(host.to_string()))
        .await?;

    append_records(&failures_path, &failures)?;
    if failures.is_empty() {
        tracing::info!(host, "no replication failures detected");
    } else {
        tracing::warn!(host, count = failures.len(), "replication failures recorded");
    }

    append_records(&vector_path, &vectors)?;
    tracing::info!(host, rows = vectors.len(), "wrote up-to-dateness vector table");

    Ok(vec![failures_path, vector_path])
}

/// Write vector and failure files for every domain controller in the forest.
///
/// Stops at the first controller that cannot be queried unless
/// `ctx.continue_on_error` is set, in which case the remaining controllers are
/// still reported and the error lists every controller that failed.
pub async fn report_dc_replication<C>(client: &C, ctx: &ReportContext) -> Result<DcReplicationSummary>
where
    C: DirectoryClient + ?Sized,
{
    let controllers = client.domain_controllers().await?;
    if controllers.is_empty() {
        tracing::info!("no domain controllers discovered in the forest");
    }

    let mut summary = DcReplicationSummary::default();
    let mut failed = Vec::new();

    for host in controllers {
        match report_controller(client, &host, ctx).await {
            Ok(files) => {
                summary.files.extend(files);
                summary.controllers.push(host);
            }
            Err(err) if ctx.continue_on_error => {
                tracing::error!(host = %host, error = %err, "skipping domain controller");
                failed.push(host);
            }
            Err(err) => return Err(err),
        }
    }

    if !failed.is_empty() {
        return Err(ReportError::ControllersFailed { hosts: failed });
    }
    Ok(summary)
}
