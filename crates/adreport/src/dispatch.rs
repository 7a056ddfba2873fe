//! Runs the one report a request asks for.

use crate::directory::DirectoryClient;
use crate::error::Result;
use crate::output::ensure_path;
use crate::records::VersionRecord;
use crate::report::{
    report_dc_replication, report_forest_version, report_repl_metadata, DcReplicationSummary,
    ReportContext,
};

/// The report to produce, with the inputs only that report needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportAction {
    ForestVersion,
    ReplMetadata { domain: String },
    DcReplication,
}

impl ReportAction {
    /// Name of the action as accepted on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            ReportAction::ForestVersion => "ForestVersion",
            ReportAction::ReplMetadata { .. } => "ADReplMetaData",
            ReportAction::DcReplication => "DCReplication",
        }
    }
}

/// A validated request: what to report and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub action: ReportAction,
    pub context: ReportContext,
}

/// What a report produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    ForestVersion(VersionRecord),
    ReplMetadata { rows: usize },
    DcReplication(DcReplicationSummary),
}

/// Ensure the output directory exists, then run exactly the requested report.
pub async fn dispatch<C>(client: &C, request: &ReportRequest) -> Result<ReportOutcome>
where
    C: DirectoryClient + ?Sized,
{
    let ctx = &request.context;
    ensure_path(ctx.output_dir())?;

    tracing::info!(action = request.action.name(), output = %ctx.output_dir().display(), "running report");
    let outcome = match &request.action {
        ReportAction::ForestVersion => {
            ReportOutcome::ForestVersion(report_forest_version(client, ctx).await?)
        }
        ReportAction::ReplMetadata { domain } => ReportOutcome::ReplMetadata {
            rows: report_repl_metadata(client, domain, ctx).await?,
        },
        ReportAction::DcReplication => {
            ReportOutcome::DcReplication(report_dc_replication(client, ctx).await?)
        }
    };
    Ok(outcome)
}
