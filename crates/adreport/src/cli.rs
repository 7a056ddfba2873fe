use crate::config::DirectoryConfig;
use crate::directory::LdapDirectoryClient;
use crate::dispatch::{dispatch, ReportAction, ReportOutcome, ReportRequest};
use crate::error::ReportError;
use crate::report::ReportContext;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "adreport")]
#[command(about = "Active Directory version and replication reports as CSV", long_about = None)]
pub struct Cli {
    /// Directory the CSV reports are written to; created if missing.
    #[arg(long, value_parser = parse_output_dir)]
    pub log_file_path: PathBuf,

    /// Report to produce.
    #[arg(long, value_enum, ignore_case = true)]
    pub action: Action,

    /// Domain to query; required for ADReplMetaData.
    #[arg(long)]
    pub domain_name: Option<String>,

    /// DCReplication: report the remaining controllers when one fails.
    #[arg(long)]
    pub continue_on_error: bool,

    /// Directory connection settings (TOML or JSON).
    #[arg(short, long, default_value = "adreport.toml")]
    pub config: PathBuf,

    /// Domain controller or domain to connect to.
    #[arg(short, long, env = "ADREPORT_SERVER")]
    pub server: Option<String>,

    #[arg(long, env = "ADREPORT_BIND_DN")]
    pub bind_dn: Option<String>,

    #[arg(long, env = "ADREPORT_BIND_PASSWORD", hide_env_values = true)]
    pub bind_password: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Action {
    #[value(name = "ForestVersion")]
    ForestVersion,
    #[value(name = "ADReplMetaData")]
    AdReplMetaData,
    #[value(name = "DCReplication")]
    DcReplication,
}

fn parse_output_dir(s: &str) -> std::result::Result<PathBuf, String> {
    if s.trim().is_empty() {
        return Err("path must not be empty".to_string());
    }
    Ok(PathBuf::from(s))
}

impl Cli {
    /// Validate the arguments into a request.
    pub fn resolve(&self) -> crate::error::Result<ReportRequest> {
        let action = match self.action {
            Action::ForestVersion => ReportAction::ForestVersion,
            Action::AdReplMetaData => {
                let domain = self
                    .domain_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .ok_or_else(|| {
                        ReportError::usage("--domain-name is required when --action is ADReplMetaData")
                    })?;
                ReportAction::ReplMetadata {
                    domain: domain.to_string(),
                }
            }
            Action::DcReplication => ReportAction::DcReplication,
        };

        if self.domain_name.is_some() && !matches!(action, ReportAction::ReplMetadata { .. }) {
            tracing::debug!("--domain-name is ignored for {}", action.name());
        }

        Ok(ReportRequest {
            action,
            context: ReportContext {
                output_dir: self.log_file_path.clone(),
                continue_on_error: self.continue_on_error,
            },
        })
    }

    /// Config file values overridden by flags and environment.
    pub fn directory_config(&self) -> Result<DirectoryConfig> {
        let mut config = DirectoryConfig::load_or_default(&self.config)
            .with_context(|| format!("failed to load config {}", self.config.display()))?;
        if let Some(ref server) = self.server {
            config.server = Some(server.clone());
        }
        if let Some(ref bind_dn) = self.bind_dn {
            config.bind_dn = Some(bind_dn.clone());
        }
        if let Some(ref password) = self.bind_password {
            config.bind_password = Some(password.clone());
        }
        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        let request = self.resolve()?;
        let client = LdapDirectoryClient::new(self.directory_config()?);

        let outcome = dispatch(&client, &request)
            .await
            .with_context(|| format!("{} report failed", request.action.name()))?;

        match outcome {
            ReportOutcome::ForestVersion(record) => println!(
                "Schema {} / Forest {} / Domain {} ({}, {})",
                record.schema_version,
                record.forest_version,
                record.domain_version,
                record.forest_function_level,
                record.domain_function_level
            ),
            ReportOutcome::ReplMetadata { rows } => {
                println!("{} replication partner rows written", rows)
            }
            ReportOutcome::DcReplication(summary) => println!(
                "{} domain controllers reported, {} files written",
                summary.controllers.len(),
                summary.files.len()
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_forest_version() {
        let cli = Cli::parse_from(["adreport", "--log-file-path", "/tmp/out", "--action", "ForestVersion"]);
        assert_eq!(cli.action, Action::ForestVersion);
        let request = cli.resolve().unwrap();
        assert_eq!(request.action, ReportAction::ForestVersion);
        assert_eq!(request.context.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_cli_repl_metadata_with_domain() {
        let cli = Cli::parse_from([
            "adreport",
            "--log-file-path",
            "/tmp/out",
            "--action",
            "ADReplMetaData",
            "--domain-name",
            "contoso.com",
        ]);
        match cli.resolve().unwrap().action {
            ReportAction::ReplMetadata { domain } => assert_eq!(domain, "contoso.com"),
            other => panic!("Expected ReplMetadata, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_repl_metadata_requires_domain() {
        let cli = Cli::parse_from(["adreport", "--log-file-path", "/tmp/out", "--action", "ADReplMetaData"]);
        assert!(matches!(cli.resolve(), Err(ReportError::Usage { .. })));

        let blank = Cli::parse_from([
            "adreport",
            "--log-file-path",
            "/tmp/out",
            "--action",
            "ADReplMetaData",
            "--domain-name",
            "  ",
        ]);
        assert!(matches!(blank.resolve(), Err(ReportError::Usage { .. })));
    }

    #[test]
    fn test_cli_dc_replication_ignores_domain() {
        let cli = Cli::parse_from([
            "adreport",
            "--log-file-path",
            "/tmp/out",
            "--action",
            "DCReplication",
            "--domain-name",
            "contoso.com",
            "--continue-on-error",
        ]);
        let request = cli.resolve().unwrap();
        assert_eq!(request.action, ReportAction::DcReplication);
        assert!(request.context.continue_on_error);
    }

    #[test]
    fn test_cli_action_case_insensitive() {
        let cli = Cli::parse_from(["adreport", "--log-file-path", "/tmp/out", "--action", "dcreplication"]);
        assert_eq!(cli.action, Action::DcReplication);
    }

    #[test]
    fn test_cli_rejects_unknown_actions() {
        for action in ["", "Forest", "ReplMetaData", "ForestVersion2", "*"] {
            let result = Cli::try_parse_from(["adreport", "--log-file-path", "/tmp/out", "--action", action]);
            assert!(result.is_err(), "action {:?} should be rejected", action);
        }
    }

    #[test]
    fn test_cli_requires_path_and_action() {
        assert!(Cli::try_parse_from(["adreport", "--action", "ForestVersion"]).is_err());
        assert!(Cli::try_parse_from(["adreport", "--log-file-path", "/tmp/out"]).is_err());
        assert!(Cli::try_parse_from(["adreport", "--log-file-path", "", "--action", "ForestVersion"]).is_err());
    }

    #[test]
    fn test_cli_connection_flags_override_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let config_path = dir.path().join("adreport.toml");
        std::fs::write(&config_path, "server = \"dc1.contoso.com\"\nbind_dn = \"svc@contoso.com\"\n").unwrap();

        let cli = Cli::parse_from([
            "adreport",
            "--log-file-path",
            "/tmp/out",
            "--action",
            "ForestVersion",
            "--config",
            config_path.to_str().unwrap(),
            "--server",
            "dc2.contoso.com",
        ]);
        let config = cli.directory_config().unwrap();
        assert_eq!(config.server.as_deref(), Some("dc2.contoso.com"));
        assert_eq!(config.bind_dn.as_deref(), Some("svc@contoso.com"));
    }
}
