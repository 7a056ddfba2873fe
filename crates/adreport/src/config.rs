use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::directory::DirectoryError;

/// Directory connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Server or domain name to query. Falls back to `USERDNSDOMAIN`.
    pub server: Option<String>,
    /// Port override; 636 with LDAPS, 389 otherwise.
    pub port: Option<u16>,
    pub use_ldaps: bool,
    pub starttls: bool,
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
}

impl DirectoryConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_lowercase().as_str() {
            "toml" => {
                let config: DirectoryConfig = toml::from_str(&contents)?;
                Ok(config)
            }
            "json" => {
                let config: DirectoryConfig = serde_json::from_str(&contents)?;
                Ok(config)
            }
            _ => anyhow::bail!("Unsupported config file extension: {}", ext),
        }
    }

    /// Load `path` if it exists, otherwise return defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!("Config file not found, using defaults: {}", path.display());
            Ok(Self::default())
        }
    }

    /// The server to bind to when no specific controller is targeted.
    pub fn default_server(&self) -> Result<String, DirectoryError> {
        self.server
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                std::env::var("USERDNSDOMAIN")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_lowercase())
            })
            .ok_or_else(|| {
                DirectoryError::Config(
                    "no directory server configured; pass --server or set USERDNSDOMAIN".to_string(),
                )
            })
    }

    pub fn port(&self) -> u16 {
        match (self.port, self.use_ldaps) {
            (Some(port), _) => port,
            (None, true) => 636,
            (None, false) => 389,
        }
    }

    /// LDAP URL for `host`.
    pub fn url_for(&self, host: &str) -> String {
        let scheme = if self.use_ldaps { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, host, self.port())
    }
}
