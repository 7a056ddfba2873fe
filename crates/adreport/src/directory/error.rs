//! Error types for directory queries.

use thiserror::Error;

/// Errors raised by a [`DirectoryClient`](super::DirectoryClient).
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The object does not exist (LDAP result 32).
    #[error("directory object not found: {dn}")]
    ObjectNotFound {
        /// Distinguished name that was looked up.
        dn: String,
    },

    /// The object exists but does not carry the attribute.
    #[error("attribute {attribute} not present on {dn}")]
    MissingAttribute {
        /// Distinguished name of the object.
        dn: String,
        /// Attribute that was requested.
        attribute: String,
    },

    /// An attribute value could not be interpreted.
    #[error("invalid value for {attribute}: {value:?}")]
    InvalidValue {
        /// Attribute or element name.
        attribute: String,
        /// Raw value received.
        value: String,
    },

    /// The server could not be contacted.
    #[error("cannot reach directory server {server}: {msg}")]
    Unreachable {
        /// Server host or URL.
        server: String,
        /// Transport error description.
        msg: String,
    },

    /// Bind or read was refused.
    #[error("access denied: {msg}")]
    AccessDenied {
        /// Server diagnostic text.
        msg: String,
    },

    /// Connection settings are incomplete.
    #[error("directory configuration error: {0}")]
    Config(String),

    /// Any other LDAP protocol error.
    #[error("LDAP error")]
    Ldap(#[from] ldap3::LdapError),
}

impl DirectoryError {
    pub(crate) fn invalid(attribute: &str, value: &str) -> Self {
        DirectoryError::InvalidValue {
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }
}
