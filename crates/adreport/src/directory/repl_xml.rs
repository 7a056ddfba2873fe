//! Parsing of the XML values returned by the constructed `msDS-Repl*` and
//! `msDS-NCRepl*` attributes.
//!
//! Each value is one flat document such as
//! `<DS_REPL_NEIGHBOR><pszNamingContext>..</pszNamingContext>..</DS_REPL_NEIGHBOR>`.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use xml::reader::{EventReader, XmlEvent};

use super::{DirectoryError, Result};

/// Child elements of a flat XML document, keyed by local name.
#[derive(Debug, Default)]
struct Fields(HashMap<String, String>);

impl Fields {
    fn parse(attribute: &str, value: &str) -> Result<Self> {
        let value = value.trim_end_matches('\0');
        let mut fields = HashMap::new();
        let mut depth = 0usize;
        let mut current: Option<String> = None;
        let mut text = String::new();

        for event in EventReader::from_str(value) {
            match event.map_err(|e| DirectoryError::invalid(attribute, &e.to_string()))? {
                XmlEvent::StartElement { name, .. } => {
                    depth += 1;
                    if depth == 2 {
                        current = Some(name.local_name);
                        text.clear();
                    }
                }
                XmlEvent::Characters(s) | XmlEvent::CData(s) if depth == 2 => text.push_str(&s),
                XmlEvent::EndElement { .. } => {
                    if depth == 2 {
                        if let Some(name) = current.take() {
                            fields.insert(name, std::mem::take(&mut text));
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
        }

        if fields.is_empty() {
            return Err(DirectoryError::invalid(attribute, value));
        }
        Ok(Fields(fields))
    }

    fn text(&self, name: &str) -> &str {
        self.0.get(name).map(|s| s.trim()).unwrap_or_default()
    }

    fn required(&self, name: &str) -> Result<&str> {
        match self.0.get(name) {
            Some(v) => Ok(v.trim()),
            None => Err(DirectoryError::invalid(name, "<missing>")),
        }
    }

    fn u32(&self, name: &str) -> Result<u32> {
        let raw = self.required(name)?;
        raw.parse().map_err(|_| DirectoryError::invalid(name, raw))
    }

    fn i64(&self, name: &str) -> Result<i64> {
        let raw = self.required(name)?;
        raw.parse().map_err(|_| DirectoryError::invalid(name, raw))
    }

    /// A FILETIME rendered as ISO 8601. The Windows epoch means "never".
    fn time(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
        let raw = self.text(name);
        if raw.is_empty() {
            return Ok(None);
        }
        let parsed = DateTime::parse_from_rfc3339(raw)
            .map_err(|_| DirectoryError::invalid(name, raw))?
            .with_timezone(&Utc);
        if parsed.year() <= 1601 {
            return Ok(None);
        }
        Ok(Some(parsed))
    }

    /// Source DSA DN, or its GUID when the DSA object no longer exists.
    fn source_dsa(&self, guid_element: &str) -> String {
        let dn = self.text("pszSourceDsaDN");
        if dn.is_empty() {
            self.text(guid_element).to_string()
        } else {
            dn.to_string()
        }
    }
}

/// One `DS_REPL_NEIGHBOR` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Neighbor {
    pub naming_context: String,
    pub source_dsa: String,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_result: u32,
    pub consecutive_failures: u32,
}

pub(crate) fn parse_neighbor(attribute: &str, value: &str) -> Result<Neighbor> {
    let f = Fields::parse(attribute, value)?;
    Ok(Neighbor {
        naming_context: f.required("pszNamingContext")?.to_string(),
        source_dsa: f.source_dsa("uuidSourceDsaObjGuid"),
        last_attempt: f.time("ftimeLastSyncAttempt")?,
        last_success: f.time("ftimeLastSyncSuccess")?,
        last_result: f.u32("dwLastSyncResult")?,
        consecutive_failures: f.u32("cNumConsecutiveSyncFailures")?,
    })
}

/// One `DS_REPL_CURSOR` entry of an up-to-dateness vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Cursor {
    pub source_dsa: String,
    pub usn_filter: i64,
    pub last_success: Option<DateTime<Utc>>,
}

pub(crate) fn parse_cursor(attribute: &str, value: &str) -> Result<Cursor> {
    let f = Fields::parse(attribute, value)?;
    Ok(Cursor {
        source_dsa: f.source_dsa("uuidSourceDsaInvocationID"),
        usn_filter: f.i64("usnAttributeFilter")?,
        last_success: f.time("ftimeLastSyncSuccess")?,
    })
}

/// One `DS_REPL_KCC_DSA_FAILURE` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KccFailure {
    pub dsa: String,
    pub failure_count: u32,
    pub last_result: u32,
}

pub(crate) fn parse_kcc_failure(attribute: &str, value: &str) -> Result<KccFailure> {
    let f = Fields::parse(attribute, value)?;
    let dsa = match f.text("pszDsaDN") {
        "" => f.text("uuidDsaObjGuid").to_string(),
        dn => dn.to_string(),
    };
    Ok(KccFailure {
        dsa,
        failure_count: f.u32("cNumFailures")?,
        last_result: f.u32("dwLastResult")?,
    })
}
