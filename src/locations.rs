//! Schema location hints
//!
//! Instances may name schema documents with `xsi:schemaLocation` (pairs of
//! namespace and location) and `xsi:noNamespaceSchemaLocation`. Hints are
//! never loaded; depending on the session policy they are reported or
//! recorded, resolved against the instance's own URI.

use std::path::{Path, PathBuf};

use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};

/// Where a location points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Absolute URL
    Url(Url),
    /// File system path
    Path(PathBuf),
}

impl Location {
    /// Classify a location string
    pub fn parse(s: &str) -> Self {
        match Url::parse(s) {
            // single letters are drive names, not schemes
            Ok(url) if url.scheme().len() > 1 => Location::Url(url),
            _ => Location::Path(PathBuf::from(s)),
        }
    }

    /// Resolve `reference` relative to this location
    pub fn join(&self, reference: &str) -> Result<Location> {
        if let Location::Url(url) = Location::parse(reference) {
            return Ok(Location::Url(url));
        }
        match self {
            Location::Url(base) => Ok(Location::Url(base.join(reference)?)),
            Location::Path(base) => {
                let reference = Path::new(reference);
                if reference.is_absolute() {
                    return Ok(Location::Path(reference.to_path_buf()));
                }
                let dir = base.parent().unwrap_or_else(|| Path::new(""));
                Ok(Location::Path(dir.join(reference)))
            }
        }
    }

    /// Whether this is a remote location
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(url) if url.scheme() != "file")
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Url(url) => write!(f, "{}", url),
            Location::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A schema location named by an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaLocationHint {
    /// Target namespace, `None` for `xsi:noNamespaceSchemaLocation`
    pub namespace: Option<String>,
    /// Location as written
    pub location: String,
    /// Location resolved against the document URI, when one was given
    pub resolved: Option<String>,
}

/// Split an `xsi:schemaLocation` value into namespace/location pairs
pub fn parse_schema_location(value: &str) -> Result<Vec<(&str, &str)>> {
    let tokens: Vec<&str> = value.split_ascii_whitespace().collect();
    if tokens.len() % 2 != 0 {
        return Err(Error::Value(format!(
            "xsi:schemaLocation must hold namespace/location pairs, found {} tokens",
            tokens.len()
        )));
    }
    Ok(tokens.chunks(2).map(|pair| (pair[0], pair[1])).collect())
}

/// Build the hints of one element
///
/// `schema_location` and `no_namespace` are the raw attribute values;
/// `document` is the instance URI that relative locations resolve against.
pub fn collect_hints(
    schema_location: Option<&str>,
    no_namespace: Option<&str>,
    document: Option<&str>,
) -> Result<Vec<SchemaLocationHint>> {
    let base = document.map(Location::parse);
    let resolve = |location: &str| -> Result<Option<String>> {
        match &base {
            Some(base) => Ok(Some(base.join(location)?.to_string())),
            None => Ok(None),
        }
    };
    let mut hints = Vec::new();
    if let Some(value) = schema_location {
        for (namespace, location) in parse_schema_location(value)? {
            hints.push(SchemaLocationHint {
                namespace: Some(namespace.to_string()),
                location: location.to_string(),
                resolved: resolve(location)?,
            });
        }
    }
    if let Some(location) = no_namespace.map(str::trim).filter(|l| !l.is_empty()) {
        hints.push(SchemaLocationHint {
            namespace: None,
            location: location.to_string(),
            resolved: resolve(location)?,
        });
    }
    Ok(hints)
}
