//! Limits and options for validation sessions
//!
//! This module defines the caps a session enforces while reading a document
//! (depth, attribute count, token size, distinct names) and the retention caps
//! that bound the buffers a session keeps across documents.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What to do with `xsi:schemaLocation` / `xsi:noNamespaceSchemaLocation`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaLocationPolicy {
    /// Report every hint as an error
    Error,
    /// Ignore hints silently
    #[default]
    Ignore,
    /// Record hints, resolved against the document URI
    Document,
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Maximum element nesting depth
    pub max_depth: usize,

    /// Maximum number of attributes per element (namespace declarations included)
    pub max_attributes: usize,

    /// Maximum size in bytes of a single text run or attribute value
    pub max_token_size: usize,

    /// Maximum number of distinct element names recorded per document
    pub max_qname_intern_entries: usize,

    /// Schema location hint handling
    pub schema_location_policy: SchemaLocationPolicy,

    /// Bytes reserved in the session arena before allocations spill to the heap
    pub arena_capacity: usize,

    /// Text buffers above this capacity are dropped on reset
    pub max_retained_text_bytes: usize,

    /// Element stacks deeper than this are dropped on reset
    pub max_retained_stack_depth: usize,

    /// Identity tables with more entries than this are dropped on reset
    pub max_retained_identity_entries: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            max_depth: 1000,
            max_attributes: 1000,
            max_token_size: 10 * 1024 * 1024, // 10 MB
            max_qname_intern_entries: 100_000,
            schema_location_policy: SchemaLocationPolicy::Ignore,
            arena_capacity: 1024 * 1024, // 1 MB
            max_retained_text_bytes: 64 * 1024,
            max_retained_stack_depth: 256,
            max_retained_identity_entries: 65_536,
        }
    }
}

impl ValidationOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict options (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_depth: 100,
            max_attributes: 100,
            max_token_size: 1024 * 1024, // 1 MB
            max_qname_intern_entries: 10_000,
            schema_location_policy: SchemaLocationPolicy::Error,
            arena_capacity: 256 * 1024,
            max_retained_text_bytes: 16 * 1024,
            max_retained_stack_depth: 64,
            max_retained_identity_entries: 4096,
        }
    }

    /// Create permissive options (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_depth: 10_000,
            max_attributes: 10_000,
            max_token_size: 1024 * 1024 * 1024, // 1 GB
            max_qname_intern_entries: 1_000_000,
            schema_location_policy: SchemaLocationPolicy::Ignore,
            arena_capacity: 16 * 1024 * 1024,
            max_retained_text_bytes: 1024 * 1024,
            max_retained_stack_depth: 4096,
            max_retained_identity_entries: 1_000_000,
        }
    }

    /// Set the schema location policy
    pub fn with_schema_location_policy(mut self, policy: SchemaLocationPolicy) -> Self {
        self.schema_location_policy = policy;
        self
    }

    /// Set the maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Load options from a JSON document; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Value(format!("invalid options: {}", e)))
    }

    /// Check if XML depth is within limits
    pub fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            Err(Error::LimitExceeded(format!(
                "XML depth {} exceeds maximum {}",
                depth, self.max_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if number of attributes is within limits
    pub fn check_attributes(&self, count: usize) -> Result<()> {
        if count > self.max_attributes {
            Err(Error::LimitExceeded(format!(
                "Attribute count {} exceeds maximum {}",
                count, self.max_attributes
            )))
        } else {
            Ok(())
        }
    }

    /// Check if a token is within limits
    pub fn check_token_size(&self, size: usize) -> Result<()> {
        if size > self.max_token_size {
            Err(Error::LimitExceeded(format!(
                "Token size {} bytes exceeds maximum {} bytes",
                size, self.max_token_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of distinct names is within limits
    pub fn check_qname_entries(&self, count: usize) -> Result<()> {
        if count > self.max_qname_intern_entries {
            Err(Error::LimitExceeded(format!(
                "Distinct element names {} exceeds maximum {}",
                count, self.max_qname_intern_entries
            )))
        } else {
            Ok(())
        }
    }
}
