//! # xmlschema-runtime
//!
//! The runtime validation core of an XML Schema (XSD 1.0) validator.
//!
//! Given immutable compiled schema tables and an XML instance delivered as a
//! stream of namespace-resolved events, a [`Session`] decides whether the
//! document conforms and reports every violation as a structured
//! [`ValidationIssue`].
//!
//! ## Features
//!
//! - Deterministic content-model automata, all-groups and wildcards
//! - Built-in and derived simple types with facets and value-space equality
//! - Substitution groups, `xsi:type` retargeting and `xsi:nil`
//! - Identity constraints (`key`, `keyref`, `unique`) with nested scopes
//! - ID/IDREF/ENTITY checks
//! - Hard caps on depth, attributes, token size and distinct names
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use xmlschema_runtime::schema::{ElementSpec, SchemaBuilder};
//! use xmlschema_runtime::{ErrorCode, Session};
//!
//! let mut builder = SchemaBuilder::new();
//! let int = builder.builtin("int");
//! let count = builder.qname("", "count");
//! builder.element(ElementSpec::new(count, int).global()).unwrap();
//! let schema = Arc::new(builder.finish().unwrap());
//!
//! let mut session = Session::with_schema(schema);
//! assert!(session.validate_str("<count>42</count>", None).is_ok());
//!
//! let errors = session.validate_str("<count>many</count>", None).unwrap_err();
//! assert_eq!(errors.codes(), vec![ErrorCode::DatatypeInvalid]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Names and resources
pub mod arena;
pub mod names;
pub mod namespaces;
pub mod symbols;
pub mod paths;
pub mod locations;

// Input
pub mod reader;

// Compiled tables and validators
pub mod schema;
pub mod validators;

// Orchestration
pub mod session;

// Re-exports for convenience
pub use error::{Error, ParseError, Result};
pub use limits::{SchemaLocationPolicy, ValidationOptions};
pub use locations::SchemaLocationHint;
pub use reader::{EventList, EventReader, XmlEvent, XmlReader};
pub use schema::{CompiledSchema, SchemaBuilder};
pub use session::Session;
pub use validators::builtins::XSD_NAMESPACE;
pub use validators::exceptions::{ErrorCode, ValidationErrors, ValidationIssue, ValueError};

/// Version of the xmlschema-runtime library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XML Schema instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
