//! XML Schema validators
//!
//! This module contains the per-component validation logic the session
//! drives: simple values and facets, content models, attributes, element
//! dispatch, identity constraints and ID tracking.

// Values
pub mod builtins;
pub mod exceptions;
pub mod facets;
pub mod patterns;
pub mod simple_types;
pub mod values;

// Structures
pub mod groups;
pub mod models;
pub mod particles;
pub mod wildcards;

// Instance checks
pub mod attributes;
pub mod elements;
pub mod identities;
pub mod ids;

pub use exceptions::{ErrorCode, ValidationErrors, ValidationIssue, ValueError};
