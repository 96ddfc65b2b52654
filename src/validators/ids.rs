//! ID, IDREF and ENTITY tracking
//!
//! IDs are collected as they are validated and duplicates are reported at
//! once. IDREF values are kept with their position until the end of the
//! document, when every reference must name a collected ID. ENTITY values
//! are checked against the names declared in the DOCTYPE, when there are any.

use std::collections::HashSet;

use crate::validators::builtins::IdClass;
use crate::validators::exceptions::{ErrorCode, ValidationIssue};

#[derive(Debug, Clone)]
struct PendingIdRef {
    value: String,
    path: String,
    line: u32,
    column: u32,
}

/// Per-document ID/IDREF/ENTITY state
#[derive(Debug, Default)]
pub struct IdTracker {
    ids: HashSet<String>,
    refs: Vec<PendingIdRef>,
    entities: HashSet<String>,
}

impl IdTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the entity names declared in the DOCTYPE
    pub fn declare_entities<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities.extend(names.into_iter().map(Into::into));
    }

    /// Record an ID value; returns an issue message when it was already seen
    pub fn add_id(&mut self, value: &str) -> Result<(), String> {
        if self.ids.contains(value) {
            return Err(format!("duplicate ID value '{}'", value));
        }
        self.ids.insert(value.to_owned());
        Ok(())
    }

    /// Record IDREF values for the end-of-document check
    pub fn add_refs(&mut self, values: &str, path: &str, line: u32, column: u32) {
        for value in values.split_ascii_whitespace() {
            self.refs.push(PendingIdRef {
                value: value.to_owned(),
                path: path.to_owned(),
                line,
                column,
            });
        }
    }

    /// Check ENTITY values; returns the first undeclared name
    pub fn check_entities<'v>(&self, values: &'v str) -> Result<(), &'v str> {
        if self.entities.is_empty() {
            return Ok(());
        }
        match values.split_ascii_whitespace().find(|v| !self.entities.contains(*v)) {
            Some(missing) => Err(missing),
            None => Ok(()),
        }
    }

    /// Track a validated value according to its ID class; returns the issue
    /// to report, if any
    pub fn track(
        &mut self,
        class: IdClass,
        value: &str,
        path: &str,
        line: u32,
        column: u32,
    ) -> Option<ValidationIssue> {
        let issue = match class {
            IdClass::None => return None,
            IdClass::Id => {
                let message = self.add_id(value).err()?;
                ValidationIssue::new(ErrorCode::DuplicateId, message)
            }
            IdClass::IdRef | IdClass::IdRefs => {
                self.add_refs(value, path, line, column);
                return None;
            }
            IdClass::Entity | IdClass::Entities => {
                let missing = self.check_entities(value).err()?;
                ValidationIssue::new(
                    ErrorCode::DatatypeInvalid,
                    format!("'{}' is not an entity declared in the DOCTYPE", missing),
                )
                .with_actual(missing)
            }
        };
        Some(issue.with_path(path).with_position(line, column))
    }

    /// Report every IDREF that names no ID
    pub fn finish(&self, issues: &mut Vec<ValidationIssue>) {
        for pending in &self.refs {
            if !self.ids.contains(&pending.value) {
                issues.push(
                    ValidationIssue::new(
                        ErrorCode::IdRefNotFound,
                        format!("IDREF '{}' does not match any ID", pending.value),
                    )
                    .with_path(pending.path.as_str())
                    .with_position(pending.line, pending.column)
                    .with_actual(pending.value.as_str()),
                );
            }
        }
    }

    /// Forget the document's values, dropping sets larger than `max_entries`
    pub fn reset(&mut self, max_entries: usize) {
        self.ids.clear();
        self.refs.clear();
        self.entities.clear();
        if self.ids.capacity() > max_entries {
            self.ids = HashSet::new();
        }
        if self.refs.capacity() > max_entries {
            self.refs = Vec::new();
        }
    }
}
