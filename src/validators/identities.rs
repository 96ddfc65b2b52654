//! XSD Identity Constraints
//!
//! This module implements identity constraints for XML Schema:
//! - xs:unique - Ensures values are unique within scope
//! - xs:key - Like unique, but all field values must be present
//! - xs:keyref - References a key/unique constraint (foreign key)
//!
//! Selector and field expressions use the restricted XPath subset of
//! XSD 1.0 and are compiled into [`PathProgram`]s when the schema is built.
//! At validation time the [`IdentityEngine`] runs the programs incrementally
//! as elements open: every open element holds the set of path states that
//! reached it, so no subtree is ever buffered.
//!
//! Key tables bubble up from the element that declared the constraint to its
//! ancestors. A keyref is resolved when its scope closes, against the table
//! visible there, or deferred to the nearest open ancestor scope of the
//! referenced key.

use std::ops::Range;

use indexmap::IndexMap;
use log::trace;

use crate::arena::{Arena, ArenaRef};
use crate::error::ParseError;
use crate::names::is_valid_ncname;
use crate::namespaces::{NamespaceContext, NamespaceResolver};
use crate::schema::{CompiledSchema, IcId};
use crate::symbols::{NamespaceId, NamespaceTable, QName, SymbolTable};
use crate::validators::exceptions::{ErrorCode, ValidationIssue};
use crate::validators::values::display_key;

/// Separator between the fields of a key tuple
pub const FIELD_SEPARATOR: u8 = 0x00;

/// Kind of identity constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityConstraintKind {
    /// xs:unique
    Unique,
    /// xs:key
    Key,
    /// xs:keyref
    KeyRef,
}

impl std::fmt::Display for IdentityConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unique => write!(f, "unique"),
            Self::Key => write!(f, "key"),
            Self::KeyRef => write!(f, "keyref"),
        }
    }
}

/// Name test of a path step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameTest {
    /// `name` or `prefix:name`
    Name(QName),
    /// `*`
    Any,
    /// `prefix:*`
    Namespace(NamespaceId),
}

impl NameTest {
    /// Whether a node name passes the test
    pub fn matches(&self, name: QName) -> bool {
        match self {
            NameTest::Name(q) => *q == name,
            NameTest::Any => true,
            NameTest::Namespace(ns) => *ns == name.ns,
        }
    }
}

/// A child step, optionally preceded by the descendant axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStep {
    /// Element name test
    pub test: NameTest,
    /// Whether any number of intermediate elements may precede the match
    pub descend: bool,
}

/// One `|`-separated alternative of a path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathAlternative {
    /// Element steps from the context node
    pub steps: Vec<PathStep>,
    /// Terminal attribute test (fields only)
    pub attribute: Option<NameTest>,
}

/// Compiled selector or field expression
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathProgram {
    /// The source expression
    pub source: String,
    /// Alternatives
    pub alternatives: Vec<PathAlternative>,
}

impl PathProgram {
    /// Parse a selector (`attributes == false`) or field expression.
    ///
    /// Names are interned so that instance names can be matched by id;
    /// unprefixed names are in no namespace.
    pub fn parse(
        xpath: &str,
        attributes: bool,
        ns: &NamespaceContext,
        namespaces: &mut NamespaceTable,
        symbols: &mut SymbolTable,
    ) -> Result<Self, ParseError> {
        let error = |msg: &str| ParseError::new(msg.to_string()).with_source(xpath);
        if xpath.trim().is_empty() {
            return Err(error("empty path expression"));
        }
        let mut alternatives = Vec::new();
        for alternative in xpath.split('|') {
            let segments: Vec<&str> = alternative.trim().split('/').map(str::trim).collect();
            let mut parsed = PathAlternative::default();
            let mut descend = false;
            for (i, segment) in segments.iter().enumerate() {
                if parsed.attribute.is_some() {
                    return Err(error("an attribute step must be the last step"));
                }
                match *segment {
                    "" if i == 0 => return Err(error("absolute paths are not allowed")),
                    "" => {
                        if descend {
                            return Err(error("unexpected '/'"));
                        }
                        descend = true;
                    }
                    "." => {}
                    s if s.starts_with('@') || s.starts_with("attribute::") => {
                        if !attributes {
                            return Err(error("a selector cannot select attributes"));
                        }
                        if descend {
                            return Err(error("'//' cannot precede an attribute step"));
                        }
                        let test = s.strip_prefix('@').or_else(|| s.strip_prefix("attribute::")).unwrap_or(s);
                        parsed.attribute = Some(parse_name_test(test.trim(), ns, namespaces, symbols).map_err(|m| error(&m))?);
                    }
                    s => {
                        let test = s.strip_prefix("child::").unwrap_or(s).trim();
                        let test = parse_name_test(test, ns, namespaces, symbols).map_err(|m| error(&m))?;
                        parsed.steps.push(PathStep { test, descend });
                        descend = false;
                    }
                }
            }
            if descend {
                return Err(error("path cannot end with '/'"));
            }
            alternatives.push(parsed);
        }
        Ok(Self {
            source: xpath.to_string(),
            alternatives,
        })
    }
}

fn parse_name_test(
    test: &str,
    ns: &NamespaceContext,
    namespaces: &mut NamespaceTable,
    symbols: &mut SymbolTable,
) -> Result<NameTest, String> {
    if test == "*" {
        return Ok(NameTest::Any);
    }
    let resolve = |prefix: &str, namespaces: &mut NamespaceTable| {
        ns.resolve_prefix(prefix)
            .map(|uri| namespaces.intern(uri))
            .ok_or_else(|| format!("unknown prefix '{}'", prefix))
    };
    match test.split_once(':') {
        Some((prefix, "*")) if is_valid_ncname(prefix) => Ok(NameTest::Namespace(resolve(prefix, namespaces)?)),
        Some((prefix, local)) if is_valid_ncname(prefix) && is_valid_ncname(local) => {
            let uri = resolve(prefix, namespaces)?;
            Ok(NameTest::Name(QName::new(uri, symbols.intern(local))))
        }
        None if is_valid_ncname(test) => Ok(NameTest::Name(QName::new(NamespaceId::EMPTY, symbols.intern(test)))),
        _ => Err(format!("invalid name test '{}'", test)),
    }
}

/// A compiled identity constraint
#[derive(Debug, Clone)]
pub struct IdentityConstraint {
    /// Name
    pub name: QName,
    /// Kind
    pub kind: IdentityConstraintKind,
    /// Selector
    pub selector: PathProgram,
    /// Fields, in tuple order
    pub fields: Vec<PathProgram>,
    /// Referenced key or unique (keyref only; `NONE` when unresolved)
    pub refer: IcId,
    /// Name given in `refer`, for messages
    pub refer_name: Option<QName>,
}

/// An attribute as seen by field paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityAttribute {
    /// Attribute name
    pub name: QName,
    /// Range of the value's canonical key in the key buffer, `None` when
    /// the value is invalid
    pub key: Option<Range<usize>>,
}

/// The value of an element at its end tag, as seen by field paths
#[derive(Debug, Clone, Copy)]
pub enum ElementValue<'a> {
    /// Simple content with its canonical key
    Simple(&'a [u8]),
    /// Element-only or mixed content
    Complex,
    /// No usable value (nilled, or invalid text)
    Absent,
}

/// Location of the node being processed
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    /// Path of the element
    pub path: &'a str,
    /// Line of its start tag
    pub line: u32,
    /// Column of its start tag
    pub column: u32,
}

#[derive(Debug, Clone)]
struct Origin {
    path: ArenaRef,
    line: u32,
    column: u32,
}

impl Origin {
    fn issue(&self, arena: &Arena, code: ErrorCode, message: String) -> ValidationIssue {
        ValidationIssue::new(code, message)
            .with_path(arena.get_str(&self.path))
            .with_position(self.line, self.column)
    }
}

type KeyTable = IndexMap<Box<[u8]>, Origin>;

#[derive(Debug, Clone)]
struct PendingRef {
    key: Box<[u8]>,
    origin: Origin,
}

#[derive(Debug)]
struct Scope {
    ic: IcId,
    depth: usize,
    table: KeyTable,
    pending: Vec<PendingRef>,
    deferred: Vec<PendingRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Selector(u32),
    Field(u32),
}

#[derive(Debug, Clone, Copy)]
struct PathState {
    owner: Owner,
    alt: u16,
    step: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(u64, u32);

#[derive(Debug, Clone)]
enum FieldValue {
    Unset,
    One(ArenaRef),
    Multiple,
    Invalid,
}

#[derive(Debug, Clone)]
struct FieldSlot {
    ic: IcId,
    field: u16,
    value: FieldValue,
    node: NodeId,
}

#[derive(Debug)]
struct SelectorMatch {
    scope: u32,
    depth: usize,
    field_start: usize,
    origin: Origin,
}

#[derive(Debug, Clone, Copy)]
struct Capture {
    depth: usize,
    slot: usize,
    node: NodeId,
}

/// Incremental identity-constraint evaluation for one document
#[derive(Debug, Default)]
pub struct IdentityEngine {
    scopes: Vec<Scope>,
    states: Vec<PathState>,
    segments: Vec<usize>,
    matches: Vec<SelectorMatch>,
    fields: Vec<FieldSlot>,
    captures: Vec<Capture>,
    frames: Vec<Vec<(IcId, KeyTable)>>,
    table_pool: Vec<KeyTable>,
    tuple: Vec<u8>,
    serial: u64,
}

impl IdentityEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open elements tracked
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Forget all state; tables holding more than `max_entries` entries are
    /// released rather than kept for reuse
    pub fn reset(&mut self, max_entries: usize) {
        for scope in self.scopes.drain(..) {
            recycle(&mut self.table_pool, scope.table, max_entries);
        }
        for frame in self.frames.drain(..) {
            for (_, table) in frame {
                recycle(&mut self.table_pool, table, max_entries);
            }
        }
        self.table_pool.retain(|t| t.capacity() <= max_entries);
        self.states.clear();
        self.segments.clear();
        self.matches.clear();
        self.fields.clear();
        self.captures.clear();
        self.tuple.clear();
        self.serial = 0;
        if self.states.capacity() > max_entries {
            self.states = Vec::new();
        }
    }

    fn alternative<'s>(&self, schema: &'s CompiledSchema, state: PathState) -> &'s PathAlternative {
        let program = match state.owner {
            Owner::Selector(scope) => &schema.identity(self.scopes[scope as usize].ic).selector,
            Owner::Field(slot) => {
                let slot = &self.fields[slot as usize];
                &schema.identity(slot.ic).fields[slot.field as usize]
            }
        };
        &program.alternatives[state.alt as usize]
    }

    /// An element starts. `constraints` are the identity constraints of its
    /// effective declaration and `attributes` its attributes, defaults
    /// included, with their keys stored in `keys`.
    pub fn on_start(
        &mut self,
        schema: &CompiledSchema,
        arena: &mut Arena,
        name: QName,
        constraints: &[IcId],
        attributes: &[IdentityAttribute],
        keys: &[u8],
        ctx: NodeContext<'_>,
    ) {
        self.serial += 1;
        let node = self.serial;
        let depth = self.segments.len() + 1;
        let parent = self.segments.last().copied();
        let start = self.states.len();
        self.segments.push(start);
        self.frames.push(Vec::new());

        if let Some(parent_start) = parent {
            for i in parent_start..start {
                let state = self.states[i];
                let alt = self.alternative(schema, state);
                let Some(step) = alt.steps.get(state.step as usize) else {
                    continue;
                };
                if step.descend {
                    self.states.push(state);
                }
                if step.test.matches(name) {
                    self.states.push(PathState {
                        step: state.step + 1,
                        ..state
                    });
                }
            }
        }

        for ic in constraints {
            let scope = self.scopes.len() as u32;
            self.scopes.push(Scope {
                ic: *ic,
                depth,
                table: self.table_pool.pop().unwrap_or_default(),
                pending: Vec::new(),
                deferred: Vec::new(),
            });
            for alt in 0..schema.identity(*ic).selector.alternatives.len() {
                self.states.push(PathState {
                    owner: Owner::Selector(scope),
                    alt: alt as u16,
                    step: 0,
                });
            }
            trace!(target: "xsd.identity", "scope of '{}' opened at {}", schema.display_qname(schema.identity(*ic).name), ctx.path);
        }

        let mut i = start;
        while i < self.states.len() {
            let state = self.states[i];
            i += 1;
            let alt = self.alternative(schema, state);
            if (state.step as usize) < alt.steps.len() {
                continue;
            }
            match state.owner {
                Owner::Selector(scope) => {
                    if self.matches.iter().rev().take_while(|m| m.depth == depth).any(|m| m.scope == scope) {
                        continue;
                    }
                    let ic = self.scopes[scope as usize].ic;
                    let field_start = self.fields.len();
                    let origin = Origin {
                        path: arena.alloc_str(ctx.path),
                        line: ctx.line,
                        column: ctx.column,
                    };
                    self.matches.push(SelectorMatch {
                        scope,
                        depth,
                        field_start,
                        origin,
                    });
                    for (f, field) in schema.identity(ic).fields.iter().enumerate() {
                        let slot = self.fields.len() as u32;
                        self.fields.push(FieldSlot {
                            ic,
                            field: f as u16,
                            value: FieldValue::Unset,
                            node: NodeId(0, 0),
                        });
                        for alt in 0..field.alternatives.len() {
                            self.states.push(PathState {
                                owner: Owner::Field(slot),
                                alt: alt as u16,
                                step: 0,
                            });
                        }
                    }
                }
                Owner::Field(slot) => match alt.attribute {
                    Some(test) => {
                        for (index, attribute) in attributes.iter().enumerate() {
                            if test.matches(attribute.name) {
                                let key = attribute.key.clone().and_then(|r| keys.get(r));
                                self.set_field(arena, slot as usize, key, NodeId(node, index as u32 + 1));
                            }
                        }
                    }
                    None => self.captures.push(Capture {
                        depth,
                        slot: slot as usize,
                        node: NodeId(node, 0),
                    }),
                },
            }
        }
    }

    fn set_field(&mut self, arena: &mut Arena, slot: usize, key: Option<&[u8]>, node: NodeId) {
        let slot = &mut self.fields[slot];
        slot.value = match std::mem::replace(&mut slot.value, FieldValue::Unset) {
            FieldValue::Unset => match key {
                Some(key) => {
                    slot.node = node;
                    FieldValue::One(arena.alloc(key))
                }
                None => FieldValue::Unset,
            },
            FieldValue::One(r) if slot.node == node => FieldValue::One(r),
            FieldValue::One(_) | FieldValue::Multiple => FieldValue::Multiple,
            FieldValue::Invalid => FieldValue::Invalid,
        };
    }

    /// The innermost open element ends with `value`; completed tuples and
    /// closed scopes report into `issues`
    pub fn on_end(
        &mut self,
        schema: &CompiledSchema,
        arena: &mut Arena,
        value: ElementValue<'_>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let depth = self.segments.len();
        if depth == 0 {
            return;
        }

        while let Some(capture) = self.captures.last().copied() {
            if capture.depth != depth {
                break;
            }
            self.captures.pop();
            match value {
                ElementValue::Simple(key) => self.set_field(arena, capture.slot, Some(key), capture.node),
                ElementValue::Complex => self.fields[capture.slot].value = FieldValue::Invalid,
                ElementValue::Absent => {}
            }
        }

        while self.matches.last().map_or(false, |m| m.depth == depth) {
            if let Some(m) = self.matches.pop() {
                self.finish_match(schema, arena, &m, issues);
                self.fields.truncate(m.field_start);
            }
        }

        self.close_scopes(schema, arena, depth, issues);

        if let Some(start) = self.segments.pop() {
            self.states.truncate(start);
        }
    }

    fn finish_match(&mut self, schema: &CompiledSchema, arena: &Arena, m: &SelectorMatch, issues: &mut Vec<ValidationIssue>) {
        let scope = &self.scopes[m.scope as usize];
        let ic = schema.identity(scope.ic);
        let ic_name = schema.display_qname(ic.name);
        self.tuple.clear();
        let mut absent = None;
        for (f, slot) in self.fields[m.field_start..].iter().enumerate() {
            match &slot.value {
                FieldValue::One(r) => {
                    if f > 0 {
                        self.tuple.push(FIELD_SEPARATOR);
                    }
                    self.tuple.extend_from_slice(arena.get(r));
                }
                FieldValue::Unset => {
                    absent.get_or_insert(f + 1);
                }
                FieldValue::Multiple => {
                    issues.push(m.origin.issue(
                        arena,
                        ErrorCode::IdentityAbsent,
                        format!("{} '{}': field {} selects more than one node", ic.kind, ic_name, f + 1),
                    ));
                    return;
                }
                FieldValue::Invalid => {
                    issues.push(m.origin.issue(
                        arena,
                        ErrorCode::IdentityAbsent,
                        format!(
                            "{} '{}': field {} selects an element that does not have simple content",
                            ic.kind,
                            ic_name,
                            f + 1
                        ),
                    ));
                    return;
                }
            }
        }
        if let Some(field) = absent {
            if ic.kind == IdentityConstraintKind::Key {
                issues.push(m.origin.issue(
                    arena,
                    ErrorCode::IdentityAbsent,
                    format!("key '{}': missing value for field {}", ic_name, field),
                ));
            }
            return;
        }
        let key: Box<[u8]> = self.tuple.as_slice().into();
        let scope = &mut self.scopes[m.scope as usize];
        match ic.kind {
            IdentityConstraintKind::Key | IdentityConstraintKind::Unique => {
                if let Some(first) = scope.table.get(&key) {
                    issues.push(m.origin.issue(
                        arena,
                        ErrorCode::IdentityDuplicate,
                        format!(
                            "duplicate value {} for {} '{}' (first seen at {})",
                            display_key(&key),
                            ic.kind,
                            ic_name,
                            arena.get_str(&first.path)
                        ),
                    ));
                } else {
                    scope.table.insert(key, m.origin.clone());
                }
            }
            IdentityConstraintKind::KeyRef => scope.pending.push(PendingRef {
                key,
                origin: m.origin.clone(),
            }),
        }
    }

    fn close_scopes(&mut self, schema: &CompiledSchema, arena: &Arena, depth: usize, issues: &mut Vec<ValidationIssue>) {
        let mut visible = self.frames.pop().unwrap_or_default();
        let first = self
            .scopes
            .iter()
            .rposition(|s| s.depth != depth)
            .map_or(0, |i| i + 1);
        if first == self.scopes.len() && visible.is_empty() {
            return;
        }

        for scope in &mut self.scopes[first..] {
            if schema.identity(scope.ic).kind != IdentityConstraintKind::KeyRef {
                let table = std::mem::take(&mut scope.table);
                merge_table(&mut visible, scope.ic, table, &mut self.table_pool);
            }
        }

        for idx in first..self.scopes.len() {
            let ic = schema.identity(self.scopes[idx].ic);
            if ic.kind != IdentityConstraintKind::KeyRef {
                continue;
            }
            let pending = std::mem::take(&mut self.scopes[idx].pending);
            if pending.is_empty() {
                continue;
            }
            let ic_name = schema.display_qname(ic.name);
            if ic.refer.is_none() {
                let refer = ic
                    .refer_name
                    .map(|n| schema.display_qname(n).to_string())
                    .unwrap_or_default();
                for p in pending {
                    issues.push(p.origin.issue(
                        arena,
                        ErrorCode::IdentityKeyRefFailed,
                        format!("keyref '{}' refers to an undefined key '{}'", ic_name, refer),
                    ));
                }
                continue;
            }
            if let Some((_, table)) = visible.iter().find(|(id, _)| *id == ic.refer) {
                resolve_refs(schema, arena, ic, table, pending, issues);
            } else if let Some(ancestor) = self.scopes[..first].iter_mut().rev().find(|s| s.ic == ic.refer) {
                trace!(target: "xsd.identity", "keyref '{}' deferred to an enclosing scope", ic_name);
                ancestor.deferred.extend(pending);
            } else {
                resolve_refs(schema, arena, ic, &KeyTable::new(), pending, issues);
            }
        }

        for idx in first..self.scopes.len() {
            let deferred = std::mem::take(&mut self.scopes[idx].deferred);
            if deferred.is_empty() {
                continue;
            }
            let ic_id = self.scopes[idx].ic;
            let empty = KeyTable::new();
            let table = visible.iter().find(|(id, _)| *id == ic_id).map_or(&empty, |(_, t)| t);
            // deferred entries belong to keyrefs, whose constraint reports them
            for p in deferred {
                if !table.contains_key(&p.key) {
                    issues.push(p.origin.issue(
                        arena,
                        ErrorCode::IdentityKeyRefFailed,
                        format!(
                            "no matching value for {} in '{}'",
                            display_key(&p.key),
                            schema.display_qname(schema.identity(ic_id).name)
                        ),
                    ));
                }
            }
        }

        for scope in self.scopes.drain(first..) {
            recycle(&mut self.table_pool, scope.table, usize::MAX);
        }

        match self.frames.last_mut() {
            Some(parent) => {
                for (ic, table) in visible {
                    merge_table(parent, ic, table, &mut self.table_pool);
                }
            }
            None => {
                for (_, table) in visible {
                    recycle(&mut self.table_pool, table, usize::MAX);
                }
            }
        }
    }
}

fn resolve_refs(
    schema: &CompiledSchema,
    arena: &Arena,
    ic: &IdentityConstraint,
    table: &KeyTable,
    pending: Vec<PendingRef>,
    issues: &mut Vec<ValidationIssue>,
) {
    for p in pending {
        if !table.contains_key(&p.key) {
            issues.push(p.origin.issue(
                arena,
                ErrorCode::IdentityKeyRefFailed,
                format!(
                    "keyref '{}': no matching value for {} in '{}'",
                    schema.display_qname(ic.name),
                    display_key(&p.key),
                    schema.display_qname(schema.identity(ic.refer).name)
                ),
            ));
        }
    }
}

fn merge_table(tables: &mut Vec<(IcId, KeyTable)>, ic: IcId, table: KeyTable, pool: &mut Vec<KeyTable>) {
    match tables.iter_mut().find(|(id, _)| *id == ic) {
        Some((_, existing)) => {
            if existing.is_empty() {
                let old = std::mem::replace(existing, table);
                recycle(pool, old, usize::MAX);
            } else {
                let mut table = table;
                for (key, origin) in table.drain(..) {
                    existing.entry(key).or_insert(origin);
                }
                recycle(pool, table, usize::MAX);
            }
        }
        None => tables.push((ic, table)),
    }
}

fn recycle(pool: &mut Vec<KeyTable>, mut table: KeyTable, max_entries: usize) {
    if table.capacity() <= max_entries {
        table.clear();
        pool.push(table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xpath: &str, attributes: bool) -> Result<PathProgram, ParseError> {
        let ns = NamespaceContext::new().with_prefix("p", "urn:p");
        PathProgram::parse(xpath, attributes, &ns, &mut NamespaceTable::new(), &mut SymbolTable::new())
    }

    #[test]
    fn test_parse_selector() {
        let program = parse(".//item | child::a/p:b", false).unwrap();
        assert_eq!(program.alternatives.len(), 2);
        assert_eq!(program.alternatives[0].steps.len(), 1);
        assert!(program.alternatives[0].steps[0].descend);
        assert_eq!(program.alternatives[1].steps.len(), 2);
        assert!(!program.alternatives[1].steps[1].descend);
    }

    #[test]
    fn test_parse_field() {
        let program = parse("@id", true).unwrap();
        assert!(program.alternatives[0].steps.is_empty());
        assert_eq!(program.alternatives[0].attribute.map(|t| t == NameTest::Any), Some(false));
        let program = parse("a/@p:*", true).unwrap();
        assert!(matches!(program.alternatives[0].attribute, Some(NameTest::Namespace(_))));
        let program = parse(".", true).unwrap();
        assert_eq!(program.alternatives[0], PathAlternative::default());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("", false).is_err());
        assert!(parse("/a", false).is_err());
        assert!(parse("a/", false).is_err());
        assert!(parse("@id", false).is_err());
        assert!(parse("@id/a", true).is_err());
        assert!(parse("q:a", false).is_err());
        assert!(parse("a[1]", false).is_err());
    }

    #[test]
    fn test_name_tests() {
        let a = QName::new(NamespaceId::EMPTY, crate::symbols::SymbolId::from_index(0));
        assert!(NameTest::Any.matches(a));
        assert!(NameTest::Name(a).matches(a));
        assert!(NameTest::Namespace(NamespaceId::EMPTY).matches(a));
        assert!(!NameTest::Namespace(NamespaceId::NONE).matches(a));
    }
}
