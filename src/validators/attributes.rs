//! XSD attribute validators
//!
//! This module checks the attributes of one element against the attribute
//! uses and the attribute wildcard of its complex type:
//! - declared uses are matched by name and their values validated
//! - undeclared names go through the wildcard and its process contents
//! - missing required uses are reported, absent defaults are supplied
//! - at most one attribute may be typed as `xs:ID`
//!
//! The checker keeps the canonical key of every attribute value it accepts,
//! defaults included, for the identity-constraint engine.

use std::fmt::Write as _;
use std::ops::Range;

use crate::namespaces::NamespaceResolver;
use crate::schema::{AttributeDecl, AttributeUseKind, CompiledSchema, ComplexTypeDef, ValueConstraint};
use crate::symbols::QName;
use crate::validators::builtins::IdClass;
use crate::validators::exceptions::{ErrorCode, ValidationIssue};
use crate::validators::identities::IdentityAttribute;
use crate::validators::ids::IdTracker;
use crate::validators::wildcards::ProcessContents;
use crate::{XMLNS_NAMESPACE, XSI_NAMESPACE};

/// The `xsi:*` attributes every element may carry
const XSI_ATTRIBUTES: [&str; 4] = ["type", "nil", "schemaLocation", "noNamespaceSchemaLocation"];

impl AttributeUseKind {
    /// Get the use as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeUseKind::Optional => "optional",
            AttributeUseKind::Required => "required",
            AttributeUseKind::Prohibited => "prohibited",
        }
    }
}

impl std::fmt::Display for AttributeUseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attribute of the instance, with its name resolved
#[derive(Debug, Clone, Copy)]
pub struct InstanceAttribute<'a> {
    /// Name looked up in the schema (unknown parts are `NONE`)
    pub name: QName,
    /// Namespace URI as written
    pub namespace: &'a str,
    /// Local name as written
    pub local: &'a str,
    /// Value, entity references expanded
    pub value: &'a str,
}

impl InstanceAttribute<'_> {
    /// Whether this is a namespace declaration or one of the `xsi:*`
    /// attributes handled by the element dispatcher
    pub fn is_special(&self) -> bool {
        self.namespace == XMLNS_NAMESPACE
            || (self.namespace.is_empty() && self.local == "xmlns")
            || (self.namespace == XSI_NAMESPACE && XSI_ATTRIBUTES.contains(&self.local))
    }
}

/// Where the attributes being checked live
pub struct AttributeContext<'a> {
    /// Schema
    pub schema: &'a CompiledSchema,
    /// In-scope namespaces of the element
    pub resolver: &'a dyn NamespaceResolver,
    /// Document ID state
    pub ids: &'a mut IdTracker,
    /// Path of the element
    pub path: &'a str,
    /// Line of the start tag
    pub line: u32,
    /// Column of the start tag
    pub column: u32,
    /// Findings
    pub issues: &'a mut Vec<ValidationIssue>,
}

impl AttributeContext<'_> {
    fn attribute_path(&self, namespace: &str, local: &str) -> String {
        let mut path = String::with_capacity(self.path.len() + local.len() + 2);
        path.push_str(self.path);
        path.push_str("/@");
        if !namespace.is_empty() {
            let _ = write!(path, "{{{}}}", namespace);
        }
        path.push_str(local);
        path
    }

    fn report(&mut self, issue: ValidationIssue, namespace: &str, local: &str) {
        let path = self.attribute_path(namespace, local);
        self.issues
            .push(issue.with_path(path).with_position(self.line, self.column));
    }
}

/// Reusable attribute checker of a session
#[derive(Debug, Default)]
pub struct AttributeChecker {
    checked: Vec<IdentityAttribute>,
    keys: Vec<u8>,
    seen: Vec<bool>,
}

impl AttributeChecker {
    /// Create an empty checker
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes of the last checked element as seen by identity fields,
    /// supplied defaults included
    pub fn identity_attributes(&self) -> &[IdentityAttribute] {
        &self.checked
    }

    /// Key buffer the ranges of [`Self::identity_attributes`] point into
    pub fn keys(&self) -> &[u8] {
        &self.keys
    }

    /// Forget the last element; buffers above `max_bytes` are released
    pub fn reset(&mut self, max_bytes: usize) {
        self.checked.clear();
        self.keys.clear();
        self.seen.clear();
        if self.keys.capacity() > max_bytes {
            self.keys = Vec::new();
        }
    }

    /// Record the attributes of an element that is not validated, so that
    /// identity fields can still read them as untyped strings
    pub fn record_untyped(&mut self, attributes: &[InstanceAttribute<'_>]) {
        self.checked.clear();
        self.keys.clear();
        for attr in attributes.iter().filter(|a| !a.is_special()) {
            let key = untyped_key(&mut self.keys, attr.value);
            self.checked.push(IdentityAttribute {
                name: attr.name,
                key: Some(key),
            });
        }
    }

    /// Check `attributes` against the uses and wildcard of `complex`; a
    /// simple type (`None`) admits no attribute besides the special ones
    pub fn check(
        &mut self,
        ctx: &mut AttributeContext<'_>,
        complex: Option<&ComplexTypeDef>,
        attributes: &[InstanceAttribute<'_>],
    ) {
        self.checked.clear();
        self.keys.clear();
        let schema = ctx.schema;
        let resolver = ctx.resolver;
        let uses = complex.map(|c| schema.attribute_uses(c)).unwrap_or(&[]);
        self.seen.clear();
        self.seen.resize(uses.len(), false);
        let mut id_count = 0usize;

        for attr in attributes {
            if attr.is_special() {
                continue;
            }
            let declared = if attr.name.is_known() {
                uses.iter()
                    .position(|u| u.use_kind != AttributeUseKind::Prohibited && schema.attribute(u.decl).name == attr.name)
            } else {
                None
            };

            let key = match declared {
                Some(index) => {
                    self.seen[index] = true;
                    let use_ = &uses[index];
                    let decl = schema.attribute(use_.decl);
                    let constraint = use_.value_constraint.as_ref().or(decl.value_constraint.as_ref());
                    self.validate(ctx, decl, constraint, attr.namespace, attr.local, attr.value, resolver, &mut id_count)
                }
                None => {
                    let wildcard = complex
                        .and_then(|c| c.any_attribute.get())
                        .map(|w| schema.wildcard(w))
                        .filter(|w| w.matches(attr.name.ns));
                    let Some(wildcard) = wildcard else {
                        ctx.report(
                            ValidationIssue::new(
                                ErrorCode::AttributeNotDeclared,
                                format!("attribute '{}' is not allowed here", display(attr.namespace, attr.local)),
                            ),
                            attr.namespace,
                            attr.local,
                        );
                        continue;
                    };
                    let global = if attr.name.is_known() { schema.global_attribute(attr.name) } else { None };
                    match (wildcard.process_contents, global) {
                        (ProcessContents::Skip, _) | (ProcessContents::Lax, None) => {
                            Some(untyped_key(&mut self.keys, attr.value))
                        }
                        (_, Some(global)) => {
                            let decl = schema.attribute(global);
                            self.validate(
                                ctx,
                                decl,
                                decl.value_constraint.as_ref(),
                                attr.namespace,
                                attr.local,
                                attr.value,
                                resolver,
                                &mut id_count,
                            )
                        }
                        (ProcessContents::Strict, None) => {
                            ctx.report(
                                ValidationIssue::new(
                                    ErrorCode::WildcardNotDeclared,
                                    format!(
                                        "no global declaration for attribute '{}' matched by a strict wildcard",
                                        display(attr.namespace, attr.local)
                                    ),
                                ),
                                attr.namespace,
                                attr.local,
                            );
                            None
                        }
                    }
                }
            };
            self.checked.push(IdentityAttribute { name: attr.name, key });
        }

        for (index, use_) in uses.iter().enumerate() {
            if self.seen[index] {
                continue;
            }
            let decl = schema.attribute(use_.decl);
            let namespace = schema.namespace_uri(decl.name.ns);
            let local = schema.symbols.name(decl.name.local);
            match use_.use_kind {
                AttributeUseKind::Required => ctx.report(
                    ValidationIssue::new(
                        ErrorCode::RequiredAttributeMissing,
                        format!("missing required attribute '{}'", display(namespace, local)),
                    ),
                    namespace,
                    local,
                ),
                AttributeUseKind::Prohibited => {}
                AttributeUseKind::Optional => {
                    let Some(constraint) = use_.value_constraint.as_ref().or(decl.value_constraint.as_ref()) else {
                        continue;
                    };
                    let key = self.validate(
                        ctx,
                        decl,
                        Some(constraint),
                        namespace,
                        local,
                        &constraint.lexical,
                        schema.ns_context(constraint.ns_context),
                        &mut id_count,
                    );
                    self.checked.push(IdentityAttribute { name: decl.name, key });
                }
            }
        }

        if id_count > 1 {
            ctx.issues.push(
                ValidationIssue::new(
                    ErrorCode::MultipleIdAttr,
                    format!("element has {} attributes of type ID", id_count),
                )
                .with_path(ctx.path)
                .with_position(ctx.line, ctx.column),
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn validate(
        &mut self,
        ctx: &mut AttributeContext<'_>,
        decl: &AttributeDecl,
        constraint: Option<&ValueConstraint>,
        namespace: &str,
        local: &str,
        value: &str,
        resolver: &dyn NamespaceResolver,
        id_count: &mut usize,
    ) -> Option<Range<usize>> {
        let schema = ctx.schema;
        let vid = schema.type_def(decl.type_id).validator;
        if vid.is_none() {
            return Some(untyped_key(&mut self.keys, value));
        }
        let start = self.keys.len();
        let outcome = match schema.validate_simple(vid, value, resolver, &mut self.keys) {
            Ok(outcome) => outcome,
            Err(err) => {
                let issue = err.into_issue();
                let message = format!("attribute '{}': {}", display(namespace, local), issue.message);
                ctx.report(ValidationIssue { message, ..issue }, namespace, local);
                return None;
            }
        };
        if outcome.id_class == IdClass::Id {
            *id_count += 1;
        }
        if outcome.id_class != IdClass::None {
            let path = ctx.attribute_path(namespace, local);
            if let Some(issue) = ctx.ids.track(outcome.id_class, &outcome.normalized, &path, ctx.line, ctx.column) {
                ctx.issues.push(issue);
            }
        }
        if let Some(fixed) = constraint.filter(|c| c.is_fixed()) {
            let expected = schema.canonical_key(vid, &fixed.lexical, schema.ns_context(fixed.ns_context));
            if expected.as_deref().ok() != Some(&self.keys[start..]) {
                ctx.report(
                    ValidationIssue::new(
                        ErrorCode::AttributeFixedValue,
                        format!(
                            "attribute '{}' has value '{}' but is fixed to '{}'",
                            display(namespace, local),
                            outcome.normalized,
                            fixed.lexical
                        ),
                    )
                    .with_actual(outcome.normalized.as_ref())
                    .with_expected(vec![fixed.lexical.clone()]),
                    namespace,
                    local,
                );
            }
        }
        Some(start..self.keys.len())
    }
}

pub(crate) fn untyped_key(keys: &mut Vec<u8>, value: &str) -> Range<usize> {
    let start = keys.len();
    keys.push(b's');
    keys.extend_from_slice(value.as_bytes());
    start..keys.len()
}

fn display(namespace: &str, local: &str) -> String {
    if namespace.is_empty() {
        local.to_string()
    } else {
        format!("{{{}}}{}", namespace, local)
    }
}
