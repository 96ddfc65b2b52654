//! XSD Element Validators
//!
//! The element dispatcher decides which declaration and which type govern an
//! element once its parent's content model has admitted it: substitution-group
//! members replace the expected declaration, `xsi:type` retargets the type and
//! `xsi:nil` switches the content check off. When no meaningful validation is
//! possible the subtree is skipped.
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#Element_Declarations

use crate::names::is_valid_qname;
use crate::namespaces::NamespaceResolver;
use crate::schema::{CompiledSchema, ElemId, TypeId, XsiTypeProblem};
use crate::symbols::QName;
use crate::validators::attributes::InstanceAttribute;
use crate::validators::exceptions::{ErrorCode, ValidationIssue};
use crate::validators::wildcards::ProcessContents;
use crate::XSI_NAMESPACE;

/// What admitted the element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementSlot {
    /// The document element, matched against the global declarations
    Root,
    /// An element particle; the declaration the content model expects
    Declared(ElemId),
    /// A wildcard particle, or the lax content of `anyType`
    Wildcard(ProcessContents),
}

/// The `xsi:type` and `xsi:nil` attributes of a start tag
#[derive(Debug, Clone, Copy, Default)]
pub struct XsiAttributes<'a> {
    /// `xsi:type` as written
    pub type_name: Option<&'a str>,
    /// `xsi:nil` as written
    pub nil: Option<&'a str>,
}

impl<'a> XsiAttributes<'a> {
    /// Pick the `xsi:type` and `xsi:nil` attributes out of a start tag
    pub fn from_attributes(attributes: &[InstanceAttribute<'a>]) -> Self {
        let mut xsi = Self::default();
        for attr in attributes.iter().filter(|a| a.namespace == XSI_NAMESPACE) {
            match attr.local {
                "type" => xsi.type_name = Some(attr.value),
                "nil" => xsi.nil = Some(attr.value),
                _ => {}
            }
        }
        xsi
    }
}

/// Declaration and type the element is validated with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementTarget {
    /// Effective declaration (`NONE` for a lax or `xsi:type`-only match)
    pub decl: ElemId,
    /// Effective type
    pub type_id: TypeId,
    /// Whether `xsi:nil="true"` was accepted
    pub nilled: bool,
}

/// Outcome of dispatching a start tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Validate the element with this target
    Validate(ElementTarget),
    /// Do not validate the element or anything below it
    Skip,
}

/// Where the element being dispatched lives
pub struct DispatchContext<'a> {
    /// Schema
    pub schema: &'a CompiledSchema,
    /// In-scope namespaces, the element's own declarations included
    pub resolver: &'a dyn NamespaceResolver,
    /// Path of the element
    pub path: &'a str,
    /// Line of the start tag
    pub line: u32,
    /// Column of the start tag
    pub column: u32,
    /// Findings
    pub issues: &'a mut Vec<ValidationIssue>,
}

impl DispatchContext<'_> {
    fn report(&mut self, code: ErrorCode, message: String) {
        self.issues.push(
            ValidationIssue::new(code, message)
                .with_path(self.path)
                .with_position(self.line, self.column),
        );
    }
}

/// Resolve the declaration and type of an element named `name`
///
/// `display` is the instance name rendered for messages.
pub fn dispatch(
    ctx: &mut DispatchContext<'_>,
    slot: ElementSlot,
    name: QName,
    display: &str,
    xsi: &XsiAttributes<'_>,
) -> Dispatch {
    let schema = ctx.schema;
    let global = if name.is_known() { schema.global_element(name) } else { None };

    let decl = match slot {
        ElementSlot::Root => match global {
            Some(decl) => Some(decl),
            None => {
                ctx.report(
                    ErrorCode::ValidateRootNotDeclared,
                    format!("no global declaration for the document element '{}'", display),
                );
                return Dispatch::Skip;
            }
        },
        ElementSlot::Declared(expected) => {
            if schema.element(expected).name == name {
                Some(expected)
            } else {
                match global.filter(|member| schema.substitution_allowed(expected, *member)) {
                    Some(member) => Some(member),
                    None => {
                        ctx.report(
                            ErrorCode::UnexpectedElement,
                            format!(
                                "element '{}' cannot substitute for '{}'",
                                display,
                                schema.display_qname(schema.element(expected).name)
                            ),
                        );
                        return Dispatch::Skip;
                    }
                }
            }
        }
        ElementSlot::Wildcard(ProcessContents::Skip) => return Dispatch::Skip,
        ElementSlot::Wildcard(ProcessContents::Lax) => global,
        ElementSlot::Wildcard(ProcessContents::Strict) => {
            if global.is_none() && xsi.type_name.is_none() {
                ctx.report(
                    ErrorCode::ElementNotDeclared,
                    format!("no global declaration for element '{}' matched by a strict wildcard", display),
                );
                return Dispatch::Skip;
            }
            global
        }
    };

    if let Some(decl) = decl {
        if schema.element(decl).is_abstract {
            ctx.report(
                ErrorCode::ElementAbstract,
                format!("element '{}' is abstract and cannot appear in a document", display),
            );
            return Dispatch::Skip;
        }
    }

    let declared = decl.map_or(schema.any_type(), |d| schema.element(d).type_id);
    let type_id = match xsi.type_name {
        Some(lexical) => match resolve_xsi_type(ctx, decl, declared, lexical) {
            Some(type_id) => type_id,
            None => return Dispatch::Skip,
        },
        None => declared,
    };

    if schema.type_def(type_id).is_abstract {
        ctx.report(
            ErrorCode::ElementTypeAbstract,
            format!(
                "type '{}' of element '{}' is abstract",
                schema.type_name(type_id),
                display
            ),
        );
        return Dispatch::Skip;
    }

    let nilled = match xsi.nil.map(str::trim) {
        None | Some("false") | Some("0") => false,
        Some("true") | Some("1") => nil_allowed(ctx, decl, display),
        Some(other) => {
            ctx.report(
                ErrorCode::DatatypeInvalid,
                format!("'{}' is not a valid value of xsi:nil", other),
            );
            false
        }
    };

    Dispatch::Validate(ElementTarget {
        decl: decl.unwrap_or(ElemId::NONE),
        type_id,
        nilled,
    })
}

fn resolve_xsi_type(
    ctx: &mut DispatchContext<'_>,
    decl: Option<ElemId>,
    declared: TypeId,
    lexical: &str,
) -> Option<TypeId> {
    let schema = ctx.schema;
    let resolver = ctx.resolver;
    let lexical = lexical.trim();
    let resolved = if is_valid_qname(lexical) {
        resolver.resolve_qname(lexical).ok()
    } else {
        None
    };
    let Some((namespace, local)) = resolved else {
        ctx.report(
            ErrorCode::XsiTypeInvalid,
            format!("'{}' is not a valid xsi:type value", lexical),
        );
        return None;
    };
    let Some(actual) = schema.global_type(schema.lookup_qname(namespace, local)) else {
        let message = if namespace.is_empty() {
            format!("xsi:type '{}' does not name a type", local)
        } else {
            format!("xsi:type '{{{}}}{}' does not name a type", namespace, local)
        };
        ctx.report(ErrorCode::ValidateXsiTypeUnresolved, message);
        return None;
    };
    match schema.check_xsi_type(decl, declared, actual) {
        Ok(()) => Some(actual),
        Err(problem) => {
            let reason = match problem {
                XsiTypeProblem::NotDerived => "is not derived from".to_string(),
                XsiTypeProblem::Blocked(methods) => format!("is derived by blocked {} from", methods),
            };
            ctx.report(
                ErrorCode::ValidateXsiTypeDerivationBlocked,
                format!(
                    "xsi:type '{}' {} the declared type '{}'",
                    schema.type_name(actual),
                    reason,
                    schema.type_name(declared)
                ),
            );
            None
        }
    }
}

fn nil_allowed(ctx: &mut DispatchContext<'_>, decl: Option<ElemId>, display: &str) -> bool {
    let Some(decl) = decl else {
        ctx.report(
            ErrorCode::ElementNotNillable,
            format!("element '{}' has no declaration and cannot be nilled", display),
        );
        return false;
    };
    let decl = ctx.schema.element(decl);
    if !decl.nillable {
        ctx.report(
            ErrorCode::ValidateXsiNilNotNillable,
            format!("element '{}' is not nillable", display),
        );
        return false;
    }
    if decl.value_constraint.as_ref().map_or(false, |c| c.is_fixed()) {
        ctx.report(
            ErrorCode::ValidateNilledHasFixed,
            format!("element '{}' has a fixed value and cannot be nilled", display),
        );
    }
    true
}
