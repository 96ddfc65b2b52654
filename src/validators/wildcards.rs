//! XSD Wildcard validators
//!
//! This module implements wildcards for XSD element and attribute content:
//! - xs:any - allows any element from specified namespaces
//! - xs:anyAttribute - allows any attribute from specified namespaces
//!
//! Namespaces are held as interned [`NamespaceId`]s, so runtime matching is a
//! set probe on integers. The set algebra (subset, union, intersection) is
//! used by the schema builder when attribute wildcards are inherited or
//! restricted.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#Wildcards

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::symbols::{NamespaceId, NamespaceTable};

/// Process contents mode for wildcards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessContents {
    /// Validate strictly - element/attribute must be declared
    #[default]
    Strict,
    /// Validate if declaration found, otherwise accept
    Lax,
    /// Skip validation entirely
    Skip,
}

impl FromStr for ProcessContents {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "skip" => Ok(Self::Skip),
            _ => Err(ParseError::new(format!("wrong value '{}' for 'processContents'", s))),
        }
    }
}

impl ProcessContents {
    /// Check if this is a valid restriction of another process contents
    pub fn is_restriction_of(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            // strict restricts everything
            (Self::Strict, _) => true,
            (Self::Lax, Self::Skip) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ProcessContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lax => write!(f, "lax"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Namespace constraint for wildcards
///
/// `Not(S)` never admits the empty namespace, whether or not `S` lists it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceConstraint {
    /// Any namespace is allowed (##any)
    #[default]
    Any,
    /// Any namespace outside the set, and never the empty one (##other)
    Not(BTreeSet<NamespaceId>),
    /// Specific set of allowed namespaces
    Enum(BTreeSet<NamespaceId>),
}

impl NamespaceConstraint {
    /// Create from a `namespace` attribute value
    pub fn from_namespace_attr(
        value: &str,
        target_namespace: NamespaceId,
        namespaces: &mut NamespaceTable,
    ) -> Result<Self, ParseError> {
        let target = if target_namespace.is_none() { NamespaceId::EMPTY } else { target_namespace };
        match value.trim() {
            "##any" => Ok(Self::Any),
            "##other" => Ok(Self::Not([target, NamespaceId::EMPTY].into_iter().collect())),
            value => {
                let mut set = BTreeSet::new();
                for ns in value.split_whitespace() {
                    match ns {
                        "##local" => {
                            set.insert(NamespaceId::EMPTY);
                        }
                        "##targetNamespace" => {
                            set.insert(target);
                        }
                        s if s.starts_with("##") => {
                            return Err(ParseError::new(format!(
                                "wrong value '{}' in 'namespace' attribute",
                                s
                            )));
                        }
                        uri => {
                            set.insert(namespaces.intern(uri));
                        }
                    }
                }
                Ok(Self::Enum(set))
            }
        }
    }

    /// Check if a namespace is allowed by this constraint
    pub fn matches(&self, ns: NamespaceId) -> bool {
        match self {
            Self::Any => true,
            Self::Not(set) => ns != NamespaceId::EMPTY && !set.contains(&ns),
            Self::Enum(set) => set.contains(&ns),
        }
    }

    /// The namespaces a `Not` constraint excludes, the empty one included
    fn excluded(set: &BTreeSet<NamespaceId>) -> BTreeSet<NamespaceId> {
        let mut out = set.clone();
        out.insert(NamespaceId::EMPTY);
        out
    }

    /// Whether every namespace admitted by `self` is admitted by `other`
    pub fn is_subset(&self, other: &Self) -> bool {
        match (self, other) {
            (_, Self::Any) => true,
            (Self::Any, _) => false,
            (Self::Enum(a), Self::Enum(b)) => a.is_subset(b),
            (Self::Enum(a), Self::Not(b)) => a.is_disjoint(&Self::excluded(b)),
            (Self::Not(_), Self::Enum(_)) => false,
            (Self::Not(a), Self::Not(b)) => Self::excluded(b).is_subset(&Self::excluded(a)),
        }
    }

    /// Union, as used when a type extends its base's attribute wildcard
    pub fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Any, _) | (_, Self::Any) => Self::Any,
            (Self::Enum(a), Self::Enum(b)) => Self::Enum(a.union(b).copied().collect()),
            (Self::Not(a), Self::Not(b)) => Self::Not(
                Self::excluded(a)
                    .intersection(&Self::excluded(b))
                    .copied()
                    .filter(|ns| *ns != NamespaceId::EMPTY)
                    .collect(),
            ),
            (Self::Enum(set), Self::Not(not)) | (Self::Not(not), Self::Enum(set)) => {
                // the empty namespace cannot be admitted under Not
                if set.contains(&NamespaceId::EMPTY) {
                    return Self::Any;
                }
                Self::Not(not.difference(set).copied().collect())
            }
        }
    }

    /// Intersection, as used when attribute wildcards are combined
    pub fn intersection(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Any, x) | (x, Self::Any) => x.clone(),
            (Self::Enum(a), Self::Enum(b)) => Self::Enum(a.intersection(b).copied().collect()),
            (Self::Enum(set), Self::Not(not)) | (Self::Not(not), Self::Enum(set)) => {
                let excluded = Self::excluded(not);
                Self::Enum(set.difference(&excluded).copied().collect())
            }
            (Self::Not(a), Self::Not(b)) => Self::Not(a.union(b).copied().collect()),
        }
    }
}

/// An element or attribute wildcard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wildcard {
    /// Namespace constraint
    pub constraint: NamespaceConstraint,
    /// Process contents mode
    pub process_contents: ProcessContents,
    /// Target namespace of the owning schema
    pub target_namespace: NamespaceId,
}

impl Wildcard {
    /// Create a wildcard
    pub fn new(
        constraint: NamespaceConstraint,
        process_contents: ProcessContents,
        target_namespace: NamespaceId,
    ) -> Self {
        Self {
            constraint,
            process_contents,
            target_namespace,
        }
    }

    /// Whether a name in namespace `ns` is admitted
    pub fn matches(&self, ns: NamespaceId) -> bool {
        self.constraint.matches(ns)
    }

    /// Check if this wildcard is a valid restriction of another
    pub fn is_restriction_of(&self, other: &Wildcard) -> bool {
        self.process_contents.is_restriction_of(&other.process_contents)
            && self.constraint.is_subset(&other.constraint)
    }

    /// Wildcard admitting the union of both namespace sets; the process
    /// contents of `self` is kept
    pub fn union(&self, other: &Wildcard) -> Wildcard {
        Wildcard {
            constraint: self.constraint.union(&other.constraint),
            ..self.clone()
        }
    }

    /// Wildcard admitting the intersection of both namespace sets; the
    /// process contents of `self` is kept
    pub fn intersection(&self, other: &Wildcard) -> Wildcard {
        Wildcard {
            constraint: self.constraint.intersection(&other.constraint),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (NamespaceTable, NamespaceId, NamespaceId) {
        let mut table = NamespaceTable::new();
        let t = table.intern("t");
        let o = table.intern("o");
        (table, t, o)
    }

    #[test]
    fn test_process_contents_parse() {
        assert_eq!("lax".parse::<ProcessContents>().unwrap(), ProcessContents::Lax);
        assert!("loose".parse::<ProcessContents>().is_err());
        assert!(ProcessContents::Strict.is_restriction_of(&ProcessContents::Skip));
        assert!(!ProcessContents::Skip.is_restriction_of(&ProcessContents::Lax));
    }

    #[test]
    fn test_any_accepts_everything() {
        let (mut table, t, _) = setup();
        let any = NamespaceConstraint::from_namespace_attr("##any", t, &mut table).unwrap();
        assert!(any.matches(NamespaceId::EMPTY));
        assert!(any.matches(t));
        assert!(any.matches(NamespaceId::NONE));
    }

    #[test]
    fn test_other_rejects_target_and_empty() {
        let (mut table, t, o) = setup();
        let other = NamespaceConstraint::from_namespace_attr("##other", t, &mut table).unwrap();
        assert!(!other.matches(t));
        assert!(!other.matches(NamespaceId::EMPTY));
        assert!(other.matches(o));
        // a namespace the schema never mentions
        assert!(other.matches(NamespaceId::NONE));
    }

    #[test]
    fn test_not_without_empty_still_rejects_empty() {
        let (_, t, _) = setup();
        let not = NamespaceConstraint::Not([t].into_iter().collect());
        assert!(!not.matches(NamespaceId::EMPTY));
    }

    #[test]
    fn test_local_and_target() {
        let (mut table, t, o) = setup();
        let local = NamespaceConstraint::from_namespace_attr("##local", t, &mut table).unwrap();
        assert!(local.matches(NamespaceId::EMPTY));
        assert!(!local.matches(t));
        let target = NamespaceConstraint::from_namespace_attr("##targetNamespace o", t, &mut table).unwrap();
        assert!(target.matches(t));
        assert!(target.matches(o));
        assert!(!target.matches(NamespaceId::EMPTY));
        assert!(NamespaceConstraint::from_namespace_attr("##bogus", t, &mut table).is_err());
    }

    #[test]
    fn test_subset() {
        let (_, t, o) = setup();
        let enum_o = NamespaceConstraint::Enum([o].into_iter().collect());
        let enum_to = NamespaceConstraint::Enum([t, o].into_iter().collect());
        let other_t = NamespaceConstraint::Not([t].into_iter().collect());
        assert!(enum_o.is_subset(&enum_to));
        assert!(!enum_to.is_subset(&enum_o));
        assert!(enum_o.is_subset(&other_t));
        assert!(!enum_to.is_subset(&other_t));
        assert!(other_t.is_subset(&NamespaceConstraint::Any));
        assert!(!NamespaceConstraint::Any.is_subset(&other_t));
        let local = NamespaceConstraint::Enum([NamespaceId::EMPTY].into_iter().collect());
        assert!(!local.is_subset(&other_t));
    }

    #[test]
    fn test_union_and_intersection() {
        let (_, t, o) = setup();
        let enum_o = NamespaceConstraint::Enum([o].into_iter().collect());
        let enum_t = NamespaceConstraint::Enum([t].into_iter().collect());
        let other_t = NamespaceConstraint::Not([t].into_iter().collect());

        let union = enum_o.union(&enum_t);
        assert!(union.matches(o) && union.matches(t));
        assert_eq!(enum_t.union(&other_t), NamespaceConstraint::Not(BTreeSet::new()));

        assert_eq!(
            enum_o.intersection(&other_t),
            NamespaceConstraint::Enum([o].into_iter().collect())
        );
        assert_eq!(enum_t.intersection(&other_t), NamespaceConstraint::Enum(BTreeSet::new()));
        assert_eq!(NamespaceConstraint::Any.intersection(&enum_o), enum_o);
    }

    #[test]
    fn test_wildcard_restriction() {
        let (_, t, o) = setup();
        let base = Wildcard::new(NamespaceConstraint::Any, ProcessContents::Lax, t);
        let derived = Wildcard::new(
            NamespaceConstraint::Enum([o].into_iter().collect()),
            ProcessContents::Strict,
            t,
        );
        assert!(derived.is_restriction_of(&base));
        assert!(!base.is_restriction_of(&derived));
    }
}
