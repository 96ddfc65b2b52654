//! Compiled schema tables
//!
//! A [`CompiledSchema`] is the immutable, integer-indexed form of a schema
//! that validation sessions read. Every component lives in a flat table and
//! refers to others by dense identifiers, so cyclic component graphs (types
//! whose content models mention elements of the same type) need no pointers.
//! Tables are produced by [`SchemaBuilder`] and shared between sessions
//! behind an `Arc`.

mod builder;
mod compile;

pub use builder::{
    AttributeSpec, AttributeUseSpec, ComplexTypeSpec, ElementSpec, FacetSpec, IdentitySpec,
    SchemaBuilder,
};

use std::collections::HashMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::namespaces::NamespaceContext;
use crate::symbols::{define_id, DisplayQName, NamespaceId, NamespaceTable, QName, SymbolTable};
use crate::validators::facets::EnumTable;
use crate::validators::groups::AllGroup;
use crate::validators::identities::IdentityConstraint;
use crate::validators::models::ContentModel;
use crate::validators::patterns::CompiledPattern;
use crate::validators::simple_types::ValidatorDef;
use crate::validators::wildcards::Wildcard;

define_id!(
    /// Type definition
    TypeId
);
define_id!(
    /// Complex type details of a type
    ComplexTypeId
);
define_id!(
    /// Element declaration
    ElemId
);
define_id!(
    /// Attribute declaration
    AttrId
);
define_id!(
    /// Element or attribute wildcard
    WildcardId
);
define_id!(
    /// Simple-type validator
    ValidatorId
);
define_id!(
    /// Identity constraint
    IcId
);
define_id!(
    /// Enumeration table
    EnumId
);
define_id!(
    /// Compiled pattern
    PatternId
);
define_id!(
    /// Content-model automaton
    ModelId
);
define_id!(
    /// All-group
    AllGroupId
);
define_id!(
    /// Namespace context snapshot
    NsContextId
);

/// A set of derivation methods, used for `block`, `final` and the
/// accumulated methods along a derivation chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DerivationSet(u8);

impl DerivationSet {
    /// No method
    pub const EMPTY: Self = Self(0);
    /// Derivation by extension
    pub const EXTENSION: Self = Self(1);
    /// Derivation by restriction
    pub const RESTRICTION: Self = Self(2);
    /// Derivation by list
    pub const LIST: Self = Self(4);
    /// Derivation by union
    pub const UNION: Self = Self(8);
    /// Substitution (element `block` only)
    pub const SUBSTITUTION: Self = Self(16);
    /// `#all`
    pub const ALL: Self = Self(31);

    /// Whether every method of `other` is in `self`
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether `self` and `other` share a method
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether no method is set
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parse a `block`/`final` attribute value
    pub fn parse(value: &str) -> Option<Self> {
        let mut set = Self::EMPTY;
        for token in value.split_whitespace() {
            set |= match token {
                "#all" => Self::ALL,
                "extension" => Self::EXTENSION,
                "restriction" => Self::RESTRICTION,
                "list" => Self::LIST,
                "union" => Self::UNION,
                "substitution" => Self::SUBSTITUTION,
                _ => return None,
            };
        }
        Some(set)
    }
}

impl BitOr for DerivationSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DerivationSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<DerivationMethod> for DerivationSet {
    fn from(method: DerivationMethod) -> Self {
        match method {
            DerivationMethod::None => Self::EMPTY,
            DerivationMethod::Extension => Self::EXTENSION,
            DerivationMethod::Restriction => Self::RESTRICTION,
            DerivationMethod::List => Self::LIST,
            DerivationMethod::Union => Self::UNION,
            DerivationMethod::Substitution => Self::SUBSTITUTION,
        }
    }
}

/// How a type was derived from its base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DerivationMethod {
    /// The root of the hierarchy
    #[default]
    None,
    /// By extension
    Extension,
    /// By restriction
    Restriction,
    /// By list
    List,
    /// By union
    Union,
    /// Substitution group membership
    Substitution,
}

/// Kind of a type definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// User-defined simple type
    Simple,
    /// Built-in simple type (or `anyType`)
    Builtin,
    /// Complex type
    Complex,
}

/// A type definition
#[derive(Debug, Clone)]
pub struct TypeDef {
    /// Name, unknown parts for anonymous types
    pub name: QName,
    /// Kind
    pub kind: TypeKind,
    /// Validator for character content (`NONE` for complex without simple content)
    pub validator: ValidatorId,
    /// Base type (`NONE` for `anyType`)
    pub base: TypeId,
    /// Method linking this type to its base
    pub derivation: DerivationMethod,
    /// Methods blocked for substitution through xsi:type
    pub block: DerivationSet,
    /// Methods forbidden for further derivation
    pub final_set: DerivationSet,
    /// Abstract flag
    pub is_abstract: bool,
    /// Ancestors, self first, with the methods accumulated on the way
    pub ancestors: Vec<(TypeId, DerivationSet)>,
    /// Complex details (`NONE` for simple types)
    pub complex: ComplexTypeId,
    /// Member types of a union
    pub union_members: Vec<TypeId>,
}

/// Character and child content of a complex type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// No children, whitespace only
    Empty,
    /// Simple content validated by the type's validator
    SimpleText,
    /// Children only, whitespace between them
    ElementOnly,
    /// Children interleaved with text
    Mixed,
    /// Anything (`anyType`): lax children and attributes, any text
    Any,
}

/// Child-sequence checker of a complex type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentHandle {
    /// No child-sequence checker
    None,
    /// Deterministic automaton
    Automaton(ModelId),
    /// All-group
    All(AllGroupId),
    /// Empty choice: no child is ever accepted
    RejectAll {
        /// minOccurs of the choice
        min_occurs: u32,
    },
}

/// Complex type details
#[derive(Debug, Clone)]
pub struct ComplexTypeDef {
    /// Offset of the first attribute use in the flat use table
    pub attribute_uses_start: u32,
    /// Number of attribute uses
    pub attribute_uses_len: u32,
    /// Attribute wildcard (`NONE` if none)
    pub any_attribute: WildcardId,
    /// Content kind
    pub content: ContentKind,
    /// Child-sequence checker
    pub model: ContentHandle,
    /// Base complex type (`NONE` when the base is simple or `anyType`)
    pub base: ComplexTypeId,
}

/// Whether a value constraint is a default or a fixed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueConstraintKind {
    /// `default="..."`
    Default,
    /// `fixed="..."`
    Fixed,
}

/// A default or fixed value with the namespaces in scope where it was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueConstraint {
    /// Default or fixed
    pub kind: ValueConstraintKind,
    /// Lexical value
    pub lexical: String,
    /// Namespace context snapshot for QName values
    pub ns_context: NsContextId,
}

impl ValueConstraint {
    /// Whether this is a fixed value
    pub fn is_fixed(&self) -> bool {
        self.kind == ValueConstraintKind::Fixed
    }
}

/// An element declaration
#[derive(Debug, Clone)]
pub struct ElementDecl {
    /// Name
    pub name: QName,
    /// Declared type
    pub type_id: TypeId,
    /// Nillable flag
    pub nillable: bool,
    /// Abstract flag
    pub is_abstract: bool,
    /// `block` set (extension, restriction, substitution)
    pub block: DerivationSet,
    /// `final` set
    pub final_set: DerivationSet,
    /// Default or fixed value
    pub value_constraint: Option<ValueConstraint>,
    /// Head of the substitution group this element belongs to
    pub substitution_head: ElemId,
    /// Identity constraints declared on this element
    pub identity_constraints: Vec<IcId>,
    /// Whether the declaration is global
    pub is_global: bool,
    /// Transitive members of the substitution group headed by this element
    pub substitutes: Vec<ElemId>,
}

/// An attribute declaration
#[derive(Debug, Clone)]
pub struct AttributeDecl {
    /// Name
    pub name: QName,
    /// Simple type
    pub type_id: TypeId,
    /// Default or fixed value
    pub value_constraint: Option<ValueConstraint>,
    /// Whether the declaration is global
    pub is_global: bool,
}

/// `use` of an attribute use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeUseKind {
    /// Must be present
    Required,
    /// May be present
    #[default]
    Optional,
    /// Must not be present
    Prohibited,
}

/// An attribute use of a complex type
#[derive(Debug, Clone)]
pub struct AttributeUse {
    /// The attribute declaration
    pub decl: AttrId,
    /// `use`
    pub use_kind: AttributeUseKind,
    /// Value constraint of the use, overriding the declaration's
    pub value_constraint: Option<ValueConstraint>,
}

/// Why an `xsi:type` cannot replace a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XsiTypeProblem {
    /// The type does not derive from the declared type
    NotDerived,
    /// A derivation method on the way is blocked
    Blocked(DerivationSet),
}

/// Immutable, shareable schema tables
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub(crate) namespaces: NamespaceTable,
    pub(crate) symbols: SymbolTable,
    pub(crate) types: Vec<TypeDef>,
    pub(crate) complex_types: Vec<ComplexTypeDef>,
    pub(crate) elements: Vec<ElementDecl>,
    pub(crate) attributes: Vec<AttributeDecl>,
    pub(crate) attribute_uses: Vec<AttributeUse>,
    pub(crate) wildcards: Vec<Wildcard>,
    pub(crate) validators: Vec<ValidatorDef>,
    pub(crate) identities: Vec<IdentityConstraint>,
    pub(crate) enums: Vec<EnumTable>,
    pub(crate) patterns: Vec<CompiledPattern>,
    pub(crate) models: Vec<ContentModel>,
    pub(crate) all_groups: Vec<AllGroup>,
    pub(crate) ns_contexts: Vec<NamespaceContext>,
    pub(crate) global_elements: HashMap<QName, ElemId>,
    pub(crate) global_attributes: HashMap<QName, AttrId>,
    pub(crate) global_types: HashMap<QName, TypeId>,
    pub(crate) any_type: TypeId,
    pub(crate) any_simple_type: TypeId,
}

impl CompiledSchema {
    /// Look up a name without interning; unknown parts come back as `NONE`
    pub fn lookup_qname(&self, namespace: &str, local: &str) -> QName {
        QName::new(self.namespaces.lookup(namespace), self.symbols.lookup(local))
    }

    /// Interned namespace id, `NONE` when the schema never mentions it
    pub fn lookup_namespace(&self, namespace: &str) -> NamespaceId {
        self.namespaces.lookup(namespace)
    }

    /// Render a name as `{ns}local`
    pub fn display_qname(&self, name: QName) -> DisplayQName<'_> {
        DisplayQName {
            namespace: self.namespaces.uri(name.ns),
            local: self.symbols.name(name.local),
        }
    }

    /// Namespace URI of an id
    pub fn namespace_uri(&self, ns: NamespaceId) -> &str {
        self.namespaces.uri(ns)
    }

    /// Global element declaration
    pub fn global_element(&self, name: QName) -> Option<ElemId> {
        self.global_elements.get(&name).copied()
    }

    /// Global attribute declaration
    pub fn global_attribute(&self, name: QName) -> Option<AttrId> {
        self.global_attributes.get(&name).copied()
    }

    /// Global type definition
    pub fn global_type(&self, name: QName) -> Option<TypeId> {
        self.global_types.get(&name).copied()
    }

    /// `xs:anyType`
    pub fn any_type(&self) -> TypeId {
        self.any_type
    }

    /// `xs:anySimpleType`
    pub fn any_simple_type(&self) -> TypeId {
        self.any_simple_type
    }

    /// Type definition
    pub fn type_def(&self, id: TypeId) -> &TypeDef {
        &self.types[id.index()]
    }

    /// Complex details of a type, `None` for simple types
    pub fn complex_of(&self, id: TypeId) -> Option<&ComplexTypeDef> {
        let complex = self.type_def(id).complex;
        complex.get().map(|c| &self.complex_types[c.index()])
    }

    /// Element declaration
    pub fn element(&self, id: ElemId) -> &ElementDecl {
        &self.elements[id.index()]
    }

    /// Attribute declaration
    pub fn attribute(&self, id: AttrId) -> &AttributeDecl {
        &self.attributes[id.index()]
    }

    /// Attribute uses of a complex type
    pub fn attribute_uses(&self, complex: &ComplexTypeDef) -> &[AttributeUse] {
        let start = complex.attribute_uses_start as usize;
        &self.attribute_uses[start..start + complex.attribute_uses_len as usize]
    }

    /// Wildcard
    pub fn wildcard(&self, id: WildcardId) -> &Wildcard {
        &self.wildcards[id.index()]
    }

    /// Simple-type validator
    pub fn validator(&self, id: ValidatorId) -> &ValidatorDef {
        &self.validators[id.index()]
    }

    /// Identity constraint
    pub fn identity(&self, id: IcId) -> &IdentityConstraint {
        &self.identities[id.index()]
    }

    /// Enumeration table
    pub fn enumeration(&self, id: EnumId) -> &EnumTable {
        &self.enums[id.index()]
    }

    /// Compiled pattern
    pub fn pattern(&self, id: PatternId) -> &CompiledPattern {
        &self.patterns[id.index()]
    }

    /// Content-model automaton
    pub fn model(&self, id: ModelId) -> &ContentModel {
        &self.models[id.index()]
    }

    /// All-group
    pub fn all_group(&self, id: AllGroupId) -> &AllGroup {
        &self.all_groups[id.index()]
    }

    /// Namespace context snapshot
    pub fn ns_context(&self, id: NsContextId) -> &NamespaceContext {
        &self.ns_contexts[id.index()]
    }

    /// Name of a type for messages (`anonymous` when unnamed)
    pub fn type_name(&self, id: TypeId) -> String {
        let name = self.type_def(id).name;
        if name.is_known() {
            self.display_qname(name).to_string()
        } else {
            "anonymous".to_string()
        }
    }

    /// Methods accumulated deriving `actual` from `declared`, `None` when
    /// `actual` is not derived from it
    ///
    /// Member types of a union count as derived from the union.
    pub fn derivation_mask(&self, actual: TypeId, declared: TypeId) -> Option<DerivationSet> {
        let def = self.type_def(actual);
        if let Some((_, mask)) = def.ancestors.iter().find(|(t, _)| *t == declared) {
            return Some(*mask);
        }
        let declared_def = self.type_def(declared);
        declared_def
            .union_members
            .iter()
            .find_map(|member| self.derivation_mask(actual, *member))
    }

    /// Check that `actual` may replace `declared` through `xsi:type` on an
    /// element whose declaration is `elem`
    pub fn check_xsi_type(
        &self,
        elem: Option<ElemId>,
        declared: TypeId,
        actual: TypeId,
    ) -> Result<(), XsiTypeProblem> {
        let mask = self
            .derivation_mask(actual, declared)
            .ok_or(XsiTypeProblem::NotDerived)?;
        let mut block = self.type_def(declared).block;
        if let Some(elem) = elem {
            block |= self.element(elem).block;
        }
        if mask.intersects(block) {
            return Err(XsiTypeProblem::Blocked(mask));
        }
        Ok(())
    }

    /// Whether `member` may appear in place of `head`
    pub fn substitution_allowed(&self, head: ElemId, member: ElemId) -> bool {
        if head == member {
            return true;
        }
        let head_decl = self.element(head);
        if head_decl.block.contains(DerivationSet::SUBSTITUTION) {
            return false;
        }
        if !head_decl.substitutes.contains(&member) {
            return false;
        }
        let member_type = self.element(member).type_id;
        let Some(mask) = self.derivation_mask(member_type, head_decl.type_id) else {
            return false;
        };
        let blocked = head_decl.block | self.type_def(head_decl.type_id).block;
        !mask.intersects(blocked)
    }
}

impl fmt::Display for DerivationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::EXTENSION, "extension"),
            (Self::RESTRICTION, "restriction"),
            (Self::LIST, "list"),
            (Self::UNION, "union"),
            (Self::SUBSTITUTION, "substitution"),
        ];
        let mut first = true;
        for (set, name) in names {
            if self.contains(set) {
                if !first {
                    f.write_str(" ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_set() {
        let set = DerivationSet::parse("extension restriction").unwrap();
        assert!(set.contains(DerivationSet::EXTENSION));
        assert!(!set.contains(DerivationSet::SUBSTITUTION));
        assert!(set.intersects(DerivationSet::RESTRICTION | DerivationSet::LIST));
        assert_eq!(DerivationSet::parse("#all"), Some(DerivationSet::ALL));
        assert_eq!(DerivationSet::parse("bogus"), None);
        assert_eq!(set.to_string(), "extension restriction");
    }

    #[test]
    fn test_builtin_ancestors() {
        let builder = SchemaBuilder::new();
        let schema = builder.finish().unwrap();
        let int = schema.global_type(schema.lookup_qname(crate::XSD_NAMESPACE, "int")).unwrap();
        let decimal = schema
            .global_type(schema.lookup_qname(crate::XSD_NAMESPACE, "decimal"))
            .unwrap();
        assert_eq!(schema.derivation_mask(int, decimal), Some(DerivationSet::RESTRICTION));
        assert_eq!(schema.derivation_mask(int, int), Some(DerivationSet::EMPTY));
        assert_eq!(schema.derivation_mask(decimal, int), None);
        assert!(schema.derivation_mask(int, schema.any_type()).is_some());
    }
}
