//! Schema construction
//!
//! [`SchemaBuilder`] assembles the tables of a [`CompiledSchema`] from
//! component descriptions. The built-in types are registered when the
//! builder is created. Other components refer to each other by the ids the
//! builder hands out, so a component must exist before it is referenced;
//! complex types are the exception, they can be declared first and defined
//! later, which is what recursive content models need.
//!
//! [`SchemaBuilder::finish`] resolves the remaining cross references
//! (keyrefs, substitution groups, derivation chains), compiles the content
//! models and checks the value constraints.

use std::collections::HashMap;

use log::debug;

use super::compile;
use super::{
    AllGroupId, AttrId, AttributeDecl, AttributeUse, AttributeUseKind, CompiledSchema, ComplexTypeDef,
    ComplexTypeId, ContentHandle, ContentKind, DerivationMethod, DerivationSet, ElemId, ElementDecl, EnumId,
    IcId, ModelId, NsContextId, PatternId, TypeDef, TypeId, TypeKind, ValidatorId, ValueConstraint,
    ValueConstraintKind, WildcardId,
};
use crate::error::ParseError;
use crate::namespaces::NamespaceContext;
use crate::symbols::{NamespaceId, NamespaceTable, QName, SymbolId, SymbolTable};
use crate::validators::builtins::{BuiltinShape, BUILTIN_TYPES, XSD_ANY_SIMPLE_TYPE, XSD_ANY_TYPE, XSD_NAMESPACE};
use crate::validators::exceptions::ValueError;
use crate::validators::facets::{EnumTable, Facet, WhiteSpace};
use crate::validators::identities::{IdentityConstraint, IdentityConstraintKind, PathProgram};
use crate::validators::models::ContentModel;
use crate::validators::particles::Particle;
use crate::validators::patterns::CompiledPattern;
use crate::validators::simple_types::{ValidatorDef, Variety};
use crate::validators::values::{parse_atomic, Value};
use crate::validators::wildcards::{NamespaceConstraint, ProcessContents, Wildcard};

/// A constraining facet of a simple-type restriction, as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetSpec {
    /// `length`
    Length(usize),
    /// `minLength`
    MinLength(usize),
    /// `maxLength`
    MaxLength(usize),
    /// `pattern`; several patterns of one restriction are alternatives
    Pattern(String),
    /// `enumeration` values
    Enumeration(Vec<String>),
    /// `minInclusive`
    MinInclusive(String),
    /// `minExclusive`
    MinExclusive(String),
    /// `maxInclusive`
    MaxInclusive(String),
    /// `maxExclusive`
    MaxExclusive(String),
    /// `totalDigits`
    TotalDigits(u32),
    /// `fractionDigits`
    FractionDigits(u32),
    /// `whiteSpace`
    WhiteSpace(WhiteSpace),
}

/// An element declaration to add
#[derive(Debug, Clone)]
pub struct ElementSpec {
    /// Name
    pub name: QName,
    /// Declared type
    pub type_id: TypeId,
    /// Global (top-level) declaration
    pub global: bool,
    /// `nillable`
    pub nillable: bool,
    /// `abstract`
    pub is_abstract: bool,
    /// `block`
    pub block: DerivationSet,
    /// `final`
    pub final_set: DerivationSet,
    /// `default` or `fixed`
    pub value: Option<(ValueConstraintKind, String)>,
    /// Namespaces in scope of the declaration, for QName values
    pub namespaces: NamespaceContext,
    /// `substitutionGroup` head
    pub substitution_group: Option<ElemId>,
    /// Identity constraints defined on the element
    pub identity_constraints: Vec<IcId>,
}

impl ElementSpec {
    /// Local element of type `type_id`
    pub fn new(name: QName, type_id: TypeId) -> Self {
        Self {
            name,
            type_id,
            global: false,
            nillable: false,
            is_abstract: false,
            block: DerivationSet::EMPTY,
            final_set: DerivationSet::EMPTY,
            value: None,
            namespaces: NamespaceContext::new(),
            substitution_group: None,
            identity_constraints: Vec::new(),
        }
    }

    /// Make the declaration global
    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    /// Set `nillable`
    pub fn nillable(mut self, nillable: bool) -> Self {
        self.nillable = nillable;
        self
    }

    /// Mark the declaration abstract
    pub fn abstract_element(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Set `block`
    pub fn block(mut self, block: DerivationSet) -> Self {
        self.block = block;
        self
    }

    /// Set `final`
    pub fn final_set(mut self, final_set: DerivationSet) -> Self {
        self.final_set = final_set;
        self
    }

    /// Set a default value
    pub fn default_value(mut self, lexical: impl Into<String>) -> Self {
        self.value = Some((ValueConstraintKind::Default, lexical.into()));
        self
    }

    /// Set a fixed value
    pub fn fixed(mut self, lexical: impl Into<String>) -> Self {
        self.value = Some((ValueConstraintKind::Fixed, lexical.into()));
        self
    }

    /// Namespaces for resolving QName-valued constraints
    pub fn namespaces(mut self, namespaces: NamespaceContext) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Join the substitution group headed by `head`
    pub fn substitution_group(mut self, head: ElemId) -> Self {
        self.substitution_group = Some(head);
        self
    }

    /// Attach an identity constraint
    pub fn identity(mut self, constraint: IcId) -> Self {
        self.identity_constraints.push(constraint);
        self
    }
}

/// An attribute declaration to add
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    /// Name
    pub name: QName,
    /// Simple type
    pub type_id: TypeId,
    /// Global (top-level) declaration
    pub global: bool,
    /// `default` or `fixed`
    pub value: Option<(ValueConstraintKind, String)>,
    /// Namespaces in scope of the declaration
    pub namespaces: NamespaceContext,
}

impl AttributeSpec {
    /// Local attribute of type `type_id`
    pub fn new(name: QName, type_id: TypeId) -> Self {
        Self {
            name,
            type_id,
            global: false,
            value: None,
            namespaces: NamespaceContext::new(),
        }
    }

    /// Make the declaration global
    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    /// Set a default value
    pub fn default_value(mut self, lexical: impl Into<String>) -> Self {
        self.value = Some((ValueConstraintKind::Default, lexical.into()));
        self
    }

    /// Set a fixed value
    pub fn fixed(mut self, lexical: impl Into<String>) -> Self {
        self.value = Some((ValueConstraintKind::Fixed, lexical.into()));
        self
    }

    /// Namespaces for resolving QName-valued constraints
    pub fn namespaces(mut self, namespaces: NamespaceContext) -> Self {
        self.namespaces = namespaces;
        self
    }
}

/// An attribute use of a complex type
#[derive(Debug, Clone)]
pub struct AttributeUseSpec {
    /// Declaration
    pub decl: AttrId,
    /// `use`
    pub use_kind: AttributeUseKind,
    /// `default` or `fixed` on the use
    pub value: Option<(ValueConstraintKind, String)>,
    /// Namespaces in scope of the use
    pub namespaces: NamespaceContext,
}

impl AttributeUseSpec {
    /// Optional use of `decl`
    pub fn new(decl: AttrId) -> Self {
        Self {
            decl,
            use_kind: AttributeUseKind::Optional,
            value: None,
            namespaces: NamespaceContext::new(),
        }
    }

    /// `use="required"`
    pub fn required(mut self) -> Self {
        self.use_kind = AttributeUseKind::Required;
        self
    }

    /// `use="prohibited"`
    pub fn prohibited(mut self) -> Self {
        self.use_kind = AttributeUseKind::Prohibited;
        self
    }

    /// Set a default value on the use
    pub fn default_value(mut self, lexical: impl Into<String>) -> Self {
        self.value = Some((ValueConstraintKind::Default, lexical.into()));
        self
    }

    /// Set a fixed value on the use
    pub fn fixed(mut self, lexical: impl Into<String>) -> Self {
        self.value = Some((ValueConstraintKind::Fixed, lexical.into()));
        self
    }

    /// Namespaces for resolving QName-valued constraints
    pub fn namespaces(mut self, namespaces: NamespaceContext) -> Self {
        self.namespaces = namespaces;
        self
    }
}

/// A complex type definition
#[derive(Debug, Clone)]
pub struct ComplexTypeSpec {
    /// Name, `None` for anonymous types
    pub name: Option<QName>,
    /// Base type (`anyType` when `None`)
    pub base: Option<TypeId>,
    /// Derivation method from the base
    pub derivation: DerivationMethod,
    /// Content kind
    pub content: ContentKind,
    /// Content particle
    pub particle: Option<Particle>,
    /// Attribute uses
    pub attributes: Vec<AttributeUseSpec>,
    /// Attribute wildcard
    pub any_attribute: Option<WildcardId>,
    /// `abstract`
    pub is_abstract: bool,
    /// `block`
    pub block: DerivationSet,
    /// `final`
    pub final_set: DerivationSet,
}

impl ComplexTypeSpec {
    /// Type with empty content, restricting `anyType`
    pub fn new(name: Option<QName>) -> Self {
        Self {
            name,
            base: None,
            derivation: DerivationMethod::Restriction,
            content: ContentKind::Empty,
            particle: None,
            attributes: Vec::new(),
            any_attribute: None,
            is_abstract: false,
            block: DerivationSet::EMPTY,
            final_set: DerivationSet::EMPTY,
        }
    }

    /// Set the content kind and particle
    pub fn content(mut self, content: ContentKind, particle: Particle) -> Self {
        self.content = content;
        self.particle = Some(particle);
        self
    }

    /// Simple content extending the simple type (or simple-content complex
    /// type) `base`
    pub fn simple_content(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self.derivation = DerivationMethod::Extension;
        self.content = ContentKind::SimpleText;
        self.particle = None;
        self
    }

    /// Derive by extension of `base`
    pub fn extends(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self.derivation = DerivationMethod::Extension;
        self
    }

    /// Derive by restriction of `base`
    pub fn restricts(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self.derivation = DerivationMethod::Restriction;
        self
    }

    /// Add an attribute use
    pub fn attribute(mut self, attribute: AttributeUseSpec) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Set the attribute wildcard
    pub fn any_attribute(mut self, wildcard: WildcardId) -> Self {
        self.any_attribute = Some(wildcard);
        self
    }

    /// Mark the type abstract
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Set `block`
    pub fn block(mut self, block: DerivationSet) -> Self {
        self.block = block;
        self
    }

    /// Set `final`
    pub fn final_set(mut self, final_set: DerivationSet) -> Self {
        self.final_set = final_set;
        self
    }
}

/// An identity constraint to add
#[derive(Debug, Clone)]
pub struct IdentitySpec {
    /// Name
    pub name: QName,
    /// unique, key or keyref
    pub kind: IdentityConstraintKind,
    /// Selector expression
    pub selector: String,
    /// Field expressions
    pub fields: Vec<String>,
    /// Referenced key (keyref only)
    pub refer: Option<QName>,
    /// Namespaces for the prefixes in the expressions
    pub namespaces: NamespaceContext,
}

impl IdentitySpec {
    fn with_kind(kind: IdentityConstraintKind, name: QName, selector: &str, fields: &[&str]) -> Self {
        Self {
            name,
            kind,
            selector: selector.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            refer: None,
            namespaces: NamespaceContext::new(),
        }
    }

    /// `xs:unique`
    pub fn unique(name: QName, selector: &str, fields: &[&str]) -> Self {
        Self::with_kind(IdentityConstraintKind::Unique, name, selector, fields)
    }

    /// `xs:key`
    pub fn key(name: QName, selector: &str, fields: &[&str]) -> Self {
        Self::with_kind(IdentityConstraintKind::Key, name, selector, fields)
    }

    /// `xs:keyref` referring to the key or unique named `refer`
    pub fn keyref(name: QName, refer: QName, selector: &str, fields: &[&str]) -> Self {
        let mut spec = Self::with_kind(IdentityConstraintKind::KeyRef, name, selector, fields);
        spec.refer = Some(refer);
        spec
    }

    /// Namespaces for the prefixes in the expressions
    pub fn namespaces(mut self, namespaces: NamespaceContext) -> Self {
        self.namespaces = namespaces;
        self
    }
}

fn facet_error(facet: &str, lexical: &str, err: ValueError) -> ParseError {
    ParseError::new(format!("invalid {} value '{}': {}", facet, lexical, err.message))
}

fn constraint_error(owner: &str, lexical: &str, err: ValueError) -> ParseError {
    ParseError::new(format!("{}: invalid value constraint '{}': {}", owner, lexical, err.message))
}

fn check_particle_refs(particle: &Particle, elements: usize, wildcards: usize) -> Result<(), ParseError> {
    match particle {
        Particle::Element { elem, .. } => match elem.get() {
            Some(e) if e.index() < elements => Ok(()),
            _ => Err(ParseError::new("content model refers to an unknown element declaration")),
        },
        Particle::Any { wildcard, .. } => match wildcard.get() {
            Some(w) if w.index() < wildcards => Ok(()),
            _ => Err(ParseError::new("content model refers to an unknown wildcard")),
        },
        Particle::Sequence { particles, .. } | Particle::Choice { particles, .. } | Particle::All { particles, .. } => {
            particles.iter().try_for_each(|p| check_particle_refs(p, elements, wildcards))
        }
    }
}

/// Builds a [`CompiledSchema`]
///
/// # Example
///
/// ```
/// use xmlschema_runtime::schema::{ElementSpec, SchemaBuilder};
///
/// let mut builder = SchemaBuilder::new();
/// let int = builder.builtin("int");
/// let name = builder.qname("urn:example", "count");
/// builder.element(ElementSpec::new(name, int).global()).unwrap();
/// let schema = builder.finish().unwrap();
/// assert!(schema.global_element(name).is_some());
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    schema: CompiledSchema,
    /// Content particle per complex type, consumed by `finish`
    particles: Vec<Option<Particle>>,
    /// Whether each declared complex type has been defined
    defined: Vec<bool>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    /// Create a builder holding the built-in types
    pub fn new() -> Self {
        let schema = CompiledSchema {
            namespaces: NamespaceTable::new(),
            symbols: SymbolTable::new(),
            types: Vec::new(),
            complex_types: Vec::new(),
            elements: Vec::new(),
            attributes: Vec::new(),
            attribute_uses: Vec::new(),
            wildcards: Vec::new(),
            validators: Vec::new(),
            identities: Vec::new(),
            enums: Vec::new(),
            patterns: Vec::new(),
            models: Vec::new(),
            all_groups: Vec::new(),
            ns_contexts: vec![NamespaceContext::new()],
            global_elements: HashMap::new(),
            global_attributes: HashMap::new(),
            global_types: HashMap::new(),
            any_type: TypeId::NONE,
            any_simple_type: TypeId::NONE,
        };
        let mut builder = Self {
            schema,
            particles: Vec::new(),
            defined: Vec::new(),
        };
        builder.register_builtins();
        builder
    }

    fn register_builtins(&mut self) {
        let xsd = self.namespace(XSD_NAMESPACE);
        let any_name = self.qname(XSD_NAMESPACE, XSD_ANY_TYPE);
        let any_attribute = self.push_wildcard(Wildcard::new(NamespaceConstraint::Any, ProcessContents::Lax, xsd));
        let complex = self.push_complex(ComplexTypeDef {
            attribute_uses_start: 0,
            attribute_uses_len: 0,
            any_attribute,
            content: ContentKind::Any,
            model: ContentHandle::None,
            base: ComplexTypeId::NONE,
        });
        self.defined[complex.index()] = true;
        let any_type = self.push_type(TypeDef {
            name: any_name,
            kind: TypeKind::Builtin,
            validator: ValidatorId::NONE,
            base: TypeId::NONE,
            derivation: DerivationMethod::None,
            block: DerivationSet::EMPTY,
            final_set: DerivationSet::EMPTY,
            is_abstract: false,
            ancestors: Vec::new(),
            complex,
            union_members: Vec::new(),
        });
        self.schema.global_types.insert(any_name, any_type);
        self.schema.any_type = any_type;

        let no_namespaces = NamespaceContext::new();
        for builtin in BUILTIN_TYPES.iter() {
            let name = self.qname(XSD_NAMESPACE, builtin.name);
            let base = self.builtin(builtin.base);
            let (variety, derivation, facets) = match builtin.shape {
                BuiltinShape::Atomic(kind) => {
                    let mut facets = match self.schema.type_def(base).validator.get() {
                        Some(vid) => self.schema.validator(vid).facets.clone(),
                        None => Vec::new(),
                    };
                    let bound = |lexical: Option<&str>| lexical.and_then(|s| parse_atomic(kind, s, &no_namespaces).ok());
                    if let Some(min) = bound(builtin.min_inclusive) {
                        facets.push(Facet::MinInclusive(min));
                    }
                    if let Some(max) = bound(builtin.max_inclusive) {
                        facets.push(Facet::MaxInclusive(max));
                    }
                    (Variety::Atomic(kind), DerivationMethod::Restriction, facets)
                }
                BuiltinShape::List(item) => {
                    let item = self.schema.type_def(self.builtin(item)).validator;
                    (Variety::List { item }, DerivationMethod::List, vec![Facet::MinLength(1)])
                }
            };
            let validator = self.push_validator(ValidatorDef {
                name: builtin.name.to_string(),
                variety,
                whitespace: builtin.white_space,
                facets,
            });
            let mut def = Self::simple_def(Some(name), validator, base, derivation);
            def.kind = TypeKind::Builtin;
            let id = self.push_type(def);
            self.schema.global_types.insert(name, id);
        }
        self.schema.any_simple_type = self.builtin(XSD_ANY_SIMPLE_TYPE);
    }

    // ---- names --------------------------------------------------------

    /// Intern a namespace URI
    pub fn namespace(&mut self, uri: &str) -> NamespaceId {
        self.schema.namespaces.intern(uri)
    }

    /// Intern a local name
    pub fn symbol(&mut self, local: &str) -> SymbolId {
        self.schema.symbols.intern(local)
    }

    /// Intern an expanded name
    pub fn qname(&mut self, namespace: &str, local: &str) -> QName {
        QName::new(self.schema.namespaces.intern(namespace), self.schema.symbols.intern(local))
    }

    /// Built-in type by local name, `NONE` when there is no such type
    pub fn builtin(&self, local: &str) -> TypeId {
        self.schema
            .global_type(self.schema.lookup_qname(XSD_NAMESPACE, local))
            .unwrap_or(TypeId::NONE)
    }

    /// `xs:anyType`
    pub fn any_type(&self) -> TypeId {
        self.schema.any_type
    }

    /// `xs:anySimpleType`
    pub fn any_simple_type(&self) -> TypeId {
        self.schema.any_simple_type
    }

    /// Register a namespace context snapshot, reusing an equal one
    pub fn ns_context(&mut self, namespaces: &NamespaceContext) -> NsContextId {
        match self.schema.ns_contexts.iter().position(|ctx| ctx == namespaces) {
            Some(index) => NsContextId::from_index(index),
            None => {
                self.schema.ns_contexts.push(namespaces.clone());
                NsContextId::from_index(self.schema.ns_contexts.len() - 1)
            }
        }
    }

    // ---- simple types -------------------------------------------------

    /// Restrict a simple type with facets
    pub fn restrict_simple(
        &mut self,
        name: Option<QName>,
        base: TypeId,
        facets: Vec<FacetSpec>,
    ) -> Result<TypeId, ParseError> {
        self.restrict_simple_with_namespaces(name, base, facets, &NamespaceContext::new())
    }

    /// Restrict a simple type; `namespaces` resolves QName facet values
    pub fn restrict_simple_with_namespaces(
        &mut self,
        name: Option<QName>,
        base: TypeId,
        facets: Vec<FacetSpec>,
        namespaces: &NamespaceContext,
    ) -> Result<TypeId, ParseError> {
        let base_vid = self.simple_validator(base)?;
        self.check_final(base, DerivationSet::RESTRICTION)?;
        let mut def = self.schema.validator(base_vid).clone();
        def.name = self.validator_name(name, Some(base));
        let extra = self
            .compile_facets(base_vid, facets, namespaces, &mut def.whitespace)
            .map_err(|e| e.with_location(format!("simpleType '{}'", def.name)))?;
        def.facets.extend(extra);
        let validator = self.push_validator(def);
        let mut type_def = Self::simple_def(name, validator, base, DerivationMethod::Restriction);
        type_def.union_members = self.schema.type_def(base).union_members.clone();
        self.define_simple(name, type_def)
    }

    /// List of `item` values
    pub fn list_type(
        &mut self,
        name: Option<QName>,
        item: TypeId,
        facets: Vec<FacetSpec>,
    ) -> Result<TypeId, ParseError> {
        let item_vid = self.simple_validator(item)?;
        if matches!(self.schema.validator(item_vid).variety, Variety::List { .. }) {
            return Err(ParseError::new(format!(
                "the item type of a list cannot be the list type '{}'",
                self.schema.type_name(item)
            )));
        }
        self.check_final(item, DerivationSet::LIST)?;
        let validator = self.push_validator(ValidatorDef {
            name: self.validator_name(name, None),
            variety: Variety::List { item: item_vid },
            whitespace: WhiteSpace::Collapse,
            facets: Vec::new(),
        });
        let mut whitespace = WhiteSpace::Collapse;
        let facets = self.compile_facets(validator, facets, &NamespaceContext::new(), &mut whitespace)?;
        self.schema.validators[validator.index()].facets = facets;
        let base = self.schema.any_simple_type;
        self.define_simple(name, Self::simple_def(name, validator, base, DerivationMethod::List))
    }

    /// Union of `members`, tried in order
    pub fn union_type(
        &mut self,
        name: Option<QName>,
        members: Vec<TypeId>,
        facets: Vec<FacetSpec>,
    ) -> Result<TypeId, ParseError> {
        if members.is_empty() {
            return Err(ParseError::new("a union type needs at least one member type"));
        }
        let mut member_vids = Vec::with_capacity(members.len());
        for member in &members {
            member_vids.push(self.simple_validator(*member)?);
            self.check_final(*member, DerivationSet::UNION)?;
        }
        let validator = self.push_validator(ValidatorDef {
            name: self.validator_name(name, None),
            variety: Variety::Union { members: member_vids },
            whitespace: WhiteSpace::Preserve,
            facets: Vec::new(),
        });
        let mut whitespace = WhiteSpace::Preserve;
        let facets = self.compile_facets(validator, facets, &NamespaceContext::new(), &mut whitespace)?;
        self.schema.validators[validator.index()].facets = facets;
        let base = self.schema.any_simple_type;
        let mut def = Self::simple_def(name, validator, base, DerivationMethod::Union);
        def.union_members = members;
        self.define_simple(name, def)
    }

    fn compile_facets(
        &mut self,
        source: ValidatorId,
        specs: Vec<FacetSpec>,
        namespaces: &NamespaceContext,
        whitespace: &mut WhiteSpace,
    ) -> Result<Vec<Facet>, ParseError> {
        let mut facets = Vec::with_capacity(specs.len());
        for spec in specs {
            let facet = match spec {
                FacetSpec::Length(n) => Facet::Length(n),
                FacetSpec::MinLength(n) => Facet::MinLength(n),
                FacetSpec::MaxLength(n) => Facet::MaxLength(n),
                FacetSpec::TotalDigits(n) => {
                    if n == 0 {
                        return Err(ParseError::new("totalDigits must be a positive integer"));
                    }
                    Facet::TotalDigits(n)
                }
                FacetSpec::FractionDigits(n) => Facet::FractionDigits(n),
                FacetSpec::MinInclusive(lexical) => {
                    Facet::MinInclusive(self.bound(source, "minInclusive", &lexical, namespaces)?)
                }
                FacetSpec::MinExclusive(lexical) => {
                    Facet::MinExclusive(self.bound(source, "minExclusive", &lexical, namespaces)?)
                }
                FacetSpec::MaxInclusive(lexical) => {
                    Facet::MaxInclusive(self.bound(source, "maxInclusive", &lexical, namespaces)?)
                }
                FacetSpec::MaxExclusive(lexical) => {
                    Facet::MaxExclusive(self.bound(source, "maxExclusive", &lexical, namespaces)?)
                }
                FacetSpec::Pattern(regex) => {
                    let pattern = CompiledPattern::new(&regex)?;
                    self.schema.patterns.push(pattern);
                    let id = PatternId::from_index(self.schema.patterns.len() - 1);
                    let step = facets.iter_mut().find_map(|f| match f {
                        Facet::Pattern(ids) => Some(ids),
                        _ => None,
                    });
                    match step {
                        Some(ids) => ids.push(id),
                        None => facets.push(Facet::Pattern(vec![id])),
                    }
                    continue;
                }
                FacetSpec::Enumeration(values) => {
                    let mut table = EnumTable::default();
                    for lexical in values {
                        let key = self
                            .schema
                            .canonical_key(source, &lexical, namespaces)
                            .map_err(|e| facet_error("enumeration", &lexical, e))?;
                        table.keys.insert(key);
                        table.lexicals.push(lexical);
                    }
                    self.schema.enums.push(table);
                    Facet::Enumeration(EnumId::from_index(self.schema.enums.len() - 1))
                }
                FacetSpec::WhiteSpace(mode) => {
                    if mode < *whitespace {
                        return Err(ParseError::new(format!(
                            "whiteSpace {:?} is looser than the base type's {:?}",
                            mode, whitespace
                        )));
                    }
                    *whitespace = mode;
                    Facet::WhiteSpace(mode)
                }
            };
            facets.push(facet);
        }
        Ok(facets)
    }

    fn bound(
        &self,
        source: ValidatorId,
        facet: &str,
        lexical: &str,
        namespaces: &NamespaceContext,
    ) -> Result<Value, ParseError> {
        self.schema
            .parse_value(source, lexical, namespaces)
            .map_err(|e| facet_error(facet, lexical, e))
    }

    fn simple_validator(&self, id: TypeId) -> Result<ValidatorId, ParseError> {
        let def = self.type_def_checked(id)?;
        if def.kind == TypeKind::Complex || def.validator.is_none() {
            return Err(ParseError::new(format!(
                "'{}' is not a simple type",
                self.schema.type_name(id)
            )));
        }
        Ok(def.validator)
    }

    fn validator_name(&self, name: Option<QName>, base: Option<TypeId>) -> String {
        match (name, base) {
            (Some(name), _) => self.schema.display_qname(name).to_string(),
            (None, Some(base)) => self.schema.validator(self.schema.type_def(base).validator).name.clone(),
            (None, None) => "anonymous".to_string(),
        }
    }

    fn simple_def(name: Option<QName>, validator: ValidatorId, base: TypeId, derivation: DerivationMethod) -> TypeDef {
        TypeDef {
            name: name.unwrap_or_default(),
            kind: TypeKind::Simple,
            validator,
            base,
            derivation,
            block: DerivationSet::EMPTY,
            final_set: DerivationSet::EMPTY,
            is_abstract: false,
            ancestors: Vec::new(),
            complex: ComplexTypeId::NONE,
            union_members: Vec::new(),
        }
    }

    fn define_simple(&mut self, name: Option<QName>, def: TypeDef) -> Result<TypeId, ParseError> {
        if let Some(name) = name {
            self.check_global_type_free(name)?;
        }
        let id = self.push_type(def);
        if let Some(name) = name {
            self.schema.global_types.insert(name, id);
        }
        Ok(id)
    }

    fn check_global_type_free(&self, name: QName) -> Result<(), ParseError> {
        if self.schema.global_types.contains_key(&name) {
            return Err(ParseError::new(format!(
                "duplicate global type '{}'",
                self.schema.display_qname(name)
            )));
        }
        Ok(())
    }

    fn check_final(&self, base: TypeId, method: DerivationSet) -> Result<(), ParseError> {
        if self.schema.type_def(base).final_set.intersects(method) {
            return Err(ParseError::new(format!(
                "type '{}' is final for {}",
                self.schema.type_name(base),
                method
            )));
        }
        Ok(())
    }

    fn type_def_checked(&self, id: TypeId) -> Result<&TypeDef, ParseError> {
        id.get()
            .and_then(|t| self.schema.types.get(t.index()))
            .ok_or_else(|| ParseError::new("reference to an unknown type"))
    }

    // ---- complex types ------------------------------------------------

    /// Declare and define a complex type in one step
    pub fn complex_type(&mut self, spec: ComplexTypeSpec) -> Result<TypeId, ParseError> {
        let id = self.declare_complex_type(spec.name)?;
        self.define_complex_type(id, spec)?;
        Ok(id)
    }

    /// Reserve a complex type id; the type must be defined before `finish`
    pub fn declare_complex_type(&mut self, name: Option<QName>) -> Result<TypeId, ParseError> {
        if let Some(name) = name {
            self.check_global_type_free(name)?;
        }
        let complex = self.push_complex(ComplexTypeDef {
            attribute_uses_start: 0,
            attribute_uses_len: 0,
            any_attribute: WildcardId::NONE,
            content: ContentKind::Empty,
            model: ContentHandle::None,
            base: ComplexTypeId::NONE,
        });
        let id = self.push_type(TypeDef {
            name: name.unwrap_or_default(),
            kind: TypeKind::Complex,
            validator: ValidatorId::NONE,
            base: self.schema.any_type,
            derivation: DerivationMethod::Restriction,
            block: DerivationSet::EMPTY,
            final_set: DerivationSet::EMPTY,
            is_abstract: false,
            ancestors: Vec::new(),
            complex,
            union_members: Vec::new(),
        });
        if let Some(name) = name {
            self.schema.global_types.insert(name, id);
        }
        Ok(id)
    }

    /// Define a complex type reserved by [`Self::declare_complex_type`]
    pub fn define_complex_type(&mut self, id: TypeId, spec: ComplexTypeSpec) -> Result<(), ParseError> {
        let complex = match self.type_def_checked(id)?.complex.get() {
            Some(complex) => complex,
            None => {
                return Err(ParseError::new(format!(
                    "'{}' is not a complex type",
                    self.schema.type_name(id)
                )))
            }
        };
        if self.defined[complex.index()] {
            return Err(ParseError::new(format!(
                "complex type '{}' is defined twice",
                self.schema.type_name(id)
            )));
        }
        let any_type = self.schema.any_type;
        let base = spec.base.unwrap_or(any_type);
        self.type_def_checked(base)?;
        if base == id {
            return Err(ParseError::new(format!(
                "complex type '{}' derives from itself",
                self.schema.type_name(id)
            )));
        }
        let method = if spec.base.is_some() { spec.derivation } else { DerivationMethod::Restriction };
        if !matches!(method, DerivationMethod::Extension | DerivationMethod::Restriction) {
            return Err(ParseError::new("complex types derive by extension or restriction"));
        }
        self.check_final(base, method.into())?;
        if let Some(wildcard) = spec.any_attribute {
            if wildcard.get().map_or(true, |w| w.index() >= self.schema.wildcards.len()) {
                return Err(ParseError::new("reference to an unknown wildcard"));
            }
        }

        let base_def = self.schema.type_def(base);
        let base_complex = base_def.complex.get().filter(|_| base != any_type);
        let base_validator = base_def.validator;

        let mut uses: Vec<AttributeUse> = Vec::new();
        let mut any_attribute = spec.any_attribute.unwrap_or(WildcardId::NONE);
        let content;
        let mut particle = None;
        let mut validator = ValidatorId::NONE;

        match base_complex {
            Some(bc) => {
                if !self.defined[bc.index()] {
                    return Err(ParseError::new(format!(
                        "base type '{}' must be defined before '{}'",
                        self.schema.type_name(base),
                        self.schema.type_name(id)
                    )));
                }
                let base_ct = self.schema.complex_types[bc.index()].clone();
                uses = self.schema.attribute_uses(&base_ct).to_vec();
                let base_particle = self.particles[bc.index()].clone();
                if base_ct.content == ContentKind::SimpleText {
                    if !matches!(spec.content, ContentKind::Empty | ContentKind::SimpleText) {
                        return Err(ParseError::new(format!(
                            "'{}' has simple content and cannot be derived with children",
                            self.schema.type_name(base)
                        )));
                    }
                    content = ContentKind::SimpleText;
                    validator = base_validator;
                } else if method == DerivationMethod::Extension {
                    particle = match (base_particle, spec.particle) {
                        (Some(b), Some(o)) => {
                            if matches!(b, Particle::All { .. }) || matches!(o, Particle::All { .. }) {
                                return Err(ParseError::new("an 'all' model group cannot be extended"));
                            }
                            Some(Particle::sequence(vec![b, o]))
                        }
                        (b, o) => b.or(o),
                    };
                    content = match (base_ct.content, spec.content) {
                        (c, ContentKind::Empty) | (ContentKind::Empty, c) => c,
                        (ContentKind::Mixed, _) | (_, ContentKind::Mixed) => ContentKind::Mixed,
                        (_, c) => c,
                    };
                } else {
                    particle = spec.particle;
                    content = spec.content;
                }
                if method == DerivationMethod::Extension {
                    if let Some(inherited) = base_ct.any_attribute.get() {
                        any_attribute = match spec.any_attribute {
                            Some(own) => {
                                let merged = self.schema.wildcard(own).union(self.schema.wildcard(inherited));
                                self.push_wildcard(merged)
                            }
                            None => inherited,
                        };
                    }
                }
            }
            None if base == any_type => {
                if spec.content == ContentKind::SimpleText {
                    return Err(ParseError::new("simple content needs a simple base type"));
                }
                content = spec.content;
                particle = spec.particle;
            }
            None => {
                if method != DerivationMethod::Extension {
                    return Err(ParseError::new(format!(
                        "a complex type can only extend the simple type '{}'",
                        self.schema.type_name(base)
                    )));
                }
                if !matches!(spec.content, ContentKind::Empty | ContentKind::SimpleText) {
                    return Err(ParseError::new("a complex type with a simple base has simple content"));
                }
                content = ContentKind::SimpleText;
                validator = base_validator;
            }
        }
        if matches!(content, ContentKind::Empty | ContentKind::SimpleText | ContentKind::Any) {
            particle = None;
        }

        let mut own_names = Vec::with_capacity(spec.attributes.len());
        for attribute in spec.attributes {
            let decl = attribute
                .decl
                .get()
                .and_then(|d| self.schema.attributes.get(d.index()))
                .ok_or_else(|| ParseError::new("attribute use of an unknown declaration"))?;
            let name = decl.name;
            if own_names.contains(&name) {
                return Err(ParseError::new(format!(
                    "attribute '{}' is used twice",
                    self.schema.display_qname(name)
                )));
            }
            own_names.push(name);
            let value_constraint = self.value_constraint(attribute.value, &attribute.namespaces);
            let new_use = AttributeUse {
                decl: attribute.decl,
                use_kind: attribute.use_kind,
                value_constraint,
            };
            let inherited = uses
                .iter()
                .position(|u| self.schema.attribute(u.decl).name == name);
            match inherited {
                Some(pos) => uses[pos] = new_use,
                None => uses.push(new_use),
            }
        }

        let start = self.schema.attribute_uses.len() as u32;
        let len = uses.len() as u32;
        self.schema.attribute_uses.extend(uses);
        self.schema.complex_types[complex.index()] = ComplexTypeDef {
            attribute_uses_start: start,
            attribute_uses_len: len,
            any_attribute,
            content,
            model: ContentHandle::None,
            base: base_complex.unwrap_or(ComplexTypeId::NONE),
        };
        self.particles[complex.index()] = particle;
        self.defined[complex.index()] = true;

        let def = &mut self.schema.types[id.index()];
        def.base = base;
        def.derivation = method;
        def.validator = validator;
        def.block = spec.block;
        def.final_set = spec.final_set;
        def.is_abstract = spec.is_abstract;
        Ok(())
    }

    // ---- declarations -------------------------------------------------

    /// Add an element declaration
    pub fn element(&mut self, spec: ElementSpec) -> Result<ElemId, ParseError> {
        self.type_def_checked(spec.type_id)?;
        let display = self.schema.display_qname(spec.name).to_string();
        if let Some(head) = spec.substitution_group {
            if !spec.global {
                return Err(ParseError::new(format!(
                    "local element '{}' cannot join a substitution group",
                    display
                )));
            }
            let head_is_global = head
                .get()
                .and_then(|h| self.schema.elements.get(h.index()))
                .map_or(false, |decl| decl.is_global);
            if !head_is_global {
                return Err(ParseError::new(format!(
                    "substitution group head of '{}' is not a global element",
                    display
                )));
            }
        }
        for ic in &spec.identity_constraints {
            if ic.get().map_or(true, |i| i.index() >= self.schema.identities.len()) {
                return Err(ParseError::new(format!(
                    "element '{}' refers to an unknown identity constraint",
                    display
                )));
            }
        }
        if spec.global && self.schema.global_elements.contains_key(&spec.name) {
            return Err(ParseError::new(format!("duplicate global element '{}'", display)));
        }
        let value_constraint = self.value_constraint(spec.value, &spec.namespaces);
        let id = ElemId::from_index(self.schema.elements.len());
        self.schema.elements.push(ElementDecl {
            name: spec.name,
            type_id: spec.type_id,
            nillable: spec.nillable,
            is_abstract: spec.is_abstract,
            block: spec.block,
            final_set: spec.final_set,
            value_constraint,
            substitution_head: spec.substitution_group.unwrap_or(ElemId::NONE),
            identity_constraints: spec.identity_constraints,
            is_global: spec.global,
            substitutes: Vec::new(),
        });
        if spec.global {
            self.schema.global_elements.insert(spec.name, id);
        }
        Ok(id)
    }

    /// Add an attribute declaration
    pub fn attribute(&mut self, spec: AttributeSpec) -> Result<AttrId, ParseError> {
        self.simple_validator(spec.type_id)?;
        if spec.global && self.schema.global_attributes.contains_key(&spec.name) {
            return Err(ParseError::new(format!(
                "duplicate global attribute '{}'",
                self.schema.display_qname(spec.name)
            )));
        }
        let value_constraint = self.value_constraint(spec.value, &spec.namespaces);
        let id = AttrId::from_index(self.schema.attributes.len());
        self.schema.attributes.push(AttributeDecl {
            name: spec.name,
            type_id: spec.type_id,
            value_constraint,
            is_global: spec.global,
        });
        if spec.global {
            self.schema.global_attributes.insert(spec.name, id);
        }
        Ok(id)
    }

    /// Add an element or attribute wildcard
    ///
    /// `namespace` is the value of the `namespace` attribute; `##other` and
    /// `##targetNamespace` are resolved against `target_namespace`.
    pub fn wildcard(
        &mut self,
        namespace: &str,
        process_contents: ProcessContents,
        target_namespace: &str,
    ) -> Result<WildcardId, ParseError> {
        let target = self.namespace(target_namespace);
        let constraint = NamespaceConstraint::from_namespace_attr(namespace, target, &mut self.schema.namespaces)?;
        Ok(self.push_wildcard(Wildcard::new(constraint, process_contents, target)))
    }

    /// Add an identity constraint; attach it with [`ElementSpec::identity`]
    pub fn identity_constraint(&mut self, spec: IdentitySpec) -> Result<IcId, ParseError> {
        let display = self.schema.display_qname(spec.name).to_string();
        if self.schema.identities.iter().any(|ic| ic.name == spec.name) {
            return Err(ParseError::new(format!("duplicate identity constraint '{}'", display)));
        }
        if spec.fields.is_empty() {
            return Err(ParseError::new(format!("identity constraint '{}' has no field", display)));
        }
        if spec.kind == IdentityConstraintKind::KeyRef && spec.refer.is_none() {
            return Err(ParseError::new(format!("keyref '{}' has no refer", display)));
        }
        let namespaces = &mut self.schema.namespaces;
        let symbols = &mut self.schema.symbols;
        let selector = PathProgram::parse(&spec.selector, false, &spec.namespaces, namespaces, symbols)?;
        let mut fields = Vec::with_capacity(spec.fields.len());
        for field in &spec.fields {
            fields.push(PathProgram::parse(field, true, &spec.namespaces, namespaces, symbols)?);
        }
        self.schema.identities.push(IdentityConstraint {
            name: spec.name,
            kind: spec.kind,
            selector,
            fields,
            refer: IcId::NONE,
            refer_name: spec.refer,
        });
        Ok(IcId::from_index(self.schema.identities.len() - 1))
    }

    fn value_constraint(
        &mut self,
        value: Option<(ValueConstraintKind, String)>,
        namespaces: &NamespaceContext,
    ) -> Option<ValueConstraint> {
        let (kind, lexical) = value?;
        Some(ValueConstraint {
            kind,
            lexical,
            ns_context: self.ns_context(namespaces),
        })
    }

    // ---- table helpers ------------------------------------------------

    fn push_type(&mut self, def: TypeDef) -> TypeId {
        self.schema.types.push(def);
        TypeId::from_index(self.schema.types.len() - 1)
    }

    fn push_complex(&mut self, def: ComplexTypeDef) -> ComplexTypeId {
        self.schema.complex_types.push(def);
        self.particles.push(None);
        self.defined.push(false);
        ComplexTypeId::from_index(self.schema.complex_types.len() - 1)
    }

    fn push_validator(&mut self, def: ValidatorDef) -> ValidatorId {
        self.schema.validators.push(def);
        ValidatorId::from_index(self.schema.validators.len() - 1)
    }

    fn push_wildcard(&mut self, wildcard: Wildcard) -> WildcardId {
        self.schema.wildcards.push(wildcard);
        WildcardId::from_index(self.schema.wildcards.len() - 1)
    }

    fn push_model(&mut self, model: ContentModel) -> ModelId {
        self.schema.models.push(model);
        ModelId::from_index(self.schema.models.len() - 1)
    }

    // ---- finishing ----------------------------------------------------

    /// Resolve cross references, compile content models and check value
    /// constraints
    pub fn finish(mut self) -> Result<CompiledSchema, ParseError> {
        if let Some(index) = self.defined.iter().position(|defined| !defined) {
            let complex = ComplexTypeId::from_index(index);
            let name = self
                .schema
                .types
                .iter()
                .position(|t| t.complex == complex)
                .map(|t| self.schema.type_name(TypeId::from_index(t)))
                .unwrap_or_default();
            return Err(ParseError::new(format!(
                "complex type '{}' is declared but never defined",
                name
            )));
        }
        self.compute_ancestors()?;
        self.resolve_keyrefs()?;
        self.build_substitution_groups()?;
        self.compile_models()?;
        self.check_value_constraints()?;
        debug!(
            "compiled schema: {} types, {} elements, {} attributes, {} content models",
            self.schema.types.len(),
            self.schema.elements.len(),
            self.schema.attributes.len(),
            self.schema.models.len() + self.schema.all_groups.len()
        );
        Ok(self.schema)
    }

    fn compute_ancestors(&mut self) -> Result<(), ParseError> {
        let count = self.schema.types.len();
        for index in 0..count {
            let mut ancestors = vec![(TypeId::from_index(index), DerivationSet::EMPTY)];
            let mut mask = DerivationSet::EMPTY;
            let mut current = &self.schema.types[index];
            while let Some(base) = current.base.get() {
                if ancestors.len() > count {
                    return Err(ParseError::new(format!(
                        "circular derivation of type '{}'",
                        self.schema.type_name(TypeId::from_index(index))
                    )));
                }
                mask |= current.derivation.into();
                ancestors.push((base, mask));
                current = &self.schema.types[base.index()];
            }
            self.schema.types[index].ancestors = ancestors;
        }
        Ok(())
    }

    fn resolve_keyrefs(&mut self) -> Result<(), ParseError> {
        for index in 0..self.schema.identities.len() {
            let ic = &self.schema.identities[index];
            let Some(refer) = ic.refer_name.filter(|_| ic.kind == IdentityConstraintKind::KeyRef) else {
                continue;
            };
            let target = self
                .schema
                .identities
                .iter()
                .position(|other| other.name == refer && other.kind != IdentityConstraintKind::KeyRef);
            let Some(target) = target else {
                return Err(ParseError::new(format!(
                    "keyref '{}' refers to unknown key '{}'",
                    self.schema.display_qname(ic.name),
                    self.schema.display_qname(refer)
                )));
            };
            if self.schema.identities[target].fields.len() != ic.fields.len() {
                return Err(ParseError::new(format!(
                    "keyref '{}' and its key '{}' have different numbers of fields",
                    self.schema.display_qname(ic.name),
                    self.schema.display_qname(refer)
                )));
            }
            self.schema.identities[index].refer = IcId::from_index(target);
        }
        Ok(())
    }

    fn build_substitution_groups(&mut self) -> Result<(), ParseError> {
        let count = self.schema.elements.len();
        for index in 0..count {
            let member = ElemId::from_index(index);
            let member_type = self.schema.elements[index].type_id;
            let mut head = self.schema.elements[index].substitution_head;
            let mut steps = 0;
            while let Some(h) = head.get() {
                let member_name = self.schema.display_qname(self.schema.elements[index].name).to_string();
                if h == member || steps > count {
                    return Err(ParseError::new(format!(
                        "circular substitution group of element '{}'",
                        member_name
                    )));
                }
                let head_decl = &self.schema.elements[h.index()];
                let (head_type, head_final, next) =
                    (head_decl.type_id, head_decl.final_set, head_decl.substitution_head);
                let mask = self.schema.derivation_mask(member_type, head_type).ok_or_else(|| {
                    ParseError::new(format!(
                        "the type of '{}' does not derive from the type of its substitution group head",
                        member_name
                    ))
                })?;
                if mask.intersects(head_final) {
                    return Err(ParseError::new(format!(
                        "element '{}' cannot substitute a head that is final for {}",
                        member_name, mask
                    )));
                }
                let substitutes = &mut self.schema.elements[h.index()].substitutes;
                if !substitutes.contains(&member) {
                    substitutes.push(member);
                }
                head = next;
                steps += 1;
            }
        }
        Ok(())
    }

    fn compile_models(&mut self) -> Result<(), ParseError> {
        let mut empty_model = None;
        for index in 0..self.schema.complex_types.len() {
            let content = self.schema.complex_types[index].content;
            let particle = self.particles[index].take();
            let handle = match (content, particle) {
                (ContentKind::Any | ContentKind::SimpleText, _) => ContentHandle::None,
                (ContentKind::Empty, _) | (_, None) => {
                    let model = match empty_model {
                        Some(model) => model,
                        None => {
                            let model = self.push_model(ContentModel::empty());
                            empty_model = Some(model);
                            model
                        }
                    };
                    ContentHandle::Automaton(model)
                }
                (_, Some(particle)) => self.compile_particle(&particle)?,
            };
            self.schema.complex_types[index].model = handle;
        }
        Ok(())
    }

    fn compile_particle(&mut self, particle: &Particle) -> Result<ContentHandle, ParseError> {
        particle.check(true)?;
        check_particle_refs(particle, self.schema.elements.len(), self.schema.wildcards.len())?;
        match particle {
            Particle::Choice { particles, occurs } if particles.is_empty() => {
                Ok(ContentHandle::RejectAll { min_occurs: occurs.min })
            }
            Particle::All { .. } => {
                let group = compile::all_group(particle, &self.schema.elements)?;
                self.schema.all_groups.push(group);
                Ok(ContentHandle::All(AllGroupId::from_index(self.schema.all_groups.len() - 1)))
            }
            _ => {
                let model = compile::content_model(particle, &self.schema.elements)?;
                Ok(ContentHandle::Automaton(self.push_model(model)))
            }
        }
    }

    fn check_value_constraints(&self) -> Result<(), ParseError> {
        let schema = &self.schema;
        for decl in &schema.elements {
            let Some(vc) = &decl.value_constraint else { continue };
            let owner = format!("element '{}'", schema.display_qname(decl.name));
            match schema.type_def(decl.type_id).validator.get() {
                Some(vid) => {
                    schema
                        .canonical_key(vid, &vc.lexical, schema.ns_context(vc.ns_context))
                        .map_err(|e| constraint_error(&owner, &vc.lexical, e))?;
                }
                None => {
                    let mixed = schema
                        .complex_of(decl.type_id)
                        .map_or(false, |ct| matches!(ct.content, ContentKind::Mixed | ContentKind::Any));
                    if !mixed {
                        return Err(ParseError::new(format!(
                            "{} has a value constraint but its type has no character content",
                            owner
                        )));
                    }
                }
            }
        }
        let check_attribute = |decl: &AttributeDecl, vc: &ValueConstraint| -> Result<(), ParseError> {
            let owner = format!("attribute '{}'", schema.display_qname(decl.name));
            let vid = schema.type_def(decl.type_id).validator;
            schema
                .canonical_key(vid, &vc.lexical, schema.ns_context(vc.ns_context))
                .map(|_| ())
                .map_err(|e| constraint_error(&owner, &vc.lexical, e))
        };
        for decl in &schema.attributes {
            if let Some(vc) = &decl.value_constraint {
                check_attribute(decl, vc)?;
            }
        }
        for attribute_use in &schema.attribute_uses {
            if let Some(vc) = &attribute_use.value_constraint {
                check_attribute(schema.attribute(attribute_use.decl), vc)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_symbol_shared_by_qnames() {
        let mut builder = SchemaBuilder::new();
        let item = builder.symbol("item");
        assert_eq!(builder.qname("urn:a", "item").local, item);
        assert_eq!(builder.qname("", "item").local, item);
        assert_ne!(builder.symbol("other"), item);
    }

    #[test]
    fn test_builtins_registered() {
        let builder = SchemaBuilder::new();
        assert!(builder.builtin("string").is_some());
        assert!(builder.builtin("IDREFS").is_some());
        assert!(builder.builtin("nonsense").is_none());
        let schema = builder.finish().unwrap();
        let any = schema.complex_of(schema.any_type()).unwrap();
        assert_eq!(any.content, ContentKind::Any);
        assert!(any.any_attribute.is_some());
        assert_eq!(
            schema.type_def(schema.any_simple_type()).base,
            schema.any_type()
        );
    }

    #[test]
    fn test_ns_context_snapshots_are_shared() {
        let mut builder = SchemaBuilder::new();
        let empty = builder.ns_context(&NamespaceContext::new());
        assert_eq!(empty, NsContextId::from_index(0));
        let ctx = NamespaceContext::new().with_prefix("p", "urn:p");
        let first = builder.ns_context(&ctx);
        assert_eq!(builder.ns_context(&ctx), first);
        assert_ne!(first, empty);
    }

    #[test]
    fn test_looser_whitespace_rejected() {
        let mut builder = SchemaBuilder::new();
        let token = builder.builtin("token");
        let err = builder
            .restrict_simple(None, token, vec![FacetSpec::WhiteSpace(WhiteSpace::Preserve)])
            .unwrap_err();
        assert!(err.message.contains("looser"));
        assert_eq!(err.location.as_deref(), Some("simpleType 'token'"));
    }

    #[test]
    fn test_invalid_bound_rejected() {
        let mut builder = SchemaBuilder::new();
        let int = builder.builtin("int");
        assert!(builder
            .restrict_simple(None, int, vec![FacetSpec::MaxInclusive("ten".into())])
            .is_err());
        assert!(builder
            .restrict_simple(None, int, vec![FacetSpec::MaxInclusive("10".into())])
            .is_ok());
    }

    #[test]
    fn test_final_blocks_restriction() {
        let mut builder = SchemaBuilder::new();
        let name = builder.qname("urn:t", "Sealed");
        let sealed = builder
            .complex_type(ComplexTypeSpec::new(Some(name)).final_set(DerivationSet::EXTENSION))
            .unwrap();
        assert!(builder.complex_type(ComplexTypeSpec::new(None).extends(sealed)).is_err());
        assert!(builder.complex_type(ComplexTypeSpec::new(None).restricts(sealed)).is_ok());
    }

    #[test]
    fn test_recursive_type() {
        let mut builder = SchemaBuilder::new();
        let type_name = builder.qname("urn:t", "Node");
        let elem_name = builder.qname("urn:t", "node");
        let node = builder.declare_complex_type(Some(type_name)).unwrap();
        let child = builder.element(ElementSpec::new(elem_name, node)).unwrap();
        builder
            .define_complex_type(
                node,
                ComplexTypeSpec::new(Some(type_name))
                    .content(ContentKind::ElementOnly, Particle::element(child).with_occurs(0, None)),
            )
            .unwrap();
        let schema = builder.finish().unwrap();
        assert!(matches!(
            schema.complex_of(node).unwrap().model,
            ContentHandle::Automaton(_)
        ));
    }

    #[test]
    fn test_undefined_type_fails_finish() {
        let mut builder = SchemaBuilder::new();
        let name = builder.qname("urn:t", "Pending");
        builder.declare_complex_type(Some(name)).unwrap();
        let err = builder.finish().unwrap_err();
        assert!(err.message.contains("never defined"));
    }

    #[test]
    fn test_extension_merges_content_and_attributes() {
        let mut builder = SchemaBuilder::new();
        let string = builder.builtin("string");
        let [a, b, id, base_name] = [("", "a"), ("", "b"), ("", "id"), ("urn:t", "Base")]
            .map(|(ns, local)| builder.qname(ns, local));
        let a = builder.element(ElementSpec::new(a, string)).unwrap();
        let b = builder.element(ElementSpec::new(b, string)).unwrap();
        let id = builder.attribute(AttributeSpec::new(id, string)).unwrap();
        let base = builder
            .complex_type(
                ComplexTypeSpec::new(Some(base_name))
                    .content(ContentKind::ElementOnly, Particle::element(a))
                    .attribute(AttributeUseSpec::new(id).required()),
            )
            .unwrap();
        let derived = builder
            .complex_type(
                ComplexTypeSpec::new(None)
                    .extends(base)
                    .content(ContentKind::ElementOnly, Particle::element(b)),
            )
            .unwrap();
        let schema = builder.finish().unwrap();
        let ct = schema.complex_of(derived).unwrap();
        assert_eq!(schema.attribute_uses(ct).len(), 1);
        assert_eq!(schema.derivation_mask(derived, base), Some(DerivationSet::EXTENSION));
        let ContentHandle::Automaton(model) = ct.model else {
            panic!("expected an automaton");
        };
        let model = schema.model(model);
        let mut state = model.start();
        let names = [schema.element(a).name, schema.element(b).name];
        for name in names {
            model.feed(&schema, &mut state, name).unwrap();
        }
        assert!(model.is_final(state));
    }

    #[test]
    fn test_empty_choice_rejects_all() {
        let mut builder = SchemaBuilder::new();
        let ty = builder
            .complex_type(ComplexTypeSpec::new(None).content(ContentKind::ElementOnly, Particle::choice(vec![])))
            .unwrap();
        let schema = builder.finish().unwrap();
        assert_eq!(
            schema.complex_of(ty).unwrap().model,
            ContentHandle::RejectAll { min_occurs: 1 }
        );
    }

    #[test]
    fn test_substitution_requires_derived_type() {
        let mut builder = SchemaBuilder::new();
        let int = builder.builtin("int");
        let date = builder.builtin("date");
        let head_name = builder.qname("", "head");
        let member_name = builder.qname("", "member");
        let head = builder.element(ElementSpec::new(head_name, int).global()).unwrap();
        builder
            .element(ElementSpec::new(member_name, date).global().substitution_group(head))
            .unwrap();
        assert!(builder.finish().is_err());
    }

    #[test]
    fn test_transitive_substitutes() {
        let mut builder = SchemaBuilder::new();
        let decimal = builder.builtin("decimal");
        let names = ["a", "b", "c"].map(|n| builder.qname("", n));
        let a = builder.element(ElementSpec::new(names[0], decimal).global()).unwrap();
        let b = builder
            .element(ElementSpec::new(names[1], decimal).global().substitution_group(a))
            .unwrap();
        let c = builder
            .element(ElementSpec::new(names[2], decimal).global().substitution_group(b))
            .unwrap();
        let schema = builder.finish().unwrap();
        assert_eq!(schema.element(a).substitutes, vec![b, c]);
        assert_eq!(schema.element(b).substitutes, vec![c]);
    }

    #[test]
    fn test_bad_default_rejected() {
        let mut builder = SchemaBuilder::new();
        let int = builder.builtin("int");
        let name = builder.qname("", "n");
        builder.element(ElementSpec::new(name, int).default_value("x")).unwrap();
        assert!(builder.finish().is_err());
    }

    #[test]
    fn test_keyref_resolution() {
        let mut builder = SchemaBuilder::new();
        let key_name = builder.qname("", "k");
        let ref_name = builder.qname("", "r");
        let key = builder.identity_constraint(IdentitySpec::key(key_name, "item", &["@id"])).unwrap();
        let keyref = builder
            .identity_constraint(IdentitySpec::keyref(ref_name, key_name, "ref", &["@to"]))
            .unwrap();
        let schema = builder.finish().unwrap();
        assert_eq!(schema.identity(keyref).refer, key);

        let mut builder = SchemaBuilder::new();
        let ref_name = builder.qname("", "r");
        let missing = builder.qname("", "missing");
        builder
            .identity_constraint(IdentitySpec::keyref(ref_name, missing, "ref", &["@to"]))
            .unwrap();
        assert!(builder.finish().is_err());
    }
}
