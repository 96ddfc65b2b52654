//! XSD built-in types
//!
//! This module defines the built-in primitive and derived types for XML Schema:
//! their lexical kinds, value-space families, whitespace rules and the implied
//! range facets of the integer family. The schema builder registers every
//! entry of [`BUILTIN_TYPES`] in the XSD namespace.

use std::fmt;

use crate::validators::facets::WhiteSpace;

// =============================================================================
// XSD Namespace Constants
// =============================================================================

/// XSD 1.0 Namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XSD anyType type name
pub const XSD_ANY_TYPE: &str = "anyType";
/// XSD anySimpleType type name
pub const XSD_ANY_SIMPLE_TYPE: &str = "anySimpleType";

/// Lexical kind of an atomic built-in, which fixes its parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicKind {
    /// anySimpleType content
    AnySimple,
    /// xs:string
    String,
    /// xs:normalizedString
    NormalizedString,
    /// xs:token
    Token,
    /// xs:language
    Language,
    /// xs:NMTOKEN
    NmToken,
    /// xs:Name
    Name,
    /// xs:NCName
    NcName,
    /// xs:ID
    Id,
    /// xs:IDREF
    IdRef,
    /// xs:ENTITY
    Entity,
    /// xs:boolean
    Boolean,
    /// xs:decimal
    Decimal,
    /// xs:integer and its range-restricted descendants
    Integer,
    /// xs:float
    Float,
    /// xs:double
    Double,
    /// xs:duration
    Duration,
    /// xs:dateTime
    DateTime,
    /// xs:time
    Time,
    /// xs:date
    Date,
    /// xs:gYearMonth
    GYearMonth,
    /// xs:gYear
    GYear,
    /// xs:gMonthDay
    GMonthDay,
    /// xs:gDay
    GDay,
    /// xs:gMonth
    GMonth,
    /// xs:hexBinary
    HexBinary,
    /// xs:base64Binary
    Base64Binary,
    /// xs:anyURI
    AnyUri,
    /// xs:QName
    QName,
    /// xs:NOTATION
    Notation,
}

/// Value-space family; values of different families never compare equal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    /// string and its descendants (and anySimpleType)
    String,
    /// boolean
    Boolean,
    /// decimal and the integer family
    Decimal,
    /// float
    Float,
    /// double
    Double,
    /// duration
    Duration,
    /// dateTime
    DateTime,
    /// time
    Time,
    /// date
    Date,
    /// gYearMonth
    GYearMonth,
    /// gYear
    GYear,
    /// gMonthDay
    GMonthDay,
    /// gDay
    GDay,
    /// gMonth
    GMonth,
    /// hexBinary
    HexBinary,
    /// base64Binary
    Base64Binary,
    /// anyURI
    AnyUri,
    /// QName
    QName,
    /// NOTATION
    Notation,
}

impl Primitive {
    /// Tag byte that prefixes canonical keys of this family
    pub fn key_tag(&self) -> u8 {
        match self {
            Primitive::String => b's',
            Primitive::Boolean => b'b',
            Primitive::Decimal => b'd',
            Primitive::Float => b'f',
            Primitive::Double => b'F',
            Primitive::Duration => b'u',
            Primitive::DateTime => b'T',
            Primitive::Time => b't',
            Primitive::Date => b'D',
            Primitive::GYearMonth => b'Y',
            Primitive::GYear => b'y',
            Primitive::GMonthDay => b'M',
            Primitive::GDay => b'a',
            Primitive::GMonth => b'm',
            Primitive::HexBinary => b'h',
            Primitive::Base64Binary => b'6',
            Primitive::AnyUri => b'U',
            Primitive::QName => b'q',
            Primitive::Notation => b'n',
        }
    }

    /// Whether ordering facets apply
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            Primitive::Decimal
                | Primitive::Float
                | Primitive::Double
                | Primitive::Duration
                | Primitive::DateTime
                | Primitive::Time
                | Primitive::Date
                | Primitive::GYearMonth
                | Primitive::GYear
                | Primitive::GMonthDay
                | Primitive::GDay
                | Primitive::GMonth
        )
    }
}

impl AtomicKind {
    /// Value-space family of this kind
    pub fn primitive(&self) -> Primitive {
        match self {
            AtomicKind::AnySimple
            | AtomicKind::String
            | AtomicKind::NormalizedString
            | AtomicKind::Token
            | AtomicKind::Language
            | AtomicKind::NmToken
            | AtomicKind::Name
            | AtomicKind::NcName
            | AtomicKind::Id
            | AtomicKind::IdRef
            | AtomicKind::Entity => Primitive::String,
            AtomicKind::Boolean => Primitive::Boolean,
            AtomicKind::Decimal | AtomicKind::Integer => Primitive::Decimal,
            AtomicKind::Float => Primitive::Float,
            AtomicKind::Double => Primitive::Double,
            AtomicKind::Duration => Primitive::Duration,
            AtomicKind::DateTime => Primitive::DateTime,
            AtomicKind::Time => Primitive::Time,
            AtomicKind::Date => Primitive::Date,
            AtomicKind::GYearMonth => Primitive::GYearMonth,
            AtomicKind::GYear => Primitive::GYear,
            AtomicKind::GMonthDay => Primitive::GMonthDay,
            AtomicKind::GDay => Primitive::GDay,
            AtomicKind::GMonth => Primitive::GMonth,
            AtomicKind::HexBinary => Primitive::HexBinary,
            AtomicKind::Base64Binary => Primitive::Base64Binary,
            AtomicKind::AnyUri => Primitive::AnyUri,
            AtomicKind::QName => Primitive::QName,
            AtomicKind::Notation => Primitive::Notation,
        }
    }

    /// ID typing class of values of this kind
    pub fn id_class(&self) -> IdClass {
        match self {
            AtomicKind::Id => IdClass::Id,
            AtomicKind::IdRef => IdClass::IdRef,
            AtomicKind::Entity => IdClass::Entity,
            _ => IdClass::None,
        }
    }
}

/// How a validated value takes part in ID/IDREF/ENTITY checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdClass {
    /// Not an ID-related type
    #[default]
    None,
    /// xs:ID
    Id,
    /// xs:IDREF
    IdRef,
    /// list of xs:IDREF
    IdRefs,
    /// xs:ENTITY
    Entity,
    /// list of xs:ENTITY
    Entities,
}

impl IdClass {
    /// The class of a list whose items have this class
    pub fn as_list(self) -> IdClass {
        match self {
            IdClass::IdRef => IdClass::IdRefs,
            IdClass::Entity => IdClass::Entities,
            // a list of IDs does not identify the element
            _ => IdClass::None,
        }
    }
}

/// Shape of a built-in type
#[derive(Debug, Clone, Copy)]
pub enum BuiltinShape {
    /// Atomic with a lexical kind
    Atomic(AtomicKind),
    /// List of another built-in, at least one item
    List(&'static str),
}

/// Definition of a built-in XSD simple type
#[derive(Debug, Clone)]
pub struct BuiltinType {
    /// Type name (local name in the XSD namespace)
    pub name: &'static str,
    /// Base type name
    pub base: &'static str,
    /// Atomic kind or list item type
    pub shape: BuiltinShape,
    /// White space handling
    pub white_space: WhiteSpace,
    /// Implied minInclusive, as a lexical value
    pub min_inclusive: Option<&'static str>,
    /// Implied maxInclusive, as a lexical value
    pub max_inclusive: Option<&'static str>,
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.name)
    }
}

const fn atomic(
    name: &'static str,
    base: &'static str,
    kind: AtomicKind,
    white_space: WhiteSpace,
) -> BuiltinType {
    BuiltinType {
        name,
        base,
        shape: BuiltinShape::Atomic(kind),
        white_space,
        min_inclusive: None,
        max_inclusive: None,
    }
}

const fn ranged(
    name: &'static str,
    base: &'static str,
    min: Option<&'static str>,
    max: Option<&'static str>,
) -> BuiltinType {
    BuiltinType {
        name,
        base,
        shape: BuiltinShape::Atomic(AtomicKind::Integer),
        white_space: WhiteSpace::Collapse,
        min_inclusive: min,
        max_inclusive: max,
    }
}

const fn list(name: &'static str, item: &'static str) -> BuiltinType {
    BuiltinType {
        name,
        base: XSD_ANY_SIMPLE_TYPE,
        shape: BuiltinShape::List(item),
        white_space: WhiteSpace::Collapse,
        min_inclusive: None,
        max_inclusive: None,
    }
}

// =============================================================================
// Built-in Type Registry
// =============================================================================

lazy_static::lazy_static! {
    /// Registry of built-in XSD simple types, bases before derived types
    pub static ref BUILTIN_TYPES: Vec<BuiltinType> = {
        use AtomicKind as K;
        use WhiteSpace::{Collapse, Preserve, Replace};
        vec![
            atomic(XSD_ANY_SIMPLE_TYPE, XSD_ANY_TYPE, K::AnySimple, Preserve),
            atomic("string", XSD_ANY_SIMPLE_TYPE, K::String, Preserve),
            atomic("normalizedString", "string", K::NormalizedString, Replace),
            atomic("token", "normalizedString", K::Token, Collapse),
            atomic("language", "token", K::Language, Collapse),
            atomic("NMTOKEN", "token", K::NmToken, Collapse),
            atomic("Name", "token", K::Name, Collapse),
            atomic("NCName", "Name", K::NcName, Collapse),
            atomic("ID", "NCName", K::Id, Collapse),
            atomic("IDREF", "NCName", K::IdRef, Collapse),
            atomic("ENTITY", "NCName", K::Entity, Collapse),
            list("NMTOKENS", "NMTOKEN"),
            list("IDREFS", "IDREF"),
            list("ENTITIES", "ENTITY"),
            atomic("boolean", XSD_ANY_SIMPLE_TYPE, K::Boolean, Collapse),
            atomic("decimal", XSD_ANY_SIMPLE_TYPE, K::Decimal, Collapse),
            ranged("integer", "decimal", None, None),
            ranged("nonPositiveInteger", "integer", None, Some("0")),
            ranged("negativeInteger", "nonPositiveInteger", None, Some("-1")),
            ranged("long", "integer", Some("-9223372036854775808"), Some("9223372036854775807")),
            ranged("int", "long", Some("-2147483648"), Some("2147483647")),
            ranged("short", "int", Some("-32768"), Some("32767")),
            ranged("byte", "short", Some("-128"), Some("127")),
            ranged("nonNegativeInteger", "integer", Some("0"), None),
            ranged("unsignedLong", "nonNegativeInteger", Some("0"), Some("18446744073709551615")),
            ranged("unsignedInt", "unsignedLong", Some("0"), Some("4294967295")),
            ranged("unsignedShort", "unsignedInt", Some("0"), Some("65535")),
            ranged("unsignedByte", "unsignedShort", Some("0"), Some("255")),
            ranged("positiveInteger", "nonNegativeInteger", Some("1"), None),
            atomic("float", XSD_ANY_SIMPLE_TYPE, K::Float, Collapse),
            atomic("double", XSD_ANY_SIMPLE_TYPE, K::Double, Collapse),
            atomic("duration", XSD_ANY_SIMPLE_TYPE, K::Duration, Collapse),
            atomic("dateTime", XSD_ANY_SIMPLE_TYPE, K::DateTime, Collapse),
            atomic("time", XSD_ANY_SIMPLE_TYPE, K::Time, Collapse),
            atomic("date", XSD_ANY_SIMPLE_TYPE, K::Date, Collapse),
            atomic("gYearMonth", XSD_ANY_SIMPLE_TYPE, K::GYearMonth, Collapse),
            atomic("gYear", XSD_ANY_SIMPLE_TYPE, K::GYear, Collapse),
            atomic("gMonthDay", XSD_ANY_SIMPLE_TYPE, K::GMonthDay, Collapse),
            atomic("gDay", XSD_ANY_SIMPLE_TYPE, K::GDay, Collapse),
            atomic("gMonth", XSD_ANY_SIMPLE_TYPE, K::GMonth, Collapse),
            atomic("hexBinary", XSD_ANY_SIMPLE_TYPE, K::HexBinary, Collapse),
            atomic("base64Binary", XSD_ANY_SIMPLE_TYPE, K::Base64Binary, Collapse),
            atomic("anyURI", XSD_ANY_SIMPLE_TYPE, K::AnyUri, Collapse),
            atomic("QName", XSD_ANY_SIMPLE_TYPE, K::QName, Collapse),
            atomic("NOTATION", XSD_ANY_SIMPLE_TYPE, K::Notation, Collapse),
        ]
    };
}

/// Look up a built-in simple type by local name
pub fn get_builtin_type(name: &str) -> Option<&'static BuiltinType> {
    BUILTIN_TYPES.iter().find(|t| t.name == name)
}
