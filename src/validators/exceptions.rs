//! XSD Validation Exceptions
//!
//! This module contains the error codes and the issue records produced while
//! validating an XML instance against a compiled schema.

use std::cmp::Ordering;
use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error codes consumers may match on.
///
/// Declaration order is the tie-break order used when sorting issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCode {
    /// The session has no compiled schema
    SchemaNotLoaded,
    /// Malformed XML, reader failure or a resource cap was exceeded
    XmlParse,
    /// The document has no root element
    NoRoot,
    /// An element has no usable declaration
    ElementNotDeclared,
    /// The element declaration is abstract
    ElementAbstract,
    /// The effective element type is abstract
    ElementTypeAbstract,
    /// `xsi:nil` used where no nillable declaration exists
    ElementNotNillable,
    /// Element content does not match the declared fixed value
    ElementFixedValue,
    /// A nilled element carries character data
    NilElementNotEmpty,
    /// The root element is not declared globally
    ValidateRootNotDeclared,
    /// A child element is not allowed at this point
    UnexpectedElement,
    /// A required child element is missing
    RequiredElementMissing,
    /// Non-whitespace text in element-only or empty content
    TextInElementOnly,
    /// The content model does not admit child elements here
    ContentModelInvalid,
    /// Attribute not declared and not admitted by a wildcard
    AttributeNotDeclared,
    /// Strict wildcard matched an attribute with no global declaration
    WildcardNotDeclared,
    /// Required attribute is absent
    RequiredAttributeMissing,
    /// Attribute value does not match its fixed value
    AttributeFixedValue,
    /// More than one ID-typed attribute on an element
    MultipleIdAttr,
    /// Lexical value not in the lexical space of its type
    DatatypeInvalid,
    /// Constraining facet violated
    FacetViolation,
    /// Value not in the enumeration
    Enumeration,
    /// Value does not match the pattern facet
    PatternMismatch,
    /// ID value seen twice
    DuplicateId,
    /// IDREF value with no matching ID
    IdRefNotFound,
    /// Key field missing, multiply selected or not simple
    IdentityAbsent,
    /// Duplicate key or unique tuple
    IdentityDuplicate,
    /// Keyref tuple with no matching key
    IdentityKeyRefFailed,
    /// `xsi:type` value is not a valid QName
    XsiTypeInvalid,
    /// `xsi:type` names an unknown type
    ValidateXsiTypeUnresolved,
    /// `xsi:type` is not validly derived or crosses a blocked step
    ValidateXsiTypeDerivationBlocked,
    /// `xsi:nil="true"` on a non-nillable element
    ValidateXsiNilNotNillable,
    /// Nilled element whose declaration carries a fixed value
    ValidateNilledHasFixed,
    /// Nilled element has child elements
    ValidateNilledNotEmpty,
    /// A schema location hint was found and the policy reports hints
    SchemaLocationHint,
}

impl ErrorCode {
    /// The stable code name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaNotLoaded => "ErrSchemaNotLoaded",
            Self::XmlParse => "ErrXMLParse",
            Self::NoRoot => "ErrNoRoot",
            Self::ElementNotDeclared => "ErrElementNotDeclared",
            Self::ElementAbstract => "ErrElementAbstract",
            Self::ElementTypeAbstract => "ErrElementTypeAbstract",
            Self::ElementNotNillable => "ErrElementNotNillable",
            Self::ElementFixedValue => "ErrElementFixedValue",
            Self::NilElementNotEmpty => "ErrNilElementNotEmpty",
            Self::ValidateRootNotDeclared => "ErrValidateRootNotDeclared",
            Self::UnexpectedElement => "ErrUnexpectedElement",
            Self::RequiredElementMissing => "ErrRequiredElementMissing",
            Self::TextInElementOnly => "ErrTextInElementOnly",
            Self::ContentModelInvalid => "ErrContentModelInvalid",
            Self::AttributeNotDeclared => "ErrAttributeNotDeclared",
            Self::WildcardNotDeclared => "ErrWildcardNotDeclared",
            Self::RequiredAttributeMissing => "ErrRequiredAttributeMissing",
            Self::AttributeFixedValue => "ErrAttributeFixedValue",
            Self::MultipleIdAttr => "ErrMultipleIDAttr",
            Self::DatatypeInvalid => "ErrDatatypeInvalid",
            Self::FacetViolation => "ErrFacetViolation",
            Self::Enumeration => "ErrEnumeration",
            Self::PatternMismatch => "ErrPatternMismatch",
            Self::DuplicateId => "ErrDuplicateID",
            Self::IdRefNotFound => "ErrIDRefNotFound",
            Self::IdentityAbsent => "ErrIdentityAbsent",
            Self::IdentityDuplicate => "ErrIdentityDuplicate",
            Self::IdentityKeyRefFailed => "ErrIdentityKeyRefFailed",
            Self::XsiTypeInvalid => "ErrXsiTypeInvalid",
            Self::ValidateXsiTypeUnresolved => "ErrValidateXsiTypeUnresolved",
            Self::ValidateXsiTypeDerivationBlocked => "ErrValidateXsiTypeDerivationBlocked",
            Self::ValidateXsiNilNotNillable => "ErrValidateXsiNilNotNillable",
            Self::ValidateNilledHasFixed => "ErrValidateNilledHasFixed",
            Self::ValidateNilledNotEmpty => "ErrValidateNilledNotEmpty",
            Self::SchemaLocationHint => "ErrSchemaLocationHint",
        }
    }

    /// Whether this code ends validation immediately
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SchemaNotLoaded | Self::XmlParse)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single validation finding, decorated with document position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Error code
    pub code: ErrorCode,
    /// Human readable message
    pub message: String,
    /// Document URI, when the caller supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    /// `/{ns}local` path of the offending node
    pub path: String,
    /// 1-based line, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// 1-based column, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    /// The offending value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    /// What would have been accepted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expected: Vec<String>,
}

impl ValidationIssue {
    /// Create a new issue with no position
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            document: None,
            path: String::new(),
            line: None,
            column: None,
            actual: None,
            expected: Vec::new(),
        }
    }

    /// Set the path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the document URI
    pub fn with_document(mut self, document: Option<&str>) -> Self {
        self.document = document.map(str::to_owned);
        self
    }

    /// Set line and column
    pub fn with_position(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Set the actual value
    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    /// Set the expected values
    pub fn with_expected(mut self, expected: Vec<String>) -> Self {
        self.expected = expected;
        self
    }

    /// Ordering used for the final report
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        self.document
            .cmp(&other.document)
            .then(self.line.cmp(&other.line))
            .then(self.column.cmp(&other.column))
            .then(self.code.cmp(&other.code))
            .then_with(|| self.message.cmp(&other.message))
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref doc) = self.document {
            write!(f, "{}:", doc)?;
        }
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, "{}:{}: ", line, column)?;
        }
        write!(f, "{}: {}", self.code, self.message)?;
        if !self.path.is_empty() {
            write!(f, " (at {})", self.path)?;
        }
        Ok(())
    }
}

/// The sorted list of findings returned when a document does not conform
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<ValidationIssue>);

impl ValidationErrors {
    /// A single fatal issue
    pub fn fatal(issue: ValidationIssue) -> Self {
        Self(vec![issue])
    }

    /// Whether the list is the result of a fatal condition
    pub fn is_fatal(&self) -> bool {
        self.0.len() == 1 && self.0[0].code.is_fatal()
    }

    /// The issues
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.0
    }

    /// Codes in report order
    pub fn codes(&self) -> Vec<ErrorCode> {
        self.0.iter().map(|i| i.code).collect()
    }

    /// Number of issues
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no issues
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as a JSON array
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "no validation errors"),
            [one] => write!(f, "{}", one),
            [first, rest @ ..] => write!(f, "{} (and {} more)", first, rest.len()),
        }
    }
}

/// Error returned by the value layer, before path decoration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError {
    /// One of the datatype codes
    pub code: ErrorCode,
    /// Message
    pub message: String,
    /// Name of the violated facet
    pub facet: Option<&'static str>,
    /// The offending value
    pub actual: String,
    /// Accepted values, for enumerations
    pub expected: Vec<String>,
    /// Set when the value is outside the lexical space of a primitive type
    pub lexical: bool,
}

impl ValueError {
    /// Lexical value not in the lexical space of the type
    pub fn invalid(type_name: &str, actual: &str) -> Self {
        Self {
            code: ErrorCode::DatatypeInvalid,
            message: format!("'{}' is not a valid value of the atomic type '{}'", actual, type_name),
            facet: None,
            actual: actual.to_owned(),
            expected: Vec::new(),
            lexical: true,
        }
    }

    /// A specific lexical problem
    pub fn datatype(actual: &str, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::DatatypeInvalid,
            message: message.into(),
            facet: None,
            actual: actual.to_owned(),
            expected: Vec::new(),
            lexical: false,
        }
    }

    /// A facet violation
    pub fn facet(facet: &'static str, actual: &str, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::FacetViolation,
            message: message.into(),
            facet: Some(facet),
            actual: actual.to_owned(),
            expected: Vec::new(),
            lexical: false,
        }
    }

    /// Name the derived type in a lexical-space error of its primitive
    pub fn retyped(mut self, type_name: &str) -> Self {
        if self.lexical {
            self.message = format!(
                "'{}' is not a valid value of the atomic type '{}'",
                self.actual, type_name
            );
        }
        self
    }

    /// Prefix the message with some context
    pub fn context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{}: {}", context, self.message);
        self
    }

    /// Convert into a positionless issue
    pub fn into_issue(self) -> ValidationIssue {
        ValidationIssue::new(self.code, self.message)
            .with_actual(self.actual)
            .with_expected(self.expected)
    }
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(facet) = self.facet {
            write!(f, " [facet '{}']", facet)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValueError {}
