//! XSD constraining facets
//!
//! A simple type's facets are lowered into a flat program of [`Facet`]
//! instructions executed in order against a value that has already been
//! whitespace-normalised and parsed. Bounds are stored as typed values so
//! that every comparison happens in the value space of the primitive.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::schema::{CompiledSchema, EnumId, PatternId};
use crate::validators::exceptions::{ErrorCode, ValueError};
use crate::validators::values::{fraction_digits, total_digits, Value};

/// White space handling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WhiteSpace {
    /// Preserve all white space
    #[default]
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl FromStr for WhiteSpace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preserve" => Ok(WhiteSpace::Preserve),
            "replace" => Ok(WhiteSpace::Replace),
            "collapse" => Ok(WhiteSpace::Collapse),
            _ => Err(Error::Value(format!(
                "Invalid whiteSpace value: '{}'. Must be 'preserve', 'replace', or 'collapse'",
                s
            ))),
        }
    }
}

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

impl WhiteSpace {
    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        self.normalize_cow(s).into_owned()
    }

    /// Normalize, borrowing the input when it is already normal
    pub fn normalize_cow<'a>(&self, s: &'a str) -> Cow<'a, str> {
        match self {
            WhiteSpace::Preserve => Cow::Borrowed(s),
            WhiteSpace::Replace => {
                if s.contains(['\t', '\n', '\r']) {
                    Cow::Owned(s.replace(['\t', '\n', '\r'], " "))
                } else {
                    Cow::Borrowed(s)
                }
            }
            WhiteSpace::Collapse => {
                if !needs_collapse(s) {
                    return Cow::Borrowed(s);
                }
                let mut result = String::with_capacity(s.len());
                for token in s.split(is_xml_space).filter(|t| !t.is_empty()) {
                    if !result.is_empty() {
                        result.push(' ');
                    }
                    result.push_str(token);
                }
                Cow::Owned(result)
            }
        }
    }
}

fn needs_collapse(s: &str) -> bool {
    if s.starts_with(' ') || s.ends_with(' ') || s.contains(['\t', '\n', '\r']) {
        return true;
    }
    s.as_bytes().windows(2).any(|w| w == b"  ")
}

/// Accepted values of one enumeration facet
#[derive(Debug, Clone, Default)]
pub struct EnumTable {
    /// Canonical keys of the accepted values
    pub keys: HashSet<Vec<u8>>,
    /// Lexical forms as written in the schema, for messages
    pub lexicals: Vec<String>,
}

impl EnumTable {
    /// Whether `key` is one of the accepted values
    pub fn contains(&self, key: &[u8]) -> bool {
        self.keys.contains(key)
    }
}

/// One instruction of a facet program
#[derive(Debug, Clone, PartialEq)]
pub enum Facet {
    /// Exact length
    Length(usize),
    /// Minimum length
    MinLength(usize),
    /// Maximum length
    MaxLength(usize),
    /// Patterns of one derivation step; any of them may match
    Pattern(Vec<PatternId>),
    /// Enumeration table
    Enumeration(EnumId),
    /// Inclusive lower bound
    MinInclusive(Value),
    /// Exclusive lower bound
    MinExclusive(Value),
    /// Inclusive upper bound
    MaxInclusive(Value),
    /// Exclusive upper bound
    MaxExclusive(Value),
    /// Maximum number of significant digits
    TotalDigits(u32),
    /// Maximum number of fraction digits
    FractionDigits(u32),
    /// Whitespace mode; applied before parsing, a no-op when executed
    WhiteSpace(WhiteSpace),
}

impl Facet {
    /// The facet's XSD name
    pub fn name(&self) -> &'static str {
        match self {
            Facet::Length(_) => "length",
            Facet::MinLength(_) => "minLength",
            Facet::MaxLength(_) => "maxLength",
            Facet::Pattern(_) => "pattern",
            Facet::Enumeration(_) => "enumeration",
            Facet::MinInclusive(_) => "minInclusive",
            Facet::MinExclusive(_) => "minExclusive",
            Facet::MaxInclusive(_) => "maxInclusive",
            Facet::MaxExclusive(_) => "maxExclusive",
            Facet::TotalDigits(_) => "totalDigits",
            Facet::FractionDigits(_) => "fractionDigits",
            Facet::WhiteSpace(_) => "whiteSpace",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::Length(n) | Facet::MinLength(n) | Facet::MaxLength(n) => {
                write!(f, "{}={}", self.name(), n)
            }
            Facet::TotalDigits(n) | Facet::FractionDigits(n) => write!(f, "{}={}", self.name(), n),
            Facet::MinInclusive(v) | Facet::MinExclusive(v) | Facet::MaxInclusive(v) | Facet::MaxExclusive(v) => {
                write!(f, "{}={}", self.name(), v)
            }
            Facet::WhiteSpace(ws) => write!(f, "whiteSpace={:?}", ws),
            Facet::Pattern(_) | Facet::Enumeration(_) => f.write_str(self.name()),
        }
    }
}

/// What a facet program is executed against
#[derive(Debug, Clone, Copy)]
pub struct FacetSubject<'a> {
    /// Whitespace-normalised lexical form
    pub normalized: &'a str,
    /// Parsed value; `None` for lists
    pub value: Option<&'a Value>,
    /// Length in the unit of the type; `None` when length facets do not apply
    pub length: Option<usize>,
    /// Canonical key of the whole value
    pub key: &'a [u8],
}

/// Execute `program` top to bottom, stopping at the first violation
pub fn check_facets(
    schema: &CompiledSchema,
    program: &[Facet],
    subject: &FacetSubject<'_>,
) -> Result<(), ValueError> {
    for facet in program {
        check_facet(schema, facet, subject)?;
    }
    Ok(())
}

fn check_facet(schema: &CompiledSchema, facet: &Facet, subject: &FacetSubject<'_>) -> Result<(), ValueError> {
    let actual = subject.normalized;
    match facet {
        Facet::Length(n) => match subject.length {
            Some(len) if len != *n => Err(ValueError::facet(
                "length",
                actual,
                format!("Length must be exactly {} (actual length: {})", n, len),
            )),
            _ => Ok(()),
        },
        Facet::MinLength(n) => match subject.length {
            Some(len) if len < *n => Err(ValueError::facet(
                "minLength",
                actual,
                format!("Length must be at least {} (actual length: {})", n, len),
            )),
            _ => Ok(()),
        },
        Facet::MaxLength(n) => match subject.length {
            Some(len) if len > *n => Err(ValueError::facet(
                "maxLength",
                actual,
                format!("Length must be at most {} (actual length: {})", n, len),
            )),
            _ => Ok(()),
        },
        Facet::Pattern(ids) => {
            if ids.iter().any(|id| schema.pattern(*id).is_match(actual)) {
                return Ok(());
            }
            let sources: Vec<String> = ids.iter().map(|id| schema.pattern(*id).source().to_owned()).collect();
            let mut err = ValueError::facet(
                "pattern",
                actual,
                format!("Value '{}' does not match pattern '{}'", actual, sources.join("' | '")),
            );
            err.code = ErrorCode::PatternMismatch;
            err.expected = sources;
            Err(err)
        }
        Facet::Enumeration(id) => {
            let table = schema.enumeration(*id);
            if table.contains(subject.key) {
                return Ok(());
            }
            let mut err = ValueError::facet(
                "enumeration",
                actual,
                format!("Value '{}' is not in the enumeration", actual),
            );
            err.code = ErrorCode::Enumeration;
            err.expected = table.lexicals.clone();
            Err(err)
        }
        Facet::MinInclusive(bound) => check_bound(facet, subject, bound, |o| o.is_ge()),
        Facet::MinExclusive(bound) => check_bound(facet, subject, bound, |o| o.is_gt()),
        Facet::MaxInclusive(bound) => check_bound(facet, subject, bound, |o| o.is_le()),
        Facet::MaxExclusive(bound) => check_bound(facet, subject, bound, |o| o.is_lt()),
        Facet::TotalDigits(n) => match subject.value {
            Some(Value::Decimal(d)) if total_digits(d) > *n => Err(ValueError::facet(
                "totalDigits",
                actual,
                format!("Value '{}' has more than {} total digits", actual, n),
            )),
            _ => Ok(()),
        },
        Facet::FractionDigits(n) => match subject.value {
            Some(Value::Decimal(d)) if fraction_digits(d) > *n => Err(ValueError::facet(
                "fractionDigits",
                actual,
                format!("Value '{}' has more than {} fraction digits", actual, n),
            )),
            _ => Ok(()),
        },
        Facet::WhiteSpace(_) => Ok(()),
    }
}

fn check_bound(
    facet: &Facet,
    subject: &FacetSubject<'_>,
    bound: &Value,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<(), ValueError> {
    let Some(value) = subject.value else {
        return Ok(());
    };
    // an incomparable value is not provably inside the bound
    match value.compare(bound) {
        Some(order) if accept(order) => Ok(()),
        Some(_) => Err(ValueError::facet(
            facet.name(),
            subject.normalized,
            format!("Value '{}' violates {}", subject.normalized, facet),
        )),
        None => Err(ValueError::facet(
            facet.name(),
            subject.normalized,
            format!("Value '{}' is not comparable with {}", subject.normalized, facet),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;
    use rust_decimal::Decimal;

    fn subject<'a>(text: &'a str, value: Option<&'a Value>, key: &'a [u8]) -> FacetSubject<'a> {
        FacetSubject {
            normalized: text,
            value,
            length: Some(text.chars().count()),
            key,
        }
    }

    #[test]
    fn test_whitespace_modes() {
        assert_eq!("preserve".parse::<WhiteSpace>().unwrap(), WhiteSpace::Preserve);
        assert_eq!("collapse".parse::<WhiteSpace>().unwrap(), WhiteSpace::Collapse);
        assert!("invalid".parse::<WhiteSpace>().is_err());
    }

    #[test]
    fn test_whitespace_normalize() {
        assert_eq!(WhiteSpace::Preserve.normalize("  a\tb  "), "  a\tb  ");
        assert_eq!(WhiteSpace::Replace.normalize("a\tb\nc"), "a b c");
        assert_eq!(WhiteSpace::Collapse.normalize("  a   b\t\n c  "), "a b c");
        assert_eq!(WhiteSpace::Collapse.normalize(" \t "), "");
    }

    #[test]
    fn test_normalize_borrows_when_clean() {
        assert!(matches!(WhiteSpace::Collapse.normalize_cow("a b"), Cow::Borrowed(_)));
        assert!(matches!(WhiteSpace::Replace.normalize_cow("a  b"), Cow::Borrowed(_)));
        assert!(matches!(WhiteSpace::Collapse.normalize_cow("a  b"), Cow::Owned(_)));
    }

    #[test]
    fn test_length_facets() {
        let schema = SchemaBuilder::new().finish().unwrap();
        let s = subject("héllo", None, b"");
        assert!(check_facets(&schema, &[Facet::Length(5)], &s).is_ok());
        let err = check_facets(&schema, &[Facet::MinLength(6)], &s).unwrap_err();
        assert_eq!(err.code, ErrorCode::FacetViolation);
        assert_eq!(err.facet, Some("minLength"));
        assert!(check_facets(&schema, &[Facet::MaxLength(4)], &s).is_err());

        // not applicable
        let na = FacetSubject { length: None, ..s };
        assert!(check_facets(&schema, &[Facet::Length(1)], &na).is_ok());
    }

    #[test]
    fn test_range_facets_in_value_space() {
        let schema = SchemaBuilder::new().finish().unwrap();
        let ten = Value::Decimal(Decimal::from(10));
        let value = Value::Decimal(Decimal::new(1000, 2));
        let s = subject("10.00", Some(&value), b"");
        assert!(check_facets(&schema, &[Facet::MaxInclusive(ten.clone())], &s).is_ok());
        assert!(check_facets(&schema, &[Facet::MinInclusive(ten.clone())], &s).is_ok());
        let err = check_facets(&schema, &[Facet::MaxExclusive(ten)], &s).unwrap_err();
        assert_eq!(err.facet, Some("maxExclusive"));
    }

    #[test]
    fn test_digit_facets() {
        let schema = SchemaBuilder::new().finish().unwrap();
        let value = Value::Decimal(Decimal::new(12345, 3));
        let s = subject("12.345", Some(&value), b"");
        assert!(check_facets(&schema, &[Facet::TotalDigits(5)], &s).is_ok());
        assert!(check_facets(&schema, &[Facet::TotalDigits(4)], &s).is_err());
        assert!(check_facets(&schema, &[Facet::FractionDigits(2)], &s).is_err());
        assert!(check_facets(&schema, &[Facet::FractionDigits(3)], &s).is_ok());
    }

    #[test]
    fn test_program_stops_at_first_violation() {
        let schema = SchemaBuilder::new().finish().unwrap();
        let s = subject("abc", None, b"");
        let err = check_facets(&schema, &[Facet::MaxLength(1), Facet::MinLength(9)], &s).unwrap_err();
        assert_eq!(err.facet, Some("maxLength"));
    }
}
