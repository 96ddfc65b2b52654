//! XSD Simple Type validators
//!
//! This module implements XSD simple type validation including:
//! - Atomic types (built-in and derived)
//! - List types (whitespace-separated lists)
//! - Union types (value matching any member type)
//!
//! Every simple type (and every complex type with simple content) owns a
//! [`ValidatorDef`]: a variety, a whitespace mode and a facet program.
//! Validation writes the canonical key of the value into a caller-owned
//! buffer so the hot path allocates nothing once the buffer has grown.
//!
//! See: https://www.w3.org/TR/xmlschema-2/

use std::borrow::Cow;

use crate::namespaces::NamespaceResolver;
use crate::schema::{CompiledSchema, ValidatorId};
use crate::validators::builtins::{AtomicKind, IdClass};
use crate::validators::exceptions::ValueError;
use crate::validators::facets::{check_facets, Facet, FacetSubject, WhiteSpace};
use crate::validators::values::{parse_atomic, Value, LIST_ITEM_SEPARATOR};

/// Variety of a simple type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variety {
    /// Atomic type with the lexical kind of its primitive ancestor
    Atomic(AtomicKind),
    /// Whitespace-separated list of items
    List {
        /// Item validator
        item: ValidatorId,
    },
    /// First member that accepts the value wins
    Union {
        /// Member validators in declaration order
        members: Vec<ValidatorId>,
    },
}

/// Compiled simple type
#[derive(Debug, Clone)]
pub struct ValidatorDef {
    /// Type name for messages
    pub name: String,
    /// Variety
    pub variety: Variety,
    /// Whitespace mode applied before parsing
    pub whitespace: WhiteSpace,
    /// Facet program, in evaluation order
    pub facets: Vec<Facet>,
}

impl ValidatorDef {
    /// Lexical kind when atomic
    pub fn atomic_kind(&self) -> Option<AtomicKind> {
        match self.variety {
            Variety::Atomic(kind) => Some(kind),
            _ => None,
        }
    }
}

/// Result of a successful simple-type validation
#[derive(Debug, Clone)]
pub struct SimpleOutcome<'v> {
    /// Whitespace-normalised lexical value
    pub normalized: Cow<'v, str>,
    /// ID typing of the value
    pub id_class: IdClass,
    /// Validator that accepted the value (the chosen member for unions)
    pub actual: ValidatorId,
}

impl CompiledSchema {
    /// Validate `lexical` against validator `vid`, appending its canonical
    /// key to `key_out`
    ///
    /// On failure `key_out` is left as it was.
    pub fn validate_simple<'v>(
        &self,
        vid: ValidatorId,
        lexical: &'v str,
        ns: &dyn NamespaceResolver,
        key_out: &mut Vec<u8>,
    ) -> Result<SimpleOutcome<'v>, ValueError> {
        let def = self.validator(vid);
        let normalized = def.whitespace.normalize_cow(lexical);
        let start = key_out.len();
        match self.check_normalized(vid, &normalized, ns, key_out) {
            Ok((id_class, actual)) => Ok(SimpleOutcome {
                normalized,
                id_class,
                actual,
            }),
            Err(err) => {
                key_out.truncate(start);
                Err(err)
            }
        }
    }

    /// Canonical key of `lexical` under `vid`
    pub fn canonical_key(
        &self,
        vid: ValidatorId,
        lexical: &str,
        ns: &dyn NamespaceResolver,
    ) -> Result<Vec<u8>, ValueError> {
        let mut key = Vec::new();
        self.validate_simple(vid, lexical, ns, &mut key)?;
        Ok(key)
    }

    /// Parse a lexical value of an atomic validator into its typed value,
    /// without running the facet program
    pub(crate) fn parse_value(
        &self,
        vid: ValidatorId,
        lexical: &str,
        ns: &dyn NamespaceResolver,
    ) -> Result<Value, ValueError> {
        let def = self.validator(vid);
        match def.variety {
            Variety::Atomic(kind) => parse_atomic(kind, &def.whitespace.normalize_cow(lexical), ns),
            _ => Err(ValueError::datatype(
                lexical,
                format!("'{}' is not an atomic type", def.name),
            )),
        }
    }

    fn check_normalized(
        &self,
        vid: ValidatorId,
        normalized: &str,
        ns: &dyn NamespaceResolver,
        key_out: &mut Vec<u8>,
    ) -> Result<(IdClass, ValidatorId), ValueError> {
        let def = self.validator(vid);
        let start = key_out.len();
        match &def.variety {
            Variety::Atomic(kind) => {
                let value = parse_atomic(*kind, normalized, ns).map_err(|e| e.retyped(&def.name))?;
                value.write_key(key_out);
                let subject = FacetSubject {
                    normalized,
                    value: Some(&value),
                    length: value.facet_length(),
                    key: &key_out[start..],
                };
                check_facets(self, &def.facets, &subject)?;
                Ok((kind.id_class(), vid))
            }
            Variety::List { item } => {
                let item_def = self.validator(*item);
                let mut count = 0usize;
                let mut id_class = IdClass::None;
                for token in normalized.split([' ', '\t', '\n', '\r']).filter(|t| !t.is_empty()) {
                    if count > 0 {
                        key_out.push(LIST_ITEM_SEPARATOR);
                    }
                    let token = item_def.whitespace.normalize_cow(token);
                    let (item_class, _) = self
                        .check_normalized(*item, &token, ns, key_out)
                        .map_err(|e| e.context(format_args!("list item of '{}'", def.name)))?;
                    id_class = item_class.as_list();
                    count += 1;
                }
                let subject = FacetSubject {
                    normalized,
                    value: None,
                    length: Some(count),
                    key: &key_out[start..],
                };
                check_facets(self, &def.facets, &subject)?;
                Ok((id_class, vid))
            }
            Variety::Union { members } => {
                let mut chosen = None;
                for member in members {
                    let member_text = self.validator(*member).whitespace.normalize_cow(normalized);
                    match self.check_normalized(*member, &member_text, ns, key_out) {
                        Ok(result) => {
                            chosen = Some(result);
                            break;
                        }
                        Err(_) => key_out.truncate(start),
                    }
                }
                let Some((id_class, actual)) = chosen else {
                    return Err(ValueError::invalid(&def.name, normalized).context("no member type accepts the value"));
                };
                let subject = FacetSubject {
                    normalized,
                    value: None,
                    length: None,
                    key: &key_out[start..],
                };
                check_facets(self, &def.facets, &subject)?;
                Ok((id_class, actual))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::NamespaceContext;
    use crate::schema::{FacetSpec, SchemaBuilder};
    use crate::validators::exceptions::ErrorCode;
    use crate::XSD_NAMESPACE;

    fn validator_of(schema: &CompiledSchema, local: &str) -> ValidatorId {
        let tid = schema.global_type(schema.lookup_qname(XSD_NAMESPACE, local)).unwrap();
        schema.type_def(tid).validator
    }

    fn key(schema: &CompiledSchema, vid: ValidatorId, s: &str) -> Result<Vec<u8>, ValueError> {
        schema.canonical_key(vid, s, &NamespaceContext::new())
    }

    #[test]
    fn test_builtin_integer_ranges() {
        let schema = SchemaBuilder::new().finish().unwrap();
        let byte = validator_of(&schema, "byte");
        assert!(key(&schema, byte, "127").is_ok());
        let err = key(&schema, byte, "128").unwrap_err();
        assert_eq!(err.code, ErrorCode::FacetViolation);
        assert_eq!(err.facet, Some("maxInclusive"));
        let positive = validator_of(&schema, "positiveInteger");
        assert!(key(&schema, positive, "0").is_err());
        let int = validator_of(&schema, "int");
        assert_eq!(key(&schema, int, " 01 ").unwrap(), key(&schema, int, "1").unwrap());
        let err = key(&schema, int, "abc").unwrap_err();
        assert_eq!(err.code, ErrorCode::DatatypeInvalid);
        assert!(err.message.contains("int"));
    }

    #[test]
    fn test_builtin_lists() {
        let schema = SchemaBuilder::new().finish().unwrap();
        let tokens = validator_of(&schema, "NMTOKENS");
        assert!(key(&schema, tokens, " a  b ").is_ok());
        assert!(key(&schema, tokens, "").is_err());
        let idrefs = validator_of(&schema, "IDREFS");
        let mut buf = Vec::new();
        let outcome = schema
            .validate_simple(idrefs, "x y", &NamespaceContext::new(), &mut buf)
            .unwrap();
        assert_eq!(outcome.id_class, IdClass::IdRefs);
        assert_eq!(buf, b"sx\x01sy".to_vec());
    }

    #[test]
    fn test_key_untouched_on_failure() {
        let schema = SchemaBuilder::new().finish().unwrap();
        let int = validator_of(&schema, "int");
        let mut buf = b"prefix".to_vec();
        assert!(schema.validate_simple(int, "x", &NamespaceContext::new(), &mut buf).is_err());
        assert_eq!(buf, b"prefix".to_vec());
    }

    #[test]
    fn test_restriction_with_facets() {
        let mut builder = SchemaBuilder::new();
        let string = builder.builtin("string");
        let code = builder
            .restrict_simple(
                None,
                string,
                vec![
                    FacetSpec::Pattern("[A-Z]{2}".into()),
                    FacetSpec::Enumeration(vec!["AB".into(), "CD".into()]),
                ],
            )
            .unwrap();
        let schema = builder.finish().unwrap();
        let vid = schema.type_def(code).validator;
        assert!(key(&schema, vid, "AB").is_ok());
        assert_eq!(key(&schema, vid, "ab").unwrap_err().code, ErrorCode::PatternMismatch);
        let err = key(&schema, vid, "EF").unwrap_err();
        assert_eq!(err.code, ErrorCode::Enumeration);
        assert_eq!(err.expected, vec!["AB".to_string(), "CD".to_string()]);
    }

    #[test]
    fn test_lexical_errors_name_the_derived_type() {
        let mut builder = SchemaBuilder::new();
        let int = builder.builtin("int");
        let date = builder.builtin("date");
        let name = builder.qname("", "Percent");
        let percent = builder
            .restrict_simple(Some(name), int, vec![FacetSpec::MaxInclusive("100".into())])
            .unwrap();
        let name = builder.qname("", "Day");
        let day = builder.restrict_simple(Some(name), date, Vec::new()).unwrap();
        let schema = builder.finish().unwrap();

        let err = key(&schema, schema.type_def(percent).validator, "lots").unwrap_err();
        assert_eq!(err.code, ErrorCode::DatatypeInvalid);
        assert!(err.lexical);
        assert!(err.message.contains("'Percent'"), "{}", err.message);

        let err = key(&schema, schema.type_def(day).validator, "0000-01-01").unwrap_err();
        assert!(!err.lexical);
        assert!(err.message.contains("year 0000"), "{}", err.message);
    }

    #[test]
    fn test_decimal_enumeration_in_value_space() {
        let mut builder = SchemaBuilder::new();
        let decimal = builder.builtin("decimal");
        let t = builder
            .restrict_simple(None, decimal, vec![FacetSpec::Enumeration(vec!["1.0".into()])])
            .unwrap();
        let schema = builder.finish().unwrap();
        let vid = schema.type_def(t).validator;
        assert!(key(&schema, vid, "1.00").is_ok());
        assert!(key(&schema, vid, "1").is_ok());
        assert!(key(&schema, vid, "1.5").is_err());
    }

    #[test]
    fn test_union_keys_are_tagged() {
        let mut builder = SchemaBuilder::new();
        let int = builder.builtin("int");
        let string = builder.builtin("string");
        let union = builder.union_type(None, vec![int, string], vec![]).unwrap();
        let schema = builder.finish().unwrap();
        let vid = schema.type_def(union).validator;
        let int_vid = schema.type_def(int).validator;
        let mut buf = Vec::new();
        let outcome = schema
            .validate_simple(vid, "1", &NamespaceContext::new(), &mut buf)
            .unwrap();
        assert_eq!(outcome.actual, int_vid);
        assert_eq!(buf, b"d1".to_vec());
        assert_eq!(key(&schema, vid, "x").unwrap(), b"sx".to_vec());
    }

    #[test]
    fn test_list_facets_count_items() {
        let mut builder = SchemaBuilder::new();
        let int = builder.builtin("int");
        let list = builder
            .list_type(None, int, vec![FacetSpec::MaxLength(2)])
            .unwrap();
        let schema = builder.finish().unwrap();
        let vid = schema.type_def(list).validator;
        assert!(key(&schema, vid, "1 2").is_ok());
        assert_eq!(key(&schema, vid, "1 2 3").unwrap_err().facet, Some("maxLength"));
        assert_eq!(key(&schema, vid, "1 x").unwrap_err().code, ErrorCode::DatatypeInvalid);
    }
}
