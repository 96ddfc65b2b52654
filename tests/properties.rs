//! Property tests: determinism of reports, session reuse, whitespace
//! handling of typed values and the wildcard namespace algebra

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use xmlschema_runtime::schema::{
    AttributeSpec, AttributeUseSpec, ComplexTypeSpec, ContentKind, ElementSpec, IdentitySpec, SchemaBuilder,
};
use xmlschema_runtime::symbols::{NamespaceId, NamespaceTable};
use xmlschema_runtime::validators::particles::Particle;
use xmlschema_runtime::validators::wildcards::NamespaceConstraint;
use xmlschema_runtime::{CompiledSchema, Session};

/// `<list><entry key="string">int</entry>{0,5}<end/>?</list>`, `key` unique
fn schema() -> Arc<CompiledSchema> {
    let mut builder = SchemaBuilder::new();
    let string = builder.builtin("string");
    let int = builder.builtin("int");
    let key = builder.qname("", "key");
    let key = builder.attribute(AttributeSpec::new(key, string)).unwrap();
    let entry_t = builder
        .complex_type(
            ComplexTypeSpec::new(None)
                .simple_content(int)
                .attribute(AttributeUseSpec::new(key)),
        )
        .unwrap();
    let entry = builder.qname("", "entry");
    let entry = builder.element(ElementSpec::new(entry, entry_t)).unwrap();
    let end = builder.qname("", "end");
    let empty = builder.complex_type(ComplexTypeSpec::new(None)).unwrap();
    let end = builder.element(ElementSpec::new(end, empty)).unwrap();
    let list_t = builder
        .complex_type(ComplexTypeSpec::new(None).content(
            ContentKind::ElementOnly,
            Particle::sequence(vec![
                Particle::element(entry).with_occurs(0, Some(5)),
                Particle::element(end).with_occurs(0, Some(1)),
            ]),
        ))
        .unwrap();
    let unique = builder.qname("", "entryKey");
    let unique = builder
        .identity_constraint(IdentitySpec::unique(unique, "entry", &["@key"]))
        .unwrap();
    let list = builder.qname("", "list");
    builder
        .element(ElementSpec::new(list, list_t).global().identity(unique))
        .unwrap();
    Arc::new(builder.finish().unwrap())
}

fn child() -> impl Strategy<Value = String> {
    prop_oneof![
        (
            prop::option::of(prop::sample::select(vec!["a", "b", "c"])),
            prop::sample::select(vec!["1", " 2 ", "-3", "x", "", "99999999999"]),
        )
            .prop_map(|(key, text)| match key {
                Some(key) => format!(r#"<entry key="{}">{}</entry>"#, key, text),
                None => format!("<entry>{}</entry>", text),
            }),
        Just("<end/>".to_string()),
        Just("<stray/>".to_string()),
        Just("text".to_string()),
        Just("\n  ".to_string()),
    ]
}

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(child(), 0..9).prop_map(|children| format!("<list>{}</list>", children.concat()))
}

fn whitespace() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec![' ', '\t', '\n', '\r']), 0..4)
        .prop_map(|chars| chars.into_iter().collect())
}

fn constraint() -> impl Strategy<Value = NamespaceConstraint> {
    let set = prop::collection::btree_set(0usize..5, 0..4);
    prop_oneof![
        Just(NamespaceConstraint::Any),
        set.clone().prop_map(|s| NamespaceConstraint::Not(namespaces(&s))),
        set.prop_map(|s| NamespaceConstraint::Enum(namespaces(&s))),
    ]
}

/// Slot 0 is the empty namespace, the others are `urn:1` .. `urn:4`
fn namespaces(slots: &BTreeSet<usize>) -> BTreeSet<NamespaceId> {
    let mut table = NamespaceTable::new();
    let ids: Vec<NamespaceId> = (0..5)
        .map(|i| if i == 0 { NamespaceId::EMPTY } else { table.intern(&format!("urn:{}", i)) })
        .collect();
    slots.iter().map(|i| ids[*i]).collect()
}

/// Every namespace a constraint can be asked about, unknown ones included
fn probes() -> Vec<NamespaceId> {
    let mut probes = vec![NamespaceId::NONE];
    probes.extend(namespaces(&(0..5).collect()));
    probes
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_reports_are_deterministic_and_sorted(xml in document()) {
        let schema = schema();
        let first = Session::with_schema(Arc::clone(&schema)).validate_str(&xml, None);
        let second = Session::with_schema(schema).validate_str(&xml, None);
        prop_assert_eq!(&first, &second);
        if let Err(errors) = first {
            prop_assert!(!errors.is_empty());
            for pair in errors.issues().windows(2) {
                prop_assert!(pair[0].sort_cmp(&pair[1]).is_le());
            }
        }
    }

    #[test]
    fn prop_reused_session_matches_fresh(docs in prop::collection::vec(document(), 1..5)) {
        let schema = schema();
        let mut reused = Session::with_schema(Arc::clone(&schema));
        for xml in &docs {
            let mut fresh = Session::with_schema(Arc::clone(&schema));
            prop_assert_eq!(reused.validate_str(xml, None), fresh.validate_str(xml, None));
            prop_assert_eq!(reused.issues(), fresh.issues());
        }
    }

    #[test]
    fn prop_int_values_collapse_whitespace(n in any::<i32>(), before in whitespace(), after in whitespace()) {
        let xml = format!(r#"<list><entry key="k">{}{}{}</entry></list>"#, before, n, after);
        prop_assert!(Session::with_schema(schema()).validate_str(&xml, None).is_ok());
    }

    #[test]
    fn prop_string_keys_compare_lexically(n in any::<i16>(), zeros in 0usize..3) {
        let padded = format!("{}{}", "0".repeat(zeros), n.unsigned_abs());
        let xml = format!(
            r#"<list><entry key="{}">1</entry><entry key="{}">1</entry></list>"#,
            n.unsigned_abs(),
            padded
        );
        let result = Session::with_schema(schema()).validate_str(&xml, None);
        prop_assert_eq!(result.is_ok(), zeros > 0);
    }

    #[test]
    fn prop_wildcard_intersection_is_exact(a in constraint(), b in constraint()) {
        let both = a.intersection(&b);
        for ns in probes() {
            prop_assert_eq!(both.matches(ns), a.matches(ns) && b.matches(ns));
        }
        prop_assert!(both.is_subset(&a));
        prop_assert!(both.is_subset(&b));
    }

    #[test]
    fn prop_wildcard_union_covers_both(a in constraint(), b in constraint()) {
        let either = a.union(&b);
        for ns in probes() {
            if a.matches(ns) || b.matches(ns) {
                prop_assert!(either.matches(ns));
            }
        }
        prop_assert!(a.is_subset(&either));
        prop_assert!(b.is_subset(&either));
        prop_assert_eq!(either, b.union(&a));
    }

    #[test]
    fn prop_wildcard_subset_agrees_with_matches(a in constraint(), b in constraint()) {
        if a.is_subset(&b) {
            for ns in probes() {
                prop_assert!(!a.matches(ns) || b.matches(ns));
            }
        }
    }
}
