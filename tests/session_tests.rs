//! Session behaviour: resource caps, fatal reader errors, event replay,
//! session reuse and sharing a schema between threads

use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use xmlschema_runtime::schema::{
    AttributeSpec, AttributeUseSpec, ComplexTypeSpec, ContentKind, ElementSpec, IdentitySpec, SchemaBuilder,
};
use xmlschema_runtime::validators::particles::Particle;
use xmlschema_runtime::{
    CompiledSchema, ErrorCode, EventList, EventReader, Session, ValidationOptions, XmlReader,
};

/// `<list><entry key="string">int</entry>*</list>` with `key` unique
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
    let list_t = builder
        .complex_type(ComplexTypeSpec::new(None).content(
            ContentKind::ElementOnly,
            Particle::element(entry).with_occurs(0, None),
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

fn session_with(options: ValidationOptions) -> Session {
    Session::new(Some(schema()), options)
}

const VALID: &str = r#"<list><entry key="a">1</entry><entry key="b">2</entry></list>"#;
const INVALID: &str = r#"<list><entry key="a">x</entry><entry key="a">2</entry><bad/></list>"#;

#[test]
fn test_attribute_cap() {
    let options = ValidationOptions {
        max_attributes: 1,
        ..ValidationOptions::default()
    };
    let mut session = session_with(options);
    assert!(session.validate_str(VALID, None).is_ok());
    let errors = session
        .validate_str(r#"<list xmlns:p="urn:p" p:a="1"/>"#, None)
        .unwrap_err();
    assert!(errors.is_fatal());
    assert_eq!(errors.codes(), vec![ErrorCode::XmlParse]);
}

#[test]
fn test_token_size_cap() {
    let options = ValidationOptions {
        max_token_size: 4,
        ..ValidationOptions::default()
    };
    let mut session = session_with(options);
    assert!(session.validate_str(VALID, None).is_ok());
    let errors = session
        .validate_str(r#"<list><entry key="a">123456</entry></list>"#, None)
        .unwrap_err();
    assert!(errors.is_fatal());
    let errors = session
        .validate_str(r#"<list><entry key="abcdef">1</entry></list>"#, None)
        .unwrap_err();
    assert!(errors.is_fatal());
}

#[test]
fn test_depth_cap_from_builder() {
    let mut session = session_with(ValidationOptions::default().with_max_depth(1));
    assert!(session.validate_str("<list/>", None).is_ok());
    let errors = session.validate_str(VALID, None).unwrap_err();
    assert_eq!(errors.codes(), vec![ErrorCode::XmlParse]);
    assert_eq!(errors.issues()[0].column, Some(7));
}

#[test]
fn test_reader_errors_are_fatal() {
    let mut session = Session::with_schema(schema());
    for xml in [
        "<list><entry></list>",
        "<list/><list/>",
        "<list/>trailing",
        "text<list/>",
    ] {
        let errors = session.validate_str(xml, Some("doc.xml")).unwrap_err();
        assert!(errors.is_fatal(), "{}", xml);
        assert_eq!(errors.codes(), vec![ErrorCode::XmlParse], "{}", xml);
        assert_eq!(errors.issues()[0].document.as_deref(), Some("doc.xml"));
        assert_eq!(session.issues(), errors.issues());
    }
    assert!(session.validate_str("\u{feff}<list/>\n", None).is_ok());
}

#[test]
fn test_issues_are_sorted_and_reported_once() {
    let mut session = Session::with_schema(schema());
    let errors = session.validate_str(INVALID, Some("doc.xml")).unwrap_err();
    assert_eq!(
        errors.codes(),
        vec![
            ErrorCode::DatatypeInvalid,
            ErrorCode::IdentityDuplicate,
            ErrorCode::UnexpectedElement,
        ]
    );
    let columns: Vec<_> = errors.issues().iter().map(|i| i.column).collect();
    let mut sorted = columns.clone();
    sorted.sort();
    assert_eq!(columns, sorted);
    assert!(errors.issues().iter().all(|i| i.document.as_deref() == Some("doc.xml")));
    assert_eq!(session.issues(), errors.issues());
}

#[test]
fn test_json_report() {
    let mut session = Session::with_schema(schema());
    let errors = session.validate_str("<list><bad/></list>", None).unwrap_err();
    let json: serde_json::Value = serde_json::from_str(&errors.to_json().unwrap()).unwrap();
    assert_eq!(json[0]["code"], "ErrUnexpectedElement");
    assert_eq!(json[0]["path"], "/list/bad");
    assert_eq!(json[0]["line"], 1);
    assert_eq!(json[0]["column"], 7);
    assert!(json[0].get("document").is_none());
}

#[test]
fn test_reused_session_matches_fresh_session() {
    let mut reused = Session::with_schema(schema());
    for xml in [INVALID, VALID, INVALID, "<list><bad/>", VALID] {
        let mut fresh = Session::with_schema(schema());
        assert_eq!(reused.validate_str(xml, None), fresh.validate_str(xml, None));
    }
}

#[test]
fn test_event_list_replay() {
    let mut reader = XmlReader::new(INVALID);
    let mut events = EventList::record(&mut reader).unwrap();
    assert!(!events.is_empty());

    let mut session = Session::with_schema(schema());
    let first = session.validate(&mut events, None).unwrap_err();
    events.rewind();
    let second = session.validate(&mut events, None).unwrap_err();
    assert_eq!(first.codes(), second.codes());
    assert_eq!(first.codes(), session.validate_str(INVALID, None).unwrap_err().codes());
}

#[test]
fn test_event_list_builder() {
    let mut events = EventList::new()
        .start("", "list")
        .start("", "entry")
        .attribute("", "key", "a")
        .text("7")
        .end("", "entry")
        .leaf("", "entry", "8")
        .end("", "list");
    let mut session = Session::with_schema(schema());
    assert!(session.validate(&mut events, None).is_ok());

    let mut events = EventList::new().start("", "list").leaf("", "entry", "x").end("", "list");
    let errors = session.validate(&mut events, None).unwrap_err();
    assert_eq!(errors.codes(), vec![ErrorCode::DatatypeInvalid]);
    assert_eq!(errors.issues()[0].line, Some(2));
}

#[test]
fn test_event_list_mismatched_end_tag_is_fatal() {
    let mut session = Session::with_schema(schema());
    for mut events in [
        EventList::new().start("", "list").leaf("", "entry", "1").end("", "entries"),
        EventList::new().start("", "list").leaf("", "entry", "1").end("urn:other", "list"),
    ] {
        let errors = session.validate(&mut events, None).unwrap_err();
        assert!(errors.is_fatal());
        assert_eq!(errors.codes(), vec![ErrorCode::XmlParse]);
        assert_eq!(errors.issues()[0].line, Some(5));
    }
}

#[test]
fn test_dyn_event_reader() {
    let mut reader = XmlReader::new(VALID);
    let reader: &mut dyn EventReader = &mut reader;
    let mut session = Session::with_schema(schema());
    assert!(session.validate(reader, None).is_ok());
}

#[test]
fn test_arena_overflow_is_counted() {
    let options = ValidationOptions {
        arena_capacity: 0,
        ..ValidationOptions::default()
    };
    let mut session = session_with(options);
    assert!(session.validate_str(VALID, None).is_ok());
    assert!(session.arena_overflow_count() > 0);

    let mut session = Session::with_schema(schema());
    assert!(session.validate_str(VALID, None).is_ok());
    assert_eq!(session.arena_overflow_count(), 0);
}

#[test]
fn test_options_from_json() {
    let options = ValidationOptions::from_json(r#"{"max_depth": 1, "schema_location_policy": "error"}"#).unwrap();
    assert_eq!(options.max_depth, 1);
    assert_eq!(options.max_attributes, ValidationOptions::default().max_attributes);
    assert!(ValidationOptions::from_json(r#"{"max_depth": "deep"}"#).is_err());

    let mut session = session_with(options);
    assert_eq!(session.options().max_depth, 1);
    assert!(session.validate_str(VALID, None).unwrap_err().is_fatal());
}

#[test]
fn test_schema_shared_between_threads() {
    let schema = schema();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let schema = Arc::clone(&schema);
            thread::spawn(move || {
                let mut session = Session::with_schema(schema);
                let mut results = Vec::new();
                for n in 0..20 {
                    let xml = if (i + n) % 2 == 0 { VALID } else { INVALID };
                    results.push(session.validate_str(xml, None).map_err(|e| e.codes()));
                }
                results
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let results = handle.join().unwrap();
        for (n, result) in results.into_iter().enumerate() {
            assert_eq!(result.is_ok(), (i + n) % 2 == 0);
        }
    }
}

#[test]
fn test_swapping_schema() {
    let mut session = Session::new(None, ValidationOptions::default());
    assert_eq!(
        session.validate_str(VALID, None).unwrap_err().codes(),
        vec![ErrorCode::SchemaNotLoaded]
    );
    session.set_schema(Some(schema()));
    assert!(session.schema().is_some());
    assert!(session.validate_str(VALID, None).is_ok());
}
