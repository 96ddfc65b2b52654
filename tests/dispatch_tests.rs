//! Element dispatch: xsi:type, substitution groups, wildcards and nil

use std::sync::Arc;

use pretty_assertions::assert_eq;
use xmlschema_runtime::schema::{ComplexTypeSpec, ContentKind, DerivationSet, ElementSpec, SchemaBuilder};
use xmlschema_runtime::validators::particles::Particle;
use xmlschema_runtime::validators::wildcards::ProcessContents;
use xmlschema_runtime::{CompiledSchema, ErrorCode, Session, XSD_NAMESPACE, XSI_NAMESPACE};

fn schema() -> Arc<CompiledSchema> {
    let mut builder = SchemaBuilder::new();
    let string = builder.builtin("string");

    // ItemT: <name/>; BookT extends it with <isbn/>
    let name = builder.qname("", "name");
    let name = builder.element(ElementSpec::new(name, string)).unwrap();
    let isbn = builder.qname("", "isbn");
    let isbn = builder.element(ElementSpec::new(isbn, string)).unwrap();
    let item_t = builder.qname("", "ItemT");
    let item_t = builder
        .complex_type(ComplexTypeSpec::new(Some(item_t)).content(ContentKind::ElementOnly, Particle::element(name)))
        .unwrap();
    let book_t = builder.qname("", "BookT");
    builder
        .complex_type(
            ComplexTypeSpec::new(Some(book_t))
                .extends(item_t)
                .content(ContentKind::ElementOnly, Particle::element(isbn)),
        )
        .unwrap();
    let abstract_t = builder.qname("", "AbstractT");
    let abstract_t = builder
        .complex_type(ComplexTypeSpec::new(Some(abstract_t)).abstract_type())
        .unwrap();
    let concrete_t = builder.qname("", "ConcreteT");
    builder
        .complex_type(ComplexTypeSpec::new(Some(concrete_t)).extends(abstract_t))
        .unwrap();

    let item = builder.qname("", "item");
    builder.element(ElementSpec::new(item, item_t).global()).unwrap();
    let blocked = builder.qname("", "blocked");
    builder
        .element(ElementSpec::new(blocked, item_t).global().block(DerivationSet::EXTENSION))
        .unwrap();
    let abs = builder.qname("", "abs");
    builder.element(ElementSpec::new(abs, abstract_t).global()).unwrap();

    // substitution group headed by an abstract <shape/>
    let shape_t = builder.qname("", "ShapeT");
    let shape_t = builder.complex_type(ComplexTypeSpec::new(Some(shape_t))).unwrap();
    let circle_t = builder.complex_type(ComplexTypeSpec::new(None).extends(shape_t)).unwrap();
    let shape = builder.qname("", "shape");
    let shape = builder
        .element(ElementSpec::new(shape, shape_t).global().abstract_element())
        .unwrap();
    let circle = builder.qname("", "circle");
    builder
        .element(ElementSpec::new(circle, circle_t).global().substitution_group(shape))
        .unwrap();
    let square = builder.qname("", "square");
    builder
        .element(ElementSpec::new(square, shape_t).global().substitution_group(shape))
        .unwrap();
    let drawing_t = builder
        .complex_type(ComplexTypeSpec::new(None).content(
            ContentKind::ElementOnly,
            Particle::element(shape).with_occurs(0, None),
        ))
        .unwrap();
    let drawing = builder.qname("", "drawing");
    builder.element(ElementSpec::new(drawing, drawing_t).global()).unwrap();

    // element wildcards
    for (local, process_contents) in [
        ("strictBox", ProcessContents::Strict),
        ("laxBox", ProcessContents::Lax),
        ("skipBox", ProcessContents::Skip),
    ] {
        let wildcard = builder.wildcard("##any", process_contents, "").unwrap();
        let ty = builder
            .complex_type(ComplexTypeSpec::new(None).content(
                ContentKind::ElementOnly,
                Particle::any(wildcard).with_occurs(0, None),
            ))
            .unwrap();
        let box_name = builder.qname("", local);
        builder.element(ElementSpec::new(box_name, ty).global()).unwrap();
    }
    let anything = builder.qname("", "anything");
    let any_type = builder.any_type();
    builder.element(ElementSpec::new(anything, any_type).global()).unwrap();

    // nil
    let opt = builder.qname("", "opt");
    builder
        .element(ElementSpec::new(opt, string).global().nillable(true))
        .unwrap();
    let plain = builder.qname("", "plain");
    builder.element(ElementSpec::new(plain, string).global()).unwrap();
    let pinned = builder.qname("", "pinned");
    builder
        .element(ElementSpec::new(pinned, string).global().nillable(true).fixed("a"))
        .unwrap();

    Arc::new(builder.finish().unwrap())
}

fn codes(xml: &str) -> Vec<ErrorCode> {
    let mut session = Session::with_schema(schema());
    match session.validate_str(xml, None) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.codes(),
    }
}

/// Wrap `body` in a start tag declaring the xsi and xs prefixes
fn xsi(tag: &str, attributes: &str, body: &str) -> String {
    format!(
        r#"<{tag} xmlns:xsi="{XSI_NAMESPACE}" xmlns:xs="{XSD_NAMESPACE}" {attributes}>{body}</{tag}>"#
    )
}

#[test]
fn test_xsi_type_extension() {
    let body = "<name>n</name><isbn>1</isbn>";
    assert_eq!(codes(&xsi("item", r#"xsi:type="BookT""#, body)), vec![]);
    assert_eq!(codes(&xsi("item", "", body)), vec![ErrorCode::UnexpectedElement]);
}

#[test]
fn test_xsi_type_failures_skip_the_subtree() {
    let body = "<bogus/>";
    assert_eq!(
        codes(&xsi("item", r#"xsi:type="Unknown""#, body)),
        vec![ErrorCode::ValidateXsiTypeUnresolved]
    );
    assert_eq!(
        codes(&xsi("item", r#"xsi:type="1bad""#, body)),
        vec![ErrorCode::XsiTypeInvalid]
    );
    assert_eq!(
        codes(&xsi("item", r#"xsi:type="nope:ItemT""#, body)),
        vec![ErrorCode::XsiTypeInvalid]
    );
    assert_eq!(
        codes(&xsi("item", r#"xsi:type="xs:string""#, body)),
        vec![ErrorCode::ValidateXsiTypeDerivationBlocked]
    );
    assert_eq!(
        codes(&xsi("blocked", r#"xsi:type="BookT""#, "<name>n</name><isbn>1</isbn>")),
        vec![ErrorCode::ValidateXsiTypeDerivationBlocked]
    );
}

#[test]
fn test_abstract_type_needs_xsi_type() {
    assert_eq!(codes("<abs/>"), vec![ErrorCode::ElementTypeAbstract]);
    assert_eq!(codes(&xsi("abs", r#"xsi:type="ConcreteT""#, "")), vec![]);
}

#[test]
fn test_substitution_group_members() {
    assert_eq!(codes("<drawing><circle/><square/><circle/></drawing>"), vec![]);
    assert_eq!(codes("<drawing><shape/></drawing>"), vec![ErrorCode::ElementAbstract]);
    assert_eq!(codes("<drawing><line/></drawing>"), vec![ErrorCode::UnexpectedElement]);
}

#[test]
fn test_element_wildcards() {
    assert_eq!(codes("<strictBox><item><name>n</name></item></strictBox>"), vec![]);
    assert_eq!(
        codes("<strictBox><mystery/></strictBox>"),
        vec![ErrorCode::ElementNotDeclared]
    );
    assert_eq!(codes("<laxBox><mystery><deep>x</deep></mystery></laxBox>"), vec![]);
    assert_eq!(
        codes("<laxBox><item><bad/></item></laxBox>"),
        vec![ErrorCode::RequiredElementMissing, ErrorCode::RequiredElementMissing]
    );
    assert_eq!(codes("<skipBox><item><bad/></item><mystery/></skipBox>"), vec![]);
}

#[test]
fn test_any_type_content_is_lax() {
    assert_eq!(codes(r#"<anything><x a="1">t<y/></x>tail</anything>"#), vec![]);
    assert_eq!(
        codes("<anything><item><bad/><name>n</name></item></anything>"),
        vec![ErrorCode::RequiredElementMissing]
    );
}

#[test]
fn test_nil_rules() {
    assert_eq!(codes(&xsi("opt", r#"xsi:nil="true""#, "")), vec![]);
    assert_eq!(codes(&xsi("opt", r#"xsi:nil="false""#, "text")), vec![]);
    assert_eq!(
        codes(&xsi("opt", r#"xsi:nil="true""#, "text")),
        vec![ErrorCode::NilElementNotEmpty]
    );
    assert_eq!(
        codes(&xsi("plain", r#"xsi:nil="true""#, "")),
        vec![ErrorCode::ValidateXsiNilNotNillable]
    );
    assert_eq!(
        codes(&xsi("pinned", r#"xsi:nil="true""#, "")),
        vec![ErrorCode::ValidateNilledHasFixed]
    );
    assert_eq!(
        codes(&xsi("opt", r#"xsi:nil="maybe""#, "")),
        vec![ErrorCode::DatatypeInvalid]
    );
    assert_eq!(
        codes(&xsi("laxBox", "", r#"<mystery xsi:nil="true"/>"#)),
        vec![ErrorCode::ElementNotNillable]
    );
}
