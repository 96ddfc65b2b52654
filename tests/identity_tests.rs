//! Identity constraints: nested scopes, absent fields, element-text fields
//! and keyrefs resolved in an enclosing scope

use std::sync::Arc;

use pretty_assertions::assert_eq;
use xmlschema_runtime::schema::{
    AttributeSpec, AttributeUseSpec, ComplexTypeSpec, ContentKind, ElementSpec, IdentitySpec, SchemaBuilder, TypeId,
};
use xmlschema_runtime::symbols::QName;
use xmlschema_runtime::validators::particles::Particle;
use xmlschema_runtime::{CompiledSchema, ErrorCode, Session};

fn attribute(builder: &mut SchemaBuilder, local: &str, ty: TypeId) -> AttributeUseSpec {
    let name = builder.qname("", local);
    AttributeUseSpec::new(builder.attribute(AttributeSpec::new(name, ty)).unwrap())
}

fn name(builder: &mut SchemaBuilder, local: &str) -> QName {
    builder.qname("", local)
}

fn schema() -> Arc<CompiledSchema> {
    let mut builder = SchemaBuilder::new();
    let string = builder.builtin("string");
    let int = builder.builtin("int");

    // <item id="int" a="" b=""/>
    let item_t = ComplexTypeSpec::new(None)
        .attribute(attribute(&mut builder, "id", int))
        .attribute(attribute(&mut builder, "a", string))
        .attribute(attribute(&mut builder, "b", string));
    let item_t = builder.complex_type(item_t).unwrap();
    let item = name(&mut builder, "item");
    let item = builder.element(ElementSpec::new(item, item_t)).unwrap();
    let items = Particle::element(item).with_occurs(0, None);
    let list_t = builder
        .complex_type(ComplexTypeSpec::new(None).content(ContentKind::ElementOnly, items))
        .unwrap();

    // <groups><group>item*</group>*</groups>, ids unique per group
    let per_group = name(&mut builder, "idsPerGroup");
    let per_group = builder
        .identity_constraint(IdentitySpec::unique(per_group, "item", &["@id"]))
        .unwrap();
    let group = name(&mut builder, "group");
    let group = builder
        .element(ElementSpec::new(group, list_t).global().identity(per_group))
        .unwrap();
    let groups_t = builder
        .complex_type(ComplexTypeSpec::new(None).content(
            ContentKind::ElementOnly,
            Particle::element(group).with_occurs(0, None),
        ))
        .unwrap();
    let groups = name(&mut builder, "groups");
    builder.element(ElementSpec::new(groups, groups_t).global()).unwrap();

    // <pairs>item*</pairs>, (a, b) unique
    let pair = name(&mut builder, "pairUnique");
    let pair = builder
        .identity_constraint(IdentitySpec::unique(pair, "item", &["@a", "@b"]))
        .unwrap();
    let pairs = name(&mut builder, "pairs");
    builder
        .element(ElementSpec::new(pairs, list_t).global().identity(pair))
        .unwrap();

    // <people><person><name/><info><x/></info>?</person>*</people>
    let person_name = name(&mut builder, "name");
    let person_name = builder.element(ElementSpec::new(person_name, string)).unwrap();
    let x = name(&mut builder, "x");
    let x = builder.element(ElementSpec::new(x, string)).unwrap();
    let info_t = builder
        .complex_type(ComplexTypeSpec::new(None).content(
            ContentKind::ElementOnly,
            Particle::element(x).with_occurs(0, Some(1)),
        ))
        .unwrap();
    let info = name(&mut builder, "info");
    let info = builder.element(ElementSpec::new(info, info_t)).unwrap();
    let person_t = builder
        .complex_type(ComplexTypeSpec::new(None).content(
            ContentKind::ElementOnly,
            Particle::sequence(vec![
                Particle::element(person_name).with_occurs(0, Some(1)),
                Particle::element(info).with_occurs(0, Some(1)),
            ]),
        ))
        .unwrap();
    let person = name(&mut builder, "person");
    let person = builder.element(ElementSpec::new(person, person_t)).unwrap();
    let people_t = builder
        .complex_type(ComplexTypeSpec::new(None).content(
            ContentKind::ElementOnly,
            Particle::element(person).with_occurs(0, None),
        ))
        .unwrap();
    let by_name = name(&mut builder, "personByName");
    let by_name = builder
        .identity_constraint(IdentitySpec::key(by_name, "person", &["name"]))
        .unwrap();
    let by_info = name(&mut builder, "personByInfo");
    let by_info = builder
        .identity_constraint(IdentitySpec::unique(by_info, "person", &["info"]))
        .unwrap();
    let people = name(&mut builder, "people");
    builder
        .element(
            ElementSpec::new(people, people_t)
                .global()
                .identity(by_name)
                .identity(by_info),
        )
        .unwrap();

    // <library><section><ref to=""/>*</section>*<book id=""/>*</library>
    let book_key = name(&mut builder, "bookKey");
    let book_key_ic = builder
        .identity_constraint(IdentitySpec::key(book_key, ".//book", &["@id"]))
        .unwrap();
    let cite = name(&mut builder, "cite");
    let cite = builder
        .identity_constraint(IdentitySpec::keyref(cite, book_key, "ref", &["@to"]))
        .unwrap();
    let ref_t = {
        let to_attr = attribute(&mut builder, "to", string).required();
        builder.complex_type(ComplexTypeSpec::new(None).attribute(to_attr))
    }
        .unwrap();
    let reference = name(&mut builder, "ref");
    let reference = builder.element(ElementSpec::new(reference, ref_t)).unwrap();
    let section_t = builder
        .complex_type(ComplexTypeSpec::new(None).content(
            ContentKind::ElementOnly,
            Particle::element(reference).with_occurs(0, None),
        ))
        .unwrap();
    let section = name(&mut builder, "section");
    let section = builder
        .element(ElementSpec::new(section, section_t).identity(cite))
        .unwrap();
    let book_t = {
        let id_attr = attribute(&mut builder, "id", string).required();
        builder.complex_type(ComplexTypeSpec::new(None).attribute(id_attr))
    }
        .unwrap();
    let book = name(&mut builder, "book");
    let book = builder.element(ElementSpec::new(book, book_t)).unwrap();
    let library_t = builder
        .complex_type(ComplexTypeSpec::new(None).content(
            ContentKind::ElementOnly,
            Particle::sequence(vec![
                Particle::element(section).with_occurs(0, None),
                Particle::element(book).with_occurs(0, None),
            ]),
        ))
        .unwrap();
    let library = name(&mut builder, "library");
    builder
        .element(ElementSpec::new(library, library_t).global().identity(book_key_ic))
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

#[test]
fn test_unique_is_scoped_to_the_declaring_element() {
    assert_eq!(
        codes(r#"<groups><group><item id="1"/></group><group><item id="1"/></group></groups>"#),
        vec![]
    );
    assert_eq!(
        codes(r#"<groups><group><item id="1"/><item id="2"/><item id="01"/></group></groups>"#),
        vec![ErrorCode::IdentityDuplicate]
    );
}

#[test]
fn test_unique_ignores_incomplete_tuples() {
    assert_eq!(codes("<group><item/><item/></group>"), vec![]);
    assert_eq!(codes(r#"<pairs><item a="x"/><item a="x"/></pairs>"#), vec![]);
}

#[test]
fn test_multi_field_tuples() {
    assert_eq!(
        codes(r#"<pairs><item a="x" b="y"/><item a="x" b="z"/><item a="y" b="x"/></pairs>"#),
        vec![]
    );
    let mut session = Session::with_schema(schema());
    let errors = session
        .validate_str(r#"<pairs><item a="x" b="y"/><item b="y" a="x"/></pairs>"#, None)
        .unwrap_err();
    assert_eq!(errors.codes(), vec![ErrorCode::IdentityDuplicate]);
    assert_eq!(errors.issues()[0].path, "/pairs/item");
    assert_eq!(errors.issues()[0].column, Some(27));
}

#[test]
fn test_key_fields_from_element_text() {
    assert_eq!(
        codes("<people><person><name>a</name></person><person><name>b</name></person></people>"),
        vec![]
    );
    assert_eq!(
        codes("<people><person><name>a</name></person><person><name>a</name></person></people>"),
        vec![ErrorCode::IdentityDuplicate]
    );
}

#[test]
fn test_key_requires_every_field() {
    assert_eq!(
        codes("<people><person><name>a</name></person><person/></people>"),
        vec![ErrorCode::IdentityAbsent]
    );
}

#[test]
fn test_field_selecting_complex_element() {
    let mut session = Session::with_schema(schema());
    let errors = session
        .validate_str("<people><person><name>a</name><info><x/></info></person></people>", None)
        .unwrap_err();
    assert_eq!(errors.codes(), vec![ErrorCode::IdentityAbsent]);
    assert!(errors.issues()[0].message.contains("simple content"));
}

#[test]
fn test_keyref_resolved_in_enclosing_scope() {
    assert_eq!(
        codes(r#"<library><section><ref to="b1"/></section><book id="b1"/></library>"#),
        vec![]
    );
    let mut session = Session::with_schema(schema());
    let errors = session
        .validate_str(
            r#"<library><section><ref to="b1"/><ref to="b2"/></section><book id="b1"/></library>"#,
            None,
        )
        .unwrap_err();
    assert_eq!(errors.codes(), vec![ErrorCode::IdentityKeyRefFailed]);
    assert_eq!(errors.issues()[0].path, "/library/section/ref");
    assert!(errors.issues()[0].message.contains("'b2'"));
}

#[test]
fn test_descendant_selector_key() {
    assert_eq!(
        codes(r#"<library><book id="b1"/><book id="b1"/></library>"#),
        vec![ErrorCode::IdentityDuplicate]
    );
    assert_eq!(
        codes("<library><book/></library>"),
        vec![ErrorCode::RequiredAttributeMissing]
    );
}
