//! Validation sessions
//!
//! A [`Session`] validates one document at a time against a shared
//! [`CompiledSchema`]. It owns every piece of mutable state a document needs
//! (element frames, text buffer, namespace scopes, identity tables, ID sets
//! and the byte arena) and keeps their storage across documents, so that a
//! warmed-up session validates without allocating on the hot path.
//!
//! A session is single-threaded. Several sessions may share one schema
//! through an [`Arc`] and run on separate threads.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, trace};

use crate::arena::Arena;
use crate::error::Error;
use crate::limits::{SchemaLocationPolicy, ValidationOptions};
use crate::locations::{collect_hints, SchemaLocationHint};
use crate::namespaces::{NamespaceResolver, NamespaceScopes};
use crate::paths::PathBuilder;
use crate::reader::{Attribute, EventReader, XmlEvent, XmlReader};
use crate::schema::{CompiledSchema, ContentHandle, ContentKind, ElemId, IcId, ValidatorId};
use crate::symbols::QName;
use crate::validators::attributes::{untyped_key, AttributeChecker, AttributeContext, InstanceAttribute};
use crate::validators::elements::{dispatch, Dispatch, DispatchContext, ElementSlot, ElementTarget, XsiAttributes};
use crate::validators::exceptions::{ErrorCode, ValidationErrors, ValidationIssue};
use crate::validators::identities::{ElementValue, IdentityEngine, NodeContext};
use crate::validators::ids::IdTracker;
use crate::validators::models::ModelMatch;
use crate::validators::wildcards::ProcessContents;
use crate::{XMLNS_NAMESPACE, XSI_NAMESPACE};

/// What happens to character data inside an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextRule {
    /// Collected and validated at the end tag
    Value(ValidatorId),
    /// Collected as an untyped string
    Untyped,
    /// Whitespace only
    ElementOnly,
    /// Anything goes, nothing collected
    Mixed,
}

/// State of one open element
#[derive(Debug, Clone, Copy)]
struct Frame {
    decl: ElemId,
    text: TextRule,
    model: ContentHandle,
    state: u32,
    counts_start: usize,
    text_start: usize,
    /// simple type or simple content: no child elements
    simple: bool,
    /// `anyType` content: children are matched laxly
    lax: bool,
    nilled: bool,
    skip: bool,
    has_children: bool,
    text_reported: bool,
    /// mixed content whose text is compared with a value constraint
    keep_text: bool,
    line: u32,
    column: u32,
}

impl Frame {
    fn new(text_start: usize, counts_start: usize, line: u32, column: u32) -> Self {
        Self {
            decl: ElemId::NONE,
            text: TextRule::Untyped,
            model: ContentHandle::None,
            state: 0,
            counts_start,
            text_start,
            simple: false,
            lax: false,
            nilled: false,
            skip: false,
            has_children: false,
            text_reported: false,
            keep_text: false,
            line,
            column,
        }
    }
}

/// How the value of a closing element is seen by identity fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClosedValue {
    Key,
    Complex,
    Absent,
}

/// A validation session
#[derive(Debug)]
pub struct Session {
    schema: Option<Arc<CompiledSchema>>,
    options: ValidationOptions,
    arena: Arena,
    frames: Vec<Frame>,
    counts: Vec<u32>,
    text: String,
    key: Vec<u8>,
    namespaces: NamespaceScopes,
    paths: PathBuilder,
    attributes: AttributeChecker,
    identity: IdentityEngine,
    ids: IdTracker,
    unknown_names: HashSet<String>,
    hints: Vec<SchemaLocationHint>,
    issues: Vec<ValidationIssue>,
    document: Option<String>,
    root_seen: bool,
}

impl Session {
    /// Create a session; without a schema every run fails with
    /// `ErrSchemaNotLoaded`
    pub fn new(schema: Option<Arc<CompiledSchema>>, options: ValidationOptions) -> Self {
        let arena = Arena::new(options.arena_capacity);
        Self {
            schema,
            options,
            arena,
            frames: Vec::new(),
            counts: Vec::new(),
            text: String::new(),
            key: Vec::new(),
            namespaces: NamespaceScopes::new(),
            paths: PathBuilder::new(),
            attributes: AttributeChecker::new(),
            identity: IdentityEngine::new(),
            ids: IdTracker::new(),
            unknown_names: HashSet::new(),
            hints: Vec::new(),
            issues: Vec::new(),
            document: None,
            root_seen: false,
        }
    }

    /// Session with default options
    pub fn with_schema(schema: Arc<CompiledSchema>) -> Self {
        Self::new(Some(schema), ValidationOptions::default())
    }

    /// The schema documents are validated against
    pub fn schema(&self) -> Option<&Arc<CompiledSchema>> {
        self.schema.as_ref()
    }

    /// Replace the schema used by the next run
    pub fn set_schema(&mut self, schema: Option<Arc<CompiledSchema>>) {
        self.schema = schema;
    }

    /// Session options
    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Issues of the last run, sorted
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Hints recorded by the last run under [`SchemaLocationPolicy::Document`]
    pub fn schema_location_hints(&self) -> &[SchemaLocationHint] {
        &self.hints
    }

    /// Arena allocations of the last run that spilled to the heap
    pub fn arena_overflow_count(&self) -> usize {
        self.arena.overflow_count()
    }

    /// Return to the zeroed state, keeping buffers within the retention caps
    pub fn reset(&mut self) {
        let options = &self.options;
        self.frames.clear();
        self.counts.clear();
        if self.frames.capacity() > options.max_retained_stack_depth {
            self.frames = Vec::new();
            self.counts = Vec::new();
        }
        self.text.clear();
        if self.text.capacity() > options.max_retained_text_bytes {
            self.text = String::new();
        }
        self.key.clear();
        if self.key.capacity() > options.max_retained_text_bytes {
            self.key = Vec::new();
        }
        self.namespaces.reset(options.max_retained_stack_depth);
        self.paths.reset(options.max_retained_text_bytes);
        self.attributes.reset(options.max_retained_text_bytes);
        self.identity.reset(options.max_retained_identity_entries);
        self.ids.reset(options.max_retained_identity_entries);
        self.unknown_names.clear();
        if self.unknown_names.capacity() > options.max_retained_identity_entries {
            self.unknown_names = HashSet::new();
        }
        self.arena.reset();
        self.hints.clear();
        self.issues.clear();
        self.document = None;
        self.root_seen = false;
    }

    /// Validate the document read from `reader`
    ///
    /// `document` names the instance in issues and is the base URI of
    /// schema location hints. The session is reset first.
    pub fn validate<R>(&mut self, reader: &mut R, document: Option<&str>) -> Result<(), ValidationErrors>
    where
        R: EventReader + ?Sized,
    {
        self.reset();
        let Some(schema) = self.schema.clone() else {
            return Err(self.fail(
                ValidationIssue::new(ErrorCode::SchemaNotLoaded, "no compiled schema is loaded"),
                document,
            ));
        };
        self.document = document.map(str::to_owned);
        debug!(target: "xsd.session", "validating {}", document.unwrap_or("<anonymous>"));

        if let Err(issue) = self.run(&schema, reader) {
            debug!(target: "xsd.session", "fatal error: {}", issue.message);
            return Err(self.fail(issue, document));
        }

        for issue in &mut self.issues {
            issue.document = document.map(str::to_owned);
        }
        self.issues.sort_by(|a, b| a.sort_cmp(b));
        debug!(
            target: "xsd.session",
            "validated {}: {} issue(s), {} arena overflow(s)",
            document.unwrap_or("<anonymous>"),
            self.issues.len(),
            self.arena.overflow_count()
        );
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(self.issues.clone()))
        }
    }

    /// Validate a document held in memory
    pub fn validate_str(&mut self, xml: &str, document: Option<&str>) -> Result<(), ValidationErrors> {
        let mut reader = XmlReader::new(xml);
        self.validate(&mut reader, document)
    }

    fn fail(&mut self, issue: ValidationIssue, document: Option<&str>) -> ValidationErrors {
        let issue = issue.with_document(document);
        self.issues.clear();
        self.issues.push(issue.clone());
        ValidationErrors::fatal(issue)
    }

    fn run<R>(&mut self, schema: &CompiledSchema, reader: &mut R) -> Result<(), ValidationIssue>
    where
        R: EventReader + ?Sized,
    {
        loop {
            let event = reader
                .next_event()
                .map_err(|e| parse_issue(e.message, e.line, e.column))?;
            match event {
                XmlEvent::DocType { entities } => self.ids.declare_entities(entities.iter().cloned()),
                XmlEvent::StartElement {
                    namespace,
                    local,
                    attributes,
                    line,
                    column,
                } => self.start_element(schema, namespace, local, attributes, line, column)?,
                XmlEvent::EndElement {
                    namespace,
                    local,
                    line,
                    column,
                } => self.end_element(schema, namespace, local, line, column)?,
                XmlEvent::Text { text, line, column } => self.characters(text, line, column)?,
                XmlEvent::Eof => break,
            }
        }
        if !self.frames.is_empty() {
            return Err(ValidationIssue::new(
                ErrorCode::XmlParse,
                format!("unexpected end of document inside {}", self.paths.as_str()),
            ));
        }
        if !self.root_seen {
            self.issues
                .push(ValidationIssue::new(ErrorCode::NoRoot, "the document has no root element"));
        }
        self.ids.finish(&mut self.issues);
        Ok(())
    }

    fn start_element(
        &mut self,
        schema: &CompiledSchema,
        namespace: &str,
        local: &str,
        attributes: &[Attribute],
        line: u32,
        column: u32,
    ) -> Result<(), ValidationIssue> {
        let depth = self.frames.len() + 1;
        let limit = |e: Error| limit_issue(e, line, column);
        self.options.check_depth(depth).map_err(limit)?;
        self.options.check_attributes(attributes.len()).map_err(limit)?;
        for attr in attributes {
            self.options.check_token_size(attr.value.len()).map_err(limit)?;
        }
        if self.frames.is_empty() {
            if self.root_seen {
                return Err(parse_issue("the document has more than one root element", line, column));
            }
            self.root_seen = true;
        }

        self.paths.push(namespace, local);
        let name = schema.lookup_qname(namespace, local);
        if !name.is_known() && !self.unknown_names.contains(self.paths.last_segment()) {
            self.unknown_names.insert(self.paths.last_segment().to_owned());
            self.options
                .check_qname_entries(self.unknown_names.len())
                .map_err(limit)?;
        }

        self.namespaces.push_scope();
        for attr in attributes.iter().filter(|a| a.namespace == XMLNS_NAMESPACE) {
            let prefix = if attr.local == "xmlns" { "" } else { attr.local.as_str() };
            self.namespaces.bind(prefix, &attr.value);
        }

        let instance: Vec<InstanceAttribute<'_>> = attributes
            .iter()
            .map(|a| InstanceAttribute {
                name: schema.lookup_qname(&a.namespace, &a.local),
                namespace: &a.namespace,
                local: &a.local,
                value: &a.value,
            })
            .collect();
        if self.options.schema_location_policy != SchemaLocationPolicy::Ignore {
            self.location_hints(&instance, line, column);
        }

        let text_start = self.text.len();
        let outcome = match self.admit_child(schema, name, line, column) {
            Some(slot) => {
                let xsi = XsiAttributes::from_attributes(&instance);
                let mut ctx = DispatchContext {
                    schema,
                    resolver: &self.namespaces,
                    path: self.paths.as_str(),
                    line,
                    column,
                    issues: &mut self.issues,
                };
                dispatch(&mut ctx, slot, name, self.paths.last_segment(), &xsi)
            }
            None => Dispatch::Skip,
        };

        let frame = match outcome {
            Dispatch::Validate(target) => {
                let mut ctx = AttributeContext {
                    schema,
                    resolver: &self.namespaces,
                    ids: &mut self.ids,
                    path: self.paths.as_str(),
                    line,
                    column,
                    issues: &mut self.issues,
                };
                self.attributes
                    .check(&mut ctx, schema.complex_of(target.type_id), &instance);
                self.open_frame(schema, target, text_start, line, column)
            }
            Dispatch::Skip => {
                self.attributes.record_untyped(&instance);
                Frame {
                    skip: true,
                    ..Frame::new(text_start, self.counts.len(), line, column)
                }
            }
        };

        let constraints: &[IcId] = match frame.decl.get() {
            Some(decl) => &schema.element(decl).identity_constraints,
            None => &[],
        };
        self.identity.on_start(
            schema,
            &mut self.arena,
            name,
            constraints,
            self.attributes.identity_attributes(),
            self.attributes.keys(),
            NodeContext {
                path: self.paths.as_str(),
                line,
                column,
            },
        );
        trace!(
            target: "xsd.session",
            "start {}{}",
            self.paths.as_str(),
            if frame.skip { " (skipped)" } else { "" }
        );
        self.frames.push(frame);
        Ok(())
    }

    /// Match a child against the innermost frame; `None` skips the child
    fn admit_child(&mut self, schema: &CompiledSchema, name: QName, line: u32, column: u32) -> Option<ElementSlot> {
        let rejected = {
            let Some(parent) = self.frames.last_mut() else {
                return Some(ElementSlot::Root);
            };
            parent.has_children = true;
            if parent.skip {
                return None;
            }
            if parent.nilled {
                (ErrorCode::ValidateNilledNotEmpty, Vec::new())
            } else if parent.simple {
                (ErrorCode::ContentModelInvalid, Vec::new())
            } else if parent.lax {
                return Some(ElementSlot::Wildcard(ProcessContents::Lax));
            } else {
                match parent.model {
                    ContentHandle::Automaton(id) => {
                        let model = schema.model(id);
                        match model.feed(schema, &mut parent.state, name) {
                            Ok(ModelMatch::Element { slot }) => return Some(ElementSlot::Declared(slot)),
                            Ok(ModelMatch::Wildcard { process_contents, .. }) => {
                                return Some(ElementSlot::Wildcard(process_contents))
                            }
                            Err(code) => (code, model.expected(schema, parent.state)),
                        }
                    }
                    ContentHandle::All(id) => {
                        let group = schema.all_group(id);
                        let start = parent.counts_start;
                        let counts = &mut self.counts[start..start + group.len()];
                        match group.feed(counts, name) {
                            Ok(slot) => return Some(ElementSlot::Declared(slot)),
                            Err(code) => {
                                let expected = group
                                    .particles
                                    .iter()
                                    .zip(counts.iter())
                                    .filter(|(p, c)| **c < p.max)
                                    .map(|(p, _)| schema.display_qname(schema.element(p.elem).name).to_string())
                                    .collect();
                                (code, expected)
                            }
                        }
                    }
                    ContentHandle::RejectAll { .. } | ContentHandle::None => {
                        (ErrorCode::UnexpectedElement, Vec::new())
                    }
                }
            }
        };

        let (code, expected) = rejected;
        let display = self.paths.last_segment();
        let message = match code {
            ErrorCode::ValidateNilledNotEmpty => {
                format!("element '{}' is not allowed inside a nilled element", display)
            }
            ErrorCode::ContentModelInvalid => {
                format!("element '{}' is not allowed in simple content", display)
            }
            ErrorCode::RequiredElementMissing if !expected.is_empty() => format!(
                "element '{}' found where a required element is missing, expected {}",
                display,
                expected.join(" | ")
            ),
            _ if expected.is_empty() => format!("unexpected element '{}'", display),
            _ => format!("unexpected element '{}', expected {}", display, expected.join(" | ")),
        };
        let issue = ValidationIssue::new(code, message)
            .with_path(self.paths.as_str())
            .with_position(line, column)
            .with_expected(expected);
        self.issues.push(issue);
        None
    }

    fn open_frame(
        &mut self,
        schema: &CompiledSchema,
        target: ElementTarget,
        text_start: usize,
        line: u32,
        column: u32,
    ) -> Frame {
        let type_def = schema.type_def(target.type_id);
        let mut frame = Frame {
            decl: target.decl,
            nilled: target.nilled,
            ..Frame::new(text_start, self.counts.len(), line, column)
        };
        let Some(complex) = schema.complex_of(target.type_id) else {
            frame.text = TextRule::Value(type_def.validator);
            frame.simple = true;
            return frame;
        };
        frame.model = complex.model;
        frame.text = match complex.content {
            ContentKind::SimpleText => {
                frame.simple = true;
                TextRule::Value(type_def.validator)
            }
            ContentKind::Empty | ContentKind::ElementOnly => TextRule::ElementOnly,
            ContentKind::Mixed => {
                frame.keep_text = target
                    .decl
                    .get()
                    .map_or(false, |decl| schema.element(decl).value_constraint.is_some());
                TextRule::Mixed
            }
            ContentKind::Any => {
                frame.lax = true;
                TextRule::Untyped
            }
        };
        match complex.model {
            ContentHandle::Automaton(id) => frame.state = schema.model(id).start(),
            ContentHandle::All(id) => {
                let len = self.counts.len() + schema.all_group(id).len();
                self.counts.resize(len, 0);
            }
            ContentHandle::RejectAll { .. } | ContentHandle::None => {}
        }
        frame
    }

    fn characters(&mut self, text: &str, line: u32, column: u32) -> Result<(), ValidationIssue> {
        self.options
            .check_token_size(text.len())
            .map_err(|e| limit_issue(e, line, column))?;
        let Some(frame) = self.frames.last_mut() else {
            let text = if self.root_seen { text } else { text.trim_start_matches('\u{feff}') };
            if !is_blank(text) {
                return Err(parse_issue("text is not allowed outside the root element", line, column));
            }
            return Ok(());
        };

        let code = if frame.skip {
            None
        } else if frame.nilled {
            Some(ErrorCode::NilElementNotEmpty)
        } else if frame.text == TextRule::ElementOnly {
            Some(ErrorCode::TextInElementOnly)
        } else {
            None
        };
        match code {
            Some(code) => {
                if frame.text_reported || is_blank(text) {
                    return Ok(());
                }
                frame.text_reported = true;
                let message = match code {
                    ErrorCode::NilElementNotEmpty => "a nilled element must not have character content",
                    _ => "character content is not allowed in element-only content",
                };
                let issue = ValidationIssue::new(code, message)
                    .with_path(self.paths.as_str())
                    .with_position(line, column)
                    .with_actual(text.trim());
                self.issues.push(issue);
            }
            None if frame.text == TextRule::Mixed && !frame.skip && !frame.keep_text => {}
            None => {
                let text_start = frame.text_start;
                self.text.push_str(text);
                self.options
                    .check_token_size(self.text.len() - text_start)
                    .map_err(|e| limit_issue(e, line, column))?;
            }
        }
        Ok(())
    }

    fn end_element(
        &mut self,
        schema: &CompiledSchema,
        namespace: &str,
        local: &str,
        line: u32,
        column: u32,
    ) -> Result<(), ValidationIssue> {
        if self.frames.is_empty() {
            return Err(parse_issue("end tag without a matching start tag", line, column));
        }
        if !self.paths.last_is(namespace, local) {
            let message = format!(
                "end tag '{}' does not match the open element '{}'",
                local,
                self.paths.last_segment()
            );
            return Err(parse_issue(message, line, column));
        }
        let Some(frame) = self.frames.pop() else {
            return Err(parse_issue("end tag without a matching start tag", line, column));
        };
        self.key.clear();

        let closed = if frame.skip {
            if frame.has_children {
                ClosedValue::Complex
            } else {
                untyped_key(&mut self.key, &self.text[frame.text_start..]);
                ClosedValue::Key
            }
        } else if frame.nilled {
            ClosedValue::Absent
        } else {
            let closed = match frame.text {
                TextRule::Value(vid) if vid.is_some() => self.check_value(schema, &frame, vid),
                TextRule::Untyped if !frame.has_children => {
                    self.check_untyped_fixed(schema, &frame);
                    untyped_key(&mut self.key, &self.text[frame.text_start..]);
                    ClosedValue::Key
                }
                TextRule::Mixed => {
                    self.check_untyped_fixed(schema, &frame);
                    ClosedValue::Complex
                }
                _ => ClosedValue::Complex,
            };
            self.close_model(schema, &frame);
            closed
        };

        let value = match closed {
            ClosedValue::Key => ElementValue::Simple(&self.key),
            ClosedValue::Complex => ElementValue::Complex,
            ClosedValue::Absent => ElementValue::Absent,
        };
        self.identity.on_end(schema, &mut self.arena, value, &mut self.issues);
        trace!(target: "xsd.session", "end {}", self.paths.as_str());

        self.text.truncate(frame.text_start);
        self.counts.truncate(frame.counts_start);
        self.namespaces.pop_scope();
        self.paths.pop();
        Ok(())
    }

    /// Validate the text of a simple-valued element, falling back to its
    /// default or fixed value when the element is empty
    fn check_value(&mut self, schema: &CompiledSchema, frame: &Frame, vid: ValidatorId) -> ClosedValue {
        let constraint = frame
            .decl
            .get()
            .and_then(|decl| schema.element(decl).value_constraint.as_ref());
        let text = &self.text[frame.text_start..];
        let (lexical, resolver): (&str, &dyn NamespaceResolver) = match constraint {
            Some(c) if text.is_empty() => (&c.lexical, schema.ns_context(c.ns_context)),
            _ => (text, &self.namespaces),
        };

        let outcome = match schema.validate_simple(vid, lexical, resolver, &mut self.key) {
            Ok(outcome) => outcome,
            Err(err) => {
                let issue = err.into_issue();
                let message = format!("element '{}': {}", self.paths.last_segment(), issue.message);
                self.issues.push(
                    ValidationIssue { message, ..issue }
                        .with_path(self.paths.as_str())
                        .with_position(frame.line, frame.column),
                );
                return ClosedValue::Absent;
            }
        };
        if let Some(issue) = self.ids.track(
            outcome.id_class,
            &outcome.normalized,
            self.paths.as_str(),
            frame.line,
            frame.column,
        ) {
            self.issues.push(issue);
        }

        if let Some(fixed) = constraint.filter(|c| c.is_fixed() && !text.is_empty()) {
            let matches = schema
                .canonical_key(vid, &fixed.lexical, schema.ns_context(fixed.ns_context))
                .map_or(false, |expected| expected == self.key);
            if !matches {
                self.issues.push(fixed_value_issue(
                    self.paths.last_segment(),
                    text,
                    &fixed.lexical,
                    self.paths.as_str(),
                    frame,
                ));
            }
        }
        ClosedValue::Key
    }

    /// Fixed values of `anyType` and mixed elements compare as strings
    fn check_untyped_fixed(&mut self, schema: &CompiledSchema, frame: &Frame) {
        let Some(fixed) = frame
            .decl
            .get()
            .and_then(|decl| schema.element(decl).value_constraint.as_ref())
            .filter(|c| c.is_fixed())
        else {
            return;
        };
        let text = &self.text[frame.text_start..];
        if frame.has_children {
            let message = format!(
                "element '{}' has the fixed value '{}' and must not contain elements",
                self.paths.last_segment(),
                fixed.lexical
            );
            let issue = ValidationIssue::new(ErrorCode::ElementFixedValue, message)
                .with_path(self.paths.as_str())
                .with_position(frame.line, frame.column)
                .with_expected(vec![fixed.lexical.clone()]);
            self.issues.push(issue);
        } else if !text.is_empty() && text != fixed.lexical {
            self.issues.push(fixed_value_issue(
                self.paths.last_segment(),
                text,
                &fixed.lexical,
                self.paths.as_str(),
                frame,
            ));
        }
    }

    fn close_model(&mut self, schema: &CompiledSchema, frame: &Frame) {
        let missing = match frame.model {
            ContentHandle::Automaton(id) => {
                let model = schema.model(id);
                if model.is_final(frame.state) {
                    return;
                }
                model.expected(schema, frame.state)
            }
            ContentHandle::All(id) => {
                let group = schema.all_group(id);
                let counts = &self.counts[frame.counts_start..frame.counts_start + group.len()];
                match group.close(counts) {
                    Ok(()) => return,
                    Err(missing) => missing
                        .into_iter()
                        .map(|elem| schema.display_qname(schema.element(elem).name).to_string())
                        .collect(),
                }
            }
            ContentHandle::RejectAll { min_occurs } if min_occurs > 0 => Vec::new(),
            ContentHandle::RejectAll { .. } | ContentHandle::None => return,
        };
        let display = self.paths.last_segment();
        let message = if missing.is_empty() {
            format!("element '{}' requires content that its empty choice can never match", display)
        } else {
            format!("element '{}' is incomplete, expected {}", display, missing.join(" | "))
        };
        let issue = ValidationIssue::new(ErrorCode::RequiredElementMissing, message)
            .with_path(self.paths.as_str())
            .with_position(frame.line, frame.column)
            .with_expected(missing);
        self.issues.push(issue);
    }

    fn location_hints(&mut self, attributes: &[InstanceAttribute<'_>], line: u32, column: u32) {
        let mut schema_location = None;
        let mut no_namespace = None;
        for attr in attributes.iter().filter(|a| a.namespace == XSI_NAMESPACE) {
            match attr.local {
                "schemaLocation" => schema_location = Some(attr.value),
                "noNamespaceSchemaLocation" => no_namespace = Some(attr.value),
                _ => {}
            }
        }
        if schema_location.is_none() && no_namespace.is_none() {
            return;
        }

        let policy = self.options.schema_location_policy;
        let base = match policy {
            SchemaLocationPolicy::Document => self.document.as_deref(),
            _ => None,
        };
        match collect_hints(schema_location, no_namespace, base) {
            Ok(hints) if policy == SchemaLocationPolicy::Document => {
                for hint in &hints {
                    debug!(target: "xsd.session", "schema location hint {}", hint.location);
                }
                self.hints.extend(hints);
            }
            Ok(hints) => {
                for hint in hints {
                    let message = match &hint.namespace {
                        Some(ns) => format!("schema location hint '{}' for namespace '{}'", hint.location, ns),
                        None => format!("schema location hint '{}' for no namespace", hint.location),
                    };
                    self.issues.push(
                        ValidationIssue::new(ErrorCode::SchemaLocationHint, message)
                            .with_path(self.paths.as_str())
                            .with_position(line, column)
                            .with_actual(hint.location),
                    );
                }
            }
            Err(err) => self.issues.push(
                ValidationIssue::new(ErrorCode::SchemaLocationHint, err.to_string())
                    .with_path(self.paths.as_str())
                    .with_position(line, column),
            ),
        }
    }
}

fn is_blank(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
}

fn parse_issue(message: impl Into<String>, line: u32, column: u32) -> ValidationIssue {
    ValidationIssue::new(ErrorCode::XmlParse, message).with_position(line, column)
}

fn limit_issue(err: Error, line: u32, column: u32) -> ValidationIssue {
    parse_issue(err.to_string(), line, column)
}

fn fixed_value_issue(display: &str, actual: &str, fixed: &str, path: &str, frame: &Frame) -> ValidationIssue {
    ValidationIssue::new(
        ErrorCode::ElementFixedValue,
        format!(
            "value '{}' of element '{}' does not match its fixed value '{}'",
            actual, display, fixed
        ),
    )
    .with_path(path)
    .with_position(frame.line, frame.column)
    .with_actual(actual)
    .with_expected(vec![fixed.to_string()])
}
