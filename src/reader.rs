//! Streaming XML input
//!
//! A session consumes namespace-resolved events through the [`EventReader`]
//! trait. [`XmlReader`] adapts a `quick-xml` namespace-aware reader over an
//! in-memory document; [`EventList`] replays a prepared list of events,
//! which is how tests and embedders that parse XML themselves feed a
//! session.
//!
//! Events borrow their strings from the reader, so the reader can reuse
//! its buffers from one event to the next.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use regex::Regex;
use thiserror::Error;

use crate::XMLNS_NAMESPACE;

/// A fatal XML input error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (line {line}, column {column})")]
pub struct ReaderError {
    /// What went wrong
    pub message: String,
    /// Line of the event being read
    pub line: u32,
    /// Column of the event being read
    pub column: u32,
}

impl ReaderError {
    /// Create an error at a position
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// A namespace-resolved attribute
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribute {
    /// Namespace URI (empty for no namespace)
    pub namespace: String,
    /// Local name
    pub local: String,
    /// Value with references expanded
    pub value: String,
}

impl Attribute {
    /// Create an attribute
    pub fn new(namespace: impl Into<String>, local: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
            value: value.into(),
        }
    }
}

/// One input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEvent<'a> {
    /// The document type declaration, with the entity names it declares
    DocType {
        /// Declared general entities
        entities: &'a [String],
    },
    /// Start tag
    StartElement {
        /// Namespace URI (empty for no namespace)
        namespace: &'a str,
        /// Local name
        local: &'a str,
        /// Attributes, namespace declarations included
        attributes: &'a [Attribute],
        /// Line of the `<`
        line: u32,
        /// Column of the `<`
        column: u32,
    },
    /// End tag
    EndElement {
        /// Namespace URI
        namespace: &'a str,
        /// Local name
        local: &'a str,
        /// Line of the `</`
        line: u32,
        /// Column of the `</`
        column: u32,
    },
    /// Character data, references expanded
    Text {
        /// The characters
        text: &'a str,
        /// Line where the text starts
        line: u32,
        /// Column where the text starts
        column: u32,
    },
    /// End of input
    Eof,
}

/// Source of input events
pub trait EventReader {
    /// Next event; [`XmlEvent::Eof`] once the input is exhausted
    fn next_event(&mut self) -> Result<XmlEvent<'_>, ReaderError>;
}

static ENTITY_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<!ENTITY\s+([^\s%>]+)\s+(?:"([^"]*)"|'([^']*)'|SYSTEM\b|PUBLIC\b)"#)
        .expect("entity declaration regex")
});

/// Reads events from an in-memory XML document with `quick-xml`
pub struct XmlReader<'i> {
    input: &'i str,
    reader: NsReader<&'i [u8]>,
    /// Byte offset up to which `line` and `column` are computed
    offset: usize,
    line: u32,
    column: u32,
    namespace: String,
    local: String,
    text: String,
    attributes: Vec<Attribute>,
    attribute_count: usize,
    entity_names: Vec<String>,
    entity_values: HashMap<String, String>,
}

impl<'i> XmlReader<'i> {
    /// Create a reader over `input`
    pub fn new(input: &'i str) -> Self {
        let mut reader = NsReader::from_str(input);
        reader.trim_text(false).expand_empty_elements(true);
        Self {
            input,
            reader,
            offset: 0,
            line: 1,
            column: 1,
            namespace: String::new(),
            local: String::new(),
            text: String::new(),
            attributes: Vec::new(),
            attribute_count: 0,
            entity_names: Vec::new(),
            entity_values: HashMap::new(),
        }
    }

    fn advance_to(&mut self, offset: usize) {
        let offset = offset.min(self.input.len());
        if offset <= self.offset {
            return;
        }
        for byte in &self.input.as_bytes()[self.offset..offset] {
            if *byte == b'\n' {
                self.line += 1;
                self.column = 1;
            } else if byte & 0xC0 != 0x80 {
                self.column += 1;
            }
        }
        self.offset = offset;
    }

    fn error(&self, message: impl std::fmt::Display) -> ReaderError {
        ReaderError::new(message.to_string(), self.line, self.column)
    }

    fn read_doctype(&mut self, content: &str) {
        self.entity_names.clear();
        self.entity_values.clear();
        for caps in ENTITY_DECL.captures_iter(content) {
            let name = caps[1].to_string();
            if let Some(value) = caps.get(2).or_else(|| caps.get(3)) {
                self.entity_values.insert(name.clone(), value.as_str().to_string());
            }
            self.entity_names.push(name);
        }
    }

    fn read_attributes(&mut self, start: &BytesStart<'_>) -> Result<(), ReaderError> {
        self.attribute_count = 0;
        for attr in start.attributes() {
            let attr = attr.map_err(|e| self.error(e))?;
            let key = attr.key.as_ref();
            let (namespace, local): (&[u8], &[u8]) = if key == b"xmlns" {
                (XMLNS_NAMESPACE.as_bytes(), b"xmlns")
            } else if let Some(prefix) = key.strip_prefix(b"xmlns:") {
                (XMLNS_NAMESPACE.as_bytes(), prefix)
            } else {
                match self.reader.resolve_attribute(attr.key) {
                    (ResolveResult::Bound(ns), local) => (ns.0, local.into_inner()),
                    (ResolveResult::Unbound, local) => (b"", local.into_inner()),
                    (ResolveResult::Unknown(prefix), _) => {
                        return Err(self.error(format_args!(
                            "unbound namespace prefix '{}'",
                            String::from_utf8_lossy(&prefix)
                        )))
                    }
                }
            };
            let namespace = std::str::from_utf8(namespace).map_err(|e| self.error(e))?;
            let local = std::str::from_utf8(local).map_err(|e| self.error(e))?;
            let entities = &self.entity_values;
            let value = attr
                .unescape_value_with(|name| entities.get(name).map(String::as_str))
                .map_err(|e| ReaderError::new(e.to_string(), self.line, self.column))?;
            if self.attribute_count == self.attributes.len() {
                self.attributes.push(Attribute::default());
            }
            let slot = &mut self.attributes[self.attribute_count];
            slot.namespace.clear();
            slot.namespace.push_str(namespace);
            slot.local.clear();
            slot.local.push_str(local);
            slot.value.clear();
            slot.value.push_str(&value);
            self.attribute_count += 1;
        }
        Ok(())
    }
}

fn copy_name(
    resolved: ResolveResult<'_>,
    local: &[u8],
    namespace_out: &mut String,
    local_out: &mut String,
) -> Result<(), String> {
    let namespace: &[u8] = match resolved {
        ResolveResult::Bound(ns) => ns.0,
        ResolveResult::Unbound => b"",
        ResolveResult::Unknown(prefix) => {
            return Err(format!("unbound namespace prefix '{}'", String::from_utf8_lossy(&prefix)))
        }
    };
    let namespace = std::str::from_utf8(namespace).map_err(|e| e.to_string())?;
    let local = std::str::from_utf8(local).map_err(|e| e.to_string())?;
    namespace_out.clear();
    namespace_out.push_str(namespace);
    local_out.clear();
    local_out.push_str(local);
    Ok(())
}

impl<'i> EventReader for XmlReader<'i> {
    fn next_event(&mut self) -> Result<XmlEvent<'_>, ReaderError> {
        loop {
            let start = self.reader.buffer_position();
            self.advance_to(start);
            let (line, column) = (self.line, self.column);
            let (resolved, event) = match self.reader.read_resolved_event() {
                Ok(pair) => pair,
                Err(e) => return Err(ReaderError::new(e.to_string(), line, column)),
            };
            match event {
                Event::Start(e) => {
                    copy_name(resolved, e.local_name().into_inner(), &mut self.namespace, &mut self.local)
                        .map_err(|m| ReaderError::new(m, line, column))?;
                    self.read_attributes(&e)?;
                    return Ok(XmlEvent::StartElement {
                        namespace: &self.namespace,
                        local: &self.local,
                        attributes: &self.attributes[..self.attribute_count],
                        line,
                        column,
                    });
                }
                Event::End(e) => {
                    copy_name(resolved, e.local_name().into_inner(), &mut self.namespace, &mut self.local)
                        .map_err(|m| ReaderError::new(m, line, column))?;
                    return Ok(XmlEvent::EndElement {
                        namespace: &self.namespace,
                        local: &self.local,
                        line,
                        column,
                    });
                }
                Event::Text(e) => {
                    let entities = &self.entity_values;
                    let text = e
                        .unescape_with(|name| entities.get(name).map(String::as_str))
                        .map_err(|e| ReaderError::new(e.to_string(), line, column))?;
                    self.text.clear();
                    self.text.push_str(&text);
                    return Ok(XmlEvent::Text {
                        text: &self.text,
                        line,
                        column,
                    });
                }
                Event::CData(e) => {
                    let text = std::str::from_utf8(&e).map_err(|e| self.error(e))?;
                    self.text.clear();
                    self.text.push_str(text);
                    return Ok(XmlEvent::Text {
                        text: &self.text,
                        line,
                        column,
                    });
                }
                Event::DocType(e) => {
                    let content = String::from_utf8_lossy(&e).into_owned();
                    self.read_doctype(&content);
                    return Ok(XmlEvent::DocType {
                        entities: &self.entity_names,
                    });
                }
                Event::Eof => return Ok(XmlEvent::Eof),
                Event::Empty(_) | Event::Comment(_) | Event::Decl(_) | Event::PI(_) => continue,
            }
        }
    }
}

/// An owned event of an [`EventList`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnedEvent {
    /// Document type declaration
    DocType(Vec<String>),
    /// Start tag
    Start {
        /// Namespace URI
        namespace: String,
        /// Local name
        local: String,
        /// Attributes
        attributes: Vec<Attribute>,
    },
    /// End tag
    End {
        /// Namespace URI
        namespace: String,
        /// Local name
        local: String,
    },
    /// Character data
    Text(String),
}

/// Replays a list of events; each event sits on its own line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventList {
    events: Vec<OwnedEvent>,
    position: usize,
}

impl EventList {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every event of another reader
    pub fn record(reader: &mut dyn EventReader) -> Result<Self, ReaderError> {
        let mut list = Self::new();
        loop {
            match reader.next_event()? {
                XmlEvent::DocType { entities } => list.events.push(OwnedEvent::DocType(entities.to_vec())),
                XmlEvent::StartElement {
                    namespace,
                    local,
                    attributes,
                    ..
                } => list.events.push(OwnedEvent::Start {
                    namespace: namespace.to_string(),
                    local: local.to_string(),
                    attributes: attributes.to_vec(),
                }),
                XmlEvent::EndElement { namespace, local, .. } => list.events.push(OwnedEvent::End {
                    namespace: namespace.to_string(),
                    local: local.to_string(),
                }),
                XmlEvent::Text { text, .. } => list.events.push(OwnedEvent::Text(text.to_string())),
                XmlEvent::Eof => return Ok(list),
            }
        }
    }

    /// Append a DOCTYPE declaring `entities`
    pub fn doctype<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events
            .push(OwnedEvent::DocType(entities.into_iter().map(Into::into).collect()));
        self
    }

    /// Append a start tag
    pub fn start(mut self, namespace: &str, local: &str) -> Self {
        self.events.push(OwnedEvent::Start {
            namespace: namespace.to_string(),
            local: local.to_string(),
            attributes: Vec::new(),
        });
        self
    }

    /// Add an attribute to the last start tag
    pub fn attribute(mut self, namespace: &str, local: &str, value: &str) -> Self {
        if let Some(OwnedEvent::Start { attributes, .. }) = self.events.last_mut() {
            attributes.push(Attribute::new(namespace, local, value));
        }
        self
    }

    /// Add a namespace declaration to the last start tag (`""` for the default namespace)
    pub fn namespace_decl(self, prefix: &str, uri: &str) -> Self {
        let local = if prefix.is_empty() { "xmlns" } else { prefix };
        self.attribute(XMLNS_NAMESPACE, local, uri)
    }

    /// Append character data
    pub fn text(mut self, text: &str) -> Self {
        self.events.push(OwnedEvent::Text(text.to_string()));
        self
    }

    /// Append an end tag
    pub fn end(mut self, namespace: &str, local: &str) -> Self {
        self.events.push(OwnedEvent::End {
            namespace: namespace.to_string(),
            local: local.to_string(),
        });
        self
    }

    /// Append a start tag, its text and its end tag
    pub fn leaf(self, namespace: &str, local: &str, text: &str) -> Self {
        self.start(namespace, local).text(text).end(namespace, local)
    }

    /// Replay from the first event again
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the list holds no event
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventReader for EventList {
    fn next_event(&mut self) -> Result<XmlEvent<'_>, ReaderError> {
        let Some(event) = self.events.get(self.position) else {
            return Ok(XmlEvent::Eof);
        };
        self.position += 1;
        let line = self.position as u32;
        Ok(match event {
            OwnedEvent::DocType(entities) => XmlEvent::DocType { entities },
            OwnedEvent::Start {
                namespace,
                local,
                attributes,
            } => XmlEvent::StartElement {
                namespace,
                local,
                attributes,
                line,
                column: 1,
            },
            OwnedEvent::End { namespace, local } => XmlEvent::EndElement {
                namespace,
                local,
                line,
                column: 1,
            },
            OwnedEvent::Text(text) => XmlEvent::Text { text, line, column: 1 },
        })
    }
}
