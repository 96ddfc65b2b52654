//! XML namespace handling
//!
//! Prefix resolution for the values the reader does not resolve itself
//! (`xsi:type`, QName-typed content, fixed/default values captured in the
//! schema). Two resolvers exist: the in-document scope stack owned by the
//! session, and immutable snapshots stored alongside schema value constraints.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::XML_NAMESPACE;

/// Resolves a prefix to a namespace URI
pub trait NamespaceResolver {
    /// URI bound to `prefix`; `""` asks for the default namespace.
    /// `None` means unbound.
    fn resolve_prefix(&self, prefix: &str) -> Option<&str>;

    /// Resolve a lexical QName into `(namespace URI, local name)`.
    ///
    /// Unprefixed names take the default namespace when one is bound.
    fn resolve_qname<'a>(&'a self, lexical: &'a str) -> Result<(&'a str, &'a str)> {
        match lexical.split_once(':') {
            Some((prefix, local)) => {
                let uri = self
                    .resolve_prefix(prefix)
                    .ok_or_else(|| Error::Namespace(format!("Unknown prefix: {}", prefix)))?;
                Ok((uri, local))
            }
            None => Ok((self.resolve_prefix("").unwrap_or(""), lexical)),
        }
    }
}

/// Immutable namespace context captured at a schema site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceContext {
    /// Mapping from prefix to namespace URI
    prefixes: HashMap<String, String>,
    /// Default namespace (no prefix)
    default_namespace: Option<String>,
}

impl NamespaceContext {
    /// Create a new empty namespace context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Builder form of [`Self::add_prefix`]
    pub fn with_prefix(mut self, prefix: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.add_prefix(prefix, namespace);
        self
    }

    /// Set the default namespace
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        self.default_namespace = Some(namespace.into());
    }
}

impl NamespaceResolver for NamespaceContext {
    fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        if prefix.is_empty() {
            return self.default_namespace.as_deref();
        }
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.prefixes.get(prefix).map(String::as_str)
    }
}

/// In-document namespace scopes, one frame per open element.
///
/// Binding strings are reused across elements and documents.
#[derive(Debug, Default)]
pub struct NamespaceScopes {
    bindings: Vec<(String, String)>,
    active: usize,
    marks: Vec<usize>,
}

impl NamespaceScopes {
    /// Create an empty scope stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the scope of a new element
    pub fn push_scope(&mut self) {
        self.marks.push(self.active);
    }

    /// Bind a prefix in the innermost scope (`""` binds the default namespace)
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        if self.active < self.bindings.len() {
            let slot = &mut self.bindings[self.active];
            slot.0.clear();
            slot.0.push_str(prefix);
            slot.1.clear();
            slot.1.push_str(uri);
        } else {
            self.bindings.push((prefix.to_owned(), uri.to_owned()));
        }
        self.active += 1;
    }

    /// Close the innermost scope
    pub fn pop_scope(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.active = mark;
        }
    }

    /// Number of open scopes
    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    /// Forget all bindings, dropping storage beyond `retain` entries
    pub fn reset(&mut self, retain: usize) {
        self.active = 0;
        self.marks.clear();
        if self.bindings.len() > retain {
            self.bindings.truncate(retain);
            self.bindings.shrink_to(retain);
        }
    }
}

impl NamespaceResolver for NamespaceScopes {
    fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.bindings[..self.active]
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
            // an undeclaration (`xmlns=""`) leaves the default unbound
            .filter(|uri| !(prefix.is_empty() && uri.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_context() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", "http://www.w3.org/2001/XMLSchema");
        ctx.set_default_namespace("http://example.com");

        assert_eq!(
            ctx.resolve_prefix("xs"),
            Some("http://www.w3.org/2001/XMLSchema")
        );
        assert_eq!(ctx.resolve_prefix(""), Some("http://example.com"));
        assert_eq!(ctx.resolve_prefix("xml"), Some(XML_NAMESPACE));
    }

    #[test]
    fn test_resolve_prefixed_name() {
        let ctx = NamespaceContext::new().with_prefix("xs", "http://www.w3.org/2001/XMLSchema");

        let (ns, local) = ctx.resolve_qname("xs:element").unwrap();
        assert_eq!(ns, "http://www.w3.org/2001/XMLSchema");
        assert_eq!(local, "element");
        assert!(ctx.resolve_qname("zz:element").is_err());
        assert_eq!(ctx.resolve_qname("plain").unwrap(), ("", "plain"));
    }

    #[test]
    fn test_scopes_shadow_and_pop() {
        let mut scopes = NamespaceScopes::new();
        scopes.push_scope();
        scopes.bind("p", "urn:outer");
        scopes.bind("", "urn:default");
        scopes.push_scope();
        scopes.bind("p", "urn:inner");
        assert_eq!(scopes.resolve_prefix("p"), Some("urn:inner"));
        assert_eq!(scopes.resolve_prefix(""), Some("urn:default"));
        scopes.pop_scope();
        assert_eq!(scopes.resolve_prefix("p"), Some("urn:outer"));
        scopes.pop_scope();
        assert_eq!(scopes.resolve_prefix("p"), None);
    }

    #[test]
    fn test_default_undeclaration() {
        let mut scopes = NamespaceScopes::new();
        scopes.push_scope();
        scopes.bind("", "urn:default");
        scopes.push_scope();
        scopes.bind("", "");
        assert_eq!(scopes.resolve_prefix(""), None);
        assert_eq!(scopes.resolve_qname("a").unwrap(), ("", "a"));
    }
}
