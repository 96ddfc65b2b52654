//! Symbol and namespace interning
//!
//! Namespace URIs and local names are mapped to dense integer identifiers when
//! the schema tables are built. At validation time the tables are only
//! queried; a lookup miss yields the `NONE` identifier, which never compares
//! equal to any declared name.

use std::fmt;

use indexmap::IndexSet;

/// Declares a dense, non-zero identifier type where `0` means "none".
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(u32);

        impl $name {
            /// The absent identifier
            pub const NONE: Self = Self(0);

            /// Whether this is the absent identifier
            pub fn is_none(self) -> bool {
                self.0 == 0
            }

            /// Whether this identifies something
            pub fn is_some(self) -> bool {
                self.0 != 0
            }

            /// Raw integer value
            pub fn raw(self) -> u32 {
                self.0
            }

            /// Identifier for the table slot at `index`
            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32 + 1)
            }

            /// Table slot of this identifier
            pub(crate) fn index(self) -> usize {
                debug_assert!(self.0 != 0, concat!(stringify!($name), "::NONE has no slot"));
                self.0 as usize - 1
            }

            /// `None` for the absent identifier
            pub fn get(self) -> Option<Self> {
                if self.0 == 0 { None } else { Some(self) }
            }
        }
    };
}

pub(crate) use define_id;

define_id!(
    /// Interned local name
    SymbolId
);
define_id!(
    /// Interned namespace URI
    NamespaceId
);

impl NamespaceId {
    /// The empty (absent) namespace, always interned first
    pub const EMPTY: Self = Self(1);
}

/// Qualified name as an integer pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct QName {
    /// Namespace identifier (`NamespaceId::EMPTY` for no namespace)
    pub ns: NamespaceId,
    /// Local name identifier
    pub local: SymbolId,
}

impl QName {
    /// Create a QName from its parts
    pub fn new(ns: NamespaceId, local: SymbolId) -> Self {
        Self { ns, local }
    }

    /// Whether both parts are known to the schema
    pub fn is_known(&self) -> bool {
        self.ns.is_some() && self.local.is_some()
    }
}

/// Append-only intern table
#[derive(Debug, Clone, Default)]
pub struct InternTable {
    entries: IndexSet<Box<str>>,
}

impl InternTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    fn intern_index(&mut self, text: &str) -> usize {
        match self.entries.get_index_of(text) {
            Some(index) => index,
            None => self.entries.insert_full(text.into()).0,
        }
    }

    fn lookup_index(&self, text: &str) -> Option<usize> {
        self.entries.get_index_of(text)
    }

    fn text(&self, index: usize) -> &str {
        self.entries.get_index(index).map(|s| &**s).unwrap_or("")
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Local-name interner
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    table: InternTable,
}

impl SymbolTable {
    /// Create an empty symbol table
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the existing id or assign the next one
    pub fn intern(&mut self, local: &str) -> SymbolId {
        SymbolId::from_index(self.table.intern_index(local))
    }

    /// Return the id, or `SymbolId::NONE` when absent
    pub fn lookup(&self, local: &str) -> SymbolId {
        self.table
            .lookup_index(local)
            .map(SymbolId::from_index)
            .unwrap_or(SymbolId::NONE)
    }

    /// Text of an id (empty for `NONE`)
    pub fn name(&self, id: SymbolId) -> &str {
        if id.is_none() {
            return "";
        }
        self.table.text(id.index())
    }

    /// Number of interned symbols
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether nothing has been interned
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Namespace URI interner; the empty namespace is always `NamespaceId::EMPTY`
#[derive(Debug, Clone)]
pub struct NamespaceTable {
    table: InternTable,
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceTable {
    /// Create a table holding only the empty namespace
    pub fn new() -> Self {
        let mut table = InternTable::new();
        table.intern_index("");
        Self { table }
    }

    /// Return the existing id or assign the next one
    pub fn intern(&mut self, uri: &str) -> NamespaceId {
        NamespaceId::from_index(self.table.intern_index(uri))
    }

    /// Return the id, or `NamespaceId::NONE` when absent
    pub fn lookup(&self, uri: &str) -> NamespaceId {
        self.table
            .lookup_index(uri)
            .map(NamespaceId::from_index)
            .unwrap_or(NamespaceId::NONE)
    }

    /// URI of an id (empty for `NONE` and `EMPTY`)
    pub fn uri(&self, id: NamespaceId) -> &str {
        if id.is_none() {
            return "";
        }
        self.table.text(id.index())
    }

    /// Number of interned namespaces, the empty one included
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Always false: the empty namespace is pre-interned
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Renders a QName as `{ns}local`, or `local` in no namespace
pub struct DisplayQName<'a> {
    pub(crate) namespace: &'a str,
    pub(crate) local: &'a str,
}

impl fmt::Display for DisplayQName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_namespace_reserved() {
        let mut table = NamespaceTable::new();
        assert_eq!(table.lookup(""), NamespaceId::EMPTY);
        assert_eq!(table.intern(""), NamespaceId::EMPTY);
        let ns = table.intern("urn:a");
        assert_ne!(ns, NamespaceId::EMPTY);
        assert_eq!(table.uri(ns), "urn:a");
    }

    #[test]
    fn test_intern_is_stable() {
        let mut symbols = SymbolTable::new();
        let a = symbols.intern("a");
        let b = symbols.intern("b");
        assert_eq!(symbols.intern("a"), a);
        assert_ne!(a, b);
        assert_eq!(symbols.name(b), "b");
        assert_eq!(symbols.lookup("zzz"), SymbolId::NONE);
        assert!(SymbolId::NONE.get().is_none());
    }

    #[test]
    fn test_unknown_qname_never_equal() {
        let mut symbols = SymbolTable::new();
        let declared = QName::new(NamespaceId::EMPTY, symbols.intern("a"));
        let unknown = QName::new(NamespaceId::EMPTY, symbols.lookup("b"));
        assert!(!unknown.is_known());
        assert_ne!(declared, unknown);
    }

    #[test]
    fn test_display_qname() {
        let shown = DisplayQName { namespace: "urn:x", local: "a" }.to_string();
        assert_eq!(shown, "{urn:x}a");
        assert_eq!(DisplayQName { namespace: "", local: "a" }.to_string(), "a");
    }
}
