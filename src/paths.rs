//! Element paths for issue locations
//!
//! Paths are built from `/{ns}local` segments, with the braces omitted for
//! names in no namespace. The builder keeps one string and a stack of
//! segment offsets so that leaving an element is a truncate.

/// Incrementally maintained path of the open elements
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    path: String,
    marks: Vec<usize>,
}

impl PathBuilder {
    /// Empty path
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a child element
    pub fn push(&mut self, namespace: &str, local: &str) {
        self.marks.push(self.path.len());
        self.path.push('/');
        if !namespace.is_empty() {
            self.path.push('{');
            self.path.push_str(namespace);
            self.path.push('}');
        }
        self.path.push_str(local);
    }

    /// Leave the innermost element
    pub fn pop(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.path.truncate(mark);
        }
    }

    /// Current path; empty outside the root element
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Name of the innermost element as written in the path (`{ns}local`)
    pub fn last_segment(&self) -> &str {
        match self.marks.last() {
            Some(mark) => &self.path[mark + 1..],
            None => "",
        }
    }

    /// Whether the innermost segment names `{namespace}local`
    pub fn last_is(&self, namespace: &str, local: &str) -> bool {
        let segment = self.last_segment();
        if namespace.is_empty() {
            return segment == local;
        }
        segment
            .strip_prefix('{')
            .and_then(|rest| rest.strip_prefix(namespace))
            .and_then(|rest| rest.strip_prefix('}'))
            .map_or(false, |rest| rest == local)
    }

    /// Number of open segments
    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    /// Clear the path, dropping buffers that grew beyond `max_bytes`
    pub fn reset(&mut self, max_bytes: usize) {
        self.path.clear();
        self.marks.clear();
        if self.path.capacity() > max_bytes {
            self.path = String::new();
            self.marks = Vec::new();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut path = PathBuilder::new();
        path.push("urn:t", "root");
        path.push("", "item");
        assert_eq!(path.as_str(), "/{urn:t}root/item");
        assert_eq!(path.last_segment(), "item");
        assert_eq!(path.depth(), 2);
        path.pop();
        assert_eq!(path.last_segment(), "{urn:t}root");
        path.push("", "item");
        path.pop();
        assert_eq!(path.as_str(), "/{urn:t}root");
        path.pop();
        path.pop();
        assert_eq!(path.as_str(), "");
    }

    #[test]
    fn test_last_is() {
        let mut path = PathBuilder::new();
        path.push("urn:t", "root");
        assert!(path.last_is("urn:t", "root"));
        assert!(!path.last_is("", "root"));
        assert!(!path.last_is("urn:t", "roo"));
        path.push("", "item");
        assert!(path.last_is("", "item"));
        assert!(!path.last_is("urn:t", "item"));
    }

    #[test]
    fn test_reset_drops_large_buffers() {
        let mut path = PathBuilder::new();
        path.push("", &"x".repeat(256));
        path.reset(16);
        assert_eq!(path.as_str(), "");
        assert_eq!(path.depth(), 0);
    }
}
