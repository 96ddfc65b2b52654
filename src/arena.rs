//! Session byte arena
//!
//! Byte strings that outlive a single event but not the document (identity
//! key tuples, their provenance paths) are copied into one bump buffer owned
//! by the session. Handles are plain offsets, so the arena can be read while
//! other session state is borrowed mutably. Once the reserved capacity is
//! used up, allocations spill to the heap and the overflow counter is bumped.

/// Handle to bytes stored in an [`Arena`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArenaRef {
    /// Bytes inside the bump buffer
    Bump {
        /// Offset of the first byte
        start: u32,
        /// Length in bytes
        len: u32,
    },
    /// Bytes that did not fit
    Heap(Box<[u8]>),
}

impl ArenaRef {
    /// The empty handle
    pub const EMPTY: ArenaRef = ArenaRef::Bump { start: 0, len: 0 };

    /// Length in bytes
    pub fn len(&self) -> usize {
        match self {
            ArenaRef::Bump { len, .. } => *len as usize,
            ArenaRef::Heap(bytes) => bytes.len(),
        }
    }

    /// Whether the handle is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bump allocator with a hard capacity
#[derive(Debug)]
pub struct Arena {
    buf: Vec<u8>,
    capacity: usize,
    overflow: usize,
}

impl Arena {
    /// Create an arena that reserves `capacity` bytes lazily
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::new(),
            capacity,
            overflow: 0,
        }
    }

    /// Copy `bytes` into the arena
    pub fn alloc(&mut self, bytes: &[u8]) -> ArenaRef {
        if bytes.is_empty() {
            return ArenaRef::EMPTY;
        }
        if self.buf.len() + bytes.len() > self.capacity || self.buf.len() + bytes.len() > u32::MAX as usize {
            self.overflow += 1;
            return ArenaRef::Heap(bytes.into());
        }
        if self.buf.capacity() == 0 {
            self.buf.reserve(self.capacity.min(64 * 1024));
        }
        let start = self.buf.len() as u32;
        self.buf.extend_from_slice(bytes);
        ArenaRef::Bump {
            start,
            len: bytes.len() as u32,
        }
    }

    /// Copy a string into the arena
    pub fn alloc_str(&mut self, text: &str) -> ArenaRef {
        self.alloc(text.as_bytes())
    }

    /// Bytes behind a handle
    pub fn get<'a>(&'a self, r: &'a ArenaRef) -> &'a [u8] {
        match r {
            ArenaRef::Bump { start, len } => {
                let start = *start as usize;
                self.buf.get(start..start + *len as usize).unwrap_or(&[])
            }
            ArenaRef::Heap(bytes) => bytes,
        }
    }

    /// Text behind a handle that was allocated from a `&str`
    pub fn get_str<'a>(&'a self, r: &'a ArenaRef) -> &'a str {
        std::str::from_utf8(self.get(r)).unwrap_or("")
    }

    /// Bytes currently used in the bump buffer
    pub fn used(&self) -> usize {
        self.buf.len()
    }

    /// Number of allocations that spilled to the heap since the last reset
    pub fn overflow_count(&self) -> usize {
        self.overflow
    }

    /// Release everything, keeping the buffer for the next document
    pub fn reset(&mut self) {
        self.buf.clear();
        if self.buf.capacity() > self.capacity {
            self.buf.shrink_to(self.capacity);
        }
        self.overflow = 0;
    }
}
