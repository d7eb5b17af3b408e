//! Stable node references into a parsed file.
//!
//! AST nodes produced by the parser live in an arena tied to the parse
//! allocator's lifetime, so bindings and usage sites cannot hold borrows into
//! the tree. Instead, every node a later phase needs to address is recorded
//! here as a byte span under a stable integer id. Rewrites operate on spans
//! against the original text, so an id held elsewhere can never be
//! invalidated by a mutation.

use serde::{Deserialize, Serialize};

/// Stable identifier for a recorded AST node within one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Byte range of a node in the original source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ByteSpan {
    pub start: u32,
    pub end: u32,
}

impl ByteSpan {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Slice the span out of the file's source text.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start as usize..self.end as usize]
    }
}

impl From<oxc_span::Span> for ByteSpan {
    fn from(span: oxc_span::Span) -> Self {
        Self::new(span.start, span.end)
    }
}

/// Per-file arena of recorded node spans.
///
/// Populated during extraction; immutable afterwards. Ids are dense indices
/// in recording order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTable {
    spans: Vec<ByteSpan>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, span: impl Into<ByteSpan>) -> NodeId {
        let id = NodeId(self.spans.len() as u32);
        self.spans.push(span.into());
        id
    }

    pub fn span(&self, id: NodeId) -> ByteSpan {
        self.spans[id.0 as usize]
    }

    pub fn get(&self, id: NodeId) -> Option<ByteSpan> {
        self.spans.get(id.0 as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}
