//! Span-based text edits.
//!
//! All rewriting is expressed as replacements against the original text,
//! applied back to front. The original string is never mutated, so a
//! failed rewrite leaves the source exactly as it was.

use migr8_graph::ByteSpan;

use crate::error::{Result, RuleError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub span: ByteSpan,
    pub replacement: String,
}

impl TextEdit {
    pub fn replace(span: ByteSpan, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }

    pub fn insert(at: u32, text: impl Into<String>) -> Self {
        Self {
            span: ByteSpan::new(at, at),
            replacement: text.into(),
        }
    }

    pub fn delete(span: ByteSpan) -> Self {
        Self {
            span,
            replacement: String::new(),
        }
    }
}

/// Apply edits to `text`, returning the rewritten string.
///
/// Edits are sorted by start position; overlapping spans are rejected.
/// Insertions at the same position keep their given order.
pub fn apply_edits(text: &str, mut edits: Vec<TextEdit>) -> Result<String> {
    edits.sort_by_key(|e| (e.span.start, e.span.end));

    let mut previous_end = 0u32;
    for edit in &edits {
        if edit.span.end as usize > text.len() || edit.span.start > edit.span.end {
            return Err(RuleError::SpanOutOfBounds {
                start: edit.span.start,
                end: edit.span.end,
                len: text.len(),
            });
        }
        if edit.span.start < previous_end {
            return Err(RuleError::OverlappingEdits { at: edit.span.start });
        }
        previous_end = edit.span.end.max(previous_end);
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for edit in &edits {
        out.push_str(&text[cursor..edit.span.start as usize]);
        out.push_str(&edit.replacement);
        cursor = edit.span.end as usize;
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

/// Widen a deletion span leftwards over whitespace so removed attributes
/// do not leave double spaces behind.
pub fn widen_over_leading_whitespace(text: &str, span: ByteSpan) -> ByteSpan {
    let bytes = text.as_bytes();
    let mut start = span.start as usize;
    while start > 0 && (bytes[start - 1] == b' ' || bytes[start - 1] == b'\t') {
        start -= 1;
    }
    ByteSpan::new(start as u32, span.end)
}
