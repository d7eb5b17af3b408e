//! Error types for rule loading and application.

use thiserror::Error;

use crate::validate::ValidationReport;

pub type Result<T> = std::result::Result<T, RuleError>;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rule file failed validation: {0}")]
    Validation(ValidationReport),

    #[error("rewrite produced overlapping edits at byte {at}")]
    OverlappingEdits { at: u32 },

    #[error("edit span {start}..{end} is out of bounds for a {len}-byte file")]
    SpanOutOfBounds { start: u32, end: u32, len: usize },

    #[error("usage references node {node:?} missing from the file's node table")]
    DanglingNode { node: migr8_graph::NodeId },

    #[error("rewrite of '{path}' no longer parses; original left untouched")]
    RewriteUnparsable { path: std::path::PathBuf },
}
