//! Error types for graph building.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: crate::runtime::RuntimeError,
    },

    #[error("file discovery failed: {0}")]
    Discovery(String),
}

/// Operation that produced a per-file failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOp {
    Read,
    Parse,
    Write,
    Rewrite,
}

impl std::fmt::Display for FileOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOp::Read => write!(f, "read"),
            FileOp::Parse => write!(f, "parse"),
            FileOp::Write => write!(f, "write"),
            FileOp::Rewrite => write!(f, "rewrite"),
        }
    }
}

/// Per-file failure collected during a batched build.
///
/// These are values, not propagated errors: a single bad file never aborts
/// a multi-thousand-file run.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{op} failed for '{path}': {cause}")]
pub struct FileError {
    pub op: FileOp,
    pub path: PathBuf,
    pub cause: String,
}

impl FileError {
    pub fn new(op: FileOp, path: PathBuf, cause: impl Into<String>) -> Self {
        Self {
            op,
            path,
            cause: cause.into(),
        }
    }
}
