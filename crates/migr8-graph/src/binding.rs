//! Import bindings: one imported symbol's package, kind, and local name,
//! scoped to a single file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::node::{ByteSpan, NodeId};

/// How a symbol was imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecifierKind {
    Default,
    Named,
    Namespace,
}

/// A single import specifier resolved during the import pass.
///
/// `local_name` is unique per file: when the same name is bound twice the
/// later declaration wins, matching JavaScript shadowing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImportBinding {
    pub file: PathBuf,
    /// Package specifier as written in the import source string.
    pub package: String,
    pub kind: SpecifierKind,
    /// Name exported by the package; `None` for default and namespace
    /// imports.
    pub imported_name: Option<String>,
    pub local_name: String,
    /// Recorded import-declaration node.
    pub node: NodeId,
    /// Span of the import source string literal, including quotes.
    pub source_span: ByteSpan,
}

impl ImportBinding {
    /// Stable key used by usage sites to reference their binding.
    pub fn key(&self) -> ImportKey {
        ImportKey {
            file: self.file.clone(),
            local_name: self.local_name.clone(),
        }
    }
}

/// Reference from a usage site back to its import binding.
///
/// Bindings are keyed by `(file, local_name)`, which is unique within a
/// graph because the import pass applies last-declaration-wins per file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImportKey {
    pub file: PathBuf,
    pub local_name: String,
}
