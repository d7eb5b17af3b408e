//! Usage sites: structural occurrences of tracked components with their
//! attributes.

use std::path::PathBuf;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::binding::ImportKey;
use crate::node::{ByteSpan, NodeId};

/// Literal attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lit {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl Lit {
    /// Canonical text used for ordering and equality in set comparisons.
    pub fn canonical(&self) -> String {
        match self {
            Lit::Str(s) => format!("s:{s}"),
            Lit::Num(n) => format!("n:{n}"),
            Lit::Bool(b) => format!("b:{b}"),
        }
    }
}

/// Attribute value: a literal we can interpret, or an opaque expression kept
/// only for print-back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropValue {
    Literal(Lit),
    OpaqueExpr(NodeId),
}

impl PropValue {
    pub fn as_literal(&self) -> Option<&Lit> {
        match self {
            PropValue::Literal(lit) => Some(lit),
            PropValue::OpaqueExpr(_) => None,
        }
    }
}

/// One extracted attribute with the spans needed to rewrite it in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    pub value: PropValue,
    /// Full attribute span (`name` or `name=value`).
    pub span: ByteSpan,
    /// Span of the value node when the attribute has one.
    pub value_span: Option<ByteSpan>,
}

/// A structural occurrence of a tracked component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSite {
    pub file: PathBuf,
    pub import: ImportKey,
    /// Component name resolved through the import binding: the imported
    /// name for named imports, otherwise the local name.
    pub component: String,
    pub props: FxHashMap<String, Prop>,
    /// Attributes in source order, for deterministic rendering.
    pub prop_order: Vec<String>,
    /// Recorded element node (whole subtree).
    pub node: NodeId,
    /// Span of the opening element's tag name.
    pub name_span: ByteSpan,
    /// End of the opening element, before `>` or `/>`.
    pub attrs_end: u32,
    /// Children region between the opening and closing tags; `None` for
    /// self-closing elements.
    pub children_span: Option<ByteSpan>,
    pub self_closing: bool,
    /// Spread attributes, preserved verbatim. Not addressable by rules.
    pub spreads: Vec<ByteSpan>,
}

impl UsageSite {
    pub fn prop(&self, name: &str) -> Option<&Prop> {
        self.props.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_canonical_distinguishes_kinds() {
        assert_ne!(Lit::Str("true".into()).canonical(), Lit::Bool(true).canonical());
        assert_ne!(Lit::Str("1".into()).canonical(), Lit::Num(1.0).canonical());
    }

    #[test]
    fn prop_value_literal_accessor() {
        let v = PropValue::Literal(Lit::Str("small".into()));
        assert_eq!(v.as_literal(), Some(&Lit::Str("small".into())));
        assert!(PropValue::OpaqueExpr(NodeId(3)).as_literal().is_none());
    }
}
