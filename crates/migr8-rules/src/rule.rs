//! The declarative rule language.
//!
//! A rule matches a usage site when any of its match groups is satisfied
//! (OR across groups); within a group every entry must hold (AND). `true`
//! means "prop present, any value"; a literal means "present and equal".
//! Rules are evaluated in ascending `order` and the first match wins.

use indexmap::IndexMap;
use serde::Deserialize;

use migr8_graph::{Lit, PropValue, UsageSite};

/// Matcher for a single prop inside a match group.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MatchValue {
    Bool(bool),
    Num(f64),
    Str(String),
}

impl MatchValue {
    /// `true` is presence-only; everything else compares literals.
    /// Opaque expressions never satisfy a literal matcher.
    pub fn matches(&self, value: &PropValue) -> bool {
        match self {
            MatchValue::Bool(true) => true,
            MatchValue::Bool(b) => matches!(value, PropValue::Literal(Lit::Bool(v)) if v == b),
            MatchValue::Num(n) => matches!(value, PropValue::Literal(Lit::Num(v)) if v == n),
            MatchValue::Str(s) => matches!(value, PropValue::Literal(Lit::Str(v)) if v == s),
        }
    }
}

/// One AND-group of prop matchers.
pub type MatchGroup = IndexMap<String, MatchValue>;

/// Value written by the `set` operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Bool(bool),
    Num(f64),
    Str(String),
}

impl RuleValue {
    /// Render as JSX attribute text for `name`.
    ///
    /// Strings become string literals, `true` a valueless attribute, and
    /// `false`/numbers expression-container literals.
    pub fn render(&self, name: &str) -> String {
        match self {
            RuleValue::Str(s) => format!("{name}=\"{s}\""),
            RuleValue::Bool(true) => name.to_string(),
            RuleValue::Bool(false) => format!("{name}={{false}}"),
            RuleValue::Num(n) => format!("{name}={{{n}}}"),
        }
    }
}

/// Whole-subtree replacement template.
///
/// `template` may reference `{OUTER_PROPS}`, `{INNER_PROPS}`, and
/// `{CHILDREN}`. Prop names listed in `inner_props` are moved onto the
/// replacement's inner element; everything else stays outer. Children are
/// substituted verbatim.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceTemplate {
    pub template: String,
    #[serde(default)]
    pub inner_props: Vec<String>,
}

/// A single transformation rule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationRule {
    #[serde(default)]
    pub order: i64,
    #[serde(default, rename = "match")]
    pub match_groups: Vec<MatchGroup>,
    #[serde(default)]
    pub rename: IndexMap<String, String>,
    #[serde(default)]
    pub remove: Vec<String>,
    #[serde(default)]
    pub set: IndexMap<String, RuleValue>,
    #[serde(default)]
    pub replace_with: Option<ReplaceTemplate>,
    #[serde(default)]
    pub import_from: Option<String>,
    #[serde(default)]
    pub import_to: Option<String>,
}

impl TransformationRule {
    /// A rule without match groups relies on its import-source criterion;
    /// validation guarantees at least one of the two exists.
    pub fn matches(&self, usage: &UsageSite, binding_package: &str) -> bool {
        if let Some(from) = &self.import_from {
            if from != binding_package {
                return false;
            }
        }
        if self.match_groups.is_empty() {
            return self.import_from.is_some();
        }
        self.match_groups.iter().any(|group| {
            group.iter().all(|(name, matcher)| {
                usage
                    .prop(name)
                    .is_some_and(|prop| matcher.matches(&prop.value))
            })
        })
    }

    /// Whether applying this rule changes anything at all.
    pub fn is_effective(&self) -> bool {
        !self.rename.is_empty()
            || !self.remove.is_empty()
            || !self.set.is_empty()
            || self.replace_with.is_some()
            || (self.import_from.is_some() && self.import_to.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migr8_graph::NodeId;

    fn usage_with(props: &[(&str, PropValue)]) -> UsageSite {
        use migr8_graph::{ByteSpan, ImportKey, Prop};
        let mut map = rustc_hash::FxHashMap::default();
        let mut order = Vec::new();
        for (name, value) in props {
            order.push(name.to_string());
            map.insert(
                name.to_string(),
                Prop {
                    value: value.clone(),
                    span: ByteSpan::new(0, 0),
                    value_span: None,
                },
            );
        }
        UsageSite {
            file: "/x.jsx".into(),
            import: ImportKey {
                file: "/x.jsx".into(),
                local_name: "Link".into(),
            },
            component: "Link".into(),
            props: map,
            prop_order: order,
            node: NodeId(0),
            name_span: ByteSpan::new(0, 0),
            attrs_end: 0,
            children_span: None,
            self_closing: true,
            spreads: Vec::new(),
        }
    }

    fn rule(json: serde_json::Value) -> TransformationRule {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn presence_and_literal_groups_are_or_combined() {
        let rule = rule(serde_json::json!({
            "match": [{"a": true}, {"b": "x"}]
        }));
        let has_a = usage_with(&[("a", PropValue::Literal(Lit::Num(7.0)))]);
        let has_b = usage_with(&[("b", PropValue::Literal(Lit::Str("x".into())))]);
        let has_wrong_b = usage_with(&[("b", PropValue::Literal(Lit::Str("y".into())))]);
        let has_neither = usage_with(&[("c", PropValue::Literal(Lit::Bool(true)))]);

        assert!(rule.matches(&has_a, "@pkg"));
        assert!(rule.matches(&has_b, "@pkg"));
        assert!(!rule.matches(&has_wrong_b, "@pkg"));
        assert!(!rule.matches(&has_neither, "@pkg"));
    }

    #[test]
    fn group_entries_are_and_combined() {
        let rule = rule(serde_json::json!({
            "match": [{"a": true, "b": "x"}]
        }));
        let only_a = usage_with(&[("a", PropValue::Literal(Lit::Bool(true)))]);
        let both = usage_with(&[
            ("a", PropValue::Literal(Lit::Bool(true))),
            ("b", PropValue::Literal(Lit::Str("x".into()))),
        ]);
        assert!(!rule.matches(&only_a, "@pkg"));
        assert!(rule.matches(&both, "@pkg"));
    }

    #[test]
    fn opaque_expressions_satisfy_presence_not_literals() {
        let presence = rule(serde_json::json!({"match": [{"a": true}]}));
        let literal = rule(serde_json::json!({"match": [{"a": "x"}]}));
        let usage = usage_with(&[("a", PropValue::OpaqueExpr(NodeId(1)))]);
        assert!(presence.matches(&usage, "@pkg"));
        assert!(!literal.matches(&usage, "@pkg"));
    }

    #[test]
    fn import_source_criterion_gates_matching() {
        let rule = rule(serde_json::json!({
            "match": [{"size": "small"}],
            "importFrom": "@old/pkg"
        }));
        let usage = usage_with(&[("size", PropValue::Literal(Lit::Str("small".into())))]);
        assert!(rule.matches(&usage, "@old/pkg"));
        assert!(!rule.matches(&usage, "@other/pkg"));
    }

    #[test]
    fn matchless_rule_matches_by_import_only() {
        let rule = rule(serde_json::json!({"importFrom": "@old/pkg", "importTo": "@new/pkg"}));
        let usage = usage_with(&[]);
        assert!(rule.matches(&usage, "@old/pkg"));
        assert!(!rule.matches(&usage, "@new/pkg"));
    }

    #[test]
    fn rule_value_rendering() {
        assert_eq!(RuleValue::Str("x".into()).render("a"), "a=\"x\"");
        assert_eq!(RuleValue::Bool(true).render("a"), "a");
        assert_eq!(RuleValue::Bool(false).render("a"), "a={false}");
        assert_eq!(RuleValue::Num(3.0).render("a"), "a={3}");
    }
}
