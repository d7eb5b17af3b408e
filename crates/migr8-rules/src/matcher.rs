//! First-match-wins rule selection.

use migr8_graph::UsageSite;

use crate::rule::TransformationRule;

/// Select the rule that applies to `usage`, or `None`.
///
/// Rules must already be sorted by ascending `order` (rule-file loading
/// guarantees it). The first satisfying rule wins and later rules are
/// never re-evaluated against the rewritten usage.
pub fn match_rule<'r>(
    usage: &UsageSite,
    binding_package: &str,
    rules: &'r [TransformationRule],
) -> Option<&'r TransformationRule> {
    rules
        .iter()
        .find(|rule| rule.matches(usage, binding_package))
}

#[cfg(test)]
mod tests {
    use migr8_graph::{ByteSpan, ImportKey, Lit, NodeId, Prop, PropValue};
    use serde_json::json;

    use super::*;

    fn usage() -> UsageSite {
        let mut props = rustc_hash::FxHashMap::default();
        props.insert(
            "size".to_string(),
            Prop {
                value: PropValue::Literal(Lit::Str("small".into())),
                span: ByteSpan::new(0, 0),
                value_span: None,
            },
        );
        UsageSite {
            file: "/x.jsx".into(),
            import: ImportKey {
                file: "/x.jsx".into(),
                local_name: "Link".into(),
            },
            component: "Link".into(),
            props,
            prop_order: vec!["size".into()],
            node: NodeId(0),
            name_span: ByteSpan::new(0, 0),
            attrs_end: 0,
            children_span: None,
            self_closing: true,
            spreads: Vec::new(),
        }
    }

    fn rules(value: serde_json::Value) -> Vec<TransformationRule> {
        let mut rules: Vec<TransformationRule> = serde_json::from_value(value).unwrap();
        rules.sort_by_key(|r| r.order);
        rules
    }

    #[test]
    fn smallest_order_wins_when_both_match() {
        let rules = rules(json!([
            {"order": 2, "match": [{"size": true}], "remove": ["size"]},
            {"order": 1, "match": [{"size": "small"}], "set": {"variant": "bodyRegular"}}
        ]));
        let rule = match_rule(&usage(), "@old/pkg", &rules).unwrap();
        assert_eq!(rule.order, 1);
    }

    #[test]
    fn no_match_is_not_an_error() {
        let rules = rules(json!([
            {"order": 1, "match": [{"missing": true}]}
        ]));
        assert!(match_rule(&usage(), "@old/pkg", &rules).is_none());
    }
}
