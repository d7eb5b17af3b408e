//! Structural validation of rule payloads.
//!
//! Validation never panics and never throws mid-way: every problem in the
//! payload is collected into a report so operators can fix the whole file
//! in one pass.

use serde_json::Value;

/// One problem found in a rule payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleProblem {
    /// Index into `migr8rules`, or `None` for file-level problems.
    pub rule_index: Option<usize>,
    pub message: String,
}

impl std::fmt::Display for RuleProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.rule_index {
            Some(i) => write!(f, "rule {i}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<RuleProblem>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn file_problem(&mut self, message: impl Into<String>) {
        self.errors.push(RuleProblem {
            rule_index: None,
            message: message.into(),
        });
    }

    fn rule_problem(&mut self, index: usize, message: impl Into<String>) {
        self.errors.push(RuleProblem {
            rule_index: Some(index),
            message: message.into(),
        });
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// Validate the whole rule-file payload: `lookup` and `migr8rules` must
/// both be present and well-shaped.
pub fn validate_migration_rules(payload: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(object) = payload.as_object() else {
        report.file_problem("payload must be a JSON object");
        return report;
    };

    match object.get("lookup") {
        None => report.file_problem("missing 'lookup'"),
        Some(lookup) if !lookup.is_object() => {
            report.file_problem("'lookup' must map packages to component arrays");
        }
        Some(lookup) => {
            for (package, components) in lookup.as_object().into_iter().flatten() {
                if !components.is_array() {
                    report.file_problem(format!("lookup entry '{package}' must be an array"));
                }
            }
        }
    }

    match object.get("migr8rules") {
        None => report.file_problem("missing 'migr8rules'"),
        Some(rules) if !rules.is_array() => report.file_problem("'migr8rules' must be an array"),
        Some(rules) => {
            for (index, rule) in rules.as_array().into_iter().flatten().enumerate() {
                validate_rule(index, rule, &mut report);
            }
        }
    }

    report
}

fn validate_rule(index: usize, rule: &Value, report: &mut ValidationReport) {
    let Some(rule) = rule.as_object() else {
        report.rule_problem(index, "rule must be an object");
        return;
    };

    let has_match = rule
        .get("match")
        .and_then(Value::as_array)
        .is_some_and(|groups| !groups.is_empty());
    let has_import = rule.get("importFrom").is_some_and(Value::is_string);
    if !has_match && !has_import {
        report.rule_problem(index, "needs a 'match' criterion or an 'importFrom'");
    }

    if let Some(groups) = rule.get("match") {
        match groups.as_array() {
            None => report.rule_problem(index, "'match' must be an array of groups"),
            Some(groups) => {
                for group in groups {
                    if !group.is_object() {
                        report.rule_problem(index, "each match group must be an object");
                    }
                }
            }
        }
    }

    for map_field in ["rename", "set"] {
        if let Some(value) = rule.get(map_field) {
            if !value.is_object() {
                report.rule_problem(index, format!("'{map_field}' must be a map"));
            }
        }
    }

    if let Some(remove) = rule.get("remove") {
        match remove.as_array() {
            None => report.rule_problem(index, "'remove' must be an array"),
            Some(names) => {
                if names.iter().any(|n| !n.is_string()) {
                    report.rule_problem(index, "'remove' entries must be strings");
                }
            }
        }
    }

    if let Some(template) = rule.get("replaceWith") {
        let ok = template
            .as_object()
            .and_then(|t| t.get("template"))
            .is_some_and(Value::is_string);
        if !ok {
            report.rule_problem(index, "'replaceWith' needs a string 'template'");
        }
    }

    let from = rule.get("importFrom").is_some();
    let to = rule.get("importTo").is_some();
    if to && !from {
        report.rule_problem(index, "'importTo' requires 'importFrom'");
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_a_complete_payload() {
        let payload = json!({
            "lookup": {"@old/pkg": ["Link"]},
            "migr8rules": [{
                "order": 1,
                "match": [{"size": "small"}],
                "remove": ["size"],
                "set": {"variant": "bodyRegular"},
                "importFrom": "@old/pkg",
                "importTo": "@new/pkg"
            }]
        });
        assert!(validate_migration_rules(&payload).is_valid());
    }

    #[test]
    fn rejects_missing_lookup_and_rules() {
        let report = validate_migration_rules(&json!({}));
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn rejects_rule_without_any_criterion() {
        let payload = json!({
            "lookup": {},
            "migr8rules": [{"remove": ["size"]}]
        });
        let report = validate_migration_rules(&payload);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].rule_index, Some(0));
    }

    #[test]
    fn rejects_malformed_shapes_without_throwing() {
        let payload = json!({
            "lookup": {"@p": "not-an-array"},
            "migr8rules": [{
                "match": [{"a": true}],
                "set": ["not", "a", "map"],
                "remove": "not-an-array",
                "rename": 3
            }]
        });
        let report = validate_migration_rules(&payload);
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 4);
    }

    #[test]
    fn import_only_rule_is_valid() {
        let payload = json!({
            "lookup": {},
            "migr8rules": [{"importFrom": "@old/pkg", "importTo": "@new/pkg"}]
        });
        assert!(validate_migration_rules(&payload).is_valid());
    }
}
