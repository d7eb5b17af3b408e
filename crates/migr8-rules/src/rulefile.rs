//! Rule file loading.
//!
//! Format: `{"lookup": {package: [component, ...]}, "migr8rules": [...]}`.
//! The payload is validated structurally before any typed deserialization,
//! so malformed files produce a full problem report instead of a serde
//! abort at the first bad field.

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::debug;

use migr8_graph::TrackedLookup;

use crate::error::{Result, RuleError};
use crate::rule::TransformationRule;
use crate::validate::validate_migration_rules;

/// Parsed and validated rule file.
#[derive(Debug, Clone)]
pub struct RuleFile {
    /// Packages (and optionally components) the graph build should track.
    pub lookup: FxHashMap<String, Vec<String>>,
    /// Rules sorted by ascending `order`.
    pub rules: Vec<TransformationRule>,
}

impl RuleFile {
    pub fn from_json(text: &str) -> Result<Self> {
        let payload: Value = serde_json::from_str(text)?;
        Self::from_value(payload)
    }

    pub fn from_value(payload: Value) -> Result<Self> {
        let report = validate_migration_rules(&payload);
        if !report.is_valid() {
            return Err(RuleError::Validation(report));
        }

        // Validation vouched for the shape; typed decoding cannot fail now
        // except on exotic values (deep nesting), which still surface as a
        // Json error rather than a panic.
        let mut lookup: FxHashMap<String, Vec<String>> = FxHashMap::default();
        if let Some(entries) = payload.get("lookup").and_then(Value::as_object) {
            for (package, components) in entries {
                let components: Vec<String> = serde_json::from_value(components.clone())?;
                lookup.insert(package.clone(), components);
            }
        }

        let mut rules: Vec<TransformationRule> = match payload.get("migr8rules") {
            Some(raw) => serde_json::from_value(raw.clone())?,
            None => Vec::new(),
        };
        rules.sort_by_key(|r| r.order);
        debug!(rules = rules.len(), packages = lookup.len(), "rule file loaded");

        Ok(Self { lookup, rules })
    }

    /// Lookup table in the form the graph builder consumes.
    pub fn tracked_lookup(&self) -> TrackedLookup {
        TrackedLookup::new(self.lookup.clone())
    }
}
