//! Declarative JSX transformation rules.
//!
//! A rule file pairs a `lookup` table (which packages and components to
//! track) with an ordered list of transformation rules. This crate loads
//! and validates rule files, matches rules against usage sites from
//! [`migr8_graph`], and rewrites source text with span edits so untouched
//! bytes survive exactly.
//!
//! ```no_run
//! use migr8_rules::RuleFile;
//!
//! let rules = RuleFile::from_json(r#"{
//!     "lookup": {"@old/pkg": ["Link"]},
//!     "migr8rules": [{
//!         "order": 1,
//!         "match": [{"size": "small"}],
//!         "remove": ["size"],
//!         "set": {"variant": "bodyRegular"},
//!         "importFrom": "@old/pkg",
//!         "importTo": "@new/pkg"
//!     }]
//! }"#)?;
//! assert_eq!(rules.rules.len(), 1);
//! # Ok::<(), migr8_rules::RuleError>(())
//! ```

mod apply;
mod diff;
mod edit;
mod error;
mod matcher;
mod rule;
mod rulefile;
mod validate;

pub use apply::{AppliedRule, FileRewrite, UsageContext, plan_file};
pub use diff::unified_diff;
pub use edit::{TextEdit, apply_edits};
pub use error::{Result, RuleError};
pub use matcher::match_rule;
pub use rule::{MatchGroup, MatchValue, ReplaceTemplate, RuleValue, TransformationRule};
pub use rulefile::RuleFile;
pub use validate::{RuleProblem, ValidationReport, validate_migration_rules};
