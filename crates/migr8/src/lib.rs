//! # migr8
//!
//! Rule-driven migration of UI component usage across JS/TS source trees.
//!
//! A run builds a usage graph linking every import of a tracked package to
//! every JSX usage of the imported symbol, matches declarative rules
//! against those usages, and rewrites the matched files with exact format
//! preservation, producing unified diffs for review. Dry-run mode stops at
//! the plan; apply mode backs up (optionally) and writes through the
//! [`Runtime`] collaborator.
//!
//! ```no_run
//! use std::sync::Arc;
//! use migr8::{MigrateOptions, Migrator, NativeRuntime};
//!
//! # async fn run() -> Result<(), migr8::MigrateError> {
//! let migrator = Migrator::new(Arc::new(NativeRuntime::new()));
//! let mut options = MigrateOptions::new("migr8.rules.json");
//! options.dry_run = true;
//! options.include = vec!["src/**/*.tsx".into(), "src/**/*.jsx".into()];
//! options.cwd = std::env::current_dir().expect("cwd");
//!
//! let report = migrator.migrate(options).await?;
//! for plan in &report.plan.files {
//!     println!("{}", plan.diff);
//! }
//! # Ok(())
//! # }
//! ```

mod backup;
mod error;
mod orchestrator;
mod plan;
mod progress;

pub use backup::{BackupError, BackupProvider, BackupRequest};
pub use error::{MigrateError, Result};
pub use orchestrator::{MigrateOptions, MigrationReport, Migrator};
pub use plan::{FilePlan, MigrationPlan, PlanOutcome, plan_files, plan_migration};
pub use progress::{FileOutcome, ProgressEvent, ProgressSender};

pub use migr8_graph::{
    BatchOptions, FileError, FileOp, GraphStatistics, ImportBinding, NativeRuntime, Runtime,
    UsageGraph, UsageSite, list_files,
};
pub use migr8_memory::{SchedulerConfig, SchedulerContext};
pub use migr8_rules::{RuleFile, TransformationRule, ValidationReport};
