//! Run-level errors.
//!
//! Only failures that must stop a run before side effects live here.
//! Per-file problems (parse, rewrite, write) are collected as
//! [`migr8_graph::FileError`] values in the report instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::backup::BackupError;

pub type Result<T> = std::result::Result<T, MigrateError>;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("failed to read rule file '{path}': {source}")]
    RulesUnreadable {
        path: PathBuf,
        #[source]
        source: migr8_graph::RuntimeError,
    },

    #[error("rule file rejected: {0}")]
    Rules(#[from] migr8_rules::RuleError),

    #[error(transparent)]
    Graph(#[from] migr8_graph::GraphError),

    #[error("backups are mandated but no backup provider is configured")]
    MissingBackupProvider,

    #[error("backups are mandated and the backup failed: {0}")]
    Backup(#[from] BackupError),
}
