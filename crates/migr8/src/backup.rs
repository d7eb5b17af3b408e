//! Backup collaborator.
//!
//! The orchestrator never talks to version control or snapshot storage
//! directly; embedders supply a provider. Backup failure is a warning
//! unless the run mandates backups, in which case it aborts before any
//! write.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("backup failed: {0}")]
pub struct BackupError(pub String);

/// What a provider is asked to preserve before files are rewritten.
#[derive(Debug, Clone)]
pub struct BackupRequest {
    /// Files the migration is about to overwrite.
    pub files: Vec<PathBuf>,
    /// Human-readable label for the backup, e.g. the rule file name.
    pub label: String,
}

#[async_trait]
pub trait BackupProvider: Send + Sync + std::fmt::Debug {
    /// Preserve the requested files, returning an opaque backup id.
    async fn create_backup(&self, request: &BackupRequest) -> Result<String, BackupError>;
}
