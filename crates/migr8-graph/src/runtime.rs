//! Filesystem collaborator abstraction.
//!
//! The graph builder and orchestrator never touch `std::fs` directly; they
//! go through `Runtime` so tests can run against an in-memory filesystem
//! and API embedders can substitute their own I/O.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("write denied: {0}")]
    WriteDenied(PathBuf),
}

#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file as UTF-8 text.
    async fn read_file(&self, path: &Path) -> RuntimeResult<String>;

    /// Write a file, replacing existing content.
    async fn write_file(&self, path: &Path, content: &str) -> RuntimeResult<()>;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// Runtime backed by the real filesystem via tokio.
#[derive(Debug, Default, Clone)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Runtime for NativeRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<String> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RuntimeError::FileNotFound(path.to_path_buf()))
            }
            Err(e) => Err(RuntimeError::Io(e.to_string())),
        }
    }

    async fn write_file(&self, path: &Path, content: &str) -> RuntimeResult<()> {
        match tokio::fs::write(path, content).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(RuntimeError::WriteDenied(path.to_path_buf()))
            }
            Err(e) => Err(RuntimeError::Io(e.to_string())),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// In-memory runtime for hermetic tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use std::collections::HashMap;

    use parking_lot::RwLock;

    use super::*;

    #[derive(Debug, Default)]
    pub struct TestRuntime {
        files: RwLock<HashMap<PathBuf, String>>,
        deny_writes: RwLock<Vec<PathBuf>>,
    }

    impl TestRuntime {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
            self.files.write().insert(path.into(), content.into());
            self
        }

        pub fn add_file(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
            self.files.write().insert(path.into(), content.into());
        }

        /// Make subsequent writes to `path` fail, for write-failure tests.
        pub fn deny_write(&self, path: impl Into<PathBuf>) {
            self.deny_writes.write().push(path.into());
        }

        pub fn content(&self, path: &Path) -> Option<String> {
            self.files.read().get(path).cloned()
        }

        pub fn paths(&self) -> Vec<PathBuf> {
            let mut paths: Vec<_> = self.files.read().keys().cloned().collect();
            paths.sort();
            paths
        }
    }

    #[async_trait]
    impl Runtime for TestRuntime {
        async fn read_file(&self, path: &Path) -> RuntimeResult<String> {
            self.files
                .read()
                .get(path)
                .cloned()
                .ok_or_else(|| RuntimeError::FileNotFound(path.to_path_buf()))
        }

        async fn write_file(&self, path: &Path, content: &str) -> RuntimeResult<()> {
            if self.deny_writes.read().iter().any(|p| p == path) {
                return Err(RuntimeError::WriteDenied(path.to_path_buf()));
            }
            self.files
                .write()
                .insert(path.to_path_buf(), content.to_string());
            Ok(())
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.read().contains_key(path)
        }
    }
}
