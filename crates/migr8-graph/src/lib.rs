//! # migr8-graph
//!
//! Dependency-usage graph builder: links every import of a tracked package
//! to every structural (JSX) usage of the imported symbol.
//!
//! Building happens in two passes per file. The import pass records one
//! [`ImportBinding`] per import specifier; the usage pass visits JSX
//! elements whose tag is a simple identifier, resolves the tag against the
//! file's bindings by local name, and emits a [`UsageSite`] with the
//! element's attributes. Unresolved tags are skipped: the graph holds
//! tracked components only.
//!
//! AST nodes are addressed through stable [`NodeId`]s into a per-file span
//! table rather than references into the parse arena, so rewrites can never
//! invalidate a reference held elsewhere.
//!
//! ```rust,no_run
//! use migr8_graph::{BatchOptions, TrackedLookup, build_graph_batched, NativeRuntime};
//! use std::sync::Arc;
//!
//! # async fn demo(files: Vec<std::path::PathBuf>) {
//! let runtime = Arc::new(NativeRuntime::new());
//! let (graph, errors) =
//!     build_graph_batched(runtime, files, TrackedLookup::default(), BatchOptions::default(), None)
//!         .await;
//! println!("{} usages, {} files failed", graph.usages.len(), errors.len());
//! # }
//! ```

pub mod binding;
pub mod builder;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod graph;
pub mod node;
pub mod runtime;
pub mod usage;

pub use binding::{ImportBinding, ImportKey, SpecifierKind};
pub use builder::{BatchOptions, build_graph, build_graph_batched, derive_batch_size};
pub use discovery::list_files;
pub use error::{FileError, FileOp, GraphError, Result};
pub use extract::{FileExtraction, TrackedLookup, extract_file, reparses_cleanly};
pub use graph::{GraphStatistics, UsageGraph};
pub use node::{ByteSpan, NodeId, NodeTable};
pub use runtime::{NativeRuntime, Runtime, RuntimeError, RuntimeResult};
pub use usage::{Lit, Prop, PropValue, UsageSite};

#[cfg(any(test, feature = "test-utils"))]
pub use runtime::test_utils::TestRuntime;
