//! Graph construction over a file set.
//!
//! Files within a batch are processed by a bounded worker pool; batches run
//! sequentially so the memory scheduler can be consulted between them. A
//! single bad file never aborts the build: per-file failures are collected
//! as `FileError` values and returned alongside the graph.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use migr8_memory::SchedulerContext;

use crate::error::{FileError, FileOp, GraphError, Result};
use crate::extract::{FileExtraction, TrackedLookup, extract_file};
use crate::graph::UsageGraph;
use crate::runtime::Runtime;

/// Options for a batched build.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Files per batch; `None` derives `max(50, min(files/10, 200))`.
    pub batch_size: Option<usize>,
    /// Upper bound on concurrent file tasks within a batch.
    pub concurrency: usize,
    /// Per-run memory budget consulted between batches.
    pub memory_limit_mb: Option<u64>,
    /// Checked between batches; in-flight tasks always run to completion.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: None,
            concurrency: 8,
            memory_limit_mb: None,
            cancel: None,
        }
    }
}

/// Derived batch size for a file count, used when none is configured.
pub fn derive_batch_size(file_count: usize) -> usize {
    (file_count / 10).clamp(50, 200)
}

/// Build a graph sequentially. Any parse or read failure is fatal here;
/// batched mode is the lenient path.
pub async fn build_graph(
    runtime: &dyn Runtime,
    files: &[PathBuf],
    lookup: &TrackedLookup,
) -> Result<UsageGraph> {
    let mut graph = UsageGraph::new();
    for path in files {
        let text = runtime
            .read_file(path)
            .await
            .map_err(|source| GraphError::Read {
                path: path.clone(),
                source,
            })?;
        let extraction = extract_file(path, &text, lookup)?;
        merge(&mut graph, path.clone(), text, extraction);
    }
    Ok(graph)
}

/// Build a graph in memory-checked batches.
///
/// Never errors on individual files; the returned graph reflects every file
/// that succeeded, and the error list reports the rest.
pub async fn build_graph_batched(
    runtime: Arc<dyn Runtime>,
    files: Vec<PathBuf>,
    lookup: TrackedLookup,
    options: BatchOptions,
    scheduler: Option<&SchedulerContext>,
) -> (UsageGraph, Vec<FileError>) {
    let lookup = Arc::new(lookup);
    let mut graph = UsageGraph::new();
    let mut errors = Vec::new();

    let configured_batch = options
        .batch_size
        .unwrap_or_else(|| derive_batch_size(files.len()));

    let mut remaining = files.as_slice();
    while !remaining.is_empty() {
        if let Some(cancel) = &options.cancel {
            if cancel.load(Ordering::Relaxed) {
                debug!(remaining = remaining.len(), "build cancelled between batches");
                break;
            }
        }

        // Strategies may shrink the recommended batch size mid-run, so the
        // chunk boundary is recomputed every iteration.
        let batch_size = scheduler
            .map(|s| configured_batch.min(s.recommended_batch_size()))
            .unwrap_or(configured_batch)
            .max(1);
        let (batch, rest) = remaining.split_at(batch_size.min(remaining.len()));
        remaining = rest;

        let concurrency = scheduler
            .map(|s| options.concurrency.min(s.recommended_concurrency()))
            .unwrap_or(options.concurrency)
            .max(1);

        process_batch(
            Arc::clone(&runtime),
            batch,
            Arc::clone(&lookup),
            concurrency,
            &mut graph,
            &mut errors,
        )
        .await;

        if let Some(scheduler) = scheduler {
            scheduler.check_between_batches(options.memory_limit_mb).await;
        }
    }

    (graph, errors)
}

/// Run one batch through the worker pool and merge results single-writer.
async fn process_batch(
    runtime: Arc<dyn Runtime>,
    batch: &[PathBuf],
    lookup: Arc<TrackedLookup>,
    concurrency: usize,
    graph: &mut UsageGraph,
    errors: &mut Vec<FileError>,
) {
    let pool = Arc::new(Semaphore::new(concurrency.min(batch.len()).max(1)));
    let mut tasks: JoinSet<std::result::Result<(PathBuf, String, FileExtraction), FileError>> =
        JoinSet::new();

    for path in batch {
        let runtime = Arc::clone(&runtime);
        let lookup = Arc::clone(&lookup);
        let pool = Arc::clone(&pool);
        let path = path.clone();
        tasks.spawn(async move {
            let _permit = pool.acquire_owned().await.expect("pool never closed");
            let text = runtime.read_file(&path).await.map_err(|e| {
                FileError::new(FileOp::Read, path.clone(), e.to_string())
            })?;
            let extraction = extract_file(&path, &text, &lookup).map_err(|e| {
                FileError::new(FileOp::Parse, path.clone(), e.to_string())
            })?;
            Ok((path, text, extraction))
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok((path, text, extraction))) => merge(graph, path, text, extraction),
            Ok(Err(file_error)) => {
                warn!(path = %file_error.path.display(), op = %file_error.op, "file skipped");
                errors.push(file_error);
            }
            Err(join_error) => {
                // A panicked worker is reported against the batch, not
                // silently dropped.
                errors.push(FileError::new(
                    FileOp::Parse,
                    PathBuf::new(),
                    join_error.to_string(),
                ));
            }
        }
    }
}

fn merge(graph: &mut UsageGraph, path: PathBuf, text: String, extraction: FileExtraction) {
    graph.merge_file(
        path,
        text,
        extraction.nodes,
        extraction.imports,
        extraction.usages,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::test_utils::TestRuntime;

    const TRACKED: &str = r#"
import { Link } from "@acme/typography";
export const A = () => <Link size="small">a</Link>;
"#;
    const UNTRACKED: &str = r#"
export const B = () => <div>b</div>;
"#;

    fn fixture() -> (Arc<dyn Runtime>, Vec<PathBuf>) {
        let runtime = TestRuntime::new();
        runtime.add_file("/proj/a.jsx", TRACKED);
        runtime.add_file("/proj/b.jsx", UNTRACKED);
        runtime.add_file("/proj/broken.jsx", "import { from ???");
        let files = vec![
            PathBuf::from("/proj/a.jsx"),
            PathBuf::from("/proj/b.jsx"),
            PathBuf::from("/proj/broken.jsx"),
        ];
        (Arc::new(runtime), files)
    }

    #[tokio::test]
    async fn batched_build_collects_errors_without_aborting() {
        let (runtime, files) = fixture();
        let (graph, errors) = build_graph_batched(
            runtime,
            files,
            TrackedLookup::default(),
            BatchOptions {
                batch_size: Some(1),
                ..Default::default()
            },
            None,
        )
        .await;

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].op, FileOp::Parse);
        assert_eq!(graph.usages.len(), 1);
        assert!(graph.check_integrity());
    }

    #[tokio::test]
    async fn rebuild_is_set_equal() {
        let (runtime, files) = fixture();
        let (first, _) = build_graph_batched(
            Arc::clone(&runtime),
            files.clone(),
            TrackedLookup::default(),
            BatchOptions::default(),
            None,
        )
        .await;
        let (second, _) = build_graph_batched(
            runtime,
            files,
            TrackedLookup::default(),
            BatchOptions {
                batch_size: Some(1),
                concurrency: 1,
                ..Default::default()
            },
            None,
        )
        .await;
        assert!(first.set_eq(&second));
    }

    #[tokio::test]
    async fn sequential_build_fails_fast_on_parse_error() {
        let (runtime, files) = fixture();
        let result = build_graph(runtime.as_ref(), &files, &TrackedLookup::default()).await;
        assert!(matches!(result, Err(GraphError::Parse { .. })));
    }

    #[tokio::test]
    async fn cancellation_stops_between_batches() {
        let (runtime, files) = fixture();
        let cancel = Arc::new(AtomicBool::new(true));
        let (graph, errors) = build_graph_batched(
            runtime,
            files,
            TrackedLookup::default(),
            BatchOptions {
                batch_size: Some(1),
                cancel: Some(cancel),
                ..Default::default()
            },
            None,
        )
        .await;
        assert!(graph.imports.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn derived_batch_size_clamps() {
        assert_eq!(derive_batch_size(10), 50);
        assert_eq!(derive_batch_size(1000), 100);
        assert_eq!(derive_batch_size(100_000), 200);
    }
}
