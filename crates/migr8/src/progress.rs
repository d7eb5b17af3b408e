//! Progress events.
//!
//! Events are pushed onto an unbounded channel in per-file completion
//! order. A dropped receiver never stalls the run; sends are best-effort.

use std::path::PathBuf;

use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// A rewrite was planned (dry-run) or written (apply).
    Modified,
    /// The file contributed to the graph but no rule matched.
    Skipped,
    /// Rewriting or writing failed; details land in the report's errors.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    File { path: PathBuf, outcome: FileOutcome },
    Diff { path: PathBuf, diff: String },
    Done,
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

pub(crate) fn emit(sender: Option<&ProgressSender>, event: ProgressEvent) {
    if let Some(sender) = sender {
        let _ = sender.send(event);
    }
}
