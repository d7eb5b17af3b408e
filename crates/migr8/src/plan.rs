//! Migration planning over a built usage graph.
//!
//! Planning is pure with respect to the filesystem: it consumes the graph's
//! captured sources and produces rewritten text plus diffs. Files with no
//! matched usage are excluded from the plan entirely.

use std::path::PathBuf;

use tracing::warn;

use migr8_graph::{FileError, FileOp, UsageGraph};
use migr8_rules::{AppliedRule, TransformationRule, UsageContext, plan_file};

/// One file's planned rewrite.
#[derive(Debug, Clone)]
pub struct FilePlan {
    pub path: PathBuf,
    pub rewritten: String,
    pub diff: String,
    pub applied: Vec<AppliedRule>,
}

#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    pub files: Vec<FilePlan>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

/// Outcome of planning across the whole graph.
#[derive(Debug, Default)]
pub struct PlanOutcome {
    pub plan: MigrationPlan,
    /// Graph files where no rule matched.
    pub skipped: Vec<PathBuf>,
    /// Files whose rewrite failed; the originals stay untouched.
    pub errors: Vec<FileError>,
}

/// Match and apply `rules` to every file the graph knows about.
pub fn plan_migration(graph: &UsageGraph, rules: &[TransformationRule]) -> PlanOutcome {
    let mut outcome = PlanOutcome::default();
    plan_files(graph, rules, graph.files(), &mut outcome);
    outcome
}

/// Plan one chunk of files into an accumulating outcome. The orchestrator
/// feeds chunks through here so the memory scheduler can run between them.
pub fn plan_files(
    graph: &UsageGraph,
    rules: &[TransformationRule],
    paths: Vec<PathBuf>,
    outcome: &mut PlanOutcome,
) {
    for path in paths {
        let (Some(text), Some(nodes)) = (graph.source_for(&path), graph.nodes_for(&path)) else {
            warn!(file = %path.display(), "graph entry without captured source, skipped");
            outcome.skipped.push(path);
            continue;
        };

        let contexts: Vec<UsageContext<'_>> = graph
            .usages_in(&path)
            .filter_map(|usage| {
                let Some(binding) = graph.binding(&usage.import) else {
                    // Integrity is checked at build time; a miss here means
                    // the graph was assembled by hand.
                    warn!(file = %path.display(), component = %usage.component, "unresolved import key");
                    return None;
                };
                Some(UsageContext {
                    usage,
                    package: &binding.package,
                    import_source_span: binding.source_span,
                })
            })
            .collect();

        match plan_file(&path, text, nodes, &contexts, rules) {
            Ok(Some(rewrite)) => outcome.plan.files.push(FilePlan {
                path,
                rewritten: rewrite.rewritten,
                diff: rewrite.diff,
                applied: rewrite.applied,
            }),
            Ok(None) => outcome.skipped.push(path),
            Err(e) => {
                outcome
                    .errors
                    .push(FileError::new(FileOp::Rewrite, path, e.to_string()));
            }
        }
    }
}
