//! The migration run: rules in, report out.
//!
//! Order of operations is fixed so failures happen before side effects
//! where possible: load and validate rules, build the graph, plan every
//! rewrite, then (apply mode only) back up and write. Per-file failures
//! never abort the run; they accumulate in the report.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use migr8_graph::{
    BatchOptions, FileError, FileOp, GraphStatistics, Runtime, UsageGraph, build_graph_batched,
    derive_batch_size, list_files,
};
use migr8_memory::SchedulerContext;
use migr8_rules::{RuleFile, TransformationRule};

use crate::backup::{BackupProvider, BackupRequest};
use crate::error::{MigrateError, Result};
use crate::plan::{MigrationPlan, PlanOutcome, plan_files};
use crate::progress::{FileOutcome, ProgressEvent, ProgressSender, emit};

/// Options for one migration run.
#[derive(Debug, Default)]
pub struct MigrateOptions {
    /// Plan and diff only; nothing is written.
    pub dry_run: bool,
    /// When false, only import re-pointing is performed; attribute and
    /// template rewrites are suppressed.
    pub change_code: bool,
    /// JSON rule file, read through the runtime.
    pub rules_path: PathBuf,
    /// Explicit file list; when empty, `include`/`exclude` globs are
    /// walked from `cwd`.
    pub files: Vec<PathBuf>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub cwd: PathBuf,
    /// Treat backup failure (or a missing provider) as fatal.
    pub require_backup: bool,
    pub batch: BatchOptions,
    pub progress: Option<ProgressSender>,
}

impl MigrateOptions {
    pub fn new(rules_path: impl Into<PathBuf>) -> Self {
        Self {
            rules_path: rules_path.into(),
            change_code: true,
            ..Default::default()
        }
    }
}

/// What a run did (or, in dry-run mode, would do).
#[derive(Debug, Serialize)]
pub struct MigrationReport {
    /// Files actually written. Empty in dry-run mode.
    pub files_modified: Vec<PathBuf>,
    /// Graph files where no rule matched.
    pub files_skipped: Vec<PathBuf>,
    /// Per-file failures across build, rewrite, and write.
    pub errors: Vec<FileError>,
    pub backup_id: Option<String>,
    pub statistics: GraphStatistics,
    /// Planned rewrites with diffs, for review.
    #[serde(skip)]
    pub plan: MigrationPlan,
}

/// Orchestrates graph building, planning, and writing.
#[derive(Debug)]
pub struct Migrator {
    runtime: Arc<dyn Runtime>,
    backup: Option<Arc<dyn BackupProvider>>,
    scheduler: Option<SchedulerContext>,
}

impl Migrator {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self {
            runtime,
            backup: None,
            scheduler: None,
        }
    }

    pub fn with_backup(mut self, backup: Arc<dyn BackupProvider>) -> Self {
        self.backup = Some(backup);
        self
    }

    /// Attach a memory scheduler consulted between batches. The caller
    /// keeps the start/stop lifecycle.
    pub fn with_scheduler(mut self, scheduler: SchedulerContext) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub async fn migrate(&self, options: MigrateOptions) -> Result<MigrationReport> {
        let rules = self.load_rules(&options).await?;
        let effective = effective_rules(&rules, options.change_code);

        let files = if options.files.is_empty() {
            list_files(&options.include, &options.cwd, &options.exclude)?
        } else {
            options.files.clone()
        };
        info!(files = files.len(), rules = effective.len(), "migration starting");

        let (graph, mut errors) = build_graph_batched(
            Arc::clone(&self.runtime),
            files,
            rules.tracked_lookup(),
            options.batch.clone(),
            self.scheduler.as_ref(),
        )
        .await;

        let outcome = self.plan_with_progress(&graph, &effective, &options).await;
        errors.extend(outcome.errors);

        let mut report = MigrationReport {
            files_modified: Vec::new(),
            files_skipped: outcome.skipped,
            errors,
            backup_id: None,
            statistics: graph.statistics(),
            plan: outcome.plan,
        };

        if !options.dry_run && !report.plan.is_empty() {
            report.backup_id = self.back_up(&options, &report.plan).await?;
            self.write_plan(&options, &mut report).await;
        }

        emit(options.progress.as_ref(), ProgressEvent::Done);
        info!(
            modified = report.files_modified.len(),
            planned = report.plan.files.len(),
            skipped = report.files_skipped.len(),
            errors = report.errors.len(),
            dry_run = options.dry_run,
            "migration finished"
        );
        Ok(report)
    }

    async fn load_rules(&self, options: &MigrateOptions) -> Result<RuleFile> {
        let text = self
            .runtime
            .read_file(&options.rules_path)
            .await
            .map_err(|source| MigrateError::RulesUnreadable {
                path: options.rules_path.clone(),
                source,
            })?;
        Ok(RuleFile::from_json(&text)?)
    }

    /// Size of the next chunk, capped by the scheduler's recommendation.
    fn chunk_size(&self, configured: usize) -> usize {
        self.scheduler
            .as_ref()
            .map(|s| configured.min(s.recommended_batch_size()))
            .unwrap_or(configured)
            .max(1)
    }

    async fn pause_if_over_budget(&self, options: &MigrateOptions) {
        if let Some(scheduler) = &self.scheduler {
            scheduler
                .check_between_batches(options.batch.memory_limit_mb)
                .await;
        }
    }

    /// Plan in chunks so the scheduler gets a say between them, same as the
    /// graph build.
    async fn plan_with_progress(
        &self,
        graph: &UsageGraph,
        rules: &[TransformationRule],
        options: &MigrateOptions,
    ) -> PlanOutcome {
        let files = graph.files();
        let configured = options
            .batch
            .batch_size
            .unwrap_or_else(|| derive_batch_size(files.len()));

        let mut outcome = PlanOutcome::default();
        let mut remaining = files.as_slice();
        while !remaining.is_empty() {
            let (chunk, rest) =
                remaining.split_at(self.chunk_size(configured).min(remaining.len()));
            remaining = rest;
            plan_files(graph, rules, chunk.to_vec(), &mut outcome);
            self.pause_if_over_budget(options).await;
        }

        let progress = options.progress.as_ref();
        for plan in &outcome.plan.files {
            emit(
                progress,
                ProgressEvent::Diff {
                    path: plan.path.clone(),
                    diff: plan.diff.clone(),
                },
            );
            emit(
                progress,
                ProgressEvent::File {
                    path: plan.path.clone(),
                    outcome: FileOutcome::Modified,
                },
            );
        }
        for path in &outcome.skipped {
            emit(
                progress,
                ProgressEvent::File {
                    path: path.clone(),
                    outcome: FileOutcome::Skipped,
                },
            );
        }
        for error in &outcome.errors {
            emit(
                progress,
                ProgressEvent::File {
                    path: error.path.clone(),
                    outcome: FileOutcome::Failed,
                },
            );
        }
        outcome
    }

    async fn back_up(
        &self,
        options: &MigrateOptions,
        plan: &MigrationPlan,
    ) -> Result<Option<String>> {
        let Some(provider) = &self.backup else {
            if options.require_backup {
                return Err(MigrateError::MissingBackupProvider);
            }
            return Ok(None);
        };

        let request = BackupRequest {
            files: plan.paths(),
            label: options.rules_path.display().to_string(),
        };
        match provider.create_backup(&request).await {
            Ok(id) => Ok(Some(id)),
            Err(e) if options.require_backup => Err(MigrateError::Backup(e)),
            Err(e) => {
                warn!(error = %e, "backup failed, continuing without one");
                Ok(None)
            }
        }
    }

    async fn write_plan(&self, options: &MigrateOptions, report: &mut MigrationReport) {
        let total = report.plan.files.len();
        let configured = options
            .batch
            .batch_size
            .unwrap_or_else(|| derive_batch_size(total));

        let mut start = 0;
        while start < total {
            let end = (start + self.chunk_size(configured)).min(total);
            for index in start..end {
                let plan = &report.plan.files[index];
                match self.runtime.write_file(&plan.path, &plan.rewritten).await {
                    Ok(()) => report.files_modified.push(plan.path.clone()),
                    Err(e) => {
                        warn!(file = %plan.path.display(), error = %e, "write failed");
                        report.errors.push(FileError::new(
                            FileOp::Write,
                            plan.path.clone(),
                            e.to_string(),
                        ));
                        emit(
                            options.progress.as_ref(),
                            ProgressEvent::File {
                                path: plan.path.clone(),
                                outcome: FileOutcome::Failed,
                            },
                        );
                    }
                }
            }
            start = end;
            self.pause_if_over_budget(options).await;
        }
    }
}

/// Strip rules down to import re-pointing when code changes are disabled.
fn effective_rules(rules: &RuleFile, change_code: bool) -> Vec<TransformationRule> {
    if change_code {
        return rules.rules.clone();
    }
    rules
        .rules
        .iter()
        .filter(|r| r.import_from.is_some() && r.import_to.is_some())
        .map(|r| TransformationRule {
            rename: Default::default(),
            remove: Vec::new(),
            set: Default::default(),
            replace_with: None,
            ..r.clone()
        })
        .collect()
}
