//! End-to-end migration runs against an in-memory filesystem.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use migr8::{
    BackupError, BackupProvider, BackupRequest, BatchOptions, FileOutcome, MigrateError,
    MigrateOptions, Migrator, ProgressEvent,
};
use migr8_graph::TestRuntime;

const RULES: &str = r#"{
  "lookup": {"@old/pkg": ["Link"]},
  "migr8rules": [{
    "order": 1,
    "match": [{"size": "small"}],
    "remove": ["size"],
    "set": {"variant": "bodyRegular"},
    "importFrom": "@old/pkg",
    "importTo": "@new/pkg"
  }]
}"#;

const MATCHING: &str = r#"import { Link } from "@old/pkg";

export const Hero = () => (
  <Link size="small" href="/docs">Read the docs</Link>
);
"#;

const NON_MATCHING: &str = r#"import { Link } from "@old/pkg";

export const Quiet = () => <Link href="/about">About</Link>;
"#;

#[derive(Debug, Default)]
struct RecordingBackup {
    requests: Mutex<Vec<BackupRequest>>,
    fail: bool,
}

#[async_trait]
impl BackupProvider for RecordingBackup {
    async fn create_backup(&self, request: &BackupRequest) -> Result<String, BackupError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(BackupError("disk full".into()));
        }
        Ok("backup-0001".into())
    }
}

fn fixture() -> (Arc<TestRuntime>, MigrateOptions) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let runtime = Arc::new(TestRuntime::new());
    runtime.add_file("/proj/rules.json", RULES);
    runtime.add_file("/proj/src/hero.jsx", MATCHING);
    runtime.add_file("/proj/src/quiet.jsx", NON_MATCHING);

    let mut options = MigrateOptions::new("/proj/rules.json");
    options.change_code = true;
    options.files = vec![
        PathBuf::from("/proj/src/hero.jsx"),
        PathBuf::from("/proj/src/quiet.jsx"),
    ];
    (runtime, options)
}

#[tokio::test]
async fn apply_rewrites_matching_files_and_repoints_imports() {
    let (runtime, options) = fixture();
    let migrator = Migrator::new(Arc::clone(&runtime) as Arc<dyn migr8::Runtime>);

    let report = migrator.migrate(options).await.unwrap();

    assert_eq!(report.files_modified, vec![PathBuf::from("/proj/src/hero.jsx")]);
    assert_eq!(report.files_skipped, vec![PathBuf::from("/proj/src/quiet.jsx")]);
    assert!(report.errors.is_empty());

    let rewritten = runtime.content(&PathBuf::from("/proj/src/hero.jsx")).unwrap();
    assert!(rewritten.contains(r#"import { Link } from "@new/pkg";"#));
    assert!(rewritten.contains(r#"<Link href="/docs" variant="bodyRegular">Read the docs</Link>"#));
    assert!(!rewritten.contains("size"));

    // The non-matching file is byte-identical.
    let untouched = runtime.content(&PathBuf::from("/proj/src/quiet.jsx")).unwrap();
    assert_eq!(untouched, NON_MATCHING);
}

#[tokio::test]
async fn dry_run_plans_without_writing() {
    let (runtime, mut options) = fixture();
    options.dry_run = true;
    let migrator = Migrator::new(Arc::clone(&runtime) as Arc<dyn migr8::Runtime>);

    let report = migrator.migrate(options).await.unwrap();

    assert!(report.files_modified.is_empty());
    assert_eq!(report.plan.files.len(), 1);
    assert!(report.plan.files[0].diff.contains("-import { Link } from \"@old/pkg\";"));
    assert!(report.plan.files[0].diff.contains("+import { Link } from \"@new/pkg\";"));

    let original = runtime.content(&PathBuf::from("/proj/src/hero.jsx")).unwrap();
    assert_eq!(original, MATCHING);
}

#[tokio::test]
async fn single_file_batches_produce_the_same_plan() {
    let (runtime, mut options) = fixture();
    options.dry_run = true;
    options.batch = BatchOptions {
        batch_size: Some(1),
        concurrency: 1,
        ..Default::default()
    };
    let migrator = Migrator::new(Arc::clone(&runtime) as Arc<dyn migr8::Runtime>);

    let report = migrator.migrate(options).await.unwrap();

    // The non-matching file contributes imports to the graph but never
    // enters the plan.
    assert_eq!(report.statistics.import_count, 2);
    assert_eq!(report.plan.paths(), vec![PathBuf::from("/proj/src/hero.jsx")]);
    assert_eq!(report.files_skipped, vec![PathBuf::from("/proj/src/quiet.jsx")]);
}

#[tokio::test]
async fn second_run_finds_nothing_left_to_do() {
    let (runtime, options) = fixture();
    let migrator = Migrator::new(Arc::clone(&runtime) as Arc<dyn migr8::Runtime>);
    migrator.migrate(options).await.unwrap();

    let (_, mut again) = fixture();
    again.files = vec![
        PathBuf::from("/proj/src/hero.jsx"),
        PathBuf::from("/proj/src/quiet.jsx"),
    ];
    let report = migrator.migrate(again).await.unwrap();

    assert!(report.plan.is_empty());
    assert!(report.files_modified.is_empty());
    // The migrated file now imports an untracked package, so only the
    // never-matching file still shows up in the graph.
    assert_eq!(report.files_skipped, vec![PathBuf::from("/proj/src/quiet.jsx")]);
}

#[tokio::test]
async fn invalid_rules_abort_before_any_side_effect() {
    let (runtime, options) = fixture();
    runtime.add_file("/proj/rules.json", r#"{"migr8rules": [{"remove": ["x"]}]}"#);
    let migrator = Migrator::new(Arc::clone(&runtime) as Arc<dyn migr8::Runtime>);

    let err = migrator.migrate(options).await.unwrap_err();
    assert!(matches!(err, MigrateError::Rules(_)));

    let original = runtime.content(&PathBuf::from("/proj/src/hero.jsx")).unwrap();
    assert_eq!(original, MATCHING);
}

#[tokio::test]
async fn backup_runs_before_writes_and_records_the_planned_files() {
    let (runtime, options) = fixture();
    let backup = Arc::new(RecordingBackup::default());
    let migrator = Migrator::new(Arc::clone(&runtime) as Arc<dyn migr8::Runtime>)
        .with_backup(Arc::clone(&backup) as Arc<dyn BackupProvider>);

    let report = migrator.migrate(options).await.unwrap();

    assert_eq!(report.backup_id.as_deref(), Some("backup-0001"));
    let requests = backup.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].files, vec![PathBuf::from("/proj/src/hero.jsx")]);
}

#[tokio::test]
async fn backup_failure_is_a_warning_unless_mandated() {
    let (runtime, options) = fixture();
    let backup = Arc::new(RecordingBackup {
        fail: true,
        ..Default::default()
    });
    let migrator = Migrator::new(Arc::clone(&runtime) as Arc<dyn migr8::Runtime>)
        .with_backup(Arc::clone(&backup) as Arc<dyn BackupProvider>);

    let report = migrator.migrate(options).await.unwrap();
    assert!(report.backup_id.is_none());
    assert_eq!(report.files_modified.len(), 1);

    let (runtime, mut options) = fixture();
    options.require_backup = true;
    let migrator = Migrator::new(Arc::clone(&runtime) as Arc<dyn migr8::Runtime>).with_backup(
        Arc::new(RecordingBackup {
            fail: true,
            ..Default::default()
        }) as Arc<dyn BackupProvider>,
    );

    let err = migrator.migrate(options).await.unwrap_err();
    assert!(matches!(err, MigrateError::Backup(_)));
    let original = runtime.content(&PathBuf::from("/proj/src/hero.jsx")).unwrap();
    assert_eq!(original, MATCHING);
}

#[tokio::test]
async fn mandated_backup_without_provider_aborts() {
    let (runtime, mut options) = fixture();
    options.require_backup = true;
    let migrator = Migrator::new(Arc::clone(&runtime) as Arc<dyn migr8::Runtime>);

    let err = migrator.migrate(options).await.unwrap_err();
    assert!(matches!(err, MigrateError::MissingBackupProvider));
}

#[tokio::test]
async fn write_failure_is_collected_and_the_run_continues() {
    let (runtime, options) = fixture();
    runtime.deny_write("/proj/src/hero.jsx");
    let migrator = Migrator::new(Arc::clone(&runtime) as Arc<dyn migr8::Runtime>);

    let report = migrator.migrate(options).await.unwrap();

    assert!(report.files_modified.is_empty());
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].path, PathBuf::from("/proj/src/hero.jsx"));
}

#[tokio::test]
async fn progress_stream_reports_each_file_and_finishes_with_done() {
    let (runtime, mut options) = fixture();
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    options.progress = Some(sender);
    options.dry_run = true;

    let migrator = Migrator::new(Arc::clone(&runtime) as Arc<dyn migr8::Runtime>);
    migrator.migrate(options).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }

    assert!(matches!(events.last(), Some(ProgressEvent::Done)));
    assert!(events.iter().any(|e| matches!(
        e,
        ProgressEvent::Diff { path, .. } if path == &PathBuf::from("/proj/src/hero.jsx")
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        ProgressEvent::File { path, outcome: FileOutcome::Skipped }
            if path == &PathBuf::from("/proj/src/quiet.jsx")
    )));
}

#[tokio::test]
async fn scheduler_backpressure_paces_planning_and_writes() {
    use std::time::{Duration, Instant};

    use migr8_memory::{FixedSampler, SchedulerConfig, SchedulerContext};

    const MB: u64 = 1024 * 1024;

    let (runtime, mut options) = fixture();
    options.batch = BatchOptions {
        batch_size: Some(1),
        concurrency: 1,
        memory_limit_mb: Some(64),
        ..Default::default()
    };

    // Usage sits permanently over the 64 MB budget, so every chunk boundary
    // pauses: two build batches, two plan chunks, one write chunk.
    let sampler = Arc::new(FixedSampler::new(128 * MB, 1024 * MB));
    let scheduler = SchedulerContext::with_sampler(SchedulerConfig::default(), sampler);
    let migrator = Migrator::new(Arc::clone(&runtime) as Arc<dyn migr8::Runtime>)
        .with_scheduler(scheduler);

    let before = Instant::now();
    let report = migrator.migrate(options).await.unwrap();

    assert_eq!(report.files_modified, vec![PathBuf::from("/proj/src/hero.jsx")]);
    // Graph building alone accounts for two pauses; anything past four
    // proves planning and writing consult the scheduler too.
    assert!(before.elapsed() >= Duration::from_millis(400));
}

#[tokio::test]
async fn import_only_mode_repoints_without_touching_attributes() {
    let (runtime, mut options) = fixture();
    options.change_code = false;
    let migrator = Migrator::new(Arc::clone(&runtime) as Arc<dyn migr8::Runtime>);

    let report = migrator.migrate(options).await.unwrap();
    // Match criteria still gate the repoint, so only the matching file moves.
    assert_eq!(report.files_modified, vec![PathBuf::from("/proj/src/hero.jsx")]);

    let hero = runtime.content(&PathBuf::from("/proj/src/hero.jsx")).unwrap();
    assert!(hero.contains(r#"from "@new/pkg""#));
    assert!(hero.contains(r#"size="small""#));
}
