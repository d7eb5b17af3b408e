//! Degradation strategies: actions that reduce memory footprint when the
//! limiter activates them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::debug;

/// Footprint impact of a strategy when active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Impact {
    Low,
    Medium,
    High,
}

/// A single degradation action. Implementations must tolerate repeated
/// activation; the registry guards against it, but the emergency path may
/// race a regular check.
pub trait DegradationStrategy: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;
    /// Activation order, ascending.
    fn priority(&self) -> u32;
    fn impact(&self) -> Impact;
    /// Whether `deactivate` restores the pre-activation state.
    fn reversible(&self) -> bool;
    fn activate(&self);
    fn deactivate(&self);
}

/// Shared execution knobs the strategies turn and the builder reads.
#[derive(Debug)]
pub struct ExecutionKnobs {
    batch_size: AtomicUsize,
    concurrency: AtomicUsize,
    verbose: AtomicBool,
}

impl ExecutionKnobs {
    pub fn new(batch_size: usize, concurrency: usize) -> Self {
        Self {
            batch_size: AtomicUsize::new(batch_size.max(1)),
            concurrency: AtomicUsize::new(concurrency.max(1)),
            verbose: AtomicBool::new(true),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.load(Ordering::Relaxed)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.load(Ordering::Relaxed)
    }

    pub fn verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    fn halve_batch_size(&self) -> usize {
        let prior = self.batch_size.load(Ordering::Relaxed);
        self.batch_size.store((prior / 2).max(1), Ordering::Relaxed);
        prior
    }

    fn halve_concurrency(&self) -> usize {
        let prior = self.concurrency.load(Ordering::Relaxed);
        self.concurrency.store((prior / 2).max(1), Ordering::Relaxed);
        prior
    }
}

/// Cleanup hooks registered by cache owners. Strategies and the emergency
/// path invoke them; owners decide what clearing means.
pub type CleanupHook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct CleanupHooks {
    hooks: Mutex<Vec<CleanupHook>>,
}

impl CleanupHooks {
    pub fn register(&self, hook: CleanupHook) {
        self.hooks.lock().push(hook);
    }

    pub fn run_all(&self) {
        for hook in self.hooks.lock().iter() {
            hook();
        }
    }

    pub fn len(&self) -> usize {
        self.hooks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.lock().is_empty()
    }
}

impl std::fmt::Debug for CleanupHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupHooks").field("len", &self.len()).finish()
    }
}

/// Clears transient parse caches by running the registered hooks.
#[derive(Debug)]
pub struct ClearParseCaches {
    hooks: Arc<CleanupHooks>,
}

impl DegradationStrategy for ClearParseCaches {
    fn name(&self) -> &str {
        "clear-parse-caches"
    }
    fn priority(&self) -> u32 {
        10
    }
    fn impact(&self) -> Impact {
        Impact::Low
    }
    fn reversible(&self) -> bool {
        true
    }
    fn activate(&self) {
        debug!("clearing parse caches");
        self.hooks.run_all();
    }
    fn deactivate(&self) {
        // Caches repopulate on demand; nothing to restore.
    }
}

/// Halves the batch size; deactivation restores the pre-activation value.
#[derive(Debug)]
pub struct HalveBatchSize {
    knobs: Arc<ExecutionKnobs>,
    prior: AtomicUsize,
}

impl DegradationStrategy for HalveBatchSize {
    fn name(&self) -> &str {
        "halve-batch-size"
    }
    fn priority(&self) -> u32 {
        20
    }
    fn impact(&self) -> Impact {
        Impact::Medium
    }
    fn reversible(&self) -> bool {
        true
    }
    fn activate(&self) {
        let prior = self.knobs.halve_batch_size();
        self.prior.store(prior, Ordering::Relaxed);
        debug!(from = prior, to = self.knobs.batch_size(), "halved batch size");
    }
    fn deactivate(&self) {
        let prior = self.prior.load(Ordering::Relaxed);
        if prior > 0 {
            self.knobs.batch_size.store(prior, Ordering::Relaxed);
        }
    }
}

/// Turns off verbose progress reporting.
#[derive(Debug)]
pub struct DisableVerboseReporting {
    knobs: Arc<ExecutionKnobs>,
}

impl DegradationStrategy for DisableVerboseReporting {
    fn name(&self) -> &str {
        "disable-verbose-reporting"
    }
    fn priority(&self) -> u32 {
        30
    }
    fn impact(&self) -> Impact {
        Impact::Low
    }
    fn reversible(&self) -> bool {
        true
    }
    fn activate(&self) {
        self.knobs.verbose.store(false, Ordering::Relaxed);
    }
    fn deactivate(&self) {
        self.knobs.verbose.store(true, Ordering::Relaxed);
    }
}

/// Drops file-content caches. Irreversible: the data is gone.
#[derive(Debug)]
pub struct ClearFileCaches {
    hooks: Arc<CleanupHooks>,
}

impl DegradationStrategy for ClearFileCaches {
    fn name(&self) -> &str {
        "clear-file-caches"
    }
    fn priority(&self) -> u32 {
        40
    }
    fn impact(&self) -> Impact {
        Impact::High
    }
    fn reversible(&self) -> bool {
        false
    }
    fn activate(&self) {
        debug!("clearing file-content caches");
        self.hooks.run_all();
    }
    fn deactivate(&self) {}
}

/// Halves the worker-pool concurrency limit.
#[derive(Debug)]
pub struct HalveConcurrency {
    knobs: Arc<ExecutionKnobs>,
    prior: AtomicUsize,
}

impl DegradationStrategy for HalveConcurrency {
    fn name(&self) -> &str {
        "halve-concurrency"
    }
    fn priority(&self) -> u32 {
        50
    }
    fn impact(&self) -> Impact {
        Impact::High
    }
    fn reversible(&self) -> bool {
        true
    }
    fn activate(&self) {
        let prior = self.knobs.halve_concurrency();
        self.prior.store(prior, Ordering::Relaxed);
        debug!(from = prior, to = self.knobs.concurrency(), "halved concurrency");
    }
    fn deactivate(&self) {
        let prior = self.prior.load(Ordering::Relaxed);
        if prior > 0 {
            self.knobs.concurrency.store(prior, Ordering::Relaxed);
        }
    }
}

/// The default strategy set, priority ascending.
pub fn default_strategies(
    knobs: Arc<ExecutionKnobs>,
    parse_cache_hooks: Arc<CleanupHooks>,
    file_cache_hooks: Arc<CleanupHooks>,
) -> Vec<Arc<dyn DegradationStrategy>> {
    vec![
        Arc::new(ClearParseCaches {
            hooks: parse_cache_hooks,
        }),
        Arc::new(HalveBatchSize {
            knobs: Arc::clone(&knobs),
            prior: AtomicUsize::new(0),
        }),
        Arc::new(DisableVerboseReporting {
            knobs: Arc::clone(&knobs),
        }),
        Arc::new(ClearFileCaches {
            hooks: file_cache_hooks,
        }),
        Arc::new(HalveConcurrency {
            knobs,
            prior: AtomicUsize::new(0),
        }),
    ]
}
