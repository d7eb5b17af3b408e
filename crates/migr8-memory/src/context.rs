//! Explicitly owned scheduler context.
//!
//! The monitor, limiter, strategy registry, and execution knobs are bundled
//! into one struct passed by reference to the graph builder and the
//! orchestrator. No ambient globals: lifecycle is explicit `start`/`stop`.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::limiter::{LimiterConfig, MemoryLimiter};
use crate::monitor::{MemoryMonitor, MonitorConfig, PressureEvent};
use crate::sampler::{MemorySampler, ProcessSampler};
use crate::strategy::{CleanupHooks, ExecutionKnobs, default_strategies};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub monitor: MonitorConfig,
    pub limiter: LimiterConfig,
    pub initial_batch_size: usize,
    pub initial_concurrency: usize,
    /// Per-run budget for the between-batches check; `None` disables the
    /// pause-and-collect backpressure.
    pub memory_budget_mb: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            limiter: LimiterConfig::default(),
            initial_batch_size: 200,
            initial_concurrency: 8,
            memory_budget_mb: None,
        }
    }
}

/// Pause applied between batches when usage exceeds the run budget.
const BACKPRESSURE_PAUSE: Duration = Duration::from_millis(100);

pub struct SchedulerContext {
    config: SchedulerConfig,
    knobs: Arc<ExecutionKnobs>,
    monitor: MemoryMonitor,
    limiter: Arc<MemoryLimiter>,
    parse_cache_hooks: Arc<CleanupHooks>,
    file_cache_hooks: Arc<CleanupHooks>,
    emergency_hooks: Arc<CleanupHooks>,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl SchedulerContext {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_sampler(config, Arc::new(ProcessSampler::new()))
    }

    /// Build against a caller-supplied sampler; tests use a scripted one.
    pub fn with_sampler(config: SchedulerConfig, sampler: Arc<dyn MemorySampler>) -> Self {
        let knobs = Arc::new(ExecutionKnobs::new(
            config.initial_batch_size,
            config.initial_concurrency,
        ));
        let parse_cache_hooks = Arc::new(CleanupHooks::default());
        let file_cache_hooks = Arc::new(CleanupHooks::default());
        let emergency_hooks = Arc::new(CleanupHooks::default());
        let monitor = MemoryMonitor::new(config.monitor.clone(), sampler);
        let strategies = default_strategies(
            Arc::clone(&knobs),
            Arc::clone(&parse_cache_hooks),
            Arc::clone(&file_cache_hooks),
        );
        let limiter = Arc::new(MemoryLimiter::new(
            config.limiter.clone(),
            strategies,
            Arc::clone(&emergency_hooks),
        ));
        Self {
            config,
            knobs,
            monitor,
            limiter,
            parse_cache_hooks,
            file_cache_hooks,
            emergency_hooks,
            timers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the monitor and limiter timers. Calling twice is a no-op.
    pub fn start(&self) {
        let mut timers = self.timers.lock();
        if !timers.is_empty() {
            return;
        }

        let monitor = self.monitor.clone();
        let monitor_interval = monitor.interval();
        timers.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                monitor.sample_now();
                monitor.leak_check();
            }
        }));

        let monitor = self.monitor.clone();
        let limiter = Arc::clone(&self.limiter);
        let limiter_interval = limiter.interval();
        timers.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                limiter.check_now(&monitor).await;
            }
        }));
        debug!("scheduler timers started");
    }

    pub fn stop(&self) {
        for timer in self.timers.lock().drain(..) {
            timer.abort();
        }
        debug!("scheduler timers stopped");
    }

    pub fn monitor(&self) -> &MemoryMonitor {
        &self.monitor
    }

    pub fn limiter(&self) -> &MemoryLimiter {
        &self.limiter
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PressureEvent> {
        self.monitor.subscribe()
    }

    /// Register a hook the parse-cache-clearing strategy will run.
    pub fn on_clear_parse_caches(&self, hook: Box<dyn Fn() + Send + Sync>) {
        self.parse_cache_hooks.register(hook);
    }

    /// Register a hook the file-cache-clearing strategy will run.
    pub fn on_clear_file_caches(&self, hook: Box<dyn Fn() + Send + Sync>) {
        self.file_cache_hooks.register(hook);
    }

    /// Register a hook the limiter runs on every emergency-limit breach.
    pub fn on_emergency_cleanup(&self, hook: Box<dyn Fn() + Send + Sync>) {
        self.emergency_hooks.register(hook);
    }

    /// Current concurrency recommendation, possibly reduced by strategies.
    pub fn recommended_concurrency(&self) -> usize {
        self.knobs.concurrency()
    }

    /// Current batch-size recommendation, possibly reduced by strategies.
    pub fn recommended_batch_size(&self) -> usize {
        self.knobs.batch_size()
    }

    pub fn verbose_reporting(&self) -> bool {
        self.knobs.verbose()
    }

    /// Backpressure point between batches: when usage exceeds the run
    /// budget, pause briefly and attempt a forced collection.
    pub async fn check_between_batches(&self, budget_mb: Option<u64>) {
        let Some(budget) = budget_mb.or(self.config.memory_budget_mb) else {
            return;
        };
        let snapshot = self.monitor.sample_now();
        if snapshot.used_mb() > budget {
            debug!(
                used_mb = snapshot.used_mb(),
                budget_mb = budget,
                "over budget between batches, pausing"
            );
            tokio::time::sleep(BACKPRESSURE_PAUSE).await;
            self.monitor.force_collect().await;
        }
    }
}

impl Drop for SchedulerContext {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for SchedulerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerContext")
            .field("batch_size", &self.recommended_batch_size())
            .field("concurrency", &self.recommended_concurrency())
            .field("level", &self.monitor.current_level())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::limiter::{LimiterAction, MemoryLimits};
    use crate::sampler::FixedSampler;

    const MB: u64 = 1024 * 1024;

    fn context(sampler: Arc<FixedSampler>) -> SchedulerContext {
        let config = SchedulerConfig {
            limiter: LimiterConfig {
                limits: MemoryLimits {
                    soft_mb: 100,
                    hard_mb: 200,
                    emergency_mb: 300,
                },
                ..Default::default()
            },
            initial_batch_size: 100,
            initial_concurrency: 8,
            memory_budget_mb: Some(64),
            ..Default::default()
        };
        SchedulerContext::with_sampler(config, sampler)
    }

    #[tokio::test]
    async fn emergency_usage_degrades_recommendations() {
        let sampler = Arc::new(FixedSampler::new(350 * MB, 1000 * MB));
        let ctx = context(sampler);
        assert_eq!(ctx.recommended_batch_size(), 100);

        let action = ctx.limiter().check_now(ctx.monitor()).await;
        assert!(matches!(action, LimiterAction::Emergency(_)));
        assert_eq!(ctx.recommended_batch_size(), 50);
        assert_eq!(ctx.recommended_concurrency(), 4);
        assert!(!ctx.verbose_reporting());
    }

    #[tokio::test]
    async fn between_batches_check_is_quiet_under_budget() {
        let sampler = Arc::new(FixedSampler::new(10 * MB, 1000 * MB));
        let ctx = context(sampler);
        let before = Instant::now();
        ctx.check_between_batches(None).await;
        assert!(before.elapsed() < BACKPRESSURE_PAUSE);
    }

    #[tokio::test]
    async fn between_batches_check_pauses_over_budget() {
        let sampler = Arc::new(FixedSampler::new(128 * MB, 1000 * MB));
        let ctx = context(sampler);
        let before = Instant::now();
        ctx.check_between_batches(Some(64)).await;
        assert!(before.elapsed() >= BACKPRESSURE_PAUSE);
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let sampler = Arc::new(FixedSampler::new(10 * MB, 1000 * MB));
        let ctx = context(sampler);
        ctx.start();
        ctx.start();
        assert_eq!(ctx.timers.lock().len(), 2);
        ctx.stop();
        assert!(ctx.timers.lock().is_empty());
    }

    #[tokio::test]
    async fn emergency_breach_runs_registered_cleanup_hooks() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let sampler = Arc::new(FixedSampler::new(350 * MB, 1000 * MB));
        let ctx = context(sampler);
        let ran = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&ran);
        ctx.on_emergency_cleanup(Box::new(move || {
            seen.fetch_add(1, Ordering::Relaxed);
        }));

        let action = ctx.limiter().check_now(ctx.monitor()).await;
        assert!(matches!(action, LimiterAction::Emergency(_)));
        assert_eq!(ran.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn parse_cache_hooks_fire_under_pressure() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let sampler = Arc::new(FixedSampler::new(150 * MB, 1000 * MB));
        let ctx = context(sampler);
        let cleared = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&cleared);
        ctx.on_clear_parse_caches(Box::new(move || {
            seen.fetch_add(1, Ordering::Relaxed);
        }));

        // Soft limit: first activation is the parse-cache clear.
        let action = ctx.limiter().check_now(ctx.monitor()).await;
        assert!(matches!(action, LimiterAction::Activated(_)));
        assert_eq!(cleared.load(Ordering::Relaxed), 1);
    }
}
