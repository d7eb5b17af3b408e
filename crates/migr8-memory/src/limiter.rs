//! Memory limiter: compares usage against soft/hard/emergency limits and
//! drives the degradation-strategy registry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::monitor::MemoryMonitor;
use crate::strategy::{CleanupHooks, DegradationStrategy, Impact};

#[derive(Debug, Clone, Copy)]
pub struct MemoryLimits {
    pub soft_mb: u64,
    pub hard_mb: u64,
    pub emergency_mb: u64,
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self {
            soft_mb: 1024,
            hard_mb: 2048,
            emergency_mb: 3072,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LimiterConfig {
    pub interval: Duration,
    pub limits: MemoryLimits,
    /// Cooldown between successive strategy activations.
    pub degradation_delay: Duration,
    /// Time usage must stay below soft before recovery starts.
    pub recovery_delay: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            limits: MemoryLimits::default(),
            degradation_delay: Duration::from_secs(5),
            recovery_delay: Duration::from_secs(10),
        }
    }
}

/// What one limiter check decided to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimiterAction {
    None,
    /// One strategy activated under the soft limit's cooldown regime.
    Activated(Vec<String>),
    /// All high-impact strategies activated at the hard limit.
    HardActivated(Vec<String>),
    /// Everything activated; emergency path.
    Emergency(Vec<String>),
    /// Reversible strategies deactivated after sustained recovery.
    Recovered(Vec<String>),
}

struct Entry {
    strategy: Arc<dyn DegradationStrategy>,
    active: bool,
}

struct LimiterState {
    entries: Vec<Entry>,
    last_activation: Option<Instant>,
    below_soft_since: Option<Instant>,
}

/// Serializes all activation/deactivation through one mutex so overlapping
/// checks cannot double-execute a strategy.
pub struct MemoryLimiter {
    config: LimiterConfig,
    state: Mutex<LimiterState>,
    cleanup: Arc<CleanupHooks>,
}

impl MemoryLimiter {
    pub fn new(
        config: LimiterConfig,
        strategies: Vec<Arc<dyn DegradationStrategy>>,
        cleanup: Arc<CleanupHooks>,
    ) -> Self {
        let mut entries: Vec<Entry> = strategies
            .into_iter()
            .map(|strategy| Entry {
                strategy,
                active: false,
            })
            .collect();
        entries.sort_by_key(|e| e.strategy.priority());
        Self {
            config,
            state: Mutex::new(LimiterState {
                entries,
                last_activation: None,
                below_soft_since: None,
            }),
            cleanup,
        }
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn active_strategies(&self) -> Vec<String> {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|e| e.active)
            .map(|e| e.strategy.name().to_string())
            .collect()
    }

    /// One full check against the configured limits.
    pub fn evaluate(&self, now: Instant, used_mb: u64) -> LimiterAction {
        let limits = self.config.limits;
        let mut state = self.state.lock();

        if used_mb >= limits.emergency_mb {
            state.below_soft_since = None;
            let activated = activate_matching(&mut state.entries, |_| true);
            state.last_activation = Some(now);
            warn!(used_mb, activated = activated.len(), "emergency limit breached");
            // Cleanup callbacks run even if every strategy was already
            // active; the emergency path bypasses all throttling.
            self.cleanup.run_all();
            return LimiterAction::Emergency(activated);
        }

        if used_mb >= limits.hard_mb {
            state.below_soft_since = None;
            let activated =
                activate_matching(&mut state.entries, |s| s.impact() == Impact::High);
            if !activated.is_empty() {
                state.last_activation = Some(now);
                info!(used_mb, ?activated, "hard limit: high-impact strategies on");
                return LimiterAction::HardActivated(activated);
            }
            return LimiterAction::None;
        }

        if used_mb >= limits.soft_mb {
            state.below_soft_since = None;
            let cooled_down = state
                .last_activation
                .is_none_or(|t| now.duration_since(t) >= self.config.degradation_delay);
            if !cooled_down {
                return LimiterAction::None;
            }
            if let Some(entry) = state.entries.iter_mut().find(|e| !e.active) {
                entry.strategy.activate();
                entry.active = true;
                let name = entry.strategy.name().to_string();
                state.last_activation = Some(now);
                info!(used_mb, strategy = %name, "soft limit: strategy activated");
                return LimiterAction::Activated(vec![name]);
            }
            return LimiterAction::None;
        }

        // Below soft: recovery path.
        let since = *state.below_soft_since.get_or_insert(now);
        if now.duration_since(since) < self.config.recovery_delay {
            return LimiterAction::None;
        }
        let mut recovered = Vec::new();
        for entry in state.entries.iter_mut().rev() {
            if entry.active && entry.strategy.reversible() {
                entry.strategy.deactivate();
                entry.active = false;
                recovered.push(entry.strategy.name().to_string());
            }
        }
        if recovered.is_empty() {
            LimiterAction::None
        } else {
            // Another full quiet period is required before the next
            // recovery round.
            state.below_soft_since = Some(now);
            debug!(?recovered, "recovered strategies after sustained low usage");
            LimiterAction::Recovered(recovered)
        }
    }

    /// Timer entry point: sample through the monitor, evaluate, and perform
    /// the emergency extras.
    pub async fn check_now(&self, monitor: &MemoryMonitor) -> LimiterAction {
        let snapshot = monitor.sample_now();
        let action = self.evaluate(Instant::now(), snapshot.used_mb());
        if matches!(action, LimiterAction::Emergency(_)) {
            monitor.force_collect().await;
        }
        action
    }
}

impl std::fmt::Debug for MemoryLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLimiter")
            .field("config", &self.config)
            .field("active", &self.active_strategies())
            .finish()
    }
}

fn activate_matching(
    entries: &mut [Entry],
    select: impl Fn(&dyn DegradationStrategy) -> bool,
) -> Vec<String> {
    let mut activated = Vec::new();
    for entry in entries.iter_mut() {
        if !entry.active && select(entry.strategy.as_ref()) {
            entry.strategy.activate();
            entry.active = true;
            activated.push(entry.strategy.name().to_string());
        }
    }
    activated
}
