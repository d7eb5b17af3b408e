//! Pressure monitor: interval sampling, level-change events, leak
//! detection, and the forced-collection pass.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::sampler::MemorySampler;
use crate::snapshot::{MemorySnapshot, PressureLevel, PressureThresholds, SnapshotRing};

pub const DEFAULT_HISTORY_CAP: usize = 1000;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub history_cap: usize,
    pub thresholds: PressureThresholds,
    /// Trailing window inspected for sustained growth.
    pub leak_window: Duration,
    /// Minimum samples in the window before growth is considered.
    pub leak_min_samples: usize,
    /// Sustained growth rate that flags a leak candidate.
    pub leak_rate_mb_per_min: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            history_cap: DEFAULT_HISTORY_CAP,
            thresholds: PressureThresholds::default(),
            leak_window: Duration::from_secs(300),
            leak_min_samples: 10,
            leak_rate_mb_per_min: 1.0,
        }
    }
}

/// Emitted on pressure level transitions only, not on every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressureEvent {
    pub previous: PressureLevel,
    pub current: PressureLevel,
    pub percentage_hundredths: u32,
}

/// Advisory leak finding. The monitor never auto-remediates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeakReport {
    pub rate_mb_per_min: f64,
    pub window_samples: usize,
}

/// Result of a forced collection attempt. Rust has no collector to force,
/// so `success` is false and `reclaimed_bytes` is a best-effort estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectResult {
    pub success: bool,
    pub reclaimed_bytes: u64,
}

#[derive(Debug)]
struct MonitorState {
    ring: SnapshotRing,
    level: PressureLevel,
}

/// Samples process memory, classifies pressure, and publishes transitions.
#[derive(Debug, Clone)]
pub struct MemoryMonitor {
    config: MonitorConfig,
    sampler: Arc<dyn MemorySampler>,
    state: Arc<Mutex<MonitorState>>,
    events: broadcast::Sender<PressureEvent>,
}

impl MemoryMonitor {
    pub fn new(config: MonitorConfig, sampler: Arc<dyn MemorySampler>) -> Self {
        let (events, _) = broadcast::channel(64);
        let state = MonitorState {
            ring: SnapshotRing::new(config.history_cap),
            level: PressureLevel::Low,
        };
        Self {
            config,
            sampler,
            state: Arc::new(Mutex::new(state)),
            events,
        }
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PressureEvent> {
        self.events.subscribe()
    }

    pub fn current_level(&self) -> PressureLevel {
        self.state.lock().level
    }

    pub fn latest(&self) -> Option<MemorySnapshot> {
        self.state.lock().ring.latest().copied()
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().ring.len()
    }

    /// Take one sample: record it, classify it, and emit an event if the
    /// level changed.
    pub fn sample_now(&self) -> MemorySnapshot {
        let reading = self.sampler.sample();
        let snapshot = MemorySnapshot::new(reading.used_bytes, reading.total_bytes, Instant::now());

        let mut state = self.state.lock();
        state.ring.push(snapshot);
        let level = self.config.thresholds.classify(snapshot.percentage);
        if level != state.level {
            let event = PressureEvent {
                previous: state.level,
                current: level,
                percentage_hundredths: (snapshot.percentage * 100.0) as u32,
            };
            state.level = level;
            drop(state);
            info!(previous = ?event.previous, current = ?event.current, "memory pressure transition");
            // Nobody listening is fine.
            let _ = self.events.send(event);
        }
        snapshot
    }

    /// Linear growth rate over the trailing window; flags a candidate when
    /// sustained growth exceeds the configured rate. Advisory only.
    pub fn leak_check(&self) -> Option<LeakReport> {
        let state = self.state.lock();
        let cutoff = Instant::now().checked_sub(self.config.leak_window)?;
        let window = state.ring.since(cutoff);
        if window.len() < self.config.leak_min_samples {
            return None;
        }

        let rate = growth_rate_mb_per_min(&window)?;
        if rate >= self.config.leak_rate_mb_per_min {
            warn!(rate_mb_per_min = rate, samples = window.len(), "leak candidate");
            Some(LeakReport {
                rate_mb_per_min: rate,
                window_samples: window.len(),
            })
        } else {
            None
        }
    }

    /// Attempt a garbage-collection-equivalent pass.
    ///
    /// There is no collector to invoke, so this degrades gracefully: it
    /// re-samples after yielding and reports any drop as the best-effort
    /// reclaim estimate, with `success: false`.
    pub async fn force_collect(&self) -> CollectResult {
        let before = self.sampler.sample().used_bytes;
        tokio::task::yield_now().await;
        let after = self.sampler.sample().used_bytes;
        let reclaimed = before.saturating_sub(after);
        debug!(reclaimed_bytes = reclaimed, "forced collection pass");
        CollectResult {
            success: false,
            reclaimed_bytes: reclaimed,
        }
    }
}

/// Least-squares slope of used memory over time, in MB per minute.
fn growth_rate_mb_per_min(window: &[MemorySnapshot]) -> Option<f64> {
    let first = window.first()?;
    let n = window.len() as f64;
    if window.len() < 2 {
        return None;
    }

    let points: Vec<(f64, f64)> = window
        .iter()
        .map(|s| {
            let minutes = s.taken_at.duration_since(first.taken_at).as_secs_f64() / 60.0;
            let mb = s.used_bytes as f64 / (1024.0 * 1024.0);
            (minutes, mb)
        })
        .collect();

    let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
    let sum_xx: f64 = points.iter().map(|(x, _)| x * x).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return None;
    }
    Some((n * sum_xy - sum_x * sum_y) / denom)
}
