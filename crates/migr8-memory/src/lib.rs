//! # migr8-memory
//!
//! Memory-aware scheduling for large-tree migrations.
//!
//! Two cooperating roles share one observation source:
//!
//! - [`MemoryMonitor`] samples process memory on an interval, keeps a
//!   bounded history ring, classifies samples into a [`PressureLevel`], and
//!   publishes level transitions. It also performs advisory leak detection.
//! - [`MemoryLimiter`] compares usage against soft/hard/emergency limits
//!   and activates [`DegradationStrategy`]s (clear caches, halve batch
//!   size, halve concurrency, ...) with cooldowns, deactivating reversible
//!   ones after sustained recovery.
//!
//! Both are owned by a [`SchedulerContext`] with an explicit start/stop
//! lifecycle. The graph builder and orchestrator consult the context's
//! recommendations before each batch and call
//! [`SchedulerContext::check_between_batches`] between batches; that pause
//! plus forced-collection attempt is the backpressure that keeps very
//! large runs from exhausting process memory.

pub mod context;
pub mod limiter;
pub mod monitor;
pub mod sampler;
pub mod snapshot;
pub mod strategy;

pub use context::{SchedulerConfig, SchedulerContext};
pub use limiter::{LimiterAction, LimiterConfig, MemoryLimiter, MemoryLimits};
pub use monitor::{
    CollectResult, LeakReport, MemoryMonitor, MonitorConfig, PressureEvent,
};
pub use sampler::{FixedSampler, MemoryReading, MemorySampler, ProcessSampler};
pub use snapshot::{MemorySnapshot, PressureLevel, PressureThresholds, SnapshotRing};
pub use strategy::{
    CleanupHooks, DegradationStrategy, ExecutionKnobs, Impact, default_strategies,
};
