//! Memory observation sources.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Raw reading from a sampler, before classification.
#[derive(Debug, Clone, Copy)]
pub struct MemoryReading {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// Source of memory observations. The monitor and limiter share one
/// sampler so their views never diverge.
pub trait MemorySampler: Send + Sync + std::fmt::Debug {
    fn sample(&self) -> MemoryReading;
}

/// Samples the current process RSS against system memory via sysinfo.
#[derive(Debug)]
pub struct ProcessSampler {
    inner: Mutex<sysinfo::System>,
    pid: sysinfo::Pid,
}

impl ProcessSampler {
    pub fn new() -> Self {
        let pid = sysinfo::Pid::from_u32(std::process::id());
        let mut system = sysinfo::System::new();
        system.refresh_memory();
        Self {
            inner: Mutex::new(system),
            pid,
        }
    }
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySampler for ProcessSampler {
    fn sample(&self) -> MemoryReading {
        let mut system = self.inner.lock();
        system.refresh_memory();
        system.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[self.pid]), true);
        let used_bytes = system.process(self.pid).map(|p| p.memory()).unwrap_or(0);
        MemoryReading {
            used_bytes,
            total_bytes: system.total_memory(),
        }
    }
}

/// Scripted sampler for tests: reports whatever was last set.
#[derive(Debug)]
pub struct FixedSampler {
    used_bytes: AtomicU64,
    total_bytes: AtomicU64,
}

impl FixedSampler {
    pub fn new(used_bytes: u64, total_bytes: u64) -> Self {
        Self {
            used_bytes: AtomicU64::new(used_bytes),
            total_bytes: AtomicU64::new(total_bytes),
        }
    }

    pub fn set_used(&self, used_bytes: u64) {
        self.used_bytes.store(used_bytes, Ordering::Relaxed);
    }

    pub fn set_used_mb(&self, used_mb: u64) {
        self.set_used(used_mb * 1024 * 1024);
    }
}

impl MemorySampler for FixedSampler {
    fn sample(&self) -> MemoryReading {
        MemoryReading {
            used_bytes: self.used_bytes.load(Ordering::Relaxed),
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
        }
    }
}
