//! Memory snapshots, pressure classification, and the bounded history ring.

use std::collections::VecDeque;
use std::time::Instant;

use serde::Serialize;

/// One process-memory observation.
#[derive(Debug, Clone, Copy)]
pub struct MemorySnapshot {
    pub used_bytes: u64,
    pub total_bytes: u64,
    /// Used as a fraction of total, 0.0..=100.0.
    pub percentage: f64,
    pub taken_at: Instant,
}

impl MemorySnapshot {
    pub fn new(used_bytes: u64, total_bytes: u64, taken_at: Instant) -> Self {
        let percentage = if total_bytes == 0 {
            0.0
        } else {
            used_bytes as f64 / total_bytes as f64 * 100.0
        };
        Self {
            used_bytes,
            total_bytes,
            percentage,
            taken_at,
        }
    }

    pub fn used_mb(&self) -> u64 {
        self.used_bytes / (1024 * 1024)
    }
}

/// Coarse classification of memory headroom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Three ascending percentage thresholds separating the four levels.
#[derive(Debug, Clone, Copy)]
pub struct PressureThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for PressureThresholds {
    fn default() -> Self {
        Self {
            medium: 60.0,
            high: 80.0,
            critical: 95.0,
        }
    }
}

impl PressureThresholds {
    pub fn classify(&self, percentage: f64) -> PressureLevel {
        if percentage >= self.critical {
            PressureLevel::Critical
        } else if percentage >= self.high {
            PressureLevel::High
        } else if percentage >= self.medium {
            PressureLevel::Medium
        } else {
            PressureLevel::Low
        }
    }
}

/// Fixed-capacity ring of snapshots; oldest evicted first.
#[derive(Debug)]
pub struct SnapshotRing {
    capacity: usize,
    entries: VecDeque<MemorySnapshot>,
}

impl SnapshotRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, snapshot: MemorySnapshot) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    pub fn latest(&self) -> Option<&MemorySnapshot> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemorySnapshot> {
        self.entries.iter()
    }

    /// Snapshots taken at or after `cutoff`, oldest first.
    pub fn since(&self, cutoff: Instant) -> Vec<MemorySnapshot> {
        self.entries
            .iter()
            .filter(|s| s.taken_at >= cutoff)
            .copied()
            .collect()
    }
}
