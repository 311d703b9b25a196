//! Named counters for engine statistics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A fixed set of named counters.
///
/// Names are registered up front; updates to an unknown name are ignored so
/// that a typo never panics on a hot path. Counters are atomics, so a shared
/// reference can be read from another thread while the owner updates it.
pub struct StatsCounter {
    counters: HashMap<&'static str, AtomicU64>,
}

impl StatsCounter {
    pub fn new(names: &[&'static str]) -> Self {
        let counters = names
            .iter()
            .map(|&name| (name, AtomicU64::new(0)))
            .collect();
        Self { counters }
    }

    pub fn increment(&self, name: &str) {
        self.add(name, 1);
    }

    pub fn add(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in self.counters.values() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> HashMap<&'static str, u64> {
        self.counters
            .iter()
            .map(|(&k, v)| (k, v.load(Ordering::Relaxed)))
            .collect()
    }
}
