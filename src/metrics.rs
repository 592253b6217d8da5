//! Engine-internal counters.
//!
//! Mirrors the collector/metric split used for pipeline execution
//! statistics: a small [`Metric`] trait for anything reportable, plus a
//! [`MetricsCollector`] that owns named counters and can print or export a
//! snapshot. Unlike a full pipeline runner this engine only ever needs
//! monotonic counters (particles emitted, migrated, decayed; exchange
//! rounds; transport-loop iterations), so the collector is built around
//! atomics rather than arbitrary boxed metric objects. The `metrics`
//! feature controls whether [`crate::particle::ParticleTransport`] actually
//! wires a collector in; the counter names below are free-standing so
//! call sites compile either way.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// A single named, monotonically-increasing counter.
pub trait Metric: Send + Sync {
    fn name(&self) -> &str;
    fn value(&self) -> u64;
}

struct Counter {
    name: String,
    value: AtomicU64,
}

impl Metric for Counter {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Well-known counter names recorded by the particle transport engine and
/// emitter.
pub mod counters {
    pub const PARTICLES_EMITTED: &str = "particles_emitted";
    pub const PARTICLES_MIGRATED: &str = "particles_migrated";
    pub const PARTICLES_DECAYED: &str = "particles_decayed";
    pub const EXCHANGE_ROUNDS: &str = "exchange_rounds";
    pub const TRANSPORT_ITERATIONS: &str = "transport_iterations";
}

/// Collects engine-internal counters over the lifetime of a run.
///
/// Cheap to clone (an `Arc`-free `Mutex<HashMap>` behind a reference would
/// also work, but every counter here is independent so a lock per name
/// avoids contention between particles on different cells).
#[derive(Default)]
pub struct MetricsCollector {
    counters: Mutex<HashMap<String, std::sync::Arc<Counter>>>,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, name: &str) -> std::sync::Arc<Counter> {
        let mut counters = self.counters.lock().expect("metrics lock poisoned");
        counters
            .entry(name.to_string())
            .or_insert_with(|| {
                std::sync::Arc::new(Counter { name: name.to_string(), value: AtomicU64::new(0) })
            })
            .clone()
    }

    /// Increment `name` by `delta`, creating it at zero if unseen.
    pub fn increment(&self, name: &str, delta: u64) {
        self.counter(name).value.fetch_add(delta, Ordering::Relaxed);
    }

    /// Current value of `name`, or `0` if never recorded.
    #[must_use]
    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .expect("metrics lock poisoned")
            .get(name)
            .map_or(0, |c| c.value())
    }

    /// A point-in-time snapshot of every counter, suitable for logging or
    /// serializing.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        let counters = self.counters.lock().expect("metrics lock poisoned");
        let map: HashMap<&str, u64> =
            counters.iter().map(|(k, v)| (k.as_str(), v.value())).collect();
        json!(map)
    }

    /// Print the current snapshot to stdout.
    pub fn print(&self) {
        println!("{}", serde_json::to_string_pretty(&self.snapshot()).unwrap_or_default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_accumulate_per_name() {
        let metrics = MetricsCollector::new();
        metrics.increment(counters::PARTICLES_EMITTED, 3);
        metrics.increment(counters::PARTICLES_EMITTED, 4);
        metrics.increment(counters::PARTICLES_MIGRATED, 1);
        assert_eq!(metrics.get(counters::PARTICLES_EMITTED), 7);
        assert_eq!(metrics.get(counters::PARTICLES_MIGRATED), 1);
        assert_eq!(metrics.get("never_recorded"), 0);
    }
}
