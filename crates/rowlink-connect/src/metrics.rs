//! Task counters.
//!
//! [`Counter`] is a monotonic atomic accumulator identified by a
//! `(group, name)` pair, where the group is the owning task's name.
//! [`CounterRegistry`] owns counter identities for the process;
//! [`TaskMetrics`] bundles the four counters a source task maintains.
//!
//! All increments use `Relaxed` atomics on the hot path. Counters may be
//! read from other threads (observability, producer callbacks), so release
//! is an idempotent atomic swap and increments after release are dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::ConnectorError;

/// Counter name for rows that passed the filter.
pub const ACCEPTED_ROWS: &str = "source.accepted.rows";
/// Counter name for the wire-serialized bytes of accepted rows.
pub const ACCEPTED_BYTES: &str = "source.accepted.bytes";
/// Counter name for rows the filter rejected.
pub const REJECTED_ROWS: &str = "source.rejected.rows";
/// Counter name for the raw-form bytes of rejected rows.
pub const REJECTED_BYTES: &str = "source.rejected.bytes";

/// A monotonically increasing atomic counter scoped to one task.
#[derive(Debug)]
pub struct Counter {
    group: String,
    name: String,
    value: AtomicU64,
    released: AtomicBool,
}

impl Counter {
    fn new(group: &str, name: &str) -> Self {
        Self {
            group: group.to_string(),
            name: name.to_string(),
            value: AtomicU64::new(0),
            released: AtomicBool::new(false),
        }
    }

    /// Returns the grouping key (the owning task's name).
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Returns the counter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds `delta` to the counter. Dropped once the counter is released.
    pub fn add(&self, delta: u64) {
        if !self.released.load(Ordering::Acquire) {
            self.value.fetch_add(delta, Ordering::Relaxed);
        }
    }

    /// Returns the current value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Marks the counter released. Idempotent; later increments are dropped.
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            debug!(group = %self.group, name = %self.name, "counter released");
        }
    }

    /// Returns `true` once the counter has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

/// Process-wide registry of counter identities.
///
/// Cloning yields another handle on the same shared state.
#[derive(Debug, Clone, Default)]
pub struct CounterRegistry {
    counters: Arc<RwLock<HashMap<(String, String), Arc<Counter>>>>,
}

impl CounterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a counter under `(group, name)`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::ResourceError`] if the identity is
    /// already registered.
    pub fn register(&self, group: &str, name: &str) -> Result<Arc<Counter>, ConnectorError> {
        let mut counters = self.counters.write();
        let key = (group.to_string(), name.to_string());
        if counters.contains_key(&key) {
            return Err(ConnectorError::ResourceError(format!(
                "counter '{name}' already registered for group '{group}'"
            )));
        }
        let counter = Arc::new(Counter::new(group, name));
        counters.insert(key, Arc::clone(&counter));
        Ok(counter)
    }

    /// Releases and removes a counter. No-op if it was never registered.
    pub fn unregister(&self, group: &str, name: &str) {
        let removed = self
            .counters
            .write()
            .remove(&(group.to_string(), name.to_string()));
        if let Some(counter) = removed {
            counter.release();
        }
    }

    /// Looks up a registered counter.
    #[must_use]
    pub fn get(&self, group: &str, name: &str) -> Option<Arc<Counter>> {
        self.counters
            .read()
            .get(&(group.to_string(), name.to_string()))
            .cloned()
    }

    /// Returns all counters registered under a group.
    #[must_use]
    pub fn group_counters(&self, group: &str) -> Vec<Arc<Counter>> {
        self.counters
            .read()
            .iter()
            .filter(|((g, _), _)| g == group)
            .map(|(_, c)| Arc::clone(c))
            .collect()
    }

    /// Returns the number of registered counters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.read().len()
    }

    /// Returns `true` if no counters are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.read().is_empty()
    }
}

/// The four counters a source task maintains, each independently optional.
///
/// When metrics are disabled every field is `None` and all increment paths
/// skip silently. Handles are `Arc`s, so a late producer-acknowledgment
/// callback may still hold one while the task releases; the release flag
/// makes that race harmless.
#[derive(Debug, Clone, Default)]
pub struct TaskMetrics {
    registry: Option<CounterRegistry>,
    group: Option<String>,
    accepted_rows: Option<Arc<Counter>>,
    accepted_bytes: Option<Arc<Counter>>,
    rejected_rows: Option<Arc<Counter>>,
    rejected_bytes: Option<Arc<Counter>>,
}

impl TaskMetrics {
    /// Registers the four task counters under `group`.
    ///
    /// On partial failure every counter created so far is unregistered
    /// before the error propagates, so a failed start leaves no identities
    /// behind.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::ResourceError`] if any identity is
    /// already taken.
    pub fn register(registry: &CounterRegistry, group: &str) -> Result<Self, ConnectorError> {
        let mut created: Vec<&str> = Vec::with_capacity(4);
        let mut register_one = |name: &'static str| -> Result<Arc<Counter>, ConnectorError> {
            let counter = registry.register(group, name)?;
            created.push(name);
            Ok(counter)
        };

        let result = (|| -> Result<Self, ConnectorError> {
            let accepted_rows = register_one(ACCEPTED_ROWS)?;
            let accepted_bytes = register_one(ACCEPTED_BYTES)?;
            let rejected_rows = register_one(REJECTED_ROWS)?;
            let rejected_bytes = register_one(REJECTED_BYTES)?;
            Ok(Self {
                registry: Some(registry.clone()),
                group: Some(group.to_string()),
                accepted_rows: Some(accepted_rows),
                accepted_bytes: Some(accepted_bytes),
                rejected_rows: Some(rejected_rows),
                rejected_bytes: Some(rejected_bytes),
            })
        })();

        if result.is_err() {
            for name in created {
                registry.unregister(group, name);
            }
        }
        result
    }

    /// Returns metrics with every counter disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Records an accepted batch: `rows` output records totalling `bytes`
    /// wire-serialized bytes. One batched increment per counter.
    pub fn record_accepted(&self, rows: u64, bytes: u64) {
        if let Some(c) = &self.accepted_rows {
            c.add(rows);
        }
        if let Some(c) = &self.accepted_bytes {
            c.add(bytes);
        }
    }

    /// Records one rejected record of `raw_bytes` raw-form bytes.
    pub fn record_rejected(&self, raw_bytes: u64) {
        if let Some(c) = &self.rejected_rows {
            c.add(1);
        }
        if let Some(c) = &self.rejected_bytes {
            c.add(raw_bytes);
        }
    }

    /// Returns the rejected-rows counter, if enabled.
    #[must_use]
    pub fn rejected_rows(&self) -> Option<&Arc<Counter>> {
        self.rejected_rows.as_ref()
    }

    /// Returns the rejected-bytes counter, if enabled.
    #[must_use]
    pub fn rejected_bytes(&self) -> Option<&Arc<Counter>> {
        self.rejected_bytes.as_ref()
    }

    /// Returns the accepted-rows counter, if enabled.
    #[must_use]
    pub fn accepted_rows(&self) -> Option<&Arc<Counter>> {
        self.accepted_rows.as_ref()
    }

    /// Returns the accepted-bytes counter, if enabled.
    #[must_use]
    pub fn accepted_bytes(&self) -> Option<&Arc<Counter>> {
        self.accepted_bytes.as_ref()
    }

    /// Releases and unregisters all four counters.
    ///
    /// Idempotent, and a no-op when metrics are disabled. Runs on every
    /// stop path, including when the stop hook failed.
    pub fn release(&self) {
        let (Some(registry), Some(group)) = (&self.registry, &self.group) else {
            return;
        };
        for name in [ACCEPTED_ROWS, ACCEPTED_BYTES, REJECTED_ROWS, REJECTED_BYTES] {
            registry.unregister(group, name);
        }
        // Handles in this struct outlive the registry entries; release
        // them directly so late holders observe the released state.
        for counter in [
            &self.accepted_rows,
            &self.accepted_bytes,
            &self.rejected_rows,
            &self.rejected_bytes,
        ]
        .into_iter()
        .flatten()
        {
            counter.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_add_and_value() {
        let registry = CounterRegistry::new();
        let counter = registry.register("t1", ACCEPTED_ROWS).unwrap();
        counter.add(3);
        counter.add(2);
        assert_eq!(counter.value(), 5);
    }

    #[test]
    fn test_counter_release_idempotent() {
        let registry = CounterRegistry::new();
        let counter = registry.register("t1", ACCEPTED_ROWS).unwrap();
        counter.add(1);
        counter.release();
        counter.release();
        counter.add(10);
        assert!(counter.is_released());
        assert_eq!(counter.value(), 1);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = CounterRegistry::new();
        registry.register("t1", ACCEPTED_ROWS).unwrap();
        let err = registry.register("t1", ACCEPTED_ROWS).unwrap_err();
        assert!(matches!(err, ConnectorError::ResourceError(_)));
        // Same name under a different group is fine.
        registry.register("t2", ACCEPTED_ROWS).unwrap();
    }

    #[test]
    fn test_unregister_releases() {
        let registry = CounterRegistry::new();
        let counter = registry.register("t1", ACCEPTED_ROWS).unwrap();
        registry.unregister("t1", ACCEPTED_ROWS);
        assert!(counter.is_released());
        assert!(registry.get("t1", ACCEPTED_ROWS).is_none());
        // Unregistering again is a no-op.
        registry.unregister("t1", ACCEPTED_ROWS);
    }

    #[test]
    fn test_task_metrics_register_all_four() {
        let registry = CounterRegistry::new();
        let metrics = TaskMetrics::register(&registry, "t1").unwrap();
        assert_eq!(registry.group_counters("t1").len(), 4);
        metrics.record_accepted(2, 100);
        metrics.record_rejected(30);
        assert_eq!(registry.get("t1", ACCEPTED_ROWS).unwrap().value(), 2);
        assert_eq!(registry.get("t1", ACCEPTED_BYTES).unwrap().value(), 100);
        assert_eq!(registry.get("t1", REJECTED_ROWS).unwrap().value(), 1);
        assert_eq!(registry.get("t1", REJECTED_BYTES).unwrap().value(), 30);
    }

    #[test]
    fn test_task_metrics_partial_failure_unwinds() {
        let registry = CounterRegistry::new();
        // Occupy the third identity so registration fails midway.
        registry.register("t1", REJECTED_ROWS).unwrap();

        let err = TaskMetrics::register(&registry, "t1").unwrap_err();
        assert!(matches!(err, ConnectorError::ResourceError(_)));
        // The two counters created before the failure were unwound.
        assert!(registry.get("t1", ACCEPTED_ROWS).is_none());
        assert!(registry.get("t1", ACCEPTED_BYTES).is_none());
        // The pre-existing counter is untouched.
        assert!(registry.get("t1", REJECTED_ROWS).is_some());
    }

    #[test]
    fn test_disabled_metrics_are_silent() {
        let metrics = TaskMetrics::disabled();
        metrics.record_accepted(5, 500);
        metrics.record_rejected(10);
        metrics.release();
        assert!(metrics.accepted_rows().is_none());
    }

    #[test]
    fn test_release_marks_counters_and_clears_registry() {
        let registry = CounterRegistry::new();
        let metrics = TaskMetrics::register(&registry, "t1").unwrap();
        let handle = registry.get("t1", ACCEPTED_ROWS).unwrap();

        metrics.release();
        metrics.release();

        assert!(handle.is_released());
        assert!(registry.group_counters("t1").is_empty());
        // Increments through a surviving handle are dropped.
        handle.add(7);
        assert_eq!(handle.value(), 0);
    }

    #[test]
    fn test_concurrent_add_and_release() {
        let registry = CounterRegistry::new();
        let metrics = TaskMetrics::register(&registry, "t1").unwrap();
        let handle = Arc::clone(metrics.accepted_rows().unwrap());

        let adder = std::thread::spawn(move || {
            for _ in 0..1000 {
                handle.add(1);
            }
        });
        metrics.release();
        adder.join().unwrap();
        // No panic and no double-release is the property under test; the
        // final value is whatever landed before the release flag flipped.
        assert!(metrics.accepted_rows().unwrap().is_released());
    }
}
