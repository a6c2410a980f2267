//! Synchronization utilities for single-flight work.
//!
//! This module provides the keyed gate used by caches and tables to make sure a
//! piece of work identified by a string key (a table type, an index format) runs
//! at most once at a time, while work for different keys proceeds in parallel.
//!
//! # Key Components
//!
//! - [`LoadGate`] - A set of per-key mutexes created on demand
//!
//! # Design Principles
//!
//! - **Per-key exclusion**: Callers for the same key serialize, callers for different keys don't
//! - **Re-check under the gate**: The gate only orders callers; the caller re-checks whether the
//!   work is still needed once it holds the gate
//! - **Poison tolerant**: The gate guards no data, so a panic inside one holder does not wedge
//!   later callers
//! - **Bounded**: A key's mutex only exists while some caller holds or waits for it, so
//!   caller-supplied keys do not accumulate

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

/// A keyed single-flight gate.
///
/// A key gets its own mutex when the first caller arrives and loses it again when the
/// last caller leaves. Holding the gate for one key never blocks callers that use a
/// different key.
///
/// # Examples
///
/// ```rust
/// use lookupcache::utils::LoadGate;
///
/// let gate = LoadGate::new();
/// let loaded = gate.run("Country", || {
///     // re-check, then load if still absent
///     42
/// });
/// assert_eq!(loaded, 42);
/// ```
#[derive(Debug, Default)]
pub struct LoadGate {
    /// One mutex per key in use; the map holds one reference, every caller another
    slots: DashMap<String, Arc<Mutex<()>>>,
}

impl LoadGate {
    /// Creates a new gate with no keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` while holding the gate for `key`.
    ///
    /// Blocks while another caller holds the gate for the same key.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to serialize on
    /// * `work` - The closure to run exclusively for this key
    ///
    /// # Returns
    ///
    /// Whatever `work` returns.
    pub fn run<T>(&self, key: &str, work: impl FnOnce() -> T) -> T {
        let slot = self.slot(key);
        let result = {
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            work()
        };

        drop(slot);
        self.release(key);
        result
    }

    /// Returns `true` if some caller currently holds the gate for `key`.
    pub fn is_busy(&self, key: &str) -> bool {
        let Some(slot) = self.slots.get(key).map(|slot| Arc::clone(slot.value())) else {
            return false;
        };

        let busy = slot.try_lock().is_err();
        busy
    }

    /// Number of keys some caller currently holds or waits for.
    pub fn key_count(&self) -> usize {
        self.slots.len()
    }

    /// The keys some caller currently holds or waits for, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.slots.iter().map(|slot| slot.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Fetch the mutex for `key`, creating it on first use.
    ///
    /// The map shard lock is released before the returned mutex is locked, so a
    /// long holder of one key never stalls lookups of other keys on the same shard.
    fn slot(&self, key: &str) -> Arc<Mutex<()>> {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }

        Arc::clone(self.slots.entry(key.to_string()).or_default().value())
    }

    /// Drop the mutex for `key` unless another caller still holds a reference.
    ///
    /// References are only taken under the map's shard lock, which `remove_if`
    /// holds while it counts them.
    fn release(&self, key: &str) {
        self.slots
            .remove_if(key, |_, slot| Arc::strong_count(slot) == 1);
    }
}
