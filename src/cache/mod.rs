//! Caches of lookup tables.
//!
//! A [`LookupCache`] owns the tables of one logical scope (the process, a user
//! session, a single parameterized loader) and populates them lazily: the first
//! request for a table type that is not cached runs every registered
//! [`CacheLoader`] that supports it, and the tables they publish are committed
//! together once all of them succeeded.
//!
//! # Guarantees
//!
//! - **Single flight**: concurrent misses for the same table type on the same cache
//!   run one load sequence; the other callers wait and observe its result.
//! - **Independence**: misses for different table types, and misses on different
//!   cache instances, never wait on each other.
//! - **Atomic visibility**: a table only becomes visible once fully built, and a
//!   failed or cancelled sequence commits nothing, so a retry is always possible.
//!
//! # Modules
//! - `config`: [`CacheConfig`] presets
//! - `scope`: [`CacheScope`], the standard cache types
//! - `registry`: [`CacheRegistry`], owner of the global and per-session caches
//!
//! # Examples
//!
//! ```rust
//! use lookupcache::{header::Header, loader::{FnLoader, LoaderBase}, LookupCache};
//! use std::sync::Arc;
//!
//! let loader = FnLoader::new(LoaderBase::with_types(true, ["Priority"]), |t| {
//!     Ok(Some(vec![Header::new(t, "1", "High"), Header::new(t, "2", "Low")]))
//! });
//! let cache = LookupCache::new("global", vec![Arc::new(loader)]);
//!
//! assert!(cache.get_cached("Priority").is_none());
//! let table = cache.get_table("Priority")?.unwrap();
//! assert!(Arc::ptr_eq(&table, &cache.get_cached("Priority").unwrap()));
//!
//! cache.remove("Priority");
//! assert!(!cache.contains("Priority"));
//! # Ok::<(), lookupcache::Error>(())
//! ```

mod config;
mod registry;
mod scope;

pub use config::CacheConfig;
pub use registry::CacheRegistry;
pub use scope::CacheScope;

use std::{collections::HashSet, fmt, sync::Arc};

use crossbeam_skiplist::SkipMap;
use log::{debug, trace, warn};
use rayon::prelude::*;

use crate::{
    loader::{CacheLoader, CancelToken, LoadContext},
    table::{LookupTable, LookupTableRc},
    utils::LoadGate,
    Result,
};

/// The tables of one cache scope, loaded on demand.
pub struct LookupCache {
    /// Logical partition this cache belongs to, e.g. `"global"`
    cache_type: String,
    /// Committed tables by table type
    tables: SkipMap<String, LookupTableRc>,
    /// Registered loaders, in registration order
    loaders: Vec<Arc<dyn CacheLoader>>,
    /// Single-flight gate for load sequences, keyed by table type
    gate: LoadGate,
    config: CacheConfig,
}

impl LookupCache {
    /// Create a cache with the default configuration.
    ///
    /// # Arguments
    /// * `cache_type` - The logical partition, see [`CacheScope`] for the standard ones
    /// * `loaders` - The loaders to consult on a miss, in registration order
    pub fn new(cache_type: &str, loaders: Vec<Arc<dyn CacheLoader>>) -> Self {
        Self::with_config(cache_type, loaders, CacheConfig::default())
    }

    /// Create a cache with an explicit configuration.
    pub fn with_config(
        cache_type: &str,
        loaders: Vec<Arc<dyn CacheLoader>>,
        config: CacheConfig,
    ) -> Self {
        LookupCache {
            cache_type: cache_type.to_string(),
            tables: SkipMap::new(),
            loaders,
            gate: LoadGate::new(),
            config,
        }
    }

    /// The logical partition this cache belongs to.
    pub fn cache_type(&self) -> &str {
        &self.cache_type
    }

    /// The configuration this cache was created with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the table of `table_type`, loading it if needed.
    ///
    /// # Arguments
    /// * `table_type` - The enumeration type
    ///
    /// # Returns
    /// The table, or `None` if no loader published one
    ///
    /// # Errors
    /// Returns the first error of any matching loader. Nothing of the failed
    /// sequence is stored.
    pub fn get_table(&self, table_type: &str) -> Result<Option<LookupTableRc>> {
        self.get_table_with_cancel(table_type, &CancelToken::new())
    }

    /// Get the table of `table_type`, loading it if needed, observing `cancel`.
    ///
    /// Cancelling the token makes a running load sequence fail with
    /// [`crate::Error::Cancelled`] and commit nothing. A table that is already
    /// cached is returned regardless of the token.
    ///
    /// Loaders must not request the table type they are loading from within
    /// [`CacheLoader::load`]; that waits on itself.
    ///
    /// # Errors
    /// Returns the first loader error, or [`crate::Error::Cancelled`].
    pub fn get_table_with_cancel(
        &self,
        table_type: &str,
        cancel: &CancelToken,
    ) -> Result<Option<LookupTableRc>> {
        if let Some(table) = self.get_cached(table_type) {
            trace!("Cache '{}' hit for '{}'", self.cache_type, table_type);
            return Ok(Some(table));
        }

        self.gate.run(table_type, || {
            if self.tables.contains_key(table_type) {
                return Ok(());
            }
            self.load(table_type, cancel)
        })?;

        Ok(self.get_cached(table_type))
    }

    /// Get the table of `table_type` only if it is already cached.
    pub fn get_cached(&self, table_type: &str) -> Option<LookupTableRc> {
        self.tables
            .get(table_type)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Returns `true` if a table of `table_type` is cached.
    pub fn contains(&self, table_type: &str) -> bool {
        self.tables.contains_key(table_type)
    }

    /// Store `table`, replacing any cached table of the same type.
    ///
    /// # Returns
    /// The shared handle to the stored table
    pub fn store(&self, table: LookupTable) -> LookupTableRc {
        let table = Arc::new(table);
        self.store_rc(Arc::clone(&table));
        table
    }

    /// Store an already shared table, replacing any cached table of the same type.
    pub fn store_rc(&self, table: LookupTableRc) {
        self.tables.insert(table.table_type().to_string(), table);
    }

    /// Evict `table_type` so the next [`LookupCache::get_table`] loads it again.
    ///
    /// Waits for a load sequence of the same type that is in progress, so the
    /// eviction cannot be overtaken by its commit.
    ///
    /// # Returns
    /// The evicted table, if one was cached
    pub fn remove(&self, table_type: &str) -> Option<LookupTableRc> {
        self.gate.run(table_type, || {
            self.tables
                .remove(table_type)
                .map(|entry| Arc::clone(entry.value()))
        })
    }

    /// The cached table types, sorted.
    pub fn table_types(&self) -> Vec<String> {
        self.tables
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of cached tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if no table is cached.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Evict every table.
    ///
    /// Like [`LookupCache::remove`], waits for every load sequence in progress, so no
    /// table started before the call is committed after it.
    pub fn clear(&self) {
        let mut table_types = self.table_types();
        table_types.extend(self.gate.keys());
        table_types.sort();
        table_types.dedup();

        for table_type in table_types {
            self.remove(&table_type);
        }
    }

    /// Number of registered loaders.
    pub fn loader_count(&self) -> usize {
        self.loaders.len()
    }

    /// Run one load sequence for `table_type` and commit its tables.
    ///
    /// Must be called with the gate of `table_type` held.
    fn load(&self, table_type: &str, cancel: &CancelToken) -> Result<()> {
        let matching: Vec<&Arc<dyn CacheLoader>> = self
            .loaders
            .iter()
            .filter(|loader| loader.supports(&self.cache_type, table_type))
            .collect();

        if matching.is_empty() {
            trace!(
                "Cache '{}' has no loader for '{}'",
                self.cache_type,
                table_type
            );
            return Ok(());
        }

        debug!(
            "Cache '{}' loading '{}' from {} loader(s)",
            self.cache_type,
            table_type,
            matching.len()
        );
        cancel.check(table_type)?;

        let run = |loader: &&Arc<dyn CacheLoader>| -> Result<Vec<LookupTableRc>> {
            let ctx = LoadContext::new(self, table_type, cancel);
            loader.load(&ctx)?;
            Ok(ctx.into_staged())
        };

        let staged: Result<Vec<Vec<LookupTableRc>>> =
            if self.config.parallel_loaders && matching.len() > 1 {
                matching.par_iter().map(run).collect()
            } else {
                matching.iter().map(run).collect()
            };

        let staged = match staged {
            Ok(staged) => staged,
            Err(error) => {
                warn!(
                    "Cache '{}' failed to load '{}': {}",
                    self.cache_type, table_type, error
                );
                return Err(error);
            }
        };

        if let Err(error) = cancel.check(table_type) {
            warn!(
                "Cache '{}' discarded load of '{}' after cancellation",
                self.cache_type, table_type
            );
            return Err(error);
        }

        let mut committed = HashSet::new();
        for table in staged.into_iter().flatten() {
            if !committed.insert(table.table_type().to_string()) {
                warn!(
                    "Table '{}' was published more than once while loading '{}', keeping the last",
                    table.table_type(),
                    table_type
                );
            }
            self.store_rc(table);
        }

        debug!(
            "Cache '{}' loaded '{}': committed {} table(s)",
            self.cache_type,
            table_type,
            committed.len()
        );
        Ok(())
    }
}

impl fmt::Debug for LookupCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupCache")
            .field("cache_type", &self.cache_type)
            .field("tables", &self.table_types())
            .field("loaders", &self.loaders.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Barrier, Mutex},
        thread,
        time::Duration,
    };

    use super::*;
    use crate::{
        header::Header,
        loader::{FnLoader, LoaderBase},
        test::{create_table, CountingLoader},
        Error,
    };

    #[test]
    fn test_miss_without_loader_is_none() {
        let cache = LookupCache::new("global", vec![]);
        assert!(cache.get_table("Country").unwrap().is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.loader_count(), 0);
    }

    #[test]
    fn test_load_once_then_hit() {
        let loader = Arc::new(CountingLoader::new(["Country"]));
        let cache = LookupCache::new("global", vec![loader.clone()]);

        let first = cache.get_table("Country").unwrap().unwrap();
        let second = cache.get_table("Country").unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.count("Country"), 1);

        // unsupported types never reach the loader
        assert!(cache.get_table("Region").unwrap().is_none());
        assert_eq!(loader.count("Region"), 0);
    }

    #[test]
    fn test_cached_only() {
        let loader = Arc::new(CountingLoader::new(["Country"]));
        let cache = LookupCache::new("global", vec![loader.clone()]);

        assert!(cache.get_cached("Country").is_none());
        assert_eq!(loader.total(), 0);
    }

    #[test]
    fn test_single_flight() {
        let loader = Arc::new(CountingLoader::new(["Country"]).with_delay(Duration::from_millis(50)));
        let cache = Arc::new(LookupCache::new("global", vec![loader.clone()]));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_table("Country").unwrap().unwrap()
                })
            })
            .collect();

        let tables: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(loader.count("Country"), 1);
        assert!(tables.iter().all(|t| Arc::ptr_eq(t, &tables[0])));
    }

    #[test]
    fn test_remove_forces_reload() {
        let loader = Arc::new(CountingLoader::new(["Country"]));
        let cache = LookupCache::new("global", vec![loader.clone()]);

        cache.get_table("Country").unwrap();
        assert!(cache.remove("Country").is_some());
        assert!(cache.remove("Country").is_none());

        cache.get_table("Country").unwrap();
        assert_eq!(loader.count("Country"), 2);
    }

    #[test]
    fn test_clear_waits_for_load_in_progress() {
        let loader = Arc::new(
            CountingLoader::new(["Country", "Region"]).with_delay(Duration::from_millis(50)),
        );
        let cache = Arc::new(LookupCache::new("global", vec![loader.clone()]));
        cache.get_table("Region").unwrap();

        let load = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get_table("Country").unwrap())
        };
        while !cache.gate.is_busy("Country") && !cache.contains("Country") {
            thread::sleep(Duration::from_millis(1));
        }

        cache.clear();
        assert!(cache.is_empty());
        load.join().unwrap();
        assert!(cache.is_empty());
        assert_eq!(loader.count("Country"), 1);
    }

    #[test]
    fn test_all_matching_loaders_run() {
        let countries = Arc::new(CountingLoader::new(["Country"]));
        let everything = Arc::new(CountingLoader::new(["Country", "Region"]));
        let cache = LookupCache::new("global", vec![countries.clone(), everything.clone()]);

        cache.get_table("Country").unwrap();
        assert_eq!(countries.count("Country"), 1);
        assert_eq!(everything.count("Country"), 1);
    }

    #[test]
    fn test_commit_in_registration_order() {
        fn text_loader(text: &'static str) -> Arc<dyn CacheLoader> {
            Arc::new(FnLoader::new(LoaderBase::new(true), move |t| {
                Ok(Some(vec![Header::new(t, "1", text)]))
            }))
        }

        for config in [CacheConfig::sequential(), CacheConfig::parallel()] {
            let cache = LookupCache::with_config(
                "global",
                vec![text_loader("first"), text_loader("second")],
                config,
            );
            let table = cache.get_table("T").unwrap().unwrap();
            assert_eq!(table.lookup_by_id("1").unwrap().text, "second");
        }
    }

    #[test]
    fn test_loader_can_publish_other_types() {
        let loader = FnLoader::new(LoaderBase::with_types(true, ["Country"]), |_| Ok(None));
        let bulk = BulkLoader;
        let cache = LookupCache::new("global", vec![Arc::new(loader), Arc::new(bulk)]);

        assert!(cache.get_table("Country").unwrap().is_some());
        assert!(cache.get_cached("Region").is_some());
        assert_eq!(cache.table_types(), vec!["Country", "Region"]);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());

        struct BulkLoader;
        impl CacheLoader for BulkLoader {
            fn supports(&self, _: &str, table_type: &str) -> bool {
                table_type == "Country"
            }
            fn load(&self, ctx: &LoadContext<'_>) -> Result<()> {
                ctx.store(create_table("Country", &[("US", "United States")]));
                ctx.store(create_table("Region", &[("NA", "North America")]));
                Ok(())
            }
        }
    }

    #[test]
    fn test_failure_commits_nothing() {
        let good = Arc::new(CountingLoader::new(["Country"]));
        let bad = Arc::new(CountingLoader::new(["Country"]).failing());
        let cache = LookupCache::with_config(
            "global",
            vec![good.clone(), bad.clone()],
            CacheConfig::sequential(),
        );

        let err = cache.get_table("Country").unwrap_err();
        assert!(err.is_retryable());
        assert!(!cache.contains("Country"));

        // a retry runs the loaders again
        assert!(cache.get_table("Country").is_err());
        assert_eq!(good.count("Country"), 2);
    }

    #[test]
    fn test_cancelled_load_commits_nothing() {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let loader = FnLoader::new(LoaderBase::new(true), move |t| {
            token.cancel();
            Ok(Some(vec![Header::new(t, "1", "one")]))
        });
        let cache = LookupCache::new("global", vec![Arc::new(loader)]);

        let err = cache.get_table_with_cancel("T", &cancel).unwrap_err();
        assert!(matches!(err, Error::Cancelled(ref t) if t == "T"));
        assert!(!cache.contains("T"));

        // a cancelled token fails before any loader runs
        assert!(matches!(
            cache.get_table_with_cancel("U", &cancel),
            Err(Error::Cancelled(_))
        ));
    }

    #[test]
    fn test_cached_table_ignores_cancel() {
        let cache = LookupCache::new("global", vec![]);
        cache.store(create_table("Country", &[("US", "United States")]));

        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(cache.get_table_with_cancel("Country", &cancel).unwrap().is_some());
    }

    #[test]
    fn test_store_replaces() {
        let cache = LookupCache::new("global", vec![]);
        let old = cache.store(create_table("Country", &[("US", "United States")]));
        let new = cache.store(create_table("Country", &[("DE", "Germany")]));

        assert!(!Arc::ptr_eq(&old, &new));
        let current = cache.get_cached("Country").unwrap();
        assert!(Arc::ptr_eq(&current, &new));
        // readers holding the old table keep a consistent view
        assert!(old.lookup_by_id("US").is_some());
    }

    #[test]
    fn test_loader_reads_other_tables() {
        let seen = Arc::new(Mutex::new(None));
        let seen_by_loader = Arc::clone(&seen);

        struct Dependent(Arc<Mutex<Option<usize>>>);
        impl CacheLoader for Dependent {
            fn supports(&self, _: &str, table_type: &str) -> bool {
                table_type == "City"
            }
            fn load(&self, ctx: &LoadContext<'_>) -> Result<()> {
                let countries = ctx.cache().get_table("Country")?;
                *self.0.lock().unwrap() = countries.map(|t| t.len());
                ctx.store(create_table("City", &[("BER", "Berlin")]));
                Ok(())
            }
        }

        let cache = LookupCache::new(
            "global",
            vec![
                Arc::new(CountingLoader::new(["Country"])),
                Arc::new(Dependent(seen_by_loader)),
            ],
        );

        assert!(cache.get_table("City").unwrap().is_some());
        assert_eq!(*seen.lock().unwrap(), Some(2));
    }

    #[test]
    fn test_cache_type_filters_loaders() {
        let user_only = Arc::new(CountingLoader::with_base(
            LoaderBase::with_types(true, ["Country"]).for_cache_type("user"),
        ));
        let global = LookupCache::new("global", vec![user_only.clone()]);
        let user = LookupCache::new("user", vec![user_only.clone()]);

        assert!(global.get_table("Country").unwrap().is_none());
        assert!(user.get_table("Country").unwrap().is_some());
        assert_eq!(user_only.count("Country"), 1);
    }
}
