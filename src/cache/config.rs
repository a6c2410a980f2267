//! Cache configuration
//!
//! This module provides the knobs that control how a cache runs its loaders and
//! how a local cache reacts to parameter changes.

/// Configuration for load sequences and local reloads
///
/// Load sequences always commit atomically; these options only affect scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Run the matching loaders of a load sequence concurrently on the rayon pool
    /// Sequences with a single matching loader always run on the calling thread
    pub parallel_loaders: bool,

    /// Reload every supported table inside `LocalCacheLoader::set_parameters`
    /// When disabled, changed parameters only evict and the next read reloads
    pub reload_eagerly: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            parallel_loaders: true,
            reload_eagerly: true,
        }
    }
}

impl CacheConfig {
    /// Creates a configuration that runs loaders one after another
    ///
    /// Loaders are invoked in registration order on the calling thread, which
    /// keeps loader side effects deterministic.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel_loaders: false,
            ..Self::default()
        }
    }

    /// Creates a configuration that fans loaders out over the rayon pool
    #[must_use]
    pub fn parallel() -> Self {
        Self::default()
    }

    /// Creates a configuration for local caches that reload lazily
    ///
    /// Parameter changes evict the affected tables; they are loaded again by the
    /// next read, which waits for the change to complete.
    #[must_use]
    pub fn lazy_reload() -> Self {
        Self {
            reload_eagerly: false,
            ..Self::default()
        }
    }
}
