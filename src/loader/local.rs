//! Parameterized loading into a private cache.
//!
//! Some enumerations depend on outside context, for example the sub-categories that
//! are valid for the currently selected category. A [`LocalCacheLoader`] keeps such
//! tables in a cache of its own, loaded by a [`ParameterizedSource`] with the current
//! [`Parameters`], so the shared caches never see one table per parameter
//! combination.
//!
//! # Generations
//!
//! Every parameter set gets its own private cache, a generation. The parameters of a
//! generation never change. [`LocalCacheLoader::set_parameters`] builds the next
//! generation, loads every supported table type into it, and only then makes it
//! current. The previous generation and all its tables are discarded once the last
//! reader lets go of it.
//!
//! [`LocalCacheLoader::read`] pins the current generation. Everything read through
//! the returned [`LocalCacheRead`] was built from the same parameters, and reads
//! never wait for a parameter change in progress. Once `set_parameters` has
//! returned, every new read sees the new parameters.
//!
//! Tables must be read through the loader. A table copied into another cache would
//! survive the next parameter change, so the loader is not a
//! [`crate::loader::CacheLoader`] itself.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    ops::Deref,
    sync::{Arc, Mutex, RwLock},
};

use log::info;

use crate::{
    cache::{CacheConfig, CacheScope, LookupCache},
    header::AttrValue,
    loader::{CacheLoader, LoadContext},
    table::LookupTableRc,
    Result,
};

/// Named input parameters of a parameterized source.
pub type Parameters = BTreeMap<String, AttrValue>;

/// A source whose tables depend on a set of parameters.
pub trait ParameterizedSource: Send + Sync {
    /// The table types this source produces.
    ///
    /// Queried once, when the owning [`LocalCacheLoader`] is created.
    fn supported_types(&self) -> Vec<String>;

    /// Publish the tables for `ctx.table_type()` built with `parameters`.
    ///
    /// # Errors
    /// Any error aborts the load; nothing is stored.
    fn load(&self, parameters: &Parameters, ctx: &LoadContext<'_>) -> Result<()>;
}

/// Registers a source with the cache of one generation.
struct BoundSource {
    source: Arc<dyn ParameterizedSource>,
    types: Arc<BTreeSet<String>>,
    parameters: Parameters,
}

impl CacheLoader for BoundSource {
    fn supports(&self, cache_type: &str, table_type: &str) -> bool {
        cache_type == CacheScope::Local.as_ref() && self.types.contains(table_type)
    }

    fn load(&self, ctx: &LoadContext<'_>) -> Result<()> {
        self.source.load(&self.parameters, ctx)
    }
}

/// One parameter set and the tables loaded with it.
struct Generation {
    parameters: Parameters,
    cache: LookupCache,
}

impl Generation {
    fn new(
        source: &Arc<dyn ParameterizedSource>,
        types: &Arc<BTreeSet<String>>,
        parameters: Parameters,
        config: CacheConfig,
    ) -> Self {
        let bound: Arc<dyn CacheLoader> = Arc::new(BoundSource {
            source: Arc::clone(source),
            types: Arc::clone(types),
            parameters: parameters.clone(),
        });

        Generation {
            parameters,
            cache: LookupCache::with_config(CacheScope::Local.as_ref(), vec![bound], config),
        }
    }
}

/// A loader owning a private cache whose content depends on parameters.
///
/// # Examples
///
/// ```rust
/// use lookupcache::{
///     header::{AttrValue, Header},
///     loader::{LoadContext, LocalCacheLoader, ParameterizedSource, Parameters},
///     Result,
/// };
///
/// struct SubCategories;
///
/// impl ParameterizedSource for SubCategories {
///     fn supported_types(&self) -> Vec<String> {
///         vec!["SubCategory".to_string()]
///     }
///
///     fn load(&self, parameters: &Parameters, ctx: &LoadContext<'_>) -> Result<()> {
///         let category = parameters
///             .get("category")
///             .and_then(AttrValue::as_scalar)
///             .unwrap_or("none");
///         let headers = vec![Header::new(ctx.table_type(), &format!("{category}-1"), "First")];
///         ctx.store(lookupcache::LookupTable::new(ctx.table_type(), headers, true));
///         Ok(())
///     }
/// }
///
/// let loader = LocalCacheLoader::new(SubCategories);
/// loader.set_parameter("category", "books")?;
///
/// let table = loader.get_table("SubCategory")?.unwrap();
/// assert!(table.lookup_by_id("books-1").is_some());
/// # Ok::<(), lookupcache::Error>(())
/// ```
pub struct LocalCacheLoader {
    source: Arc<dyn ParameterizedSource>,
    types: Arc<BTreeSet<String>>,
    /// The generation new reads start from
    current: RwLock<Arc<Generation>>,
    /// Serializes parameter changes
    changes: Mutex<()>,
    config: CacheConfig,
}

impl LocalCacheLoader {
    /// Create a loader with empty parameters and the default configuration.
    pub fn new(source: impl ParameterizedSource + 'static) -> Self {
        Self::with_config(source, CacheConfig::default())
    }

    /// Create a loader with empty parameters.
    ///
    /// # Arguments
    /// * `source` - Produces the tables for the current parameters
    /// * `config` - Configuration of the private cache and of reloads
    pub fn with_config(source: impl ParameterizedSource + 'static, config: CacheConfig) -> Self {
        let types: Arc<BTreeSet<String>> =
            Arc::new(source.supported_types().into_iter().collect());
        let source: Arc<dyn ParameterizedSource> = Arc::new(source);
        let first = Generation::new(&source, &types, Parameters::new(), config);

        LocalCacheLoader {
            source,
            types,
            current: RwLock::new(Arc::new(first)),
            changes: Mutex::new(()),
            config,
        }
    }

    /// A copy of the current parameters.
    pub fn parameters(&self) -> Parameters {
        self.current().parameters.clone()
    }

    /// The table types this loader supports, sorted.
    pub fn supported_types(&self) -> Vec<String> {
        self.types.iter().cloned().collect()
    }

    /// Replace all parameters and reload.
    ///
    /// When `parameters` equals the current set nothing happens. Otherwise the
    /// tables of the current parameters are discarded and, with
    /// [`CacheConfig::reload_eagerly`], every supported table type is loaded with
    /// the new ones before this returns.
    ///
    /// # Returns
    /// `true` if the parameters changed
    ///
    /// # Errors
    /// Returns the first error of the eager reload. The parameters are replaced
    /// regardless; tables that failed to reload are loaded again by the next read.
    pub fn set_parameters(&self, parameters: Parameters) -> Result<bool> {
        self.update(|current| *current = parameters)
    }

    /// Set a single parameter and reload, see [`LocalCacheLoader::set_parameters`].
    pub fn set_parameter(&self, name: &str, value: impl Into<AttrValue>) -> Result<bool> {
        let value = value.into();
        self.update(|current| {
            current.insert(name.to_string(), value);
        })
    }

    /// Remove a single parameter and reload, see [`LocalCacheLoader::set_parameters`].
    pub fn remove_parameter(&self, name: &str) -> Result<bool> {
        self.update(|current| {
            current.remove(name);
        })
    }

    /// Read access to the private cache of the current parameters.
    ///
    /// The returned handle keeps reading from the same parameters for as long as it
    /// is held, even across a concurrent parameter change. It takes no lock, so
    /// holding it never blocks a parameter change or another read.
    pub fn read(&self) -> LocalCacheRead {
        LocalCacheRead {
            generation: self.current(),
        }
    }

    /// Get a table of the private cache, loading it with the current parameters.
    ///
    /// # Errors
    /// Returns the source's error if the table had to be loaded and failed.
    pub fn get_table(&self, table_type: &str) -> Result<Option<LookupTableRc>> {
        self.read().get_table(table_type)
    }

    fn current(&self) -> Arc<Generation> {
        read_lock!(self.current).clone()
    }

    fn update<F>(&self, change: F) -> Result<bool>
    where
        F: FnOnce(&mut Parameters),
    {
        let _change = lock!(self.changes);

        let previous = self.current();
        let mut parameters = previous.parameters.clone();
        change(&mut parameters);
        if parameters == previous.parameters {
            return Ok(false);
        }

        let next = Arc::new(Generation::new(
            &self.source,
            &self.types,
            parameters,
            self.config,
        ));
        let reloaded = if self.config.reload_eagerly {
            self.types
                .iter()
                .try_for_each(|table_type| next.cache.get_table(table_type).map(|_| ()))
        } else {
            Ok(())
        };

        *write_lock!(self.current) = next;
        info!(
            "Parameters of local cache for {:?} changed",
            self.types
        );

        reloaded.map(|()| true)
    }
}

impl fmt::Debug for LocalCacheLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current();
        f.debug_struct("LocalCacheLoader")
            .field("types", &self.types)
            .field("parameters", &current.parameters)
            .field("cache", &current.cache)
            .finish()
    }
}

/// Read access to the private cache of one parameter set.
///
/// Obtained from [`LocalCacheLoader::read`]. Dereferences to the [`LookupCache`]
/// holding the tables built from [`LocalCacheRead::parameters`].
#[derive(Clone)]
pub struct LocalCacheRead {
    generation: Arc<Generation>,
}

impl LocalCacheRead {
    /// The parameters every table of this read is built from.
    pub fn parameters(&self) -> &Parameters {
        &self.generation.parameters
    }
}

impl Deref for LocalCacheRead {
    type Target = LookupCache;

    fn deref(&self) -> &LookupCache {
        &self.generation.cache
    }
}

impl fmt::Debug for LocalCacheRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCacheRead")
            .field("parameters", &self.generation.parameters)
            .finish()
    }
}
