//! Closure-backed loader.

use std::fmt;

use crate::{
    header::Header,
    loader::{CacheLoader, LoadContext, LoaderBase},
    Result,
};

/// A loader that asks a closure for the headers of a table type.
///
/// The closure returns `Ok(None)` for types it does not know, which contributes
/// nothing to the load sequence. It is the adapter for in-memory data and for
/// fetching from a service.
///
/// # Examples
///
/// ```rust
/// use lookupcache::{header::Header, loader::{FnLoader, LoaderBase}, LookupCache};
/// use std::sync::Arc;
///
/// let loader = FnLoader::new(LoaderBase::with_types(false, ["Status"]), |table_type| {
///     Ok(Some(vec![
///         Header::new(table_type, "A", "Active"),
///         Header::new(table_type, "C", "Closed"),
///     ]))
/// });
///
/// let cache = LookupCache::new("global", vec![Arc::new(loader)]);
/// let status = cache.get_table("Status")?.unwrap();
/// assert_eq!(status.lookup_by_id("c").unwrap().text, "Closed");
/// # Ok::<(), lookupcache::Error>(())
/// ```
pub struct FnLoader<F> {
    base: LoaderBase,
    source: F,
}

impl<F> FnLoader<F>
where
    F: Fn(&str) -> Result<Option<Vec<Header>>> + Send + Sync,
{
    /// Create the loader.
    ///
    /// # Arguments
    /// * `base` - Supported types and table case sensitivity
    /// * `source` - Produces the headers of a requested table type
    pub fn new(base: LoaderBase, source: F) -> Self {
        FnLoader { base, source }
    }

    /// The loader configuration.
    pub fn base(&self) -> &LoaderBase {
        &self.base
    }
}

impl<F> CacheLoader for FnLoader<F>
where
    F: Fn(&str) -> Result<Option<Vec<Header>>> + Send + Sync,
{
    fn supports(&self, cache_type: &str, table_type: &str) -> bool {
        self.base.supports(cache_type, table_type)
    }

    fn load(&self, ctx: &LoadContext<'_>) -> Result<()> {
        if let Some(headers) = (self.source)(ctx.table_type())? {
            ctx.check_cancelled()?;
            ctx.store(self.base.table(ctx.table_type(), headers));
        }
        Ok(())
    }
}

impl<F> fmt::Debug for FnLoader<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLoader").field("base", &self.base).finish()
    }
}
