//! `LoadContext` - per-loader staging area for one load sequence.
//!
//! A context is created by [`crate::LookupCache`] for every matching loader when a
//! table type misses, handed to [`crate::loader::CacheLoader::load`], and consumed
//! once the loader returns. Tables a loader publishes through [`LoadContext::store`]
//! are only staged; the cache commits them after every loader of the sequence has
//! succeeded and the sequence was not cancelled.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    cache::LookupCache,
    table::{LookupTable, LookupTableRc},
    Error, Result,
};

/// Cooperative cancellation flag for load sequences.
///
/// Clones share the same flag. Loaders doing long-running work should poll
/// [`LoadContext::check_cancelled`] between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every sequence observing this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once [`CancelToken::cancel`] was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Fail with [`Error::Cancelled`] for `table_type` if cancellation was requested.
    pub(crate) fn check(&self, table_type: &str) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled(table_type.to_string()))
        } else {
            Ok(())
        }
    }
}

/// The view a loader gets of the load sequence it takes part in.
pub struct LoadContext<'a> {
    /// The cache being populated
    cache: &'a LookupCache,
    /// The table type that missed
    table_type: &'a str,
    /// Cancellation flag of the sequence
    cancel: &'a CancelToken,
    /// Tables published by the loader, in publication order
    staged: boxcar::Vec<LookupTableRc>,
}

impl<'a> LoadContext<'a> {
    pub(crate) fn new(cache: &'a LookupCache, table_type: &'a str, cancel: &'a CancelToken) -> Self {
        LoadContext {
            cache,
            table_type,
            cancel,
            staged: boxcar::Vec::new(),
        }
    }

    /// The cache type (scope) of the cache being populated.
    pub fn cache_type(&self) -> &str {
        self.cache.cache_type()
    }

    /// The requested table type.
    pub fn table_type(&self) -> &str {
        self.table_type
    }

    /// The cache being populated.
    ///
    /// Loaders may read other table types through it. Requesting the table type
    /// that is currently being loaded from inside `load` deadlocks.
    pub fn cache(&self) -> &LookupCache {
        self.cache
    }

    /// Publish a table.
    ///
    /// The table becomes visible in the cache when the whole sequence commits. A
    /// loader may publish tables of other types than the requested one, and may call
    /// this from several threads.
    pub fn store(&self, table: LookupTable) {
        self.staged.push(Arc::new(table));
    }

    /// Publish a table that is already shared, e.g. one taken from another cache.
    pub fn store_rc(&self, table: LookupTableRc) {
        self.staged.push(table);
    }

    /// Number of tables published so far.
    pub fn staged_count(&self) -> usize {
        self.staged.count()
    }

    /// Returns `true` if the sequence was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with [`Error::Cancelled`] if the sequence was cancelled.
    ///
    /// # Errors
    /// Returns [`Error::Cancelled`] naming the requested table type.
    pub fn check_cancelled(&self) -> Result<()> {
        self.cancel.check(self.table_type)
    }

    /// The published tables, in publication order.
    pub(crate) fn into_staged(self) -> Vec<LookupTableRc> {
        self.staged
            .iter()
            .map(|(_, table)| Arc::clone(table))
            .collect()
    }
}
