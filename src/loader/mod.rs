//! Loader contract and the loaders shipped with the crate.
//!
//! A [`CacheLoader`] decouples "how to fetch the data of an enumeration type" from
//! "where it is cached". A [`crate::LookupCache`] keeps an ordered list of loaders and,
//! on a miss, invokes every loader whose [`CacheLoader::supports`] matches the cache
//! type and the requested table type.
//!
//! # Modules
//! - `context`: [`LoadContext`] handed to loaders, and the [`CancelToken`] it observes.
//! - `base`: [`LoaderBase`], the construction-time configuration shared by loaders.
//! - `func`: [`FnLoader`], a loader backed by a closure.
//! - `xml`: [`XmlLoader`], a loader over a tag-based definition document.
//! - `local`: [`LocalCacheLoader`], a parameterized loader owning a private cache.
//!
//! # Implementing a loader
//!
//! ```rust
//! use lookupcache::{
//!     header::Header,
//!     loader::{CacheLoader, LoadContext, LoaderBase},
//!     LookupCache, Result,
//! };
//! use std::sync::Arc;
//!
//! struct Weekdays(LoaderBase);
//!
//! impl CacheLoader for Weekdays {
//!     fn supports(&self, cache_type: &str, table_type: &str) -> bool {
//!         self.0.supports(cache_type, table_type)
//!     }
//!
//!     fn load(&self, ctx: &LoadContext<'_>) -> Result<()> {
//!         let days = ["Mon", "Tue", "Wed", "Thu", "Fri"]
//!             .iter()
//!             .enumerate()
//!             .map(|(i, day)| Header::new(ctx.table_type(), &i.to_string(), day))
//!             .collect();
//!         ctx.store(self.0.table(ctx.table_type(), days));
//!         Ok(())
//!     }
//! }
//!
//! let cache = LookupCache::new(
//!     "global",
//!     vec![Arc::new(Weekdays(LoaderBase::with_types(false, ["Weekday"])))],
//! );
//! assert_eq!(cache.get_table("Weekday")?.unwrap().len(), 5);
//! assert!(cache.get_table("Month")?.is_none());
//! # Ok::<(), lookupcache::Error>(())
//! ```

mod base;
mod context;
mod func;
mod local;
mod xml;

pub use base::LoaderBase;
pub use context::{CancelToken, LoadContext};
pub use func::FnLoader;
pub use local::{LocalCacheLoader, LocalCacheRead, ParameterizedSource, Parameters};
pub use xml::XmlLoader;

use crate::Result;

/// A source able to populate tables of a cache.
///
/// Loaders are shared between threads and may be invoked concurrently for
/// different table types, so implementations must be `Send + Sync`.
pub trait CacheLoader: Send + Sync {
    /// Whether this loader can populate `table_type` for a cache of `cache_type`.
    ///
    /// A loader that only learns its type set on first use should answer `true`
    /// until it knows better, see [`LoaderBase::publish_types`].
    ///
    /// # Arguments
    /// * `cache_type` - The scope of the requesting cache, e.g. `"global"`
    /// * `table_type` - The requested enumeration type
    fn supports(&self, cache_type: &str, table_type: &str) -> bool;

    /// Populate the requested table type through `ctx`.
    ///
    /// Tables are published with [`LoadContext::store`]; publishing nothing is a
    /// valid outcome. Loading must be idempotent in effect: running it twice with
    /// the same inputs simply replaces the first result.
    ///
    /// # Arguments
    /// * `ctx` - The load sequence this invocation takes part in
    ///
    /// # Errors
    /// Any error aborts the whole load sequence, and nothing published by any of its
    /// loaders is committed.
    fn load(&self, ctx: &LoadContext<'_>) -> Result<()>;
}
