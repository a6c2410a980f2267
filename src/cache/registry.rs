//! Owner of the global cache and of one cache per user session.
//!
//! The registry is built once per process and passed to whatever needs a cache,
//! instead of living in static state. Every cache it creates shares the same loader
//! list; loaders tell the scopes apart through the cache type they are asked for.

use std::sync::Arc;

use dashmap::DashMap;
use log::debug;

use crate::{
    cache::{CacheConfig, CacheScope, LookupCache},
    loader::CacheLoader,
};

/// The caches of a process, one per logical scope.
///
/// # Examples
///
/// ```rust
/// use lookupcache::cache::{CacheRegistry, CacheScope};
///
/// let registry = CacheRegistry::new(vec![]);
/// let alice = registry.user("alice");
/// assert_eq!(alice.cache_type(), "user");
///
/// // the same session always resolves to the same cache
/// let again = registry.cache(CacheScope::User, Some("alice")).unwrap();
/// assert!(std::sync::Arc::ptr_eq(&alice, &again));
///
/// assert!(registry.end_session("alice"));
/// ```
pub struct CacheRegistry {
    loaders: Vec<Arc<dyn CacheLoader>>,
    config: CacheConfig,
    global: Arc<LookupCache>,
    users: DashMap<String, Arc<LookupCache>>,
}

impl CacheRegistry {
    /// Create a registry with the default configuration.
    ///
    /// # Arguments
    /// * `loaders` - The loaders shared by every cache of the registry
    pub fn new(loaders: Vec<Arc<dyn CacheLoader>>) -> Self {
        Self::with_config(loaders, CacheConfig::default())
    }

    /// Create a registry whose caches use `config`.
    pub fn with_config(loaders: Vec<Arc<dyn CacheLoader>>, config: CacheConfig) -> Self {
        let global = Arc::new(LookupCache::with_config(
            CacheScope::Global.as_ref(),
            loaders.clone(),
            config,
        ));

        CacheRegistry {
            loaders,
            config,
            global,
            users: DashMap::new(),
        }
    }

    /// The process-wide cache.
    pub fn global(&self) -> &Arc<LookupCache> {
        &self.global
    }

    /// The cache of `session`, created on first use.
    pub fn user(&self, session: &str) -> Arc<LookupCache> {
        if let Some(cache) = self.users.get(session) {
            return Arc::clone(cache.value());
        }

        let entry = self.users.entry(session.to_string()).or_insert_with(|| {
            debug!("Creating user cache for session '{}'", session);
            Arc::new(LookupCache::with_config(
                CacheScope::User.as_ref(),
                self.loaders.clone(),
                self.config,
            ))
        });
        Arc::clone(entry.value())
    }

    /// Drop the cache of `session`.
    ///
    /// Holders of the cache keep using it; the next [`CacheRegistry::user`] call
    /// for the session starts over with an empty one.
    ///
    /// # Returns
    /// `true` if the session had a cache
    pub fn end_session(&self, session: &str) -> bool {
        self.users.remove(session).is_some()
    }

    /// Sessions that currently have a cache, sorted.
    pub fn sessions(&self) -> Vec<String> {
        let mut sessions: Vec<String> = self.users.iter().map(|e| e.key().clone()).collect();
        sessions.sort();
        sessions
    }

    /// Resolve the cache a consumer of `scope` should use.
    ///
    /// # Arguments
    /// * `scope` - The requested scope
    /// * `session` - The consumer's session, required for [`CacheScope::User`]
    ///
    /// # Returns
    /// `None` for a user scope without session and for [`CacheScope::Local`],
    /// whose caches belong to their loaders
    pub fn cache(&self, scope: CacheScope, session: Option<&str>) -> Option<Arc<LookupCache>> {
        match scope {
            CacheScope::Global => Some(Arc::clone(&self.global)),
            CacheScope::User => session.map(|session| self.user(session)),
            CacheScope::Local => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{loader::LoaderBase, test::CountingLoader};

    #[test]
    fn test_scopes_load_independently() {
        let loader = Arc::new(CountingLoader::new(["Country"]));
        let registry = CacheRegistry::new(vec![loader.clone()]);

        registry.global().get_table("Country").unwrap();
        registry.user("alice").get_table("Country").unwrap();
        registry.user("bob").get_table("Country").unwrap();
        registry.user("alice").get_table("Country").unwrap();

        assert_eq!(loader.count("Country"), 3);
        assert_eq!(registry.sessions(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_end_session_starts_over() {
        let loader = Arc::new(CountingLoader::new(["Country"]));
        let registry = CacheRegistry::new(vec![loader.clone()]);

        let before = registry.user("alice");
        before.get_table("Country").unwrap();
        assert!(registry.end_session("alice"));
        assert!(!registry.end_session("alice"));

        let after = registry.user("alice");
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.is_empty());
        // the old handle stays usable
        assert!(before.contains("Country"));
    }

    #[test]
    fn test_resolve_scope() {
        let registry = CacheRegistry::new(vec![]);

        let global = registry.cache(CacheScope::Global, Some("alice")).unwrap();
        assert!(Arc::ptr_eq(&global, registry.global()));
        assert_eq!(global.cache_type(), "global");

        assert!(registry.cache(CacheScope::User, None).is_none());
        assert_eq!(
            registry.cache(CacheScope::User, Some("alice")).unwrap().cache_type(),
            "user"
        );
        assert!(registry.cache(CacheScope::Local, Some("alice")).is_none());
    }

    #[test]
    fn test_user_only_loader() {
        let loader = Arc::new(CountingLoader::with_base(
            LoaderBase::with_types(true, ["Favorites"]).for_cache_type(CacheScope::User.as_ref()),
        ));
        let registry = CacheRegistry::with_config(vec![loader], CacheConfig::sequential());

        assert!(registry.global().get_table("Favorites").unwrap().is_none());
        assert!(registry.user("alice").get_table("Favorites").unwrap().is_some());
        assert!(!registry.user("alice").config().parallel_loaders);
    }
}
