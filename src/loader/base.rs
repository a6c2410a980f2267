//! Shared `supports` logic for loader implementations.

use std::{collections::HashSet, sync::OnceLock};

use crate::{header::Header, table::LookupTable};

/// Construction-time configuration every loader shares.
///
/// A loader either declares its supported table types up front, or leaves them open
/// and publishes them once known (for example after reading a definition file). Until
/// then [`LoaderBase::supports`] answers optimistically with `true`.
///
/// # Examples
///
/// ```rust
/// use lookupcache::loader::LoaderBase;
///
/// let fixed = LoaderBase::with_types(false, ["Country", "Region"]);
/// assert!(fixed.supports("global", "Country"));
/// assert!(!fixed.supports("global", "Currency"));
///
/// let deferred = LoaderBase::new(false).for_cache_type("global");
/// assert!(deferred.supports("global", "Anything"));
/// assert!(!deferred.supports("user", "Anything"));
///
/// deferred.publish_types(["Currency"]);
/// assert!(!deferred.supports("global", "Anything"));
/// assert!(deferred.supports("global", "Currency"));
/// ```
#[derive(Debug, Default)]
pub struct LoaderBase {
    /// Case sensitivity of the tables this loader builds
    case_sensitive: bool,
    /// Restricts the loader to one cache type when set
    cache_type: Option<String>,
    /// Supported table types, once known
    supported: OnceLock<HashSet<String>>,
}

impl LoaderBase {
    /// A loader whose supported types are discovered later.
    ///
    /// # Arguments
    /// * `case_sensitive` - Case sensitivity of the tables the loader builds
    pub fn new(case_sensitive: bool) -> Self {
        LoaderBase {
            case_sensitive,
            ..Self::default()
        }
    }

    /// A loader with a fixed set of supported table types.
    ///
    /// # Arguments
    /// * `case_sensitive` - Case sensitivity of the tables the loader builds
    /// * `types` - The supported table types
    pub fn with_types<I, S>(case_sensitive: bool, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let base = Self::new(case_sensitive);
        base.publish_types(types);
        base
    }

    /// Restrict the loader to caches of `cache_type`.
    #[must_use]
    pub fn for_cache_type(mut self, cache_type: &str) -> Self {
        self.cache_type = Some(cache_type.to_string());
        self
    }

    /// Whether the loader can populate `table_type` for a cache of `cache_type`.
    pub fn supports(&self, cache_type: &str, table_type: &str) -> bool {
        if self
            .cache_type
            .as_deref()
            .is_some_and(|restricted| restricted != cache_type)
        {
            return false;
        }

        self.supported
            .get()
            .map_or(true, |types| types.contains(table_type))
    }

    /// Record the supported table types.
    ///
    /// Only the first call has an effect.
    ///
    /// # Returns
    /// `true` if the types were recorded by this call
    pub fn publish_types<I, S>(&self, types: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported
            .set(types.into_iter().map(Into::into).collect())
            .is_ok()
    }

    /// The supported table types, if known.
    pub fn supported_types(&self) -> Option<&HashSet<String>> {
        self.supported.get()
    }

    /// The cache type this loader is restricted to, if any.
    pub fn cache_type(&self) -> Option<&str> {
        self.cache_type.as_deref()
    }

    /// Case sensitivity of the tables this loader builds.
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Build a table with this loader's case sensitivity.
    pub fn table(&self, table_type: &str, headers: Vec<Header>) -> LookupTable {
        LookupTable::new(table_type, headers, self.case_sensitive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deferred_types_are_optimistic() {
        let base = LoaderBase::new(true);
        assert!(base.supports("global", "Country"));
        assert!(base.supported_types().is_none());

        assert!(base.publish_types(vec!["Region".to_string()]));
        assert!(!base.supports("global", "Country"));
        assert!(base.supports("global", "Region"));

        // first publication wins
        assert!(!base.publish_types(["Country"]));
        assert!(!base.supports("global", "Country"));
    }

    #[test]
    fn test_cache_type_restriction() {
        let base = LoaderBase::with_types(false, ["Country"]).for_cache_type("user");
        assert_eq!(base.cache_type(), Some("user"));
        assert!(base.supports("user", "Country"));
        assert!(!base.supports("global", "Country"));
        assert!(!base.supports("user", "Region"));
    }

    #[test]
    fn test_table_uses_case_sensitivity() {
        let base = LoaderBase::new(false);
        assert!(!base.is_case_sensitive());

        let table = base.table("Country", vec![Header::new("Country", "us", "United States")]);
        assert!(!table.is_case_sensitive());
        assert!(table.lookup_by_id("US").is_some());
    }
}
