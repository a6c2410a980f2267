use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString};

/// The standard cache types.
///
/// A cache type is a plain string, so loaders and caches are free to use others;
/// these are the partitions the crate itself creates. The string form is the
/// lowercase variant name.
///
/// ```rust
/// use lookupcache::cache::CacheScope;
///
/// assert_eq!(CacheScope::User.as_ref(), "user");
/// assert_eq!("global".parse::<CacheScope>().unwrap(), CacheScope::Global);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
)]
#[strum(serialize_all = "lowercase")]
pub enum CacheScope {
    /// Process-wide cache shared by every session
    Global,
    /// Cache private to one user session
    User,
    /// Cache owned by a single parameterized loader
    Local,
}
