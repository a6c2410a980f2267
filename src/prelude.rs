//! # lookupcache Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the lookupcache library. Import it to get quick access to caches, tables,
//! loaders and filters.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all lookupcache operations
pub use crate::Error;

/// The result type used throughout lookupcache
pub use crate::Result;

// ================================================================================================
// Records and Tables
// ================================================================================================

/// Reference-value records and their attribute values
pub use crate::header::{AttrValue, Header, HeaderFormat};

/// Standard format templates
pub use crate::header::{FIELD_ID, FIELD_ID_TEXT, FIELD_TEXT};

/// Self-indexing tables
pub use crate::table::{LookupTable, LookupTableRc};

// ================================================================================================
// Caches
// ================================================================================================

/// Caches, their scopes, configuration and registry
pub use crate::cache::{CacheConfig, CacheRegistry, CacheScope, LookupCache};

// ================================================================================================
// Loaders
// ================================================================================================

/// The loader contract and its context
pub use crate::loader::{CacheLoader, CancelToken, LoadContext, LoaderBase};

/// Shipped loader implementations
pub use crate::loader::{FnLoader, LocalCacheLoader, ParameterizedSource, Parameters, XmlLoader};

// ================================================================================================
// Filters
// ================================================================================================

/// Cascading filters and driving properties
pub use crate::filter::{CascadingFilter, DrivingProperty, FilterValue, MatchPolicy, PropertyValue};
