// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # lookupcache
//!
//! Lookup caches and self-indexing tables for enumerated reference values.
//!
//! Data-driven applications show the same small sets of reference values (countries,
//! statuses, categories) in many fields and to many concurrent users, while the values
//! themselves live in a slow backing store. `lookupcache` keeps them in memory, typed
//! by enumeration, and loads each one at most once per cache.
//!
//! ## Features
//!
//! - **Single-flight loading** - concurrent misses for one table type run one load
//! - **Composable loaders** - every loader supporting a type contributes on a miss
//! - **On-demand indexes** - look values up by id, text, or any format template
//! - **Duplicate-key groups** - the first header owns a key, the rest form its group
//! - **Parameterized caches** - reload a private cache atomically when inputs change
//! - **Cascading filters** - restrict values by the selection of other properties
//!
//! ## Quick Start
//!
//! ```rust
//! use lookupcache::prelude::*;
//! use std::sync::Arc;
//!
//! let loader = XmlLoader::from_xml(r#"
//!     <enums>
//!       <enum name="Country">
//!         <item name="US" text="United States"/>
//!         <item name="DE" text="Germany"/>
//!       </enum>
//!     </enums>"#);
//!
//! let registry = CacheRegistry::new(vec![Arc::new(loader)]);
//! let countries = registry.global().get_table("Country")?.unwrap();
//!
//! assert_eq!(countries.lookup_by_id("de").unwrap().text, "Germany");
//! assert_eq!(countries.lookup_by_format(FIELD_ID_TEXT, "US - United States").unwrap().id, "US");
//! # Ok::<(), lookupcache::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`header`] - [`header::Header`] records and the format template syntax
//! - [`table`] - [`LookupTable`], all headers of one type plus lazily built indexes
//! - [`cache`] - [`LookupCache`] with single-flight loading, scopes and the registry
//! - [`loader`] - the [`loader::CacheLoader`] contract and the shipped loaders
//! - [`filter`] - [`filter::CascadingFilter`] and its driving properties
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and never installs a logger. Load
//! sequences are reported at `debug`, index builds and cache hits at `trace`,
//! failures and cancellations at `warn`.
//!
//! ## Fuzzing
//!
//! The XML loader and the format template parser are fuzzed with `cargo-fuzz`:
//!
//! ```bash
//! cargo +nightly fuzz run definitions
//! ```

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use lookupcache::prelude::*;
///
/// let table = LookupTable::new("Status", vec![Header::new("Status", "A", "Active")], true);
/// assert!(table.lookup_by_id("A").is_some());
/// ```
pub mod prelude;

/// Reference-value records and their format templates.
pub mod header;

/// Self-indexing tables of headers.
pub mod table;

/// Caches of tables, loaded on demand.
pub mod cache;

/// The loader contract and the loaders shipped with the crate.
pub mod loader;

/// Cascading filters restricting values by other properties.
pub mod filter;

/// Synchronization helpers.
pub mod utils;

/// `lookupcache` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `lookupcache` Error type
///
/// The error type for all fallible operations in this crate. A missing table or a
/// lookup miss is never an error; see [`Error`] for the categories that are.
pub use error::Error;

/// The cache of one logical scope.
///
/// See [`cache::LookupCache`] for details.
pub use cache::LookupCache;

/// All headers of one enumeration type.
///
/// See [`table::LookupTable`] for details.
pub use table::LookupTable;
