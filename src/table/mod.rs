//! Self-indexing lookup tables.
//!
//! A [`LookupTable`] holds every [`Header`] of one enumeration type in source order
//! and answers two kinds of questions:
//!
//! - "which header renders to `value` under format `F`?" ([`LookupTable::lookup_by_format`])
//! - "give me all headers, optionally filtered" ([`LookupTable::get_values`])
//!
//! # Indexes
//!
//! Indexes are built lazily, one per format string, the first time a format is
//! queried. They are derived data: [`LookupTable::reset_indexes`] and
//! [`LookupTable::clear_index`] are always safe and only cost the next lookup a
//! rebuild.
//!
//! When several headers render to the same key, the first one in source order owns
//! the key. The others are returned as its group, an attribute named after the
//! format (see [`Header::group`]), on every lookup of that key.
//!
//! # Thread Safety
//!
//! - Lookups against already built indexes only take a shared read lock and never
//!   wait on a build.
//! - Builds for the same format are single-flight through a per-format gate; builds
//!   for different formats run concurrently.
//! - The write lock is held only to insert a finished index.

mod index;

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use log::trace;

use crate::{
    header::{group_attribute, AttrValue, Header, FIELD_ID},
    utils::LoadGate,
};

use index::{normalize_key, FormatIndex};

/// A reference to a `LookupTable`
pub type LookupTableRc = Arc<LookupTable>;

/// All headers of one enumeration type plus their on-demand indexes.
///
/// # Examples
///
/// ```rust
/// use lookupcache::{header::{Header, FIELD_ID}, table::LookupTable};
///
/// let table = LookupTable::new(
///     "Country",
///     vec![
///         Header::new("Country", "us", "United States"),
///         Header::new("Country", "de", "Germany"),
///     ],
///     false,
/// );
///
/// let germany = table.lookup_by_id("DE").unwrap();
/// assert_eq!(germany.text, "Germany");
/// assert_eq!(table.lookup_by_format("[t]", "united states").unwrap().id, "us");
/// ```
#[derive(Debug)]
pub struct LookupTable {
    /// The enumeration type
    table_type: String,
    /// Key comparison rule for every index of this table
    case_sensitive: bool,
    /// Source of truth, in load order
    data: Vec<Header>,
    /// Built indexes by format string
    indexes: RwLock<HashMap<String, Arc<FormatIndex>>>,
    /// Single-flight gate for index builds, keyed by format
    builds: LoadGate,
}

impl LookupTable {
    /// Create a table from a finished set of headers.
    ///
    /// # Arguments
    /// * `table_type` - The enumeration type
    /// * `data` - The headers, in the order they should win duplicate keys
    /// * `case_sensitive` - Whether index keys are compared case-sensitively
    pub fn new(table_type: &str, data: Vec<Header>, case_sensitive: bool) -> Self {
        LookupTable {
            table_type: table_type.to_string(),
            case_sensitive,
            data,
            indexes: RwLock::new(HashMap::new()),
            builds: LoadGate::new(),
        }
    }

    /// The enumeration type of this table.
    pub fn table_type(&self) -> &str {
        &self.table_type
    }

    /// Whether index keys are compared case-sensitively.
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the table holds no headers.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrowing iterator over the headers in source order.
    ///
    /// Use [`LookupTable::get_values`] to obtain copies that may be mutated.
    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.data.iter()
    }

    /// Copies of all headers, in source order.
    pub fn get_values(&self) -> Vec<Header> {
        self.data.clone()
    }

    /// Copies of the headers accepted by `filter`, in source order.
    ///
    /// Only accepted headers are cloned.
    ///
    /// # Arguments
    /// * `filter` - Predicate deciding which headers to return
    pub fn get_values_filtered<F>(&self, filter: F) -> Vec<Header>
    where
        F: Fn(&Header) -> bool,
    {
        self.data
            .iter()
            .filter(|header| filter(header))
            .cloned()
            .collect()
    }

    /// Look up a header by id.
    ///
    /// Equivalent to `lookup_by_format(FIELD_ID, id)`.
    pub fn lookup_by_id(&self, id: &str) -> Option<Header> {
        self.lookup_by_format(FIELD_ID, id)
    }

    /// Look up the header whose rendering under `format` equals `value`.
    ///
    /// Builds the index for `format` on first use. If several headers share the
    /// key, the first one in source order is returned with the others attached as
    /// its group for `format`.
    ///
    /// # Arguments
    /// * `format` - The format to render headers with, e.g. `"[t]"` or `"[i]-[a:code]"`
    /// * `value` - The rendered value to find
    ///
    /// # Returns
    /// A copy of the matching header, or `None` if no header renders to `value`
    pub fn lookup_by_format(&self, format: &str, value: &str) -> Option<Header> {
        let index = self.index(format);
        let positions = index.positions(&normalize_key(value, self.case_sensitive))?;

        let (&owner, siblings) = positions.split_first()?;
        let mut header = self.data[owner].clone();
        if !siblings.is_empty() {
            let group = siblings.iter().map(|&p| self.data[p].clone()).collect();
            header.set_attribute(&group_attribute(format), AttrValue::Group(group));
        }

        Some(header)
    }

    /// Look up every header whose rendering under `format` equals `value`.
    ///
    /// # Returns
    /// Copies in source order; empty when nothing matches
    pub fn lookup_group(&self, format: &str, value: &str) -> Vec<Header> {
        let index = self.index(format);
        index
            .positions(&normalize_key(value, self.case_sensitive))
            .map(|positions| positions.iter().map(|&p| self.data[p].clone()).collect())
            .unwrap_or_default()
    }

    /// Drop all built indexes.
    pub fn reset_indexes(&self) {
        write_lock!(self.indexes).clear();
    }

    /// Drop the index for `format`.
    ///
    /// # Returns
    /// `true` if the index existed
    pub fn clear_index(&self, format: &str) -> bool {
        write_lock!(self.indexes).remove(format).is_some()
    }

    /// Formats that currently have a built index.
    pub fn index_formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = read_lock!(self.indexes).keys().cloned().collect();
        formats.sort();
        formats
    }

    /// Fetch the index for `format`, building it if needed.
    fn index(&self, format: &str) -> Arc<FormatIndex> {
        if let Some(index) = self.built_index(format) {
            return index;
        }

        self.builds.run(format, || {
            if let Some(index) = self.built_index(format) {
                return index;
            }

            let index = Arc::new(FormatIndex::build(format, &self.data, self.case_sensitive));
            trace!(
                "Built index '{}' for table '{}': {} keys ({} shared)",
                format,
                self.table_type,
                index.len(),
                index.duplicate_keys()
            );

            write_lock!(self.indexes).insert(format.to_string(), Arc::clone(&index));
            index
        })
    }

    fn built_index(&self, format: &str) -> Option<Arc<FormatIndex>> {
        read_lock!(self.indexes).get(format).cloned()
    }
}

impl<'a> IntoIterator for &'a LookupTable {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
