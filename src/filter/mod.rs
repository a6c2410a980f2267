//! Cascading filters.
//!
//! A [`CascadingFilter`] restricts the values of one enumeration by the current
//! value(s) of other properties. Each registration pairs a header attribute name
//! with a [`DrivingProperty`]; a header is allowed when every pair matches:
//!
//! | driver        | attribute     | matches when                              |
//! |---------------|---------------|-------------------------------------------|
//! | absent        | any           | [`MatchPolicy::NULL_DRIVER_MATCHES_ALL`]  |
//! | present       | absent        | [`MatchPolicy::NULL_ATTR_MATCHES_ANY`]    |
//! | absent        | absent        | always                                    |
//! | multi         | multi         | the sets intersect                        |
//! | single/multi  | multi/single  | the set contains the single value         |
//! | single        | single        | the values are equal                      |
//!
//! Filters are pure. When a driver changes, consumers run the filter again and use
//! [`CascadingFilter::disallowed`] to find selections that are no longer valid.

mod value;

pub use value::{pair_matches, FilterValue, MatchPolicy};

use std::{
    fmt,
    sync::{Arc, RwLock},
};

use crate::{
    header::{AttrValue, Header},
    table::LookupTable,
};

/// A property whose current value restricts another enumeration.
pub trait DrivingProperty: Send + Sync {
    /// The property name, used in diagnostics.
    fn name(&self) -> &str;

    /// The current value, `None` when nothing is selected.
    fn current_value(&self) -> Option<FilterValue>;

    /// Interpret a header attribute in this property's value domain.
    fn resolve(&self, raw: &AttrValue) -> Option<FilterValue> {
        FilterValue::from_attr(raw)
    }
}

/// A settable driving property.
///
/// # Examples
///
/// ```rust
/// use lookupcache::filter::{DrivingProperty, FilterValue, PropertyValue};
///
/// let category = PropertyValue::new("category").ignore_case();
/// assert!(category.current_value().is_none());
///
/// category.set_single("Books");
/// assert_eq!(category.current_value(), FilterValue::single("books"));
/// ```
#[derive(Debug)]
pub struct PropertyValue {
    name: String,
    value: RwLock<Option<FilterValue>>,
    ignore_case: bool,
}

impl PropertyValue {
    /// Create a property without a value.
    pub fn new(name: &str) -> Self {
        PropertyValue {
            name: name.to_string(),
            value: RwLock::new(None),
            ignore_case: false,
        }
    }

    /// Compare values of this property case-insensitively.
    #[must_use]
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Replace the current value; `None` clears it.
    pub fn set(&self, value: Option<FilterValue>) {
        *write_lock!(self.value) = value;
    }

    /// Select a single value. An empty string clears the selection.
    pub fn set_single(&self, value: &str) {
        self.set(FilterValue::single(value));
    }

    /// Select several values. An empty set clears the selection.
    pub fn set_multi<I, S>(&self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(FilterValue::multi(values));
    }

    /// Clear the selection.
    pub fn clear(&self) {
        self.set(None);
    }

    fn normalize(&self, value: FilterValue) -> FilterValue {
        if self.ignore_case {
            value.to_lowercase()
        } else {
            value
        }
    }
}

impl DrivingProperty for PropertyValue {
    fn name(&self) -> &str {
        &self.name
    }

    fn current_value(&self) -> Option<FilterValue> {
        read_lock!(self.value)
            .clone()
            .map(|value| self.normalize(value))
    }

    fn resolve(&self, raw: &AttrValue) -> Option<FilterValue> {
        FilterValue::from_attr(raw).map(|value| self.normalize(value))
    }
}

/// Allowed-value filter driven by other properties.
///
/// # Examples
///
/// ```rust
/// use lookupcache::{
///     filter::{CascadingFilter, MatchPolicy, PropertyValue},
///     header::Header,
///     LookupTable,
/// };
/// use std::sync::Arc;
///
/// let mut berlin = Header::new("City", "BER", "Berlin");
/// berlin.set_attribute("country", "DE");
/// let mut paris = Header::new("City", "PAR", "Paris");
/// paris.set_attribute("country", "FR");
/// let cities = LookupTable::new("City", vec![berlin, paris], true);
///
/// let country = Arc::new(PropertyValue::new("country"));
/// let mut filter = CascadingFilter::new(MatchPolicy::NULL_DRIVER_MATCHES_ALL);
/// filter.add("country", country.clone());
///
/// assert_eq!(filter.apply(&cities).len(), 2);
/// country.set_single("FR");
/// assert_eq!(filter.apply(&cities)[0].id, "PAR");
/// ```
pub struct CascadingFilter {
    policy: MatchPolicy,
    drivers: Vec<(String, Arc<dyn DrivingProperty>)>,
}

/// Driver values taken once for a batch of headers.
struct Snapshot<'a> {
    policy: MatchPolicy,
    pairs: Vec<(&'a str, &'a dyn DrivingProperty, Option<FilterValue>)>,
}

impl Snapshot<'_> {
    fn matches(&self, header: &Header) -> bool {
        self.pairs.iter().all(|(attribute, driver, current)| {
            let attr = header
                .attribute(attribute)
                .and_then(|raw| driver.resolve(raw));
            pair_matches(current.as_ref(), attr.as_ref(), self.policy)
        })
    }
}

impl CascadingFilter {
    /// Create a filter without drivers; it allows every header.
    pub fn new(policy: MatchPolicy) -> Self {
        CascadingFilter {
            policy,
            drivers: Vec::new(),
        }
    }

    /// Restrict headers by comparing their `attribute` with `driver`.
    ///
    /// # Arguments
    /// * `attribute` - Header attribute holding the related value(s)
    /// * `driver` - The property whose current value the attribute must match
    pub fn add(&mut self, attribute: &str, driver: Arc<dyn DrivingProperty>) -> &mut Self {
        self.drivers.push((attribute.to_string(), driver));
        self
    }

    /// The policy for absent values.
    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Number of registered drivers.
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// Returns `true` if no driver is registered.
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Whether `header` is allowed by the drivers' current values.
    pub fn matches(&self, header: &Header) -> bool {
        self.snapshot().matches(header)
    }

    /// Copies of the allowed headers of `table`, in source order.
    ///
    /// Driver values are read once, so a driver changing concurrently affects
    /// either all or none of the headers.
    pub fn apply(&self, table: &LookupTable) -> Vec<Header> {
        let snapshot = self.snapshot();
        table.get_values_filtered(|header| snapshot.matches(header))
    }

    /// The headers of `selection` that are no longer allowed.
    pub fn disallowed(&self, selection: &[Header]) -> Vec<Header> {
        let snapshot = self.snapshot();
        selection
            .iter()
            .filter(|header| !snapshot.matches(header))
            .cloned()
            .collect()
    }

    fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            policy: self.policy,
            pairs: self
                .drivers
                .iter()
                .map(|(attribute, driver)| {
                    (attribute.as_str(), &**driver, driver.current_value())
                })
                .collect(),
        }
    }
}

impl Default for CascadingFilter {
    fn default() -> Self {
        Self::new(MatchPolicy::default())
    }
}

impl fmt::Debug for CascadingFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let drivers: Vec<(&str, &str)> = self
            .drivers
            .iter()
            .map(|(attribute, driver)| (attribute.as_str(), driver.name()))
            .collect();
        f.debug_struct("CascadingFilter")
            .field("policy", &self.policy)
            .field("drivers", &drivers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::create_header;

    fn city(id: &str, countries: &[&str]) -> Header {
        let mut header = create_header("City", id, id);
        match countries {
            [] => {}
            [single] => header.set_attribute("country", *single),
            many => header.set_attribute("country", many.to_vec()),
        }
        header
    }

    fn cities() -> LookupTable {
        LookupTable::new(
            "City",
            vec![
                city("BER", &["DE"]),
                city("PAR", &["FR"]),
                city("BSL", &["CH", "DE", "FR"]),
                city("ANY", &[]),
            ],
            true,
        )
    }

    fn ids(headers: &[Header]) -> Vec<&str> {
        headers.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn test_null_driver_matches_all() {
        let country = Arc::new(PropertyValue::new("country"));
        let mut filter = CascadingFilter::new(MatchPolicy::NULL_DRIVER_MATCHES_ALL);
        filter.add("country", country);

        assert_eq!(ids(&filter.apply(&cities())), vec!["BER", "PAR", "BSL", "ANY"]);
    }

    #[test]
    fn test_null_driver_without_policy() {
        let country = Arc::new(PropertyValue::new("country"));
        let mut filter = CascadingFilter::new(MatchPolicy::empty());
        filter.add("country", country);

        // only headers without the attribute remain
        assert_eq!(ids(&filter.apply(&cities())), vec!["ANY"]);
    }

    #[test]
    fn test_single_driver() {
        let country = Arc::new(PropertyValue::new("country"));
        let mut filter = CascadingFilter::default();
        filter.add("country", country.clone());

        country.set_single("DE");
        assert_eq!(ids(&filter.apply(&cities())), vec!["BER", "BSL"]);

        let mut filter = CascadingFilter::new(MatchPolicy::all());
        filter.add("country", country);
        assert_eq!(ids(&filter.apply(&cities())), vec!["BER", "BSL", "ANY"]);
    }

    #[test]
    fn test_multi_driver_intersection() {
        let country = Arc::new(PropertyValue::new("country"));
        let mut filter = CascadingFilter::default();
        filter.add("country", country.clone());

        country.set_multi(["CH", "IT"]);
        assert_eq!(ids(&filter.apply(&cities())), vec!["BSL"]);

        country.set_multi(["FR", "DE"]);
        assert_eq!(ids(&filter.apply(&cities())), vec!["BER", "PAR", "BSL"]);
    }

    #[test]
    fn test_all_drivers_must_match() {
        let mut header = city("X", &["DE"]);
        header.set_attribute("kind", "capital");

        let country = Arc::new(PropertyValue::new("country"));
        let kind = Arc::new(PropertyValue::new("kind"));
        let mut filter = CascadingFilter::default();
        filter.add("country", country.clone()).add("kind", kind.clone());
        assert_eq!(filter.len(), 2);

        country.set_single("DE");
        kind.set_single("capital");
        assert!(filter.matches(&header));

        kind.set_single("port");
        assert!(!filter.matches(&header));
    }

    #[test]
    fn test_ignore_case() {
        let country = Arc::new(PropertyValue::new("country").ignore_case());
        let mut filter = CascadingFilter::default();
        filter.add("country", country.clone());

        country.set_single("de");
        assert_eq!(ids(&filter.apply(&cities())), vec!["BER", "BSL"]);
    }

    #[test]
    fn test_disallowed_after_driver_change() {
        let table = cities();
        let country = Arc::new(PropertyValue::new("country"));
        let mut filter = CascadingFilter::default();
        filter.add("country", country.clone());

        let selection = vec![
            table.lookup_by_id("BER").unwrap(),
            table.lookup_by_id("BSL").unwrap(),
        ];
        assert!(filter.disallowed(&selection).is_empty());

        country.set_single("FR");
        assert_eq!(ids(&filter.disallowed(&selection)), vec!["BER"]);

        country.clear();
        assert!(filter.disallowed(&selection).is_empty());
    }

    #[test]
    fn test_empty_filter_allows_everything() {
        let filter = CascadingFilter::new(MatchPolicy::empty());
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&cities()).len(), 4);
    }
}
