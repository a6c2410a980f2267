//! Values compared by the cascading filter, and the policy flags of the comparison.

use std::fmt;

use bitflags::bitflags;

use crate::header::AttrValue;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// How absent values take part in a cascading-filter comparison
    pub struct MatchPolicy : u8 {
        /// A driving property without a current value accepts every header
        const NULL_DRIVER_MATCHES_ALL = 0x01;
        /// A header without the attribute is accepted for every driver value
        const NULL_ATTR_MATCHES_ANY = 0x02;
    }
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy::NULL_DRIVER_MATCHES_ALL
    }
}

/// A present value on either side of a cascading-filter comparison.
///
/// Absence is expressed as `Option<FilterValue>::None`. Empty strings and empty
/// lists never make it into a `FilterValue`, they count as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// One value
    Single(String),
    /// A set of values; never empty
    Multi(Vec<String>),
}

impl FilterValue {
    /// A single value, `None` when `value` is empty.
    pub fn single(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        (!value.is_empty()).then_some(FilterValue::Single(value))
    }

    /// A multi-value, `None` when no non-empty value remains.
    pub fn multi<I, S>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut collected: Vec<String> = Vec::new();
        for value in values.into_iter().map(Into::into) {
            if !value.is_empty() && !collected.contains(&value) {
                collected.push(value);
            }
        }
        (!collected.is_empty()).then_some(FilterValue::Multi(collected))
    }

    /// Interpret a header attribute.
    ///
    /// Scalars become single values; lists and groups become multi-values.
    pub fn from_attr(value: &AttrValue) -> Option<Self> {
        match value {
            AttrValue::Scalar(value) => Self::single(value.as_str()),
            other => Self::multi(other.values()),
        }
    }

    /// Returns `true` for multi-values.
    pub fn is_multi(&self) -> bool {
        matches!(self, FilterValue::Multi(_))
    }

    /// The contained values.
    pub fn values(&self) -> &[String] {
        match self {
            FilterValue::Single(value) => std::slice::from_ref(value),
            FilterValue::Multi(values) => values,
        }
    }

    /// The same value with every entry lowercased.
    #[must_use]
    pub fn to_lowercase(&self) -> Self {
        match self {
            FilterValue::Single(value) => FilterValue::Single(value.to_lowercase()),
            FilterValue::Multi(values) => {
                FilterValue::Multi(values.iter().map(|v| v.to_lowercase()).collect())
            }
        }
    }

    /// Whether two present values match.
    ///
    /// Two multi-values match when they intersect, a multi-value and a single
    /// value when the set contains it, two single values when they are equal.
    pub fn matches(&self, other: &FilterValue) -> bool {
        match (self, other) {
            (FilterValue::Single(a), FilterValue::Single(b)) => a == b,
            (FilterValue::Single(single), FilterValue::Multi(set))
            | (FilterValue::Multi(set), FilterValue::Single(single)) => set.contains(single),
            (FilterValue::Multi(a), FilterValue::Multi(b)) => a.iter().any(|v| b.contains(v)),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Single(value) => write!(f, "{value}"),
            FilterValue::Multi(values) => write!(f, "{{{}}}", values.join(", ")),
        }
    }
}

/// Decide one `(attribute, driver)` pair of a cascading filter.
///
/// # Arguments
/// * `driver` - The driving property's current value
/// * `attr` - The header's attribute, resolved against the driver's domain
/// * `policy` - How absent values are treated
pub fn pair_matches(
    driver: Option<&FilterValue>,
    attr: Option<&FilterValue>,
    policy: MatchPolicy,
) -> bool {
    match (driver, attr) {
        (None, _) if policy.contains(MatchPolicy::NULL_DRIVER_MATCHES_ALL) => true,
        (_, None) if policy.contains(MatchPolicy::NULL_ATTR_MATCHES_ANY) => true,
        (None, None) => true,
        (Some(driver), Some(attr)) => driver.matches(attr),
        _ => false,
    }
}
