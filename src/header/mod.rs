//! Reference-value records.
//!
//! A [`Header`] is one value of an enumeration: a type tag, an id, a display text,
//! an active flag and an open-ended bag of named attributes. Headers are built by
//! loaders, stored inside [`crate::table::LookupTable`]s and handed out as clones,
//! so callers may mutate what they receive without affecting cached state.
//!
//! # Identity
//!
//! Two headers are equal iff their `table_type` and `id` match. Validity is not part
//! of identity: an unresolved placeholder created with [`Header::invalid`] compares
//! equal to the resolved header with the same id, and callers that care have to
//! check [`Header::is_valid`] themselves.
//!
//! # Attributes
//!
//! Attribute values are tagged ([`AttrValue`]) and may hold a scalar, a list of
//! scalars (multi-valued attributes such as a list of related ids) or, for group
//! attributes maintained by table indexes, a list of sibling headers.

mod format;

pub use format::{attr_format, HeaderFormat, FIELD_ID, FIELD_ID_TEXT, FIELD_TEXT};

use std::{
    collections::BTreeMap,
    fmt,
    hash::{Hash, Hasher},
};

/// The value of a named header attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A single value
    Scalar(String),
    /// Multiple values, in insertion order
    List(Vec<String>),
    /// Sibling headers sharing an index key with the owning header
    Group(Vec<Header>),
}

impl AttrValue {
    /// Returns the value if this is a scalar.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            AttrValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Returns `true` for list-shaped values (lists and groups).
    pub fn is_multi(&self) -> bool {
        !matches!(self, AttrValue::Scalar(_))
    }

    /// All contained values as strings; group members contribute their ids.
    pub fn values(&self) -> Vec<&str> {
        match self {
            AttrValue::Scalar(value) => vec![value.as_str()],
            AttrValue::List(values) => values.iter().map(String::as_str).collect(),
            AttrValue::Group(headers) => headers.iter().map(|h| h.id.as_str()).collect(),
        }
    }

    /// Returns `true` if `value` is one of the contained values.
    pub fn contains(&self, value: &str) -> bool {
        self.values().contains(&value)
    }

    /// Renders the value for display, joining lists with `", "`.
    pub fn to_display_string(&self) -> String {
        match self {
            AttrValue::Scalar(value) => value.clone(),
            _ => self.values().join(", "),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Scalar(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Scalar(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(values: Vec<String>) -> Self {
        AttrValue::List(values)
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(values: Vec<&str>) -> Self {
        AttrValue::List(values.into_iter().map(str::to_string).collect())
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

/// An enumeration value.
///
/// # Examples
///
/// ```rust
/// use lookupcache::header::Header;
///
/// let mut header = Header::new("Country", "US", "United States");
/// header.add_to_attribute("lang", "en");
/// header.add_to_attribute("lang", "es");
///
/// assert_eq!(header.attribute("lang").unwrap().values(), vec!["en", "es"]);
/// assert_eq!(header.format("[i] ([a:lang])"), "US (en, es)");
/// ```
#[derive(Debug, Clone)]
pub struct Header {
    /// The enumeration type this value belongs to
    pub table_type: String,
    /// Identifier, unique within the table under its case-sensitivity rule
    pub id: String,
    /// Display text
    pub text: String,
    /// `false` for placeholders echoing unresolved user input
    pub is_valid: bool,
    /// Inactive values stay resolvable but should not be offered for selection
    pub is_active: bool,
    /// Format used by `Display`
    pub default_format: String,
    attributes: BTreeMap<String, AttrValue>,
}

impl Header {
    /// Create a valid, active header.
    ///
    /// # Arguments
    /// * `table_type` - The enumeration type
    /// * `id` - The value id
    /// * `text` - The display text
    pub fn new(table_type: &str, id: &str, text: &str) -> Self {
        Header {
            table_type: table_type.to_string(),
            id: id.to_string(),
            text: text.to_string(),
            is_valid: true,
            is_active: true,
            default_format: FIELD_TEXT.to_string(),
            attributes: BTreeMap::new(),
        }
    }

    /// Create a placeholder for input that did not resolve to a known value.
    ///
    /// The placeholder uses `id` as its text and has `is_valid` set to `false`.
    pub fn invalid(table_type: &str, id: &str) -> Self {
        Header {
            is_valid: false,
            ..Header::new(table_type, id, id)
        }
    }

    /// Returns the attribute `name`, if set.
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    /// Set the attribute `name`, replacing any previous value.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    /// Remove the attribute `name`, returning its previous value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<AttrValue> {
        self.attributes.remove(name)
    }

    /// Add a value to the attribute `name`.
    ///
    /// The first value is stored as a scalar; adding a different second value turns
    /// the attribute into a list. Values already present are not added again, and a
    /// group attribute is replaced by the new scalar.
    ///
    /// # Arguments
    /// * `name` - The attribute name
    /// * `value` - The value to add
    pub fn add_to_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.get_mut(name) {
            None | Some(AttrValue::Group(_)) => {
                self.attributes
                    .insert(name.to_string(), AttrValue::Scalar(value));
            }
            Some(AttrValue::Scalar(existing)) => {
                if *existing != value {
                    let first = std::mem::take(existing);
                    self.attributes
                        .insert(name.to_string(), AttrValue::List(vec![first, value]));
                }
            }
            Some(AttrValue::List(values)) => {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }
    }

    /// Names of all attributes, in sorted order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Number of attributes set on this header.
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// The sibling headers recorded for `format` when this header owns a
    /// duplicated index key.
    ///
    /// # Arguments
    /// * `format` - The index format the group was recorded for
    ///
    /// # Returns
    /// The siblings in source order, empty when the key was unique
    pub fn group(&self, format: &str) -> &[Header] {
        match self.attributes.get(&group_attribute(format)) {
            Some(AttrValue::Group(headers)) => headers,
            _ => &[],
        }
    }

    /// Render this header with a format template.
    ///
    /// See [`HeaderFormat`] for the template syntax.
    pub fn format(&self, format: &str) -> String {
        HeaderFormat::parse(format).render(self)
    }

    /// The format `Display` uses: `default_format`, or [`FIELD_TEXT`] when empty.
    pub fn display_format(&self) -> &str {
        if self.default_format.is_empty() {
            FIELD_TEXT
        } else {
            &self.default_format
        }
    }
}

/// Name of the attribute holding the duplicate-key group for `format`.
pub(crate) fn group_attribute(format: &str) -> String {
    format!("group:{format}")
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.table_type == other.table_type && self.id == other.id
    }
}

impl Eq for Header {}

impl Hash for Header {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table_type.hash(state);
        self.id.hash(state);
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(self.display_format()))
    }
}
