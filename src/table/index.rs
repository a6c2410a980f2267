//! Per-format key indexes over a table's headers.

use std::{borrow::Cow, collections::HashMap};

use crate::header::{Header, HeaderFormat};

/// Normalise a key according to the table's case-sensitivity rule.
pub(crate) fn normalize_key(key: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive {
        Cow::Borrowed(key)
    } else {
        Cow::Owned(key.to_lowercase())
    }
}

/// Index of one format: rendered key to the positions of the headers producing it.
///
/// Positions are kept in source order, so the first entry of every key is the
/// header that owns it and any further entries form its group.
#[derive(Debug, Default)]
pub(crate) struct FormatIndex {
    keys: HashMap<String, Vec<usize>>,
}

impl FormatIndex {
    /// Build the index for `format` over `data`.
    ///
    /// # Arguments
    /// * `format` - The format every header is rendered with
    /// * `data` - The table's headers in source order
    /// * `case_sensitive` - Whether keys keep their case
    pub(crate) fn build(format: &str, data: &[Header], case_sensitive: bool) -> Self {
        let format = HeaderFormat::parse(format);
        let mut keys: HashMap<String, Vec<usize>> = HashMap::with_capacity(data.len());

        for (position, header) in data.iter().enumerate() {
            let rendered = format.render(header);
            let key = normalize_key(&rendered, case_sensitive).into_owned();
            keys.entry(key).or_default().push(position);
        }

        FormatIndex { keys }
    }

    /// Positions of the headers rendering to `key`, owner first.
    ///
    /// `key` must already be normalised.
    pub(crate) fn positions(&self, key: &str) -> Option<&[usize]> {
        self.keys.get(key).map(Vec::as_slice)
    }

    /// Number of distinct keys.
    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    /// Number of keys shared by more than one header.
    pub(crate) fn duplicate_keys(&self) -> usize {
        self.keys.values().filter(|p| p.len() > 1).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FIELD_ID;

    #[test]
    fn test_build_groups_in_source_order() {
        let data = vec![
            Header::new("T", "1", "A"),
            Header::new("T", "2", "B"),
            Header::new("T", "1", "C"),
            Header::new("T", "1", "D"),
        ];

        let index = FormatIndex::build(FIELD_ID, &data, true);
        assert_eq!(index.len(), 2);
        assert_eq!(index.duplicate_keys(), 1);
        assert_eq!(index.positions("1"), Some(&[0, 2, 3][..]));
        assert_eq!(index.positions("2"), Some(&[1][..]));
        assert_eq!(index.positions("3"), None);
    }

    #[test]
    fn test_case_insensitive_keys() {
        let data = vec![Header::new("T", "abc", "x"), Header::new("T", "ABC", "y")];

        let index = FormatIndex::build(FIELD_ID, &data, false);
        assert_eq!(index.len(), 1);
        assert_eq!(index.positions("abc"), Some(&[0, 1][..]));

        let index = FormatIndex::build(FIELD_ID, &data, true);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("AbC", true), "AbC");
        assert_eq!(normalize_key("AbC", false), "abc");
    }
}
