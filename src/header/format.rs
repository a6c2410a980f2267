//! Template formatting of headers.
//!
//! A format string mixes literal text with bracketed field tokens. Each token
//! is replaced by the matching part of a [`crate::header::Header`]:
//!
//! | Token      | Replaced with                                        |
//! |------------|------------------------------------------------------|
//! | `[i]`      | the header id                                        |
//! | `[t]`      | the header display text                              |
//! | `[a:name]` | the attribute `name`, list values joined with `", "` |
//! | `[d]`      | the header's own default format, rendered once       |
//!
//! Anything else, including unknown tokens and unterminated brackets, is copied
//! through literally. Missing attributes render as an empty string, so there is
//! no such thing as an invalid format.
//!
//! Formats are parsed once into a [`HeaderFormat`] and can then be rendered
//! against any number of headers, which is what index builds do.

use crate::header::Header;

/// Format rendering only the header id.
pub const FIELD_ID: &str = "[i]";
/// Format rendering only the header text.
pub const FIELD_TEXT: &str = "[t]";
/// Format rendering id and text, e.g. `"US - United States"`.
pub const FIELD_ID_TEXT: &str = "[i] - [t]";

/// Builds the format string that renders a single attribute.
///
/// # Arguments
/// * `name` - The attribute name
///
/// # Returns
/// A format such as `"[a:region]"`
pub fn attr_format(name: &str) -> String {
    format!("[a:{name}]")
}

/// One parsed piece of a format string.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Id,
    Text,
    Attr(String),
    Default,
}

/// A parsed, reusable header format.
///
/// # Examples
///
/// ```rust
/// use lookupcache::header::{Header, HeaderFormat};
///
/// let mut header = Header::new("Country", "US", "United States");
/// header.set_attribute("code", "840");
///
/// let format = HeaderFormat::parse("[i]-[a:code]");
/// assert_eq!(format.render(&header), "US-840");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFormat {
    source: String,
    segments: Vec<Segment>,
}

impl HeaderFormat {
    /// Parse a format string.
    ///
    /// Parsing never fails; unrecognised syntax becomes literal text.
    ///
    /// # Arguments
    /// * `format` - The template to parse
    pub fn parse(format: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = format;

        while let Some(open) = rest.find('[') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let Some(close) = after.find(']') else {
                // unterminated, keep the remainder as is
                literal.push_str(&rest[open..]);
                rest = "";
                break;
            };

            let token = &after[..close];
            let segment = match token {
                "i" => Some(Segment::Id),
                "t" => Some(Segment::Text),
                "d" => Some(Segment::Default),
                _ => token
                    .strip_prefix("a:")
                    .map(|name| Segment::Attr(name.to_string())),
            };

            match segment {
                Some(segment) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                }
                None => literal.push_str(&rest[open..open + close + 2]),
            }

            rest = &after[close + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        HeaderFormat {
            source: format.to_string(),
            segments,
        }
    }

    /// The format string this was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if the format contains no field tokens at all.
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)))
    }

    /// Render `header` with this format.
    ///
    /// # Arguments
    /// * `header` - The header to render
    ///
    /// # Returns
    /// The rendered string; blank fields for missing attributes
    pub fn render(&self, header: &Header) -> String {
        let mut out = String::new();
        self.render_into(header, &mut out, true);
        out
    }

    fn render_into(&self, header: &Header, out: &mut String, expand_default: bool) {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Id => out.push_str(&header.id),
                Segment::Text => out.push_str(&header.text),
                Segment::Attr(name) => {
                    if let Some(value) = header.attribute(name) {
                        out.push_str(&value.to_display_string());
                    }
                }
                Segment::Default => {
                    // one level only, a default format referencing [d] renders blank
                    if expand_default {
                        HeaderFormat::parse(header.display_format()).render_into(
                            header,
                            out,
                            false,
                        );
                    }
                }
            }
        }
    }
}

impl From<&str> for HeaderFormat {
    fn from(format: &str) -> Self {
        HeaderFormat::parse(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn country() -> Header {
        let mut header = Header::new("Country", "US", "United States");
        header.set_attribute("code", "840");
        header.add_to_attribute("lang", "en");
        header.add_to_attribute("lang", "es");
        header
    }

    #[test]
    fn test_builtin_formats() {
        let header = country();
        assert_eq!(HeaderFormat::parse(FIELD_ID).render(&header), "US");
        assert_eq!(HeaderFormat::parse(FIELD_TEXT).render(&header), "United States");
        assert_eq!(
            HeaderFormat::parse(FIELD_ID_TEXT).render(&header),
            "US - United States"
        );
        assert_eq!(
            HeaderFormat::parse(&attr_format("code")).render(&header),
            "840"
        );
    }

    #[test]
    fn test_mixed_template() {
        let header = country();
        let format = HeaderFormat::parse("[i]-[a:code] ([a:lang])");
        assert_eq!(format.render(&header), "US-840 (en, es)");
        assert!(!format.is_literal());
        assert_eq!(format.as_str(), "[i]-[a:code] ([a:lang])");
    }

    #[test]
    fn test_missing_attribute_renders_blank() {
        let header = country();
        assert_eq!(HeaderFormat::parse("<[a:missing]>").render(&header), "<>");
    }

    #[test]
    fn test_unknown_and_malformed_tokens_are_literal() {
        let header = country();
        assert_eq!(HeaderFormat::parse("[x]").render(&header), "[x]");
        assert_eq!(HeaderFormat::parse("[i] [oops").render(&header), "US [oops");
        assert_eq!(HeaderFormat::parse("plain").render(&header), "plain");
        assert!(HeaderFormat::parse("[zz]").is_literal());
        assert_eq!(HeaderFormat::parse("").render(&header), "");
    }

    #[test]
    fn test_default_token() {
        let mut header = country();
        header.default_format = "[i]/[d]".to_string();
        // the nested [d] does not expand again
        assert_eq!(HeaderFormat::parse("<[d]>").render(&header), "<US/>");

        header.default_format = FIELD_ID_TEXT.to_string();
        assert_eq!(
            HeaderFormat::parse("[d]").render(&header),
            "US - United States"
        );
    }
}
