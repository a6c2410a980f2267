//! Reference loader over a tag-based enumeration definition document.
//!
//! # Document format
//!
//! ```xml
//! <enums>
//!   <enum name="Country" format="[i] - [t]">
//!     <properties>
//!       <property name="region" default="EU"/>
//!       <property name="lang" multi-value="true"/>
//!     </properties>
//!     <item name="US" text="United States">
//!       <prop ref="region">NA</prop>
//!       <prop ref="lang">en</prop>
//!       <prop ref="lang">es</prop>
//!     </item>
//!     <item name="DE" text="Germany" active="false"/>
//!   </enum>
//! </enums>
//! ```
//!
//! - `enum@name` is the table type, `enum@format` the items' default format.
//! - `item@name` is the id, `item@text` the display text (defaults to the id),
//!   `item@active="false"` marks the value inactive.
//! - `prop` elements set attributes; repeating one accumulates values.
//! - Items that omit a property with a `default` receive the default, and
//!   `multi-value` properties are always exposed as lists.
//!
//! Unknown elements are ignored.

use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock},
};

use log::debug;
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use crate::{
    header::{AttrValue, Header},
    loader::{CacheLoader, LoadContext, LoaderBase},
    Result,
};

/// Parsed definitions: table type to headers in document order.
type Definitions = HashMap<String, Vec<Header>>;

enum XmlSource {
    Text(String),
    File(PathBuf),
}

/// A loader that reads every enumeration of a definition document.
///
/// The document is read and parsed once, on first use; the loader does not know
/// its table types before that and answers [`CacheLoader::supports`] with `true`
/// until then. A document that fails to parse is read again on the next load.
///
/// # Examples
///
/// ```rust
/// use lookupcache::{loader::XmlLoader, LookupCache};
/// use std::sync::Arc;
///
/// let loader = XmlLoader::from_xml(r#"
///     <enums>
///       <enum name="Status">
///         <item name="A" text="Active"/>
///         <item name="C" text="Closed" active="false"/>
///       </enum>
///     </enums>"#);
///
/// let cache = LookupCache::new("global", vec![Arc::new(loader)]);
/// let status = cache.get_table("Status")?.unwrap();
/// assert!(!status.lookup_by_id("C").unwrap().is_active);
/// # Ok::<(), lookupcache::Error>(())
/// ```
pub struct XmlLoader {
    base: LoaderBase,
    source: XmlSource,
    definitions: OnceLock<Definitions>,
    parse_lock: Mutex<()>,
}

impl XmlLoader {
    fn with_source(source: XmlSource, base: LoaderBase) -> Self {
        XmlLoader {
            base,
            source,
            definitions: OnceLock::new(),
            parse_lock: Mutex::new(()),
        }
    }

    /// Create a loader over an in-memory document.
    ///
    /// # Arguments
    /// * `xml` - The definition document
    /// * `base` - Case sensitivity and optional cache-type restriction
    pub fn new(xml: impl Into<String>, base: LoaderBase) -> Self {
        Self::with_source(XmlSource::Text(xml.into()), base)
    }

    /// Create a case-insensitive loader over an in-memory document.
    pub fn from_xml(xml: impl Into<String>) -> Self {
        Self::new(xml, LoaderBase::new(false))
    }

    /// Create a case-insensitive loader reading `path` on first use.
    ///
    /// The file is not touched before the first load.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self::file_with_base(path, LoaderBase::new(false))
    }

    /// Create a loader reading `path` on first use.
    pub fn file_with_base(path: impl AsRef<Path>, base: LoaderBase) -> Self {
        Self::with_source(XmlSource::File(path.as_ref().to_path_buf()), base)
    }

    /// The table types defined by the document, sorted.
    ///
    /// Parses the document if that has not happened yet.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be read, and
    /// [`crate::Error::Xml`] or [`crate::Error::Malformed`] if it does not parse.
    pub fn table_types(&self) -> Result<Vec<String>> {
        let mut types: Vec<String> = self.definitions()?.keys().cloned().collect();
        types.sort();
        Ok(types)
    }

    /// The loader configuration.
    pub fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn definitions(&self) -> Result<&Definitions> {
        if let Some(definitions) = self.definitions.get() {
            return Ok(definitions);
        }

        let _guard = lock!(self.parse_lock);
        if let Some(definitions) = self.definitions.get() {
            return Ok(definitions);
        }

        let parsed = match &self.source {
            XmlSource::Text(xml) => parse_definitions(xml)?,
            XmlSource::File(path) => parse_definitions(&fs::read_to_string(path)?)?,
        };
        debug!("Parsed {} enum definitions from {:?}", parsed.len(), self);

        self.base.publish_types(parsed.keys().cloned());
        Ok(self.definitions.get_or_init(|| parsed))
    }
}

impl CacheLoader for XmlLoader {
    fn supports(&self, cache_type: &str, table_type: &str) -> bool {
        self.base.supports(cache_type, table_type)
    }

    fn load(&self, ctx: &LoadContext<'_>) -> Result<()> {
        if let Some(headers) = self.definitions()?.get(ctx.table_type()) {
            ctx.store(self.base.table(ctx.table_type(), headers.clone()));
        }
        Ok(())
    }
}

impl fmt::Debug for XmlLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            XmlSource::Text(xml) => write!(f, "XmlLoader(<{} bytes>)", xml.len()),
            XmlSource::File(path) => write!(f, "XmlLoader({})", path.display()),
        }
    }
}

/// A `<property>` declaration of an enum.
struct PropertyDef {
    name: String,
    default: Option<String>,
    multi_value: bool,
}

/// An `<enum>` under construction.
struct EnumDef {
    name: String,
    format: Option<String>,
    properties: Vec<PropertyDef>,
    items: Vec<Header>,
}

impl EnumDef {
    fn finish_item(&mut self, mut item: Header) {
        for property in &self.properties {
            if let Some(default) = &property.default {
                if item.attribute(&property.name).is_none() {
                    item.set_attribute(&property.name, default.as_str());
                }
            }

            if property.multi_value {
                if let Some(AttrValue::Scalar(value)) = item.attribute(&property.name) {
                    let list = vec![value.clone()];
                    item.set_attribute(&property.name, list);
                }
            }
        }
        self.items.push(item);
    }
}

/// Parser state while walking the document.
#[derive(Default)]
struct DefinitionParser {
    definitions: Definitions,
    current_enum: Option<EnumDef>,
    current_item: Option<Header>,
    /// Open `<prop>`: attribute name and collected text
    current_prop: Option<(String, String)>,
}

impl DefinitionParser {
    fn start(&mut self, element: &BytesStart<'_>, empty: bool) -> Result<()> {
        match element.local_name().as_ref() {
            b"enum" => {
                if self.current_enum.is_some() {
                    return Err(malformed_error!("Nested <enum> elements are not allowed"));
                }
                let name = required_attr(element, "enum", "name")?;
                if self.definitions.contains_key(&name) {
                    return Err(malformed_error!("Duplicate definition of enum '{}'", name));
                }
                self.current_enum = Some(EnumDef {
                    name,
                    format: optional_attr(element, "format")?,
                    properties: Vec::new(),
                    items: Vec::new(),
                });
                if empty {
                    self.end_enum();
                }
            }
            b"property" => {
                let Some(current) = self.current_enum.as_mut() else {
                    return Err(malformed_error!("<property> outside of an <enum>"));
                };
                current.properties.push(PropertyDef {
                    name: required_attr(element, "property", "name")?,
                    default: optional_attr(element, "default")?,
                    multi_value: optional_attr(element, "multi-value")?
                        .is_some_and(|v| v.eq_ignore_ascii_case("true")),
                });
            }
            b"item" => {
                let Some(current) = self.current_enum.as_ref() else {
                    return Err(malformed_error!("<item> outside of an <enum>"));
                };
                let id = required_attr(element, "item", "name")?;
                let text = optional_attr(element, "text")?.unwrap_or_else(|| id.clone());

                let mut item = Header::new(&current.name, &id, &text);
                item.is_active = !optional_attr(element, "active")?
                    .is_some_and(|v| v.eq_ignore_ascii_case("false"));
                if let Some(format) = &current.format {
                    item.default_format.clone_from(format);
                }

                if empty {
                    self.finish_item(item);
                } else {
                    self.current_item = Some(item);
                }
            }
            b"prop" => {
                if self.current_item.is_none() {
                    return Err(malformed_error!("<prop> outside of an <item>"));
                }
                let name = required_attr(element, "prop", "ref")?;
                if empty {
                    self.add_prop_value(&name, "");
                } else {
                    self.current_prop = Some((name, String::new()));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"enum" => self.end_enum(),
            b"item" => {
                if let Some(item) = self.current_item.take() {
                    self.finish_item(item);
                }
            }
            b"prop" => {
                if let Some((name, value)) = self.current_prop.take() {
                    self.add_prop_value(&name, value.trim());
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some((_, value)) = self.current_prop.as_mut() {
            value.push_str(text);
        }
    }

    fn add_prop_value(&mut self, name: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        if let Some(item) = self.current_item.as_mut() {
            item.add_to_attribute(name, value);
        }
    }

    fn finish_item(&mut self, item: Header) {
        if let Some(current) = self.current_enum.as_mut() {
            current.finish_item(item);
        }
    }

    fn end_enum(&mut self) {
        if let Some(current) = self.current_enum.take() {
            self.definitions.insert(current.name, current.items);
        }
    }

    fn finish(self) -> Result<Definitions> {
        if let Some(current) = self.current_enum {
            return Err(malformed_error!("Unterminated <enum name=\"{}\">", current.name));
        }
        Ok(self.definitions)
    }
}

/// Parse a definition document into headers per table type.
pub(crate) fn parse_definitions(xml: &str) -> Result<Definitions> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut parser = DefinitionParser::default();
    loop {
        match reader.read_event()? {
            Event::Start(element) => parser.start(&element, false)?,
            Event::Empty(element) => parser.start(&element, true)?,
            Event::End(element) => parser.end(element.local_name().as_ref()),
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| malformed_error!("Invalid text content - {}", e))?;
                parser.text(&text);
            }
            Event::CData(data) => parser.text(&String::from_utf8_lossy(&data)),
            Event::Eof => break,
            _ => {}
        }
    }

    parser.finish()
}

fn optional_attr(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| malformed_error!("Invalid attribute - {}", e))?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| malformed_error!("Invalid value for '{}' - {}", name, e))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn required_attr(element: &BytesStart<'_>, tag: &str, name: &str) -> Result<String> {
    optional_attr(element, name)?
        .ok_or_else(|| malformed_error!("<{}> is missing the '{}' attribute", tag, name))
}
