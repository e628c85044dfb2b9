//! # Configuration File Loading
//!
//! Sources for the supported file formats plus in-memory sources.
//!
//! Formats: YAML, JSON, TOML, INI, XML and Java-style properties. The
//! format of a [`FileSource`] is either given explicitly or detected from
//! the file extension.

use crate::loader::ConfigSource;
use crate::value::Value;
use errors::{ConfigurationError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
    Toml,
    Ini,
    Xml,
    Properties,
}

impl Format {
    /// Detect the format from the file extension.
    ///
    /// ## Errors
    /// `Unsupported` when the file has no extension or an unknown one.
    pub fn from_path(path: &Path) -> Result<Self> {
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            return Err(ConfigurationError::Unsupported {
                capability: format!("config file without extension: {}", path.display()),
            }
            .into());
        };

        match extension.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            "ini" | "cfg" => Ok(Self::Ini),
            "xml" => Ok(Self::Xml),
            "properties" => Ok(Self::Properties),
            other => Err(ConfigurationError::Unsupported {
                capability: format!("config file format: {other}"),
            }
            .into()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Json => "JSON",
            Self::Toml => "TOML",
            Self::Ini => "INI",
            Self::Xml => "XML",
            Self::Properties => "properties",
        }
    }
}

fn parse_error(format: Format, source_name: &str, reason: impl ToString) -> errors::StaticConfError {
    ConfigurationError::Parse {
        format: format.name().to_string(),
        source_name: source_name.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

fn invalid_line(format: Format, source_name: &str, line: &str) -> errors::StaticConfError {
    ConfigurationError::InvalidLine {
        format: format.name().to_string(),
        source_name: source_name.to_string(),
        line: line.to_string(),
    }
    .into()
}

/// A configuration file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    path: PathBuf,
    format: Format,
    xml_safe: bool,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>, format: Format) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format,
            xml_safe: false,
        }
    }

    pub fn yaml(path: impl AsRef<Path>) -> Self {
        Self::new(path, Format::Yaml)
    }

    pub fn json(path: impl AsRef<Path>) -> Self {
        Self::new(path, Format::Json)
    }

    pub fn toml(path: impl AsRef<Path>) -> Self {
        Self::new(path, Format::Toml)
    }

    pub fn ini(path: impl AsRef<Path>) -> Self {
        Self::new(path, Format::Ini)
    }

    pub fn xml(path: impl AsRef<Path>, safe: bool) -> Self {
        Self {
            xml_safe: safe,
            ..Self::new(path, Format::Xml)
        }
    }

    pub fn properties(path: impl AsRef<Path>) -> Self {
        Self::new(path, Format::Properties)
    }

    /// Source with the format taken from the extension.
    pub fn detect(path: impl AsRef<Path>) -> Result<Self> {
        let format = Format::from_path(path.as_ref())?;
        Ok(Self::new(path, format))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.format
    }

    fn read_text(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|e| {
            let source_name = self.path.display().to_string();
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigurationError::SourceNotFound { source_name }.into()
            } else {
                ConfigurationError::Io {
                    source_name,
                    reason: e.to_string(),
                }
                .into()
            }
        })
    }
}

impl ConfigSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<Value> {
        let text = self.read_text()?;
        let name = self.describe();
        match self.format {
            Format::Yaml => parse_yaml(&text, &name),
            Format::Json => parse_json(&text, &name),
            Format::Toml => parse_toml(&text, &name),
            Format::Ini => parse_ini(&text, &name),
            Format::Xml => parse_xml(&text, &name, self.xml_safe),
            Format::Properties => parse_properties(&text, &name),
        }
    }
}

/// An empty document is an empty mapping.
pub fn parse_yaml(text: &str, source_name: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::empty_map());
    }
    let doc: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| parse_error(Format::Yaml, source_name, e))?;
    Ok(doc.into())
}

pub fn parse_json(text: &str, source_name: &str) -> Result<Value> {
    let doc: serde_json::Value =
        serde_json::from_str(text).map_err(|e| parse_error(Format::Json, source_name, e))?;
    Ok(doc.into())
}

pub fn parse_toml(text: &str, source_name: &str) -> Result<Value> {
    let table: toml::Table =
        toml::from_str(text).map_err(|e| parse_error(Format::Toml, source_name, e))?;
    Ok(toml::Value::Table(table).into())
}

const INI_DEFAULT_SECTION: &str = "DEFAULT";

/// Parse INI text into `section.key` entries.
///
/// Keys are lowercased. Entries of the `DEFAULT` section are inherited by
/// every other section and are not loaded on their own. Lines indented
/// under an entry continue its value.
pub fn parse_ini(text: &str, source_name: &str) -> Result<Value> {
    let mut defaults: BTreeMap<String, String> = BTreeMap::new();
    let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    let mut current: Option<String> = None;
    let mut last_key: Option<String> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if raw.starts_with(char::is_whitespace) {
            if let (Some(section), Some(key)) = (&current, &last_key) {
                let entries = if section == INI_DEFAULT_SECTION {
                    &mut defaults
                } else {
                    sections.entry(section.clone()).or_default()
                };
                if let Some(value) = entries.get_mut(key) {
                    value.push('\n');
                    value.push_str(line);
                    continue;
                }
            }
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            if name != INI_DEFAULT_SECTION {
                sections.entry(name.clone()).or_default();
            }
            current = Some(name);
            last_key = None;
            continue;
        }

        let Some(section) = &current else {
            return Err(invalid_line(Format::Ini, source_name, line));
        };
        let Some((key, value)) = line.split_once(['=', ':']) else {
            return Err(invalid_line(Format::Ini, source_name, line));
        };

        let key = key.trim().to_lowercase();
        let entries = if section == INI_DEFAULT_SECTION {
            &mut defaults
        } else {
            sections.entry(section.clone()).or_default()
        };
        entries.insert(key.clone(), value.trim().to_string());
        last_key = Some(key);
    }

    let mut flat = BTreeMap::new();
    for (section, entries) in sections {
        let mut merged = defaults.clone();
        merged.extend(entries);
        for (key, value) in merged {
            flat.insert(utils::join_key(&section, &key), Value::String(value));
        }
    }
    Ok(Value::Map(flat))
}

/// Parse `key=value` or `key: value` lines. `#` starts a comment line; any
/// other line without a separator is an error.
pub fn parse_properties(text: &str, source_name: &str) -> Result<Value> {
    let mut entries = BTreeMap::new();
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once(['=', ':'])
            .ok_or_else(|| invalid_line(Format::Properties, source_name, line))?;
        entries.insert(key.trim().to_string(), Value::from(value.trim()));
    }
    Ok(Value::Map(entries))
}

struct XmlElement {
    tag: String,
    attributes: BTreeMap<String, Value>,
    children: BTreeMap<String, Value>,
    text: String,
    has_children: bool,
}

impl XmlElement {
    fn start(start: &BytesStart<'_>, source_name: &str) -> Result<Self> {
        let mut attributes = BTreeMap::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| parse_error(Format::Xml, source_name, e))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| parse_error(Format::Xml, source_name, e))?;
            attributes.insert(key, Value::from(value.into_owned()));
        }
        Ok(Self {
            tag: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            children: BTreeMap::new(),
            text: String::new(),
            has_children: false,
        })
    }

    /// Attributes, then child elements, then the element text as `value`.
    fn finish(self, source_name: &str, safe: bool) -> Result<(String, BTreeMap<String, Value>)> {
        let Self {
            tag,
            mut attributes,
            children,
            text,
            ..
        } = self;

        if safe {
            let shared: Vec<String> = children
                .keys()
                .filter(|k| attributes.contains_key(*k))
                .cloned()
                .collect();
            if !shared.is_empty() {
                return Err(ConfigurationError::DuplicateKeys {
                    namespace: source_name.to_string(),
                    keys: shared,
                }
                .into());
            }
        }
        attributes.extend(children);

        if !text.is_empty() {
            if safe && attributes.contains_key("value") {
                return Err(ConfigurationError::AmbiguousValue {
                    source_name: source_name.to_string(),
                    tag,
                }
                .into());
            }
            attributes.insert("value".to_string(), Value::String(text));
        }
        Ok((tag, attributes))
    }
}

/// Parse an XML document. The root element becomes the top-level mapping.
/// Whitespace-only text is ignored, and only the text before the first
/// child element counts as the element's `value`.
pub fn parse_xml(text: &str, source_name: &str, safe: bool) -> Result<Value> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<BTreeMap<String, Value>> = None;

    let mut close = |element: XmlElement, stack: &mut Vec<XmlElement>| -> Result<()> {
        let (tag, items) = element.finish(source_name, safe)?;
        match stack.last_mut() {
            Some(parent) => {
                parent.children.insert(tag, Value::Map(items));
            }
            None => root = Some(items),
        }
        Ok(())
    };

    loop {
        match reader
            .read_event()
            .map_err(|e| parse_error(Format::Xml, source_name, e))?
        {
            Event::Start(start) => {
                if let Some(parent) = stack.last_mut() {
                    parent.has_children = true;
                }
                stack.push(XmlElement::start(&start, source_name)?);
            }
            Event::Empty(start) => {
                if let Some(parent) = stack.last_mut() {
                    parent.has_children = true;
                }
                let element = XmlElement::start(&start, source_name)?;
                close(element, &mut stack)?;
            }
            Event::Text(content) => {
                if let Some(element) = stack.last_mut().filter(|e| !e.has_children) {
                    let unescaped = content
                        .unescape()
                        .map_err(|e| parse_error(Format::Xml, source_name, e))?;
                    element.text.push_str(&unescaped);
                }
            }
            Event::CData(content) => {
                if let Some(element) = stack.last_mut().filter(|e| !e.has_children) {
                    element
                        .text
                        .push_str(&String::from_utf8_lossy(&content.into_inner()));
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| parse_error(Format::Xml, source_name, "unbalanced end tag"))?;
                close(element, &mut stack)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(parse_error(Format::Xml, source_name, "unclosed element"));
    }
    Ok(root.map_or_else(Value::empty_map, Value::Map))
}

/// `key=value` strings held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSource {
    items: Vec<String>,
}

impl ListSource {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

impl ConfigSource for ListSource {
    fn describe(&self) -> String {
        "list".to_string()
    }

    fn read(&self) -> Result<Value> {
        let mut entries = BTreeMap::new();
        for item in &self.items {
            let (key, value) = item.split_once('=').ok_or_else(|| {
                ConfigurationError::InvalidLine {
                    format: "list".to_string(),
                    source_name: self.describe(),
                    line: item.clone(),
                }
            })?;
            entries.insert(key.to_string(), Value::from(value));
        }
        Ok(Value::Map(entries))
    }
}

/// An in-memory document.
#[derive(Debug, Clone, PartialEq)]
pub struct DictSource {
    data: Value,
}

impl DictSource {
    pub fn new(data: impl Into<Value>) -> Self {
        Self { data: data.into() }
    }
}

impl ConfigSource for DictSource {
    fn describe(&self) -> String {
        "dict".to_string()
    }

    fn read(&self) -> Result<Value> {
        Ok(self.data.clone())
    }
}

/// The serialized form of any `Serialize` value.
#[derive(Debug)]
pub struct ObjectSource<'a, T> {
    object: &'a T,
}

impl<'a, T> ObjectSource<'a, T> {
    pub fn new(object: &'a T) -> Self {
        Self { object }
    }
}

impl<T: Serialize + Sync> ConfigSource for ObjectSource<'_, T> {
    fn describe(&self) -> String {
        std::any::type_name::<T>().to_string()
    }

    fn read(&self) -> Result<Value> {
        let json = serde_json::to_value(self.object).map_err(|e| ConfigurationError::Parse {
            format: "object".to_string(),
            source_name: self.describe(),
            reason: e.to_string(),
        })?;
        Ok(json.into())
    }
}

/// File names tried by [`AutoSource`], in order.
pub const AUTO_CONFIGURATIONS: &[(&str, Format)] = &[
    ("config.yaml", Format::Yaml),
    ("config.json", Format::Json),
    ("config.ini", Format::Ini),
    ("config.xml", Format::Xml),
    ("config.properties", Format::Properties),
];

/// The first well-known configuration file found in a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSource {
    base_dir: PathBuf,
}

impl AutoSource {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// The file that would be loaded, if any.
    pub fn resolve(&self) -> Option<FileSource> {
        AUTO_CONFIGURATIONS.iter().find_map(|(name, format)| {
            let path = self.base_dir.join(name);
            path.is_file().then(|| FileSource::new(path, *format))
        })
    }
}

impl ConfigSource for AutoSource {
    fn describe(&self) -> String {
        self.resolve()
            .map_or_else(|| self.base_dir.display().to_string(), |f| f.describe())
    }

    fn read(&self) -> Result<Value> {
        match self.resolve() {
            Some(source) => source.read(),
            None => Err(ConfigurationError::NoConfigurationFound {
                base_dir: self.base_dir.display().to_string(),
            }
            .into()),
        }
    }
}
