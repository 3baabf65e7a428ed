//! Field metadata: the loosely typed form attached to a declaration and
//! the normalized, per-layer form the engines consume.

use std::collections::BTreeMap;

use crate::error::{BundleError, BundleResult};
use crate::hint::{Hint, NamingFn};
use crate::record::HintScope;

pub const NAME_KEY: &str = "name";
pub const EXTENSION_KEY: &str = "extension";
pub const PREFIX_KEY: &str = "prefix";

/// The structural role a metadata record applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Directory,
    File,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Directory => "Dir",
            Layer::File => "File",
        }
    }
}

/// Key of a raw metadata entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetaKey {
    /// Entry scoped to one layer.
    Layer(Layer),
    /// Plain entry (`name`, `extension`, `prefix` or a passthrough key).
    Key(String),
}

impl From<&str> for MetaKey {
    fn from(key: &str) -> Self {
        match key {
            "Dir" => MetaKey::Layer(Layer::Directory),
            "File" => MetaKey::Layer(Layer::File),
            other => MetaKey::Key(other.to_string()),
        }
    }
}

impl From<Layer> for MetaKey {
    fn from(layer: Layer) -> Self {
        MetaKey::Layer(layer)
    }
}

/// Loosely typed metadata value, as declared.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Text(String),
    /// Passthrough data (flags, numbers, objects).
    Json(serde_json::Value),
    Hint(Hint),
    Callable(NamingFn),
    /// A `(value, source)` pair; any other length is rejected.
    Tuple(Vec<RawValue>),
    Map(RawMetadata),
    Seq(Vec<RawValue>),
}

impl RawValue {
    pub fn pair(value: impl Into<RawValue>, source: &str) -> Self {
        RawValue::Tuple(vec![value.into(), RawValue::Text(source.to_string())])
    }

    pub fn callable<F>(func: F) -> Self
    where
        F: Fn(HintScope<'_>, Option<usize>) -> String + Send + Sync + 'static,
    {
        RawValue::Callable(NamingFn::new(func))
    }

    /// Truthiness of a passthrough flag.
    pub fn is_truthy(&self) -> bool {
        match self {
            RawValue::Null => false,
            RawValue::Text(text) => !text.is_empty(),
            RawValue::Json(json) => match json {
                serde_json::Value::Null => false,
                serde_json::Value::Bool(flag) => *flag,
                serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
                serde_json::Value::String(s) => !s.is_empty(),
                serde_json::Value::Array(a) => !a.is_empty(),
                serde_json::Value::Object(o) => !o.is_empty(),
            },
            RawValue::Tuple(items) | RawValue::Seq(items) => !items.is_empty(),
            RawValue::Map(map) => !map.is_empty(),
            RawValue::Hint(_) | RawValue::Callable(_) => true,
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Json(value.into())
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        RawValue::Json(value)
    }
}

impl From<Hint> for RawValue {
    fn from(value: Hint) -> Self {
        RawValue::Hint(value)
    }
}

impl From<NamingFn> for RawValue {
    fn from(value: NamingFn) -> Self {
        RawValue::Callable(value)
    }
}

impl From<RawMetadata> for RawValue {
    fn from(value: RawMetadata) -> Self {
        RawValue::Map(value)
    }
}

impl From<Vec<RawMetadata>> for RawValue {
    fn from(values: Vec<RawMetadata>) -> Self {
        RawValue::Seq(values.into_iter().map(RawValue::Map).collect())
    }
}

/// Metadata attached to a field declaration: ordered `(key, value)`
/// entries, duplicates preserved so that ambiguous layer assignments can
/// be reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetadata {
    entries: Vec<(MetaKey, RawValue)>,
}

impl RawMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(self, value: impl Into<RawValue>) -> Self {
        self.with(NAME_KEY, value)
    }

    pub fn extension(self, value: impl Into<RawValue>) -> Self {
        self.with(EXTENSION_KEY, value)
    }

    pub fn prefix(self, value: impl Into<RawValue>) -> Self {
        self.with(PREFIX_KEY, value)
    }

    /// Adds metadata scoped to `layer`: a single map or a sequence of maps.
    pub fn layer(self, layer: Layer, value: impl Into<RawValue>) -> Self {
        self.with(layer, value)
    }

    pub fn with(mut self, key: impl Into<MetaKey>, value: impl Into<RawValue>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(MetaKey, RawValue)] {
        &self.entries
    }
}

/// Normalized configuration for one layer of a field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerData {
    pub name: Option<Hint>,
    pub prefix: Option<Hint>,
    pub extension: Option<String>,
    /// Keys the engines do not interpret, passed through unchanged.
    pub extra: BTreeMap<String, RawValue>,
}

impl LayerData {
    pub fn extra(&self, key: &str) -> Option<&RawValue> {
        self.extra.get(key)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.extra.get(key).is_some_and(RawValue::is_truthy)
    }
}

/// Normalized metadata targeting one layer. `index` is the position in
/// a layer-scoped sequence and 0 otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleMetadata {
    pub layer: Layer,
    pub index: usize,
    pub data: LayerData,
}

/// Strips one leading `.` and rejects empty results.
pub fn normalize_extension(raw: &str) -> BundleResult<String> {
    let trimmed = raw.trim();
    let ext = trimmed.strip_prefix('.').unwrap_or(trimmed);
    if ext.is_empty() {
        return Err(BundleError::metadata("extension values cannot be empty"));
    }
    Ok(ext.to_string())
}

/// Normalizes `raw` for a field whose top-level wrapper is `root_layer`.
///
/// Plain entries become one record for `root_layer` at index 0, followed
/// by layer-scoped entries in declaration order. If `inferred_extension`
/// is given and no record carries an extension, it is merged into the
/// File record at index 0 (created if needed).
pub fn normalize_metadata(
    root_layer: Layer,
    raw: &RawMetadata,
    inferred_extension: Option<&str>,
) -> BundleResult<Vec<BundleMetadata>> {
    let mut plain: Vec<(&str, &RawValue)> = Vec::new();
    let mut scoped: Vec<(Layer, &RawValue)> = Vec::new();
    for (key, value) in raw.entries() {
        match key {
            MetaKey::Layer(layer) => {
                if scoped.iter().any(|(seen, _)| seen == layer) {
                    return Err(BundleError::metadata(format!(
                        "duplicate metadata assignment for layer {}; use a sequence of mappings instead",
                        layer.as_str()
                    )));
                }
                scoped.push((*layer, value));
            }
            MetaKey::Key(key) => {
                plain.retain(|(seen, _)| *seen != key.as_str());
                plain.push((key.as_str(), value));
            }
        }
    }

    let mut normalized = Vec::new();
    if !plain.is_empty() {
        normalized.push(BundleMetadata {
            layer: root_layer,
            index: 0,
            data: normalize_layer(plain.into_iter())?,
        });
    }
    for (layer, value) in scoped {
        expand_layer(layer, value, &mut normalized)?;
    }

    for (pos, meta) in normalized.iter().enumerate() {
        if normalized[..pos]
            .iter()
            .any(|prev| prev.layer == meta.layer && prev.index == meta.index)
        {
            return Err(BundleError::metadata(format!(
                "metadata for layer {} at index {} is assigned more than once",
                meta.layer.as_str(),
                meta.index
            )));
        }
    }

    if let Some(ext) = inferred_extension {
        attach_extension(&mut normalized, normalize_extension(ext)?);
    }
    Ok(normalized)
}

fn expand_layer(
    layer: Layer,
    value: &RawValue,
    out: &mut Vec<BundleMetadata>,
) -> BundleResult<()> {
    match value {
        RawValue::Map(map) => {
            out.push(BundleMetadata {
                layer,
                index: 0,
                data: normalize_map(map)?,
            });
            Ok(())
        }
        RawValue::Seq(items) => {
            for (index, item) in items.iter().enumerate() {
                let RawValue::Map(map) = item else {
                    return Err(BundleError::metadata(format!(
                        "layer metadata for {} must be mappings",
                        layer.as_str()
                    )));
                };
                out.push(BundleMetadata {
                    layer,
                    index,
                    data: normalize_map(map)?,
                });
            }
            Ok(())
        }
        _ => Err(BundleError::metadata(format!(
            "layer metadata for {} must be a mapping or sequence of mappings",
            layer.as_str()
        ))),
    }
}

fn normalize_map(map: &RawMetadata) -> BundleResult<LayerData> {
    let mut entries: Vec<(&str, &RawValue)> = Vec::new();
    for (key, value) in map.entries() {
        let key = match key {
            MetaKey::Key(key) => key.as_str(),
            MetaKey::Layer(layer) => layer.as_str(),
        };
        entries.retain(|(seen, _)| *seen != key);
        entries.push((key, value));
    }
    normalize_layer(entries.into_iter())
}

fn normalize_layer<'a>(
    entries: impl Iterator<Item = (&'a str, &'a RawValue)>,
) -> BundleResult<LayerData> {
    let mut data = LayerData::default();
    for (key, value) in entries {
        match key {
            NAME_KEY => data.name = Hint::normalize(NAME_KEY, value)?,
            PREFIX_KEY => data.prefix = Hint::normalize(PREFIX_KEY, value)?,
            EXTENSION_KEY => match value {
                RawValue::Text(text) => data.extension = Some(normalize_extension(text)?),
                _ => {
                    return Err(BundleError::metadata("extension values must be text"));
                }
            },
            other => {
                data.extra.insert(other.to_string(), value.clone());
            }
        }
    }
    Ok(data)
}

fn attach_extension(metadata: &mut Vec<BundleMetadata>, ext: String) {
    if metadata
        .iter()
        .any(|meta| meta.layer == Layer::File && meta.data.extension.is_some())
    {
        return;
    }
    match metadata
        .iter_mut()
        .find(|meta| meta.layer == Layer::File && meta.index == 0)
    {
        Some(meta) => meta.data.extension = Some(ext),
        None => metadata.insert(
            0,
            BundleMetadata {
                layer: Layer::File,
                index: 0,
                data: LayerData {
                    extension: Some(ext),
                    ..LayerData::default()
                },
            },
        ),
    }
}

/// Layer data for `layer` at sequence position `position`, falling back
/// to position 0.
pub fn layer_data(metadata: &[BundleMetadata], layer: Layer, position: usize) -> Option<&LayerData> {
    let at = |index: usize| {
        metadata
            .iter()
            .find(|meta| meta.layer == layer && meta.index == index)
            .map(|meta| &meta.data)
    };
    at(position).or_else(|| at(0))
}
