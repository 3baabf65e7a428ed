use bytes::Bytes;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::definition::{BundleDefinition, BundleField, BundleType};
use crate::error::{BundleError, BundleResult};

/// Instance data carried by a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    /// Text, written verbatim.
    Text(String),
    /// Raw bytes, written verbatim.
    Bytes(Bytes),
    /// Any JSON value; encoded according to the file extension.
    Json(serde_json::Value),
    /// A nested record (Directory fields).
    Record(Box<Record>),
    /// A sequence: records for collection Directory fields, JSON rows for
    /// `jsonl` files.
    List(Vec<Value>),
    /// A path to an existing file, used by copy-by-reference payloads.
    Path(PathBuf),
}

impl Value {
    /// Only [`Value::Null`] counts; a JSON `null` is a real payload.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            Value::Json(serde_json::Value::String(text)) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(json) => Some(json),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
            Value::Record(_) => "record",
            Value::List(_) => "list",
            Value::Path(_) => "path",
        }
    }

    /// Text form used when the value is substituted into a name.
    pub fn to_name_text(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Text(text) => text.clone(),
            Value::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Value::Json(json) => json_name_text(json),
            Value::Record(record) => record.type_name().to_string(),
            Value::List(items) => items
                .iter()
                .map(Value::to_name_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Path(path) => path.display().to_string(),
        }
    }
}

fn json_name_text(json: &serde_json::Value) -> String {
    match json {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Value::Bytes(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Json(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Json(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Json(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Json(value.into())
    }
}

impl From<PathBuf> for Value {
    fn from(value: PathBuf) -> Self {
        Value::Path(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(Box::new(value))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// An instance of a bundle type.
///
/// Values are stored by field name and always visited in the
/// definition's declaration order. Records are never mutated by the
/// engines.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    definition: Arc<BundleDefinition>,
    values: BTreeMap<String, Value>,
    annotations: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Record {
    pub fn builder(definition: Arc<BundleDefinition>) -> RecordBuilder {
        RecordBuilder {
            record: Record {
                definition,
                values: BTreeMap::new(),
                annotations: None,
            },
            unknown: Vec::new(),
        }
    }

    /// Starts a record of the statically declared type `T`.
    pub fn of<T: BundleType>() -> BundleResult<RecordBuilder> {
        Ok(Self::builder(T::definition()?))
    }

    pub fn definition(&self) -> &Arc<BundleDefinition> {
        &self.definition
    }

    pub fn type_name(&self) -> &str {
        self.definition.name()
    }

    /// Value of `field`, or `None` when it was never set.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Every declared field paired with its value, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&BundleField, Option<&Value>)> {
        self.definition
            .fields()
            .iter()
            .map(|field| (field, self.values.get(&field.name)))
    }

    /// Instance-level annotations attached at construction time.
    pub fn annotations(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.annotations.as_ref()
    }

    /// Convenience lookup of a nested record.
    pub fn child(&self, field: &str) -> Option<&Record> {
        self.get(field).and_then(Value::as_record)
    }
}

/// Builder returned by [`Record::builder`] and [`Record::of`].
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
    unknown: Vec<String>,
}

impl RecordBuilder {
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        if self.record.definition.field(field).is_none() {
            self.unknown.push(field.to_string());
        } else {
            self.record.values.insert(field.to_string(), value.into());
        }
        self
    }

    pub fn annotations(mut self, annotations: serde_json::Map<String, serde_json::Value>) -> Self {
        self.record.annotations = Some(annotations);
        self
    }

    pub fn build(self) -> BundleResult<Record> {
        if let Some(field) = self.unknown.first() {
            return Err(BundleError::render(format!(
                "'{}' has no field named '{}'",
                self.record.type_name(),
                field
            )));
        }
        Ok(self.record)
    }
}

/// The object a hint is resolved against: either a record, whose fields
/// are its visible attributes, or a plain value. A JSON object exposes
/// its own key/value pairs; other values expose nothing.
#[derive(Debug, Clone, Copy)]
pub enum HintScope<'a> {
    Record(&'a Record),
    Value(&'a Value),
}

impl<'a> HintScope<'a> {
    pub fn from_value(value: &'a Value) -> Self {
        match value {
            Value::Record(record) => HintScope::Record(record),
            other => HintScope::Value(other),
        }
    }

    /// Text form of the attribute `key`, or `None` if the scope has no
    /// such attribute. Unset and null record fields count as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        match self {
            HintScope::Record(record) => record
                .get(key)
                .filter(|value| !value.is_null())
                .map(Value::to_name_text),
            HintScope::Value(Value::Json(serde_json::Value::Object(map))) => {
                map.get(key).map(json_name_text)
            }
            HintScope::Value(_) => None,
        }
    }
}
