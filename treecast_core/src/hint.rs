//! Naming hints.
//!
//! A hint is the normalized form of a `name` or `prefix` metadata entry.
//! It is resolved at write time against either the owning record or the
//! value being placed.

use std::fmt;
use std::sync::Arc;

use crate::error::{BundleError, BundleResult};
use crate::metadata::RawValue;
use crate::record::{HintScope, Record, Value};

/// Raw source spellings accepted in a `(value, source)` pair.
const OWNER_SOURCE: &str = "self";
const SUBJECT_SOURCE: &str = "field";

/// Signature of a naming callable: the resolution scope and the 1-based
/// collection index, if any.
pub type NamingFnInner = dyn Fn(HintScope<'_>, Option<usize>) -> String + Send + Sync;

/// A shareable naming callable. Two `NamingFn`s compare equal only when
/// they are the same allocation.
#[derive(Clone)]
pub struct NamingFn(Arc<NamingFnInner>);

impl NamingFn {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(HintScope<'_>, Option<usize>) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(func))
    }

    pub fn call(&self, scope: HintScope<'_>, index: Option<usize>) -> String {
        (self.0)(scope, index)
    }
}

impl fmt::Debug for NamingFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NamingFn({:p})", Arc::as_ptr(&self.0))
    }
}

impl PartialEq for NamingFn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Which object a hint is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HintSource {
    /// The record that owns the field (`"self"`).
    #[default]
    Owner,
    /// The value being named: the child record or the payload (`"field"`).
    Subject,
}

impl HintSource {
    /// Parses a raw source spelling, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            OWNER_SOURCE => Some(HintSource::Owner),
            SUBJECT_SOURCE => Some(HintSource::Subject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintKind {
    Literal,
    Template,
    FieldRef,
    Callable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HintValue {
    Literal(String),
    Template(String),
    FieldRef(String),
    Callable(NamingFn),
}

/// A normalized naming or prefix directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Hint {
    pub value: HintValue,
    pub source: HintSource,
}

impl Hint {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::owned(HintValue::Literal(text.into()))
    }

    pub fn template(template: impl Into<String>) -> Self {
        Self::owned(HintValue::Template(template.into()))
    }

    pub fn field_ref(field: impl Into<String>) -> Self {
        Self::owned(HintValue::FieldRef(field.into()))
    }

    pub fn callable<F>(func: F) -> Self
    where
        F: Fn(HintScope<'_>, Option<usize>) -> String + Send + Sync + 'static,
    {
        Self::owned(HintValue::Callable(NamingFn::new(func)))
    }

    fn owned(value: HintValue) -> Self {
        Self {
            value,
            source: HintSource::Owner,
        }
    }

    pub fn with_source(mut self, source: HintSource) -> Self {
        self.source = source;
        self
    }

    pub fn kind(&self) -> HintKind {
        match self.value {
            HintValue::Literal(_) => HintKind::Literal,
            HintValue::Template(_) => HintKind::Template,
            HintValue::FieldRef(_) => HintKind::FieldRef,
            HintValue::Callable(_) => HintKind::Callable,
        }
    }

    /// Text of a literal, template or field-reference hint.
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            HintValue::Literal(text) | HintValue::Template(text) | HintValue::FieldRef(text) => {
                Some(text)
            }
            HintValue::Callable(_) => None,
        }
    }

    /// Normalizes a raw `name`/`prefix` entry. `Null` yields no hint.
    pub fn normalize(entry: &str, raw: &RawValue) -> BundleResult<Option<Hint>> {
        let (value, source) = match raw {
            RawValue::Null => return Ok(None),
            RawValue::Tuple(items) => {
                let [value, source] = items.as_slice() else {
                    return Err(BundleError::metadata(format!(
                        "metadata entry '{entry}' must be a value/source pair"
                    )));
                };
                let source = match source {
                    RawValue::Text(text) => HintSource::parse(text),
                    _ => None,
                };
                let source = source.ok_or_else(|| {
                    BundleError::metadata(format!(
                        "metadata entry '{entry}' source must be one of \
                         ('{OWNER_SOURCE}', '{SUBJECT_SOURCE}')"
                    ))
                })?;
                (value, Some(source))
            }
            other => (other, None),
        };

        match value {
            // a prebuilt hint keeps its own source unless a pair overrides it
            RawValue::Hint(hint) => Ok(Some(match source {
                Some(source) => hint.clone().with_source(source),
                None => hint.clone(),
            })),
            RawValue::Callable(func) => Ok(Some(Hint {
                value: HintValue::Callable(func.clone()),
                source: source.unwrap_or_default(),
            })),
            RawValue::Text(text) if text.is_empty() => Err(BundleError::metadata(format!(
                "metadata entry '{entry}' cannot be an empty string"
            ))),
            RawValue::Text(text) => {
                let value = if text.contains('{') && text.contains('}') {
                    HintValue::Template(text.clone())
                } else {
                    HintValue::Literal(text.clone())
                };
                Ok(Some(Hint {
                    value,
                    source: source.unwrap_or_default(),
                }))
            }
            _ => Err(BundleError::metadata(format!(
                "unsupported value for '{entry}' metadata entry"
            ))),
        }
    }

    /// Resolves the hint to a name.
    ///
    /// `owner` is the record holding the field, `subject` the value being
    /// placed, `index` the 1-based collection position. `field` only
    /// labels errors.
    pub fn resolve(
        &self,
        owner: &Record,
        subject: &Value,
        index: Option<usize>,
        field: &str,
    ) -> BundleResult<String> {
        let scope = match self.source {
            HintSource::Owner => HintScope::Record(owner),
            HintSource::Subject => HintScope::from_value(subject),
        };
        match &self.value {
            HintValue::Literal(text) => Ok(text.clone()),
            HintValue::Template(template) => render_template(template, scope, index, field),
            HintValue::FieldRef(name) => {
                scope
                    .text(name)
                    .ok_or_else(|| BundleError::TemplateResolution {
                        field: field.to_string(),
                        key: name.clone(),
                    })
            }
            HintValue::Callable(func) => Ok(func.call(scope, index)),
        }
    }
}

/// Formats `{key}` placeholders against `scope`.
///
/// `{{` and `}}` escape braces. `index` is available as a placeholder
/// unless the scope has its own `index` attribute. A placeholder may carry
/// a width spec (`{index:03}` zero-pads, `{name:8}` pads with spaces).
pub fn render_template(
    template: &str,
    scope: HintScope<'_>,
    index: Option<usize>,
    field: &str,
) -> BundleResult<String> {
    let missing = |key: &str| BundleError::TemplateResolution {
        field: field.to_string(),
        key: key.to_string(),
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut placeholder = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    placeholder.push(inner);
                }
                if !closed {
                    return Err(missing(&placeholder));
                }
                let (key, spec) = match placeholder.split_once(':') {
                    Some((key, spec)) => (key, Some(spec)),
                    None => (placeholder.as_str(), None),
                };
                let text = match scope.text(key) {
                    Some(text) => text,
                    None if key == "index" => index.ok_or_else(|| missing(key))?.to_string(),
                    None => return Err(missing(key)),
                };
                out.push_str(&apply_width(&text, spec));
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn apply_width(text: &str, spec: Option<&str>) -> String {
    let Some(spec) = spec else {
        return text.to_string();
    };
    let zero = spec.starts_with('0');
    let Ok(width) = spec.parse::<usize>() else {
        return text.to_string();
    };
    let numeric = text.parse::<f64>().is_ok();
    if zero && numeric {
        let (sign, digits) = match text.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", text),
        };
        let pad = width.saturating_sub(text.chars().count());
        format!("{sign}{}{digits}", "0".repeat(pad))
    } else if numeric {
        format!("{text:>width$}")
    } else {
        format!("{text:<width$}")
    }
}
