//! Materializes a record graph as a directory tree.

use anyhow::Context;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use treecast_core::{
    BundleError, BundleField, BundleResult, FieldKind, FileSystem, Layer, Record, Value,
};

/// File-layer passthrough key marking a payload as a path to copy from.
pub const COPYFILE_KEY: &str = "copyfile";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Allow writing into a non-empty destination, overlaying its files.
    pub overwrite: bool,
}

/// Writes `record` and everything below it under `path`.
///
/// Fields are visited in declaration order, depth first. A failure stops
/// the walk immediately; entries already written are left in place.
pub fn write_bundle(
    record: &Record,
    fs: &dyn FileSystem,
    path: &Path,
    options: WriteOptions,
) -> BundleResult<()> {
    prepare_destination(fs, path, options.overwrite)?;
    tracing::info!(bundle = %record.type_name(), path = %path.display(), "writing bundle");
    let mut writer = Writer { fs, written: 0 };
    writer.write_record(record, path)?;
    tracing::info!(files = writer.written, path = %path.display(), "bundle written");
    Ok(())
}

fn prepare_destination(fs: &dyn FileSystem, path: &Path, overwrite: bool) -> BundleResult<()> {
    if fs.exists(path)? {
        if !fs.is_dir(path)? {
            return Err(BundleError::render(format!(
                "destination '{}' exists and is not a directory",
                path.display()
            )));
        }
        if !overwrite && !fs.list_entries(path)?.is_empty() {
            return Err(BundleError::render(format!(
                "destination '{}' already exists and is not empty",
                path.display()
            )));
        }
        return Ok(());
    }
    fs.create_dir(path, true)?;
    Ok(())
}

struct Writer<'a> {
    fs: &'a dyn FileSystem,
    written: usize,
}

impl Writer<'_> {
    fn write_record(&mut self, record: &Record, base: &Path) -> BundleResult<()> {
        for (field, value) in record.fields() {
            let Some(value) = value.filter(|value| !value.is_null()) else {
                continue;
            };
            match field.kind {
                FieldKind::Directory => self.write_dir_field(field, value, record, base)?,
                FieldKind::File => self.write_file_field(field, value, record, base)?,
                FieldKind::Value => {}
            }
        }
        Ok(())
    }

    fn write_dir_field(
        &mut self,
        field: &BundleField,
        value: &Value,
        owner: &Record,
        base: &Path,
    ) -> BundleResult<()> {
        let children: Vec<(Option<usize>, &Value)> = match (field.is_collection, value) {
            (false, Value::Record(_)) => vec![(None, value)],
            (true, Value::List(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| (Some(i + 1), item))
                .collect(),
            (true, other) => {
                return Err(BundleError::render(format!(
                    "directory field '{}' expected a sequence of bundles; got {}",
                    field.name,
                    other.kind_name()
                )));
            }
            (false, other) => {
                return Err(BundleError::render(format!(
                    "directory field '{}' expected a single bundle; got {}",
                    field.name,
                    other.kind_name()
                )));
            }
        };

        for (index, child) in children {
            let Some(child_record) = child.as_record() else {
                return Err(BundleError::render(format!(
                    "directory field '{}' expected bundle data; got {}",
                    field.name,
                    child.kind_name()
                )));
            };
            if let Some(expected) = &field.nested {
                let actual = child_record.definition();
                if !Arc::ptr_eq(expected, actual) && **expected != **actual {
                    return Err(BundleError::render(format!(
                        "directory field '{}' expected bundle type '{}'; got '{}'",
                        field.name,
                        expected.name(),
                        actual.name()
                    )));
                }
            }
            let name = placement(field, owner, child, index)?;
            let dir = base.join(&name);
            tracing::debug!(field = %field.name, dir = %dir.display(), "creating directory");
            self.fs.create_dir(&dir, true)?;
            self.write_record(child_record, &dir)?;
        }
        Ok(())
    }

    fn write_file_field(
        &mut self,
        field: &BundleField,
        value: &Value,
        owner: &Record,
        base: &Path,
    ) -> BundleResult<()> {
        let name = placement(field, owner, value, None)?;
        let extension = field.extension();
        let copyfile = field
            .layer_data_for(Layer::File, 0)
            .is_some_and(|data| data.flag(COPYFILE_KEY));

        if copyfile {
            if let Some((target, bytes)) = self.copy_source(field, value, base, &name, extension)? {
                return self.emit(&target, &bytes);
            }
        }

        let target = base.join(with_extension(&name, extension));
        let content = encode_payload(field, value, extension)?;
        self.emit(&target, &content)
    }

    /// Reads the source of a copy-by-reference payload. `None` means the
    /// source is missing and the path should be written as text instead.
    fn copy_source(
        &self,
        field: &BundleField,
        value: &Value,
        base: &Path,
        name: &Path,
        extension: Option<&str>,
    ) -> BundleResult<Option<(PathBuf, bytes::Bytes)>> {
        let source = match value {
            Value::Path(path) => path.clone(),
            other => match other.as_text() {
                Some(text) => PathBuf::from(text),
                None => {
                    return Err(BundleError::render(format!(
                        "copyfile field '{}' needs a path payload; got {}",
                        field.name,
                        other.kind_name()
                    )));
                }
            },
        };
        if !self.fs.exists(&source)? || self.fs.is_dir(&source)? {
            tracing::warn!(
                field = %field.name,
                source = %source.display(),
                "copyfile source not found, writing the path as text"
            );
            return Ok(None);
        }
        let bytes = self
            .fs
            .read_bytes(&source)
            .with_context(|| format!("copying {}", source.display()))?;
        let source_ext = source.extension().and_then(|ext| ext.to_str());
        let target = base.join(with_extension(name, source_ext.or(extension)));
        Ok(Some((target, bytes)))
    }

    fn emit(&mut self, target: &Path, content: &[u8]) -> BundleResult<()> {
        if let Some(parent) = target.parent() {
            self.fs.create_dir(parent, true)?;
        }
        tracing::debug!(file = %target.display(), bytes = content.len(), "writing file");
        self.fs.write_bytes(target, content)?;
        self.written += 1;
        Ok(())
    }
}

/// Relative path for one placement of `field`: the resolved name hint (or
/// default name), under the resolved prefix hint if there is one.
fn placement(
    field: &BundleField,
    owner: &Record,
    subject: &Value,
    index: Option<usize>,
) -> BundleResult<PathBuf> {
    let position = index.map_or(0, |i| i - 1);
    let data = field.layer_data(position);

    let name = match data.and_then(|data| data.name.as_ref()) {
        Some(hint) => hint.resolve(owner, subject, index, &field.name)?,
        None => default_name(&field.name, index),
    };
    let name = checked_relative(&name, field, "name")?;

    let prefix = match data.and_then(|data| data.prefix.as_ref()) {
        Some(hint) => hint.resolve(owner, subject, index, &field.name)?,
        None => String::new(),
    };
    if prefix.is_empty() {
        return Ok(name);
    }
    Ok(checked_relative(&prefix, field, "prefix")?.join(name))
}

fn default_name(field: &str, index: Option<usize>) -> String {
    match index {
        Some(index) => format!("{field}_{index}"),
        None => field.to_string(),
    }
}

/// Rejects empty, absolute and parent-escaping names.
fn checked_relative(raw: &str, field: &BundleField, what: &str) -> BundleResult<PathBuf> {
    if raw.is_empty() {
        return Err(BundleError::render(format!(
            "field '{}' produced an empty {what}",
            field.name
        )));
    }
    let path = PathBuf::from(raw);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(BundleError::render(format!(
            "field '{}' produced {what} '{raw}' outside the bundle",
            field.name
        )));
    }
    Ok(path)
}

fn with_extension(name: &Path, extension: Option<&str>) -> PathBuf {
    match extension {
        Some(ext) => {
            let mut file = name.as_os_str().to_owned();
            file.push(".");
            file.push(ext);
            PathBuf::from(file)
        }
        None => name.to_path_buf(),
    }
}

/// Encodes a File payload completely before anything touches disk.
fn encode_payload(field: &BundleField, value: &Value, extension: Option<&str>) -> BundleResult<Vec<u8>> {
    let encoding = extension.map(str::to_ascii_lowercase);
    match (value, encoding.as_deref()) {
        (Value::Bytes(bytes), _) => Ok(bytes.to_vec()),
        (Value::Text(text), _) => Ok(text.clone().into_bytes()),
        (_, Some("json")) => {
            let json = to_json(field, value)?;
            Ok(serde_json::to_string_pretty(&json)?.into_bytes())
        }
        (_, Some("jsonl")) => {
            let rows = match value {
                Value::List(items) => items
                    .iter()
                    .map(|item| to_json(field, item))
                    .collect::<BundleResult<Vec<_>>>()?,
                Value::Json(serde_json::Value::Array(items)) => items.clone(),
                other => {
                    return Err(BundleError::render(format!(
                        "jsonl field '{}' needs a sequence of records; got {}",
                        field.name,
                        other.kind_name()
                    )));
                }
            };
            let mut out = String::new();
            for row in &rows {
                out.push_str(&serde_json::to_string(row)?);
                out.push('\n');
            }
            Ok(out.into_bytes())
        }
        (Value::Json(serde_json::Value::String(text)), _) => Ok(text.clone().into_bytes()),
        (Value::Json(json @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_))), _) => {
            Ok(json.to_string().into_bytes())
        }
        (Value::Path(path), _) => Ok(path.display().to_string().into_bytes()),
        (other, _) => Err(BundleError::render(format!(
            "unsupported payload for field '{}': {} cannot be written as '{}'",
            field.name,
            other.kind_name(),
            extension.unwrap_or("<no extension>")
        ))),
    }
}

fn to_json(field: &BundleField, value: &Value) -> BundleResult<serde_json::Value> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Json(json) => Ok(json.clone()),
        Value::Text(text) => Ok(text.clone().into()),
        Value::Path(path) => Ok(path.display().to_string().into()),
        Value::List(items) => items
            .iter()
            .map(|item| to_json(field, item))
            .collect::<BundleResult<Vec<_>>>()
            .map(serde_json::Value::Array),
        Value::Bytes(_) | Value::Record(_) => Err(BundleError::render(format!(
            "field '{}' holds {} which is not JSON-encodable",
            field.name,
            value.kind_name()
        ))),
    }
}
