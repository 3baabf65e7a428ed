//! Infers a bundle schema and instance from an existing directory tree.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, json};
use treecast_core::{
    BundleDefinition, BundleError, BundleResult, DirEntry, FileSystem, Hint, RawMetadata,
    Record, RecordDescriptor, TypeExpr, Value,
};

use crate::naming::{TypeNames, camel_case, sanitize_type_name, snake_case, unique_field_name};
use crate::schema::{ANNOTATION_KEY, SCHEMA_DIALECT, infer_json_schema, jsonl_schema};
use crate::writer::{WriteOptions, write_bundle};

/// Extensions the reader can decode.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "json", "jsonl"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferOptions {
    /// Type name for the root directory instead of one derived from its name.
    pub root_name: Option<String>,
    /// Scheme of the emitted `$id`.
    pub schema_id_scheme: String,
}

impl Default for InferOptions {
    fn default() -> Self {
        Self {
            root_name: None,
            schema_id_scheme: "treecast".to_string(),
        }
    }
}

/// The outcome of [`infer_bundle`].
#[derive(Debug, Clone)]
pub struct InferredBundle {
    pub root_type: Arc<BundleDefinition>,
    pub instance: Record,
    /// JSON-Schema document describing every synthesized type.
    pub schema: serde_json::Value,
    /// Synthesized type of every directory, by path relative to the root
    /// (`.` for the root itself).
    pub types: BTreeMap<String, Arc<BundleDefinition>>,
}

impl InferredBundle {
    /// Writes the inferred instance back out.
    pub fn write(&self, fs: &dyn FileSystem, path: &Path, options: WriteOptions) -> BundleResult<()> {
        write_bundle(&self.instance, fs, path, options)
    }

    pub fn type_at(&self, relative: &str) -> Option<&Arc<BundleDefinition>> {
        self.types.get(relative)
    }
}

/// Walks the tree under `root` and synthesizes one record type per
/// distinct directory shape.
pub fn infer_bundle(
    fs: &dyn FileSystem,
    root: &Path,
    options: &InferOptions,
) -> BundleResult<InferredBundle> {
    if !fs.exists(root)? || !fs.is_dir(root)? {
        return Err(BundleError::NotFound(root.display().to_string()));
    }
    log::info!("Starting inference from {:?}", root);

    let root_dir_name = root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut inference = Inference {
        fs,
        root: root.to_path_buf(),
        root_dir_name: root_dir_name.clone(),
        names: TypeNames::default(),
        shapes: HashMap::new(),
        defs: Map::new(),
        types: BTreeMap::new(),
    };

    let root_base = match &options.root_name {
        Some(name) => sanitize_type_name(name),
        None => camel_case(if root_dir_name.is_empty() { "root" } else { &root_dir_name }),
    };
    let (root_type, instance) = inference.build_dir(root, root_base)?;

    let schema = json!({
        "$schema": SCHEMA_DIALECT,
        "$id": format!("{}://{}", options.schema_id_scheme, root_dir_name),
        "$ref": format!("#/$defs/{}", root_type.name()),
        "$defs": inference.defs,
    });
    log::info!(
        "Finished inference from {:?}: {} types",
        root,
        inference.shapes.len()
    );

    Ok(InferredBundle {
        root_type,
        instance,
        schema,
        types: inference.types,
    })
}

struct Inference<'a> {
    fs: &'a dyn FileSystem,
    root: PathBuf,
    root_dir_name: String,
    names: TypeNames,
    /// Synthesized types by structural hash.
    shapes: HashMap<blake3::Hash, Arc<BundleDefinition>>,
    defs: Map<String, serde_json::Value>,
    types: BTreeMap<String, Arc<BundleDefinition>>,
}

/// One field synthesized from a directory entry.
struct Synthesized {
    field: String,
    ty: TypeExpr,
    metadata: RawMetadata,
    value: Value,
    schema: serde_json::Value,
    /// Stable description of the field's shape, fed to the structural hash.
    signature: serde_json::Value,
}

impl Inference<'_> {
    fn build_dir(
        &mut self,
        path: &Path,
        base_name: String,
    ) -> BundleResult<(Arc<BundleDefinition>, Record)> {
        // reserved before the children so that names follow pre-order
        let reservation = self.names.reserve(base_name);

        let mut entries = self.fs.list_entries(path)?;
        entries.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));

        let mut taken = HashSet::new();
        let mut fields = Vec::with_capacity(entries.len());
        for entry in &entries {
            let child = path.join(&entry.name);
            let synthesized = if entry.is_dir() {
                self.dir_field(&child, entry, &mut taken)?
            } else {
                self.file_field(&child, entry, &mut taken)?
            };
            fields.push(synthesized);
        }

        let signature: Vec<&serde_json::Value> = fields.iter().map(|f| &f.signature).collect();
        let hash = blake3::hash(&serde_json::to_vec(&signature)?);

        let definition = if let Some(existing) = self.shapes.get(&hash).cloned() {
            log::debug!("{:?} has the same shape as {}", path, existing.name());
            self.names.release(reservation);
            existing
        } else {
            let mut descriptor = RecordDescriptor::new(reservation.name.clone());
            for field in &fields {
                descriptor =
                    descriptor.field_with(&field.field, field.ty.clone(), field.metadata.clone());
            }
            let definition = Arc::new(BundleDefinition::build(descriptor)?);
            let schema = self.directory_schema(definition.name(), path, &fields);
            self.defs.insert(definition.name().to_string(), schema);
            self.shapes.insert(hash, definition.clone());
            definition
        };

        let mut builder = Record::builder(definition.clone());
        for field in fields {
            builder = builder.set(&field.field, field.value);
        }
        let record = builder.build()?;
        let relative = self.relative(path);
        self.types.insert(relative, definition.clone());
        Ok((definition, record))
    }

    fn dir_field(
        &mut self,
        path: &Path,
        entry: &DirEntry,
        taken: &mut HashSet<String>,
    ) -> BundleResult<Synthesized> {
        log::debug!("Inferring directory {:?}", path);
        let (child_type, child) = self.build_dir(path, camel_case(&entry.name))?;
        let field = unique_field_name(taken, snake_case(&entry.name));
        let reference = format!("#/$defs/{}", child_type.name());
        let schema = json!({
            "$ref": reference,
            "description": format!("Directory '{}'", entry.name),
            ANNOTATION_KEY: {
                "kind": "dir",
                "path": self.relative(path),
                "name": entry.name,
            },
        });
        let signature = json!({
            "field": field,
            "kind": "dir",
            "name": entry.name,
            "type": child_type.name(),
        });
        Ok(Synthesized {
            field,
            ty: TypeExpr::dir(TypeExpr::built(child_type)),
            metadata: RawMetadata::new().name(Hint::literal(entry.name.clone())),
            value: Value::Record(Box::new(child)),
            schema,
            signature,
        })
    }

    fn file_field(
        &mut self,
        path: &Path,
        entry: &DirEntry,
        taken: &mut HashSet<String>,
    ) -> BundleResult<Synthesized> {
        let as_path = Path::new(&entry.name);
        let extension = as_path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        // matched case-insensitively, pinned as found on disk
        let kind = extension.to_ascii_lowercase();
        if !SUPPORTED_EXTENSIONS.contains(&kind.as_str()) {
            return Err(BundleError::UnsupportedExtension {
                path: path.display().to_string(),
                extension: if extension.is_empty() {
                    String::new()
                } else {
                    format!(".{extension}")
                },
            });
        }
        let stem = as_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.name.clone());
        log::trace!("Decoding {:?} as {}", path, extension);

        let (payload, value, mut schema) = match kind.as_str() {
            "txt" => {
                let text = self.fs.read_text(path)?;
                (TypeExpr::str(), Value::Text(text), json!({"type": "string"}))
            }
            "json" => {
                let decoded: serde_json::Value = serde_json::from_str(&self.fs.read_text(path)?)?;
                let schema = infer_json_schema(&decoded);
                (payload_type(&decoded), Value::Json(decoded), schema)
            }
            _ => {
                let text = self.fs.read_text(path)?;
                let rows = text
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(serde_json::from_str)
                    .collect::<Result<Vec<serde_json::Value>, _>>()?;
                let item = rows
                    .first()
                    .map_or_else(|| TypeExpr::map(TypeExpr::any()), payload_type);
                let schema = jsonl_schema(&rows);
                (
                    TypeExpr::list(item),
                    Value::List(rows.into_iter().map(Value::Json).collect()),
                    schema,
                )
            }
        };

        let field = unique_field_name(taken, snake_case(&stem));
        let signature = json!({
            "field": field,
            "kind": "file",
            "name": stem,
            "extension": extension,
            "schema": schema,
        });
        if let Some(object) = schema.as_object_mut() {
            object.insert(
                ANNOTATION_KEY.to_string(),
                json!({
                    "kind": "file",
                    "path": self.relative(path),
                    "name": entry.name,
                    "extension": extension,
                }),
            );
        }
        Ok(Synthesized {
            field,
            ty: TypeExpr::file(payload),
            metadata: RawMetadata::new()
                .name(Hint::literal(stem))
                .extension(extension),
            value,
            schema,
            signature,
        })
    }

    fn directory_schema(&self, title: &str, path: &Path, fields: &[Synthesized]) -> serde_json::Value {
        let properties: Map<String, serde_json::Value> = fields
            .iter()
            .map(|field| (field.field.clone(), field.schema.clone()))
            .collect();
        let relative = self.relative(path);
        let name = if relative == "." {
            if self.root_dir_name.is_empty() {
                "root".to_string()
            } else {
                self.root_dir_name.clone()
            }
        } else {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        let mut schema = Map::new();
        schema.insert("title".into(), title.into());
        schema.insert("type".into(), "object".into());
        schema.insert("properties".into(), serde_json::Value::Object(properties));
        schema.insert("additionalProperties".into(), false.into());
        schema.insert(
            ANNOTATION_KEY.into(),
            json!({"kind": "dir", "path": relative, "name": name}),
        );
        if !fields.is_empty() {
            let required: Vec<serde_json::Value> =
                fields.iter().map(|field| field.field.clone().into()).collect();
            schema.insert("required".into(), serde_json::Value::Array(required));
        }
        serde_json::Value::Object(schema)
    }

    /// `/`-joined path relative to the root, `.` for the root.
    fn relative(&self, path: &Path) -> String {
        let parts: Vec<String> = path
            .strip_prefix(&self.root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            ".".to_string()
        } else {
            parts.join("/")
        }
    }
}

/// Declared payload type for a decoded JSON value.
fn payload_type(value: &serde_json::Value) -> TypeExpr {
    match value {
        serde_json::Value::Object(_) => TypeExpr::map(TypeExpr::any()),
        serde_json::Value::Array(_) => TypeExpr::list(TypeExpr::any()),
        serde_json::Value::Bool(_) => TypeExpr::bool(),
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => TypeExpr::int(),
        serde_json::Value::Number(_) => TypeExpr::float(),
        serde_json::Value::Null => TypeExpr::any(),
        serde_json::Value::String(_) => TypeExpr::str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treecast_core::FieldKind;
    use treecast_fs_memory::MemoryFileSystem;

    fn tree(files: &[(&str, &str)]) -> MemoryFileSystem {
        let fs = MemoryFileSystem::new();
        for (path, content) in files {
            let path = Path::new(path);
            if let Some(parent) = path.parent() {
                fs.create_dir(parent, true).unwrap();
            }
            fs.write_text(path, content).unwrap();
        }
        fs
    }

    #[test]
    fn missing_root_is_not_found() {
        let fs = MemoryFileSystem::new();
        let err = infer_bundle(&fs, Path::new("/nope"), &InferOptions::default()).unwrap_err();
        assert!(matches!(err, BundleError::NotFound(_)));

        let fs = tree(&[("/file.txt", "x")]);
        let err = infer_bundle(&fs, Path::new("/file.txt"), &InferOptions::default()).unwrap_err();
        assert!(matches!(err, BundleError::NotFound(_)));
    }

    #[test]
    fn directories_come_before_files() {
        let fs = tree(&[
            ("/data/b.txt", "b"),
            ("/data/a.json", "1"),
            ("/data/z/inner.txt", "i"),
        ]);
        let inferred = infer_bundle(&fs, Path::new("/data"), &InferOptions::default()).unwrap();
        let names: Vec<_> = inferred
            .root_type
            .fields()
            .iter()
            .map(|f| (f.name.as_str(), f.kind))
            .collect();
        assert_eq!(
            names,
            [
                ("z", FieldKind::Directory),
                ("a", FieldKind::File),
                ("b", FieldKind::File)
            ]
        );
        assert_eq!(inferred.root_type.name(), "Data");
        assert_eq!(inferred.schema["$id"], "treecast://data");
    }

    #[test]
    fn colliding_field_names_are_suffixed() {
        let fs = tree(&[("/r/my-file.txt", "1"), ("/r/my_file.json", "2")]);
        let inferred = infer_bundle(&fs, Path::new("/r"), &InferOptions::default()).unwrap();
        let names: Vec<_> = inferred.root_type.fields().iter().map(|f| f.name.clone()).collect();
        assert_eq!(names, ["my_file", "my_file_2"]);
        // the pinned names still point at the original entries
        let second = &inferred.root_type.fields()[1];
        assert_eq!(second.layer_data(0).unwrap().name, Some(Hint::literal("my_file")));
        assert_eq!(second.extension(), Some("json"));
    }

    #[test]
    fn identical_shapes_share_a_type() {
        let fs = tree(&[
            ("/runs/a/out.txt", "1"),
            ("/runs/b/out.txt", "2"),
            ("/runs/c/out.json", "{}"),
        ]);
        let inferred = infer_bundle(&fs, Path::new("/runs"), &InferOptions::default()).unwrap();
        let a = inferred.type_at("a").unwrap();
        let b = inferred.type_at("b").unwrap();
        let c = inferred.type_at("c").unwrap();
        assert!(Arc::ptr_eq(a, b));
        assert_eq!(a.name(), "A");
        assert_eq!(c.name(), "C");

        let defs = inferred.schema["$defs"].as_object().unwrap();
        let mut keys: Vec<_> = defs.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["A", "C", "Runs"]);
        assert_eq!(defs["Runs"]["properties"]["b"]["$ref"], "#/$defs/A");
    }

    #[test]
    fn type_name_collisions_follow_preorder() {
        let fs = tree(&[("/data/data/x.txt", "x")]);
        let inferred = infer_bundle(&fs, Path::new("/data"), &InferOptions::default()).unwrap();
        assert_eq!(inferred.root_type.name(), "Data");
        assert_eq!(inferred.type_at("data").unwrap().name(), "Data2");
    }

    #[test]
    fn jsonl_skips_blank_lines() {
        let fs = tree(&[("/j/rows.jsonl", "{\"a\":1}\n\n{\"a\":2}\n   \n")]);
        let inferred = infer_bundle(&fs, Path::new("/j"), &InferOptions::default()).unwrap();
        let rows = inferred.instance.get("rows").unwrap();
        assert_eq!(
            rows,
            &Value::List(vec![json!({"a": 1}).into(), json!({"a": 2}).into()])
        );
        let field = inferred.root_type.field("rows").unwrap();
        assert_eq!(
            field.declared_type,
            TypeExpr::file(TypeExpr::list(TypeExpr::map(TypeExpr::any())))
        );
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let fs = tree(&[("/c/Report.JSON", "{\"k\": true}")]);
        let inferred = infer_bundle(&fs, Path::new("/c"), &InferOptions::default()).unwrap();
        let field = inferred.root_type.field("report").unwrap();
        assert_eq!(field.extension(), Some("JSON"));
        assert_eq!(
            inferred.instance.get("report").and_then(Value::as_json),
            Some(&json!({"k": true}))
        );
        let schema = &inferred.schema["$defs"]["C"]["properties"]["report"];
        assert_eq!(schema[ANNOTATION_KEY]["name"], "Report.JSON");
        assert_eq!(schema[ANNOTATION_KEY]["extension"], "JSON");
    }

    #[test]
    fn upper_case_extensions_survive_a_round_trip() {
        let fs = tree(&[
            ("/c/Report.TXT", "plain"),
            ("/c/rows.JsonL", "{\"a\":1}\n{\"a\":2}\n"),
        ]);
        let inferred = infer_bundle(&fs, Path::new("/c"), &InferOptions::default()).unwrap();
        inferred.write(&fs, Path::new("/out"), WriteOptions::default()).unwrap();
        assert_eq!(fs.read_text(Path::new("/out/Report.TXT")).unwrap(), "plain");
        assert_eq!(
            fs.read_text(Path::new("/out/rows.JsonL")).unwrap(),
            "{\"a\":1}\n{\"a\":2}\n"
        );
        assert!(!fs.exists(Path::new("/out/Report.txt")).unwrap());
    }

    #[test]
    fn suffixed_type_names_do_not_clash_with_sibling_directories() {
        let fs = tree(&[("/r/data/data/x.txt", "x"), ("/r/data2/y.json", "{}")]);
        let inferred = infer_bundle(&fs, Path::new("/r"), &InferOptions::default()).unwrap();
        let nested = inferred.type_at("data/data").unwrap();
        let sibling = inferred.type_at("data2").unwrap();
        assert_eq!(nested.name(), "Data2");
        assert_eq!(sibling.name(), "Data22");
        assert!(nested.field("x").is_some());
        assert!(sibling.field("y").is_some());

        let defs = inferred.schema["$defs"].as_object().unwrap();
        let mut keys: Vec<_> = defs.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["Data", "Data2", "Data22", "R"]);
        assert!(defs["Data2"]["properties"].get("x").is_some());
        assert!(defs["Data22"]["properties"].get("y").is_some());
    }

    #[test]
    fn empty_directory_has_no_required_list() {
        let fs = MemoryFileSystem::new();
        fs.create_dir(Path::new("/empty"), true).unwrap();
        let inferred = infer_bundle(&fs, Path::new("/empty"), &InferOptions::default()).unwrap();
        let def = &inferred.schema["$defs"]["Empty"];
        assert!(def.get("required").is_none());
        assert_eq!(def[ANNOTATION_KEY], json!({"kind": "dir", "path": ".", "name": "empty"}));
    }
}
