use std::collections::BTreeMap;
use std::path::Path;

use treecast_bundle::{InferOptions, WriteOptions, infer_bundle};
use treecast_core::{BundleError, FieldKind, FileSystem, Value};
use treecast_fs_local::{LocalFileSystem, walk_files};
use treecast_fs_memory::MemoryFileSystem;

fn write_json(path: &Path, payload: &serde_json::Value) -> anyhow::Result<()> {
    std::fs::write(path, serde_json::to_string(payload)?)?;
    Ok(())
}

fn write_jsonl(path: &Path, rows: &[serde_json::Value]) -> anyhow::Result<()> {
    let mut out = String::new();
    for row in rows {
        out.push_str(&serde_json::to_string(row)?);
        out.push('\n');
    }
    std::fs::write(path, out)?;
    Ok(())
}

/// Decoded contents of every file below `root`, by relative path.
fn collect_files(root: &Path) -> anyhow::Result<BTreeMap<String, serde_json::Value>> {
    let mut collected = BTreeMap::new();
    for relative in walk_files(root)? {
        let text = std::fs::read_to_string(root.join(&relative))?;
        let key = relative.to_string_lossy().into_owned();
        let value = match relative.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&text)?,
            Some("jsonl") => serde_json::Value::Array(
                text.lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(serde_json::from_str)
                    .collect::<Result<_, _>>()?,
            ),
            _ => serde_json::Value::String(text),
        };
        collected.insert(key, value);
    }
    Ok(collected)
}

#[test]
fn infer_bundle_round_trip() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("input-tree");
    std::fs::create_dir_all(root.join("experiments/run-001"))?;
    std::fs::create_dir_all(root.join("experiments/run-002"))?;

    std::fs::write(root.join("experiments/run-001/payload.txt"), "alpha")?;
    write_json(
        &root.join("experiments/run-001/metrics.json"),
        &serde_json::json!({"accuracy": 0.9, "passed": true}),
    )?;
    std::fs::write(root.join("experiments/run-002/payload.txt"), "beta")?;
    write_jsonl(
        &root.join("experiments/run-002/metrics.jsonl"),
        &[
            serde_json::json!({"step": 1, "loss": 0.5}),
            serde_json::json!({"step": 2, "loss": 0.3}),
        ],
    )?;
    write_json(
        &root.join("leaderboard.json"),
        &serde_json::json!({"best": "run-001", "scores": [1, 2]}),
    )?;

    let fs = LocalFileSystem::new();
    let options = InferOptions {
        root_name: Some("ExperimentBundle".into()),
        ..InferOptions::default()
    };
    let inferred = infer_bundle(&fs, &root, &options)?;
    assert_eq!(inferred.root_type.name(), "ExperimentBundle");

    let instance = &inferred.instance;
    let experiments = instance.child("experiments").unwrap();
    let run_001 = experiments.child("run_001").unwrap();
    let run_002 = experiments.child("run_002").unwrap();
    assert_eq!(run_001.get("payload").and_then(Value::as_text), Some("alpha"));
    assert_eq!(run_001.get("metrics").and_then(Value::as_json).unwrap()["accuracy"], 0.9);
    assert_eq!(run_002.get("payload").and_then(Value::as_text), Some("beta"));
    match run_002.get("metrics") {
        Some(Value::List(rows)) => assert_eq!(rows[0].as_json().unwrap()["step"], 1),
        other => panic!("unexpected metrics value: {other:?}"),
    }
    assert_eq!(
        instance.get("leaderboard").and_then(Value::as_json).unwrap()["best"],
        "run-001"
    );

    let out = temp.path().join("round-trip");
    inferred.write(&fs, &out, WriteOptions::default())?;
    assert_eq!(collect_files(&root)?, collect_files(&out)?);

    let schema = &inferred.schema;
    assert_eq!(schema["$ref"], "#/$defs/ExperimentBundle");
    assert_eq!(schema["$id"], "treecast://input-tree");
    let defs = &schema["$defs"];
    let experiments_def = &defs[experiments.type_name()];
    assert_eq!(experiments_def["properties"]["run_001"]["$ref"], "#/$defs/Run001");
    assert_eq!(experiments_def["x-treecast"]["path"], "experiments");
    let leaderboard = &defs["ExperimentBundle"]["properties"]["leaderboard"];
    assert_eq!(leaderboard["type"], "object");
    assert_eq!(leaderboard["x-treecast"]["extension"], "json");
    assert_eq!(leaderboard["x-treecast"]["name"], "leaderboard.json");
    assert_eq!(
        defs["Run002"]["properties"]["metrics"]["items"]["properties"]["loss"]["type"],
        "number"
    );
    Ok(())
}

#[test]
fn infer_bundle_rejects_unknown_extension() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("bad");
    std::fs::create_dir(&root)?;
    std::fs::write(root.join("notes.md"), "hello")?;

    let err = infer_bundle(&LocalFileSystem::new(), &root, &InferOptions::default()).unwrap_err();
    match err {
        BundleError::UnsupportedExtension { path, extension } => {
            assert!(path.ends_with("notes.md"));
            assert_eq!(extension, ".md");
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn unsupported_extension_deep_in_the_tree_fails_the_whole_walk() -> anyhow::Result<()> {
    let fs = MemoryFileSystem::new();
    fs.create_dir(Path::new("/tree/a/b"), true)?;
    fs.write_text(Path::new("/tree/ok.txt"), "fine")?;
    fs.write_text(Path::new("/tree/a/b/README"), "no extension")?;
    let err = infer_bundle(&fs, Path::new("/tree"), &InferOptions::default()).unwrap_err();
    assert!(matches!(err, BundleError::UnsupportedExtension { .. }));
    Ok(())
}

#[test]
fn round_trip_in_memory_keeps_odd_names() -> anyhow::Result<()> {
    let fs = MemoryFileSystem::new();
    fs.create_dir(Path::new("/src/My Data {v1}"), true)?;
    fs.write_text(Path::new("/src/My Data {v1}/notes.v2.txt"), "braces stay literal")?;
    fs.write_text(Path::new("/src/1st.json"), "[1, 2.5, \"x\", null]")?;

    let inferred = infer_bundle(&fs, Path::new("/src"), &InferOptions::default())?;
    let fields: Vec<_> = inferred
        .root_type
        .fields()
        .iter()
        .map(|f| (f.name.clone(), f.kind))
        .collect();
    assert_eq!(
        fields,
        [
            ("my_data_v1".to_string(), FieldKind::Directory),
            ("n_1st".to_string(), FieldKind::File)
        ]
    );

    inferred.write(&fs, Path::new("/dst"), WriteOptions::default())?;
    assert_eq!(
        fs.read_text(Path::new("/dst/My Data {v1}/notes.v2.txt"))?,
        "braces stay literal"
    );
    let list: serde_json::Value = serde_json::from_str(&fs.read_text(Path::new("/dst/1st.json"))?)?;
    assert_eq!(list, serde_json::json!([1, 2.5, "x", null]));
    Ok(())
}

#[test]
fn mixed_case_extensions_round_trip_on_disk() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("cased");
    std::fs::create_dir_all(root.join("logs"))?;
    std::fs::write(root.join("Report.TXT"), "shouting")?;
    write_json(&root.join("logs/Summary.Json"), &serde_json::json!({"ok": true}))?;

    let fs = LocalFileSystem::new();
    let inferred = infer_bundle(&fs, &root, &InferOptions::default())?;
    let out = temp.path().join("cased-copy");
    inferred.write(&fs, &out, WriteOptions::default())?;

    assert_eq!(
        walk_files(&out)?,
        walk_files(&root)?,
        "file names, extension case included, are kept"
    );
    assert_eq!(std::fs::read_to_string(out.join("Report.TXT"))?, "shouting");
    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("logs/Summary.Json"))?)?;
    assert_eq!(summary, serde_json::json!({"ok": true}));
    Ok(())
}
