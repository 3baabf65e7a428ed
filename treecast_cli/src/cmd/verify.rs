use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};
use treecast_bundle::WriteOptions;
use treecast_fs_local::{LocalFileSystem, walk_files};

use crate::config::TreecastConfig;

pub fn run_verify(config: &TreecastConfig, dir: &Path) -> Result<()> {
    let inferred = super::infer_dir(config, dir, None)?;
    let scratch = tempfile::tempdir().context("failed to create a scratch directory")?;
    let out = scratch.path().join("bundle");
    inferred
        .write(&LocalFileSystem::new(), &out, WriteOptions::default())
        .context("failed to write the inferred bundle")?;

    let expected = decoded_files(dir)?;
    let actual = decoded_files(&out)?;
    let mut mismatches = 0;
    for (path, value) in &expected {
        match actual.get(path) {
            None => {
                warn!("{path} is missing after the round trip");
                mismatches += 1;
            }
            Some(written) if written != value => {
                warn!("{path} differs after the round trip");
                mismatches += 1;
            }
            Some(_) => {}
        }
    }
    for path in actual.keys().filter(|path| !expected.contains_key(*path)) {
        warn!("{path} was not in the source tree");
        mismatches += 1;
    }

    if mismatches > 0 {
        bail!("{mismatches} of {} files did not round-trip", expected.len());
    }
    info!("{} files round-tripped through {}", expected.len(), inferred.root_type.name());
    Ok(())
}

/// Decoded contents of every file below `root`, keyed by relative path.
fn decoded_files(root: &Path) -> Result<BTreeMap<String, serde_json::Value>> {
    let mut files = BTreeMap::new();
    for relative in walk_files(root)? {
        let path = root.join(&relative);
        let text = std::fs::read_to_string(&path).with_context(|| format!("failed to read {path:?}"))?;
        let extension = relative
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        let value = match extension.as_deref() {
            Some("json") => serde_json::from_str(&text).with_context(|| format!("invalid JSON in {path:?}"))?,
            Some("jsonl") => serde_json::Value::Array(
                text.lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(serde_json::from_str)
                    .collect::<Result<_, _>>()
                    .with_context(|| format!("invalid JSON line in {path:?}"))?,
            ),
            _ => serde_json::Value::String(text),
        };
        files.insert(relative.to_string_lossy().into_owned(), value);
    }
    Ok(files)
}
