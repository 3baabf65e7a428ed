use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::config::TreecastConfig;

pub fn run_infer(
    config: &TreecastConfig,
    dir: &Path,
    root_name: Option<String>,
    schema_out: Option<PathBuf>,
) -> Result<()> {
    let inferred = super::infer_dir(config, dir, root_name)?;
    let rendered = serde_json::to_string_pretty(&inferred.schema)?;
    match schema_out {
        Some(path) => {
            std::fs::write(&path, rendered + "\n")
                .with_context(|| format!("failed to write schema to {path:?}"))?;
            info!(
                "wrote schema for {} ({} types) to {path:?}",
                inferred.root_type.name(),
                inferred.schema["$defs"].as_object().map_or(0, |defs| defs.len())
            );
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
