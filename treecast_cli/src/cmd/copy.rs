use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use treecast_fs_local::LocalFileSystem;

use crate::config::TreecastConfig;

pub fn run_copy(
    config: &TreecastConfig,
    src: &Path,
    dst: &Path,
    overwrite: bool,
    root_name: Option<String>,
) -> Result<()> {
    let inferred = super::infer_dir(config, src, root_name)?;
    inferred
        .write(&LocalFileSystem::new(), dst, config.write_options(overwrite))
        .with_context(|| format!("failed to write bundle to {dst:?}"))?;
    info!("copied {} from {src:?} to {dst:?}", inferred.root_type.name());
    Ok(())
}
