use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use treecast_bundle::{InferredBundle, infer_bundle};
use treecast_fs_local::LocalFileSystem;

use crate::config::TreecastConfig;

mod copy;
mod infer;
mod tree;
mod verify;

pub use copy::run_copy;
pub use infer::run_infer;
pub use tree::run_tree;
pub use verify::run_verify;

pub fn run_command(config_file: PathBuf, cmd: crate::Commands) -> Result<()> {
    if let crate::Commands::Config { cmd } = cmd {
        return cmd.run(config_file);
    }
    let config = TreecastConfig::load(&config_file)?;

    match cmd {
        crate::Commands::Infer {
            dir,
            root_name,
            schema_out,
        } => run_infer(&config, &dir, root_name, schema_out),
        crate::Commands::Copy {
            src,
            dst,
            overwrite,
            root_name,
        } => run_copy(&config, &src, &dst, overwrite, root_name),
        crate::Commands::Verify { dir } => run_verify(&config, &dir),
        crate::Commands::Tree { dir } => run_tree(&config, &dir),
        crate::Commands::Config { .. } => unreachable!(),
    }
}

/// Infers the bundle rooted at `dir` on the local filesystem.
fn infer_dir(
    config: &TreecastConfig,
    dir: &Path,
    root_name: Option<String>,
) -> Result<InferredBundle> {
    // canonical so that `.` still yields a directory name for `$id`
    let dir = dir
        .canonicalize()
        .with_context(|| format!("failed to resolve {dir:?}"))?;
    let options = config.infer_options(root_name);
    infer_bundle(&LocalFileSystem::new(), &dir, &options)
        .with_context(|| format!("failed to infer a bundle from {dir:?}"))
}
