use anyhow::{Context, anyhow};
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use treecast_core::fs::{DirEntry, FileSystem, FsResult};
use walkdir::WalkDir;

/// `FileSystem` over the local disk.
///
/// Without a base, paths are used as given. A rooted instance resolves
/// every path against its base and refuses absolute paths or `..`.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem {
    base_path: Option<PathBuf>,
}

impl LocalFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rooted(base_path: impl Into<PathBuf>) -> Self {
        LocalFileSystem {
            base_path: Some(base_path.into()),
        }
    }

    fn resolve_path(&self, path: &Path) -> FsResult<PathBuf> {
        let Some(base) = &self.base_path else {
            return Ok(path.to_path_buf());
        };
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(anyhow!(
                "Invalid path: '{}'. Must be a relative path without '..'.",
                path.display()
            ));
        }
        Ok(base.join(path))
    }
}

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> FsResult<bool> {
        let full_path = self.resolve_path(path)?;
        full_path
            .try_exists()
            .with_context(|| format!("checking {}", full_path.display()))
    }

    fn is_dir(&self, path: &Path) -> FsResult<bool> {
        Ok(self.resolve_path(path)?.is_dir())
    }

    fn list_entries(&self, path: &Path) -> FsResult<Vec<DirEntry>> {
        let full_path = self.resolve_path(path)?;
        let mut entries = Vec::new();
        let read_dir = std::fs::read_dir(&full_path)
            .with_context(|| format!("listing {}", full_path.display()))?;
        for entry in read_dir {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // follows symlinks, like the reader's notion of file vs directory
            if entry.path().is_dir() {
                entries.push(DirEntry::directory(name));
            } else if entry.path().is_file() {
                entries.push(DirEntry::file(name));
            } else {
                tracing::debug!(path = %entry.path().display(), "skipping special file");
            }
        }
        Ok(entries)
    }

    fn create_dir(&self, path: &Path, recursive: bool) -> FsResult<()> {
        let full_path = self.resolve_path(path)?;
        if full_path.is_dir() {
            return Ok(());
        }
        let result = if recursive {
            std::fs::create_dir_all(&full_path)
        } else {
            std::fs::create_dir(&full_path)
        };
        result.with_context(|| format!("creating directory {}", full_path.display()))
    }

    fn read_bytes(&self, path: &Path) -> FsResult<Bytes> {
        let full_path = self.resolve_path(path)?;
        let data =
            std::fs::read(&full_path).with_context(|| format!("reading {}", full_path.display()))?;
        Ok(Bytes::from(data))
    }

    fn write_bytes(&self, path: &Path, content: &[u8]) -> FsResult<()> {
        let full_path = self.resolve_path(path)?;
        std::fs::write(&full_path, content)
            .with_context(|| format!("writing {}", full_path.display()))
    }
}

/// Every regular file below `root`, as sorted paths relative to `root`.
pub fn walk_files(root: &Path) -> FsResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("{} is outside {}", entry.path().display(), root.display()))?;
        files.push(relative.to_path_buf());
    }
    files.sort();
    Ok(files)
}
