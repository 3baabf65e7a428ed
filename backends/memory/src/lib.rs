use anyhow::{anyhow, bail};
use bytes::Bytes;
use dashmap::DashMap;
use std::path::{Component, Path};
use treecast_core::fs::{DirEntry, FileSystem, FsResult};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Bytes),
}

/// A `FileSystem` kept entirely in memory.
///
/// Paths are normalized to `/`-joined components; `.` is dropped and the
/// leading `/` is ignored, so `/a/b` and `a/./b` name the same entry. The
/// root always exists.
#[derive(Debug)]
pub struct MemoryFileSystem {
    nodes: DashMap<String, Node>,
}

impl MemoryFileSystem {
    /// Creates a new, empty `MemoryFileSystem`.
    pub fn new() -> Self {
        let nodes = DashMap::new();
        nodes.insert(String::new(), Node::Dir);
        Self { nodes }
    }

    /// Number of files currently stored.
    pub fn file_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|entry| matches!(entry.value(), Node::File(_)))
            .count()
    }

    fn key(path: &Path) -> FsResult<String> {
        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    bail!("unsupported path component in {}", path.display())
                }
            }
        }
        Ok(parts.join("/"))
    }

    fn parent_key(key: &str) -> Option<&str> {
        if key.is_empty() {
            return None;
        }
        Some(key.rsplit_once('/').map_or("", |(parent, _)| parent))
    }

    fn require_parent_dir(&self, key: &str, path: &Path) -> FsResult<()> {
        if let Some(parent) = Self::parent_key(key) {
            match self.nodes.get(parent).as_deref() {
                Some(Node::Dir) => {}
                _ => bail!("parent directory of {} does not exist", path.display()),
            }
        }
        Ok(())
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> FsResult<bool> {
        Ok(self.nodes.contains_key(&Self::key(path)?))
    }

    fn is_dir(&self, path: &Path) -> FsResult<bool> {
        Ok(matches!(
            self.nodes.get(&Self::key(path)?).as_deref(),
            Some(Node::Dir)
        ))
    }

    fn list_entries(&self, path: &Path) -> FsResult<Vec<DirEntry>> {
        let key = Self::key(path)?;
        if !matches!(self.nodes.get(&key).as_deref(), Some(Node::Dir)) {
            bail!("{} is not a directory", path.display());
        }
        let entries = self
            .nodes
            .iter()
            .filter(|entry| Self::parent_key(entry.key()) == Some(key.as_str()))
            .map(|entry| {
                let name = entry
                    .key()
                    .rsplit_once('/')
                    .map_or(entry.key().as_str(), |(_, name)| name)
                    .to_string();
                match entry.value() {
                    Node::Dir => DirEntry::directory(name),
                    Node::File(_) => DirEntry::file(name),
                }
            })
            .collect();
        Ok(entries)
    }

    fn create_dir(&self, path: &Path, recursive: bool) -> FsResult<()> {
        let key = Self::key(path)?;
        if let Some(node) = self.nodes.get(&key) {
            return match node.value() {
                Node::Dir => Ok(()),
                Node::File(_) => bail!("{} exists and is a file", path.display()),
            };
        }
        if recursive {
            let mut prefix = String::new();
            for part in key.split('/') {
                if !prefix.is_empty() {
                    prefix.push('/');
                }
                prefix.push_str(part);
                let node = self.nodes.entry(prefix.clone()).or_insert(Node::Dir);
                if matches!(node.value(), Node::File(_)) {
                    bail!("{prefix} exists and is a file");
                }
            }
        } else {
            self.require_parent_dir(&key, path)?;
            self.nodes.insert(key, Node::Dir);
        }
        Ok(())
    }

    fn read_bytes(&self, path: &Path) -> FsResult<Bytes> {
        match self.nodes.get(&Self::key(path)?).as_deref() {
            Some(Node::File(bytes)) => Ok(bytes.clone()),
            Some(Node::Dir) => Err(anyhow!("{} is a directory", path.display())),
            None => Err(anyhow!("{} not found", path.display())),
        }
    }

    fn write_bytes(&self, path: &Path, content: &[u8]) -> FsResult<()> {
        let key = Self::key(path)?;
        self.require_parent_dir(&key, path)?;
        if matches!(self.nodes.get(&key).as_deref(), Some(Node::Dir)) {
            bail!("{} is a directory", path.display());
        }
        self.nodes
            .insert(key, Node::File(Bytes::copy_from_slice(content)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treecast_core::testutil::FileSystemTests;

    #[test]
    fn test_memory_fs() {
        let fs = MemoryFileSystem::new();
        FileSystemTests::new(&fs, Path::new("/")).run_all().unwrap();
    }

    #[test]
    fn paths_are_normalized() {
        let fs = MemoryFileSystem::new();
        fs.create_dir(Path::new("/out/a"), true).unwrap();
        fs.write_text(Path::new("out/./a/x.txt"), "x").unwrap();
        assert_eq!(fs.read_text(Path::new("/out/a/x.txt")).unwrap(), "x");
        assert_eq!(fs.file_count(), 1);
        assert!(fs.exists(Path::new("../out")).is_err());
    }

    #[test]
    fn root_lists_top_level_only() {
        let fs = MemoryFileSystem::new();
        fs.create_dir(Path::new("top/inner"), true).unwrap();
        fs.write_text(Path::new("file.txt"), "f").unwrap();
        let mut entries = fs.list_entries(Path::new("/")).unwrap();
        entries.sort();
        assert_eq!(
            entries,
            vec![DirEntry::directory("top"), DirEntry::file("file.txt")]
        );
    }
}
