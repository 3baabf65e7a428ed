use bytes::Bytes;
use std::path::Path;

pub type FsResult<T, E = anyhow::Error> = std::result::Result<T, E>;

/// Whether a listed entry is a regular file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryKind {
    Directory,
    File,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Filesystem capability consumed by the writer and reader engines.
///
/// Calls are synchronous and made one entry at a time. Implementations
/// do not need to provide any locking; concurrent mutation of the same
/// tree is outside the contract.
pub trait FileSystem: std::fmt::Debug + Send + Sync {
    fn exists(&self, path: &Path) -> FsResult<bool>;

    fn is_dir(&self, path: &Path) -> FsResult<bool>;

    /// Lists the direct children of `path`, in no particular order.
    fn list_entries(&self, path: &Path) -> FsResult<Vec<DirEntry>>;

    /// Creates `path`. Succeeds if it already is a directory. Without
    /// `recursive` the parent must already exist.
    fn create_dir(&self, path: &Path, recursive: bool) -> FsResult<()>;

    fn read_bytes(&self, path: &Path) -> FsResult<Bytes>;

    /// Creates or truncates the file at `path`. The parent directory must exist.
    fn write_bytes(&self, path: &Path, content: &[u8]) -> FsResult<()>;

    fn read_text(&self, path: &Path) -> FsResult<String> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|err| anyhow::anyhow!("{} is not valid UTF-8: {}", path.display(), err))
    }

    fn write_text(&self, path: &Path, content: &str) -> FsResult<()> {
        self.write_bytes(path, content.as_bytes())
    }
}
