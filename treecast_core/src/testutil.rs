//! Test utilities for `FileSystem` implementations.
//!
//! A conformance suite that can be run against any `FileSystem`
//! implementation to check it honours the contract the engines rely on.
//!
//! # Usage
//!
//! In your backend crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! treecast_core = { workspace = true, features = ["testutil"] }
//! ```
//!
//! In your test file:
//!
//! ```ignore
//! use treecast_core::testutil::FileSystemTests;
//!
//! #[test]
//! fn test_my_fs() {
//!     let fs = MyFileSystem::new();
//!     FileSystemTests::new(&fs, Path::new("/scratch")).run_all().unwrap();
//! }
//! ```

use crate::fs::{DirEntry, FileSystem, FsResult};
use bytes::Bytes;
use rand::Rng;
use std::path::{Path, PathBuf};

/// Test suite for `FileSystem` implementations.
pub struct FileSystemTests<'a, F: ?Sized> {
    fs: &'a F,
    /// Scratch directory all test entries live under
    base: PathBuf,
}

impl<'a, F: FileSystem + ?Sized> FileSystemTests<'a, F> {
    /// Create a suite that works in a random sub-directory of `root`.
    /// `root` must exist.
    pub fn new(fs: &'a F, root: &Path) -> Self {
        let base = root.join(format!("_test_{}", rand::rng().random::<u32>()));
        Self { fs, base }
    }

    /// Create a suite that works directly in `base`.
    pub fn with_base(fs: &'a F, base: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            base: base.into(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.base.join(name)
    }

    /// Run all tests.
    pub fn run_all(&self) -> FsResult<()> {
        self.fs.create_dir(&self.base, true)?;

        self.test_write_read_bytes()?;
        self.test_text_helpers()?;
        self.test_exists_and_is_dir()?;
        self.test_create_dir()?;
        self.test_list_entries()?;
        self.test_overwrite()?;
        self.test_missing_parent()?;
        Ok(())
    }

    pub fn test_write_read_bytes(&self) -> FsResult<()> {
        let path = self.path("bytes.bin");
        let data = random_bytes(4096);
        self.fs.write_bytes(&path, &data)?;
        let read = self.fs.read_bytes(&path)?;
        assert_eq!(read, data, "read data should match what was written");

        let empty = self.path("empty.bin");
        self.fs.write_bytes(&empty, b"")?;
        assert!(self.fs.read_bytes(&empty)?.is_empty(), "empty files stay empty");
        Ok(())
    }

    pub fn test_text_helpers(&self) -> FsResult<()> {
        let path = self.path("text.txt");
        self.fs.write_text(&path, "grüße\n")?;
        assert_eq!(self.fs.read_text(&path)?, "grüße\n");

        let invalid = self.path("invalid.txt");
        self.fs.write_bytes(&invalid, &[0xff, 0xfe, 0x00])?;
        assert!(
            self.fs.read_text(&invalid).is_err(),
            "invalid UTF-8 should not decode"
        );
        Ok(())
    }

    pub fn test_exists_and_is_dir(&self) -> FsResult<()> {
        let file = self.path("exists.txt");
        assert!(!self.fs.exists(&file)?, "file should not exist before creation");
        assert!(!self.fs.is_dir(&file)?, "missing paths are not directories");

        self.fs.write_text(&file, "x")?;
        assert!(self.fs.exists(&file)?, "file should exist after creation");
        assert!(!self.fs.is_dir(&file)?, "a file is not a directory");

        assert!(self.fs.exists(&self.base)?);
        assert!(self.fs.is_dir(&self.base)?);
        Ok(())
    }

    pub fn test_create_dir(&self) -> FsResult<()> {
        let nested = self.path("a/b/c");
        assert!(
            self.fs.create_dir(&nested, false).is_err(),
            "non-recursive create needs an existing parent"
        );
        self.fs.create_dir(&nested, true)?;
        assert!(self.fs.is_dir(&nested)?);
        assert!(self.fs.is_dir(&self.path("a/b"))?);

        // idempotent on an existing directory
        self.fs.create_dir(&nested, true)?;
        self.fs.create_dir(&nested, false)?;

        let file = self.path("plain.txt");
        self.fs.write_text(&file, "x")?;
        assert!(
            self.fs.create_dir(&file, true).is_err(),
            "cannot create a directory over a file"
        );
        Ok(())
    }

    pub fn test_list_entries(&self) -> FsResult<()> {
        let dir = self.path("listing");
        self.fs.create_dir(&dir, false)?;
        self.fs.write_text(&dir.join("b.txt"), "b")?;
        self.fs.write_text(&dir.join("a.json"), "{}")?;
        self.fs.create_dir(&dir.join("sub"), false)?;
        self.fs.write_text(&dir.join("sub").join("deep.txt"), "d")?;

        let mut entries = self.fs.list_entries(&dir)?;
        entries.sort();
        assert_eq!(
            entries,
            vec![
                DirEntry::directory("sub"),
                DirEntry::file("a.json"),
                DirEntry::file("b.txt"),
            ],
            "listing should contain direct children only"
        );

        assert!(
            self.fs.list_entries(&self.path("nowhere")).is_err(),
            "listing a missing directory fails"
        );
        Ok(())
    }

    pub fn test_overwrite(&self) -> FsResult<()> {
        let path = self.path("overwrite.txt");
        self.fs.write_text(&path, "original content")?;
        self.fs.write_text(&path, "new")?;
        assert_eq!(
            self.fs.read_text(&path)?,
            "new",
            "overwritten content should be replaced, not appended"
        );
        Ok(())
    }

    pub fn test_missing_parent(&self) -> FsResult<()> {
        let path = self.path("no/such/parent.txt");
        assert!(
            self.fs.write_bytes(&path, b"x").is_err(),
            "writing needs an existing parent"
        );
        assert!(
            self.fs.read_bytes(&self.path("missing.bin")).is_err(),
            "reading a missing file fails"
        );
        Ok(())
    }
}

/// Generate random bytes for testing.
pub fn random_bytes(len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    rand::rng().fill(&mut data[..]);
    Bytes::from(data)
}
