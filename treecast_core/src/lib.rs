//! Core treecast types and traits.
//!
//! treecast maps record graphs onto real directory trees and back. This
//! crate holds everything both directions share:
//!
//! ## Schema model
//!
//! - Naming hints (`hint::Hint`) and their resolution against records
//! - Raw field metadata and its normalization into per-layer
//!   `metadata::BundleMetadata` records
//! - Declared field types (`types::TypeExpr`) and the Directory / File /
//!   Value classification
//! - Resolved schemas (`definition::BundleDefinition`), cached per Rust
//!   type in a process-wide registry
//!
//! ## Instances
//!
//! - `record::Record` and `record::Value`, the dynamic instance data the
//!   engines walk
//!
//! ## Filesystem capability
//!
//! - `fs::FileSystem`, the narrow synchronous interface the writer and
//!   reader call; implementations live in `treecast_fs_local` and
//!   `treecast_fs_memory`

pub mod definition;
pub mod error;
pub mod fs;
pub mod hint;
pub mod metadata;
pub mod record;
pub mod registry;
pub mod types;

// Conformance suite for FileSystem implementations (behind feature flag)
#[cfg(feature = "testutil")]
pub mod testutil;

pub use definition::{BundleDefinition, BundleField, BundleType, FieldDescriptor, RecordDescriptor};
pub use error::{BundleError, BundleResult};
pub use fs::{DirEntry, EntryKind, FileSystem, FsResult};
pub use hint::{Hint, HintKind, HintSource, HintValue, NamingFn};
pub use metadata::{BundleMetadata, Layer, LayerData, MetaKey, RawMetadata, RawValue};
pub use record::{HintScope, Record, RecordBuilder, Value};
pub use types::{FieldKind, RecordRef, ScalarKind, TypeExpr};
