//! Writer and reader engines for treecast bundles.
//!
//! - [`write_bundle`] materializes a [`Record`](treecast_core::Record)
//!   graph as a directory tree, following each field's naming, prefix and
//!   extension metadata.
//! - [`infer_bundle`] goes the other way: it walks an existing tree of
//!   `.txt`, `.json` and `.jsonl` files, synthesizes one record type per
//!   distinct directory shape, and emits a JSON-Schema document next to
//!   the instance.
//!
//! Both engines are synchronous depth-first walks over a
//! [`FileSystem`](treecast_core::FileSystem).

pub mod naming;
pub mod reader;
pub mod schema;
pub mod writer;

pub use reader::{InferOptions, InferredBundle, SUPPORTED_EXTENSIONS, infer_bundle};
pub use schema::{infer_json_schema, merge_schemas};
pub use writer::{COPYFILE_KEY, WriteOptions, write_bundle};
