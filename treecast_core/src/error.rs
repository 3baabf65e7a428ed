/// Errors raised while building bundle definitions or while moving a
/// bundle to and from disk.
///
/// Every variant is a configuration or data error; none of them is
/// transient and nothing in treecast retries.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum BundleError {
    /// A field's declared type violates the Dir/File contract.
    #[error("invalid annotation on field '{field}' of '{record}': {reason}")]
    InvalidAnnotation {
        record: String,
        field: String,
        reason: String,
    },

    /// Raw field metadata could not be normalized.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// A template or field-reference hint could not be resolved.
    #[error("cannot resolve '{key}' for field '{field}'")]
    TemplateResolution { field: String, key: String },

    /// Writer-side failure.
    #[error("render error: {0}")]
    Render(String),

    /// Reader root missing or not a directory.
    #[error("directory '{0}' does not exist or is not a directory")]
    NotFound(String),

    /// Reader found a file whose extension it cannot decode.
    #[error("unsupported file extension '{extension}' in '{path}'")]
    UnsupportedExtension { path: String, extension: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("filesystem error: {0:#}")]
    FileSystem(#[from] anyhow::Error),
}

impl BundleError {
    pub(crate) fn metadata(msg: impl Into<String>) -> Self {
        BundleError::Metadata(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        BundleError::Render(msg.into())
    }
}

/// Crate-wide result alias.
pub type BundleResult<T> = Result<T, BundleError>;
