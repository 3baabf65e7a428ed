use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use treecast_bundle::{InferOptions, WriteOptions};

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TreecastConfig {
    pub writer: WriterConfig,
    pub reader: ReaderConfig,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct WriterConfig {
    /// Allow writing into non-empty destinations
    pub overwrite: bool,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ReaderConfig {
    pub root_name: Option<String>,
    pub schema_id_scheme: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        let defaults = InferOptions::default();
        Self {
            root_name: defaults.root_name,
            schema_id_scheme: defaults.schema_id_scheme,
        }
    }
}

impl TreecastConfig {
    /// Reads the config file, or returns the defaults if there is none.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("no config file at {path:?}, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path:?}"))?;
        toml::from_str(&content).with_context(|| format!("could not parse config file {path:?}"))
    }

    pub fn infer_options(&self, root_name: Option<String>) -> InferOptions {
        InferOptions {
            root_name: root_name.or_else(|| self.reader.root_name.clone()),
            schema_id_scheme: self.reader.schema_id_scheme.clone(),
        }
    }

    pub fn write_options(&self, overwrite: bool) -> WriteOptions {
        WriteOptions {
            overwrite: overwrite || self.writer.overwrite,
        }
    }
}
