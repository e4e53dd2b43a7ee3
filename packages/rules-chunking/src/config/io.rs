//! `chunking` section of a compiler configuration file
//!
//! ```yaml
//! chunking:
//!   enabled: true
//!   strategy: source
//!   maxParallel: 4
//!   chunkSize: 100000
//! ```
//!
//! Everything outside the section belongs to other readers and is ignored.
//! Unknown keys inside the section are rejected.

use super::options::{ChunkingMode, ChunkingOptions, ChunkingStrategy};
use crate::error::{ChunkingError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raw `chunking` section
///
/// Integers are signed so that negative values reach validation instead of
/// failing as a type error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ChunkingSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ChunkingStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<i64>,
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    chunking: Option<ChunkingSection>,
}

impl ChunkingSection {
    /// Extract the section from a full YAML document
    pub fn from_yaml_document(content: &str) -> Result<Option<Self>> {
        let document: Document = serde_yaml::from_str(content)?;
        Ok(document.chunking)
    }

    /// Extract the section from a full JSON document
    pub fn from_json_document(content: &str) -> Result<Option<Self>> {
        let document: Document = serde_json::from_str(content)?;
        Ok(document.chunking)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match super::extension_of(path).as_str() {
            "json" => Self::from_json_document(&content),
            "yaml" | "yml" => Self::from_yaml_document(&content),
            other => Err(ChunkingError::config(
                "extension",
                other,
                "Configuration files must end in .json, .yaml or .yml",
            )),
        }
    }

    /// Overlay this section on `base`; absent fields keep the base value
    pub fn apply_to(&self, base: ChunkingOptions) -> Result<ChunkingOptions> {
        let mut options = base;
        if let Some(enabled) = self.enabled {
            options.enabled = ChunkingMode::from(Some(enabled));
        }

        if let Some(strategy) = self.strategy {
            options.strategy = strategy;
        }
        if let Some(max_parallel) = self.max_parallel {
            options.max_parallel = positive("maxParallel", max_parallel)?;
        }
        if let Some(chunk_size) = self.chunk_size {
            options.chunk_size = positive("chunkSize", chunk_size)?;
        }

        options.validate()?;
        Ok(options)
    }

    /// Options from this section alone; absent `enabled` means `Auto`
    pub fn into_options(self) -> Result<ChunkingOptions> {
        self.apply_to(ChunkingOptions::default())
    }
}

fn positive(field: &str, value: i64) -> Result<usize> {
    if value <= 0 {
        return Err(ChunkingError::config(field, value, "Must be greater than zero"));
    }
    usize::try_from(value)
        .map_err(|_| ChunkingError::config(field, value, "Value does not fit this platform"))
}
