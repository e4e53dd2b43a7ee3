//! Rule-source configuration and chunking options
//!
//! `RuleSourceConfig` mirrors the JSON document consumed by
//! `hostlist-compiler`. The engine treats it as an immutable value: the
//! planner reads it and produces per-chunk copies, never mutating the parent.

pub mod io;
pub mod options;

pub use io::ChunkingSection;
pub use options::{ChunkingMode, ChunkingOptions, ChunkingStrategy, DEFAULT_CHUNK_SIZE};

use crate::error::{ChunkingError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source list syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Adblock,
    Hosts,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Adblock => "adblock",
            SourceType::Hosts => "hosts",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One filter list to compile
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// URL or local path
    pub source: String,

    #[serde(rename = "type", default)]
    pub source_type: SourceType,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transformations: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inclusions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inclusions_sources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions_sources: Vec<String>,
}

impl FilterSource {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }

    pub fn with_transformation(mut self, transformation: impl Into<String>) -> Self {
        self.transformations.push(transformation.into());
        self
    }

    /// Label used in logs and error messages
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.source)
    }
}

/// A compilation unit: metadata, ordered sources and whole-list filters
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleSourceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub sources: Vec<FilterSource>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transformations: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inclusions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inclusions_sources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions_sources: Vec<String>,
}

impl RuleSourceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: FilterSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_transformation(mut self, transformation: impl Into<String>) -> Self {
        self.transformations.push(transformation.into());
        self
    }

    /// Copy of this config holding only `sources`, renamed to `name`
    pub fn derive_subset(&self, name: String, sources: Vec<FilterSource>) -> Self {
        Self {
            name: Some(name),
            description: self.description.clone(),
            homepage: self.homepage.clone(),
            license: self.license.clone(),
            version: self.version.clone(),
            sources,
            transformations: self.transformations.clone(),
            inclusions: self.inclusions.clone(),
            exclusions: self.exclusions.clone(),
            inclusions_sources: self.inclusions_sources.clone(),
            exclusions_sources: self.exclusions_sources.clone(),
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match extension_of(path).as_str() {
            "json" => Self::from_json_str(&content),
            "yaml" | "yml" => Self::from_yaml_str(&content),
            other => Err(ChunkingError::config(
                "extension",
                other,
                "Configuration files must end in .json, .yaml or .yml",
            )),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}
