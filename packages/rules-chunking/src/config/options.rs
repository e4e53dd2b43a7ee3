use crate::error::{ChunkingError, Result};
use serde::{Deserialize, Serialize};

/// Default planning-time rules per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Whether chunking was requested
///
/// `Auto` lets the planner decide from the source count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingMode {
    #[default]
    Auto,
    ForceOn,
    ForceOff,
}

impl From<Option<bool>> for ChunkingMode {
    fn from(enabled: Option<bool>) -> Self {
        match enabled {
            None => ChunkingMode::Auto,
            Some(true) => ChunkingMode::ForceOn,
            Some(false) => ChunkingMode::ForceOff,
        }
    }
}

/// How sources are partitioned into chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Contiguous blocks of the source list
    #[default]
    Source,
}

impl ChunkingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkingStrategy::Source => "source",
        }
    }
}

impl std::fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Chunked compilation options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingOptions {
    pub enabled: ChunkingMode,
    /// Target rules per chunk, used only by [`crate::estimate_speedup`]
    pub chunk_size: usize,
    /// Upper bound on concurrently running chunks
    pub max_parallel: usize,
    pub strategy: ChunkingStrategy,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            enabled: ChunkingMode::Auto,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_parallel: num_cpus::get().max(1),
            strategy: ChunkingStrategy::Source,
        }
    }
}

impl ChunkingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forced on, with at least two workers
    pub fn for_large_lists() -> Self {
        Self {
            enabled: ChunkingMode::ForceOn,
            max_parallel: num_cpus::get().max(2),
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = ChunkingMode::from(Some(enabled));
        self
    }

    pub fn with_mode(mut self, mode: ChunkingMode) -> Self {
        self.enabled = mode;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    pub fn with_strategy(mut self, strategy: ChunkingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn is_force_off(&self) -> bool {
        self.enabled == ChunkingMode::ForceOff
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_parallel == 0 {
            return Err(ChunkingError::config(
                "max_parallel",
                self.max_parallel,
                "At least one chunk must be allowed to run",
            ));
        }

        if self.chunk_size == 0 {
            return Err(ChunkingError::config(
                "chunk_size",
                self.chunk_size,
                "Chunk size must be a positive rule count",
            ));
        }

        Ok(())
    }
}
