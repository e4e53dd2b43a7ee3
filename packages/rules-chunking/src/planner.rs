//! Chunk planning
//!
//! Decides whether a configuration is worth splitting and partitions its
//! sources into contiguous, balanced blocks. Contiguous blocks keep chunk
//! output order aligned with the original source order, which callers rely on
//! for precedence.

use crate::config::{
    ChunkingMode, ChunkingOptions, ChunkingStrategy, FilterSource, RuleSourceConfig,
};
use crate::error::Result;
use tracing::{debug, info};

/// Identity of one chunk within a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// 0-based
    pub index: usize,
    pub total: usize,
    /// Same list as the chunk's `config.sources`
    pub sources: Vec<FilterSource>,
}

impl ChunkMetadata {
    /// Comma-separated source labels, for error messages
    pub fn source_list(&self) -> String {
        self.sources
            .iter()
            .map(FilterSource::label)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One independent unit of parallel work
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub total: usize,
    pub config: RuleSourceConfig,
    pub metadata: ChunkMetadata,
}

/// Whether `config` should be compiled in chunks
pub fn should_enable_chunking(config: &RuleSourceConfig, options: Option<&ChunkingOptions>) -> bool {
    if config.sources.is_empty() {
        return false;
    }

    let (mode, strategy) = options
        .map(|o| (o.enabled, o.strategy))
        .unwrap_or((ChunkingMode::Auto, ChunkingStrategy::Source));

    match mode {
        ChunkingMode::ForceOff => false,
        ChunkingMode::ForceOn => true,
        ChunkingMode::Auto => match strategy {
            ChunkingStrategy::Source => config.sources.len() >= 2,
        },
    }
}

/// Per-chunk source counts for `source_count` sources over `chunk_count` chunks
///
/// The first `source_count % chunk_count` chunks take one extra source.
pub fn chunk_sizes(source_count: usize, chunk_count: usize) -> Vec<usize> {
    if source_count == 0 || chunk_count == 0 {
        return Vec::new();
    }

    let base = source_count / chunk_count;
    let remainder = source_count % chunk_count;
    (0..chunk_count)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Split `config` into at most `options.max_parallel` chunks
pub fn split_into_chunks(config: &RuleSourceConfig, options: &ChunkingOptions) -> Result<Vec<Chunk>> {
    options.validate()?;

    let sources = &config.sources;
    if sources.is_empty() {
        debug!("No sources to chunk");
        return Ok(Vec::new());
    }

    let chunk_count = options.max_parallel.min(sources.len()).max(1);
    let sizes = chunk_sizes(sources.len(), chunk_count);

    info!(
        "Splitting {} sources into {} chunks (strategy: {})",
        sources.len(),
        chunk_count,
        options.strategy
    );

    let mut chunks = Vec::with_capacity(chunk_count);
    let mut start = 0;
    for (index, size) in sizes.into_iter().enumerate() {
        let block = sources[start..start + size].to_vec();
        start += size;

        let name = chunk_name(config.name.as_deref(), index, chunk_count);
        let chunk_config = config.derive_subset(name, block.clone());

        debug!(
            "Chunk {}/{}: {} sources",
            index + 1,
            chunk_count,
            block.len()
        );

        chunks.push(Chunk {
            index,
            total: chunk_count,
            config: chunk_config,
            metadata: ChunkMetadata {
                index,
                total: chunk_count,
                sources: block,
            },
        });
    }

    Ok(chunks)
}

fn chunk_name(parent: Option<&str>, index: usize, total: usize) -> String {
    match parent {
        Some(name) => format!("{} (chunk {}/{})", name, index + 1, total),
        None => format!("(chunk {}/{})", index + 1, total),
    }
}
