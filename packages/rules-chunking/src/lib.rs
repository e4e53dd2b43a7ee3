/*
 * Rules Chunking - Parallel compilation for large filter lists
 *
 * Splits a rule-source configuration into chunks, compiles them
 * concurrently through a pluggable delegate and merges the output.
 *
 * Architecture:
 * - Planner (contiguous source partitioning)
 * - Executor (bounded fork-join, fail-fast cancellation)
 * - Merger (order-preserving rule deduplication)
 * - Delegate (hostlist-compiler process)
 */

// Public modules
pub mod compiler;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod hostlist;
pub mod merger;
pub mod planner;
pub mod result;
pub mod speedup;

// Re-exports
pub use compiler::ChunkedCompiler;
pub use config::{
    ChunkingMode, ChunkingOptions, ChunkingSection, ChunkingStrategy, FilterSource,
    RuleSourceConfig, SourceType, DEFAULT_CHUNK_SIZE,
};
pub use error::{ChunkingError, ErrorCategory, Result};
pub use events::{
    ChunkCompleted, ChunkEventHandler, ChunkStarted, ChunksMerged, ChunksMerging,
    EventDispatcher,
};
pub use executor::{ChunkCompiler, ChunkOutcome, CompiledLines, ParallelCompilationExecutor};
pub use hostlist::HostlistCompiler;
pub use merger::{classify_line, merge_chunks, merge_outcomes, LineKind, MergeResult};
pub use planner::{chunk_sizes, should_enable_chunking, split_into_chunks, Chunk, ChunkMetadata};
pub use result::{ChunkReport, ChunkedCompilationResult};
pub use speedup::{estimate_speedup, measured_speedup};
