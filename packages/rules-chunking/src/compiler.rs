use crate::config::{ChunkingOptions, RuleSourceConfig};
use crate::error::{ChunkingError, Result};
use crate::events::{ChunkEventHandler, ChunksMerged, ChunksMerging, EventDispatcher};
use crate::executor::{ChunkCompiler, ParallelCompilationExecutor};
use crate::merger::merge_outcomes;
use crate::planner::{should_enable_chunking, split_into_chunks, ChunkMetadata};
use crate::result::{ChunkReport, ChunkedCompilationResult};
use chrono::Utc;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

/// Plan, compile and merge a rule list
///
/// Falls back to a single delegate call when chunking does not apply.
pub struct ChunkedCompiler {
    compiler: Arc<dyn ChunkCompiler>,
    options: ChunkingOptions,
    events: EventDispatcher,
}

impl ChunkedCompiler {
    pub fn new(compiler: Arc<dyn ChunkCompiler>, options: ChunkingOptions) -> Result<Self> {
        options.validate()?;

        Ok(Self {
            compiler,
            options,
            events: EventDispatcher::default(),
        })
    }

    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    /// Register an event handler
    pub fn add_handler(&mut self, handler: Arc<dyn ChunkEventHandler>) {
        self.events.add_handler(handler);
    }

    pub fn options(&self) -> &ChunkingOptions {
        &self.options
    }

    pub async fn compile(&self, config: &RuleSourceConfig) -> Result<ChunkedCompilationResult> {
        self.compile_with_cancel(config, &CancellationToken::new())
            .await
    }

    /// Compile `config`, aborting when `cancel` fires
    pub async fn compile_with_cancel(
        &self,
        config: &RuleSourceConfig,
        cancel: &CancellationToken,
    ) -> Result<ChunkedCompilationResult> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start_time = Instant::now();

        if !should_enable_chunking(config, Some(&self.options)) {
            info!(
                "Run {}: compiling {} sources as a single unit (chunking: {:?})",
                run_id,
                config.sources.len(),
                self.options.enabled
            );

            let merged_lines = match self.compile_single(config, cancel).await {
                Ok(lines) => lines,
                Err(e) => {
                    error!("Run {} failed: {}", run_id, e);
                    return Err(e);
                }
            };

            return Ok(ChunkedCompilationResult {
                run_id,
                started_at,
                finished_at: Utc::now(),
                total_elapsed_ms: start_time.elapsed().as_millis() as u64,
                chunks: Vec::new(),
                merged_lines,
                duplicates_removed: 0,
            });
        }

        let chunks = split_into_chunks(config, &self.options)?;
        let metadata: Vec<ChunkMetadata> = chunks.iter().map(|c| c.metadata.clone()).collect();
        let chunk_count = chunks.len();

        info!(
            "Run {}: {} sources split into {} chunks (max {} parallel)",
            run_id,
            config.sources.len(),
            chunk_count,
            self.options.max_parallel
        );

        let executor =
            ParallelCompilationExecutor::new(Arc::clone(&self.compiler), self.options.max_parallel)?
                .with_events(self.events.clone())
                .with_run_id(run_id);
        let outcomes = executor.run_all(chunks, cancel).await?;

        let total_lines_before_merge: usize = outcomes.iter().map(|o| o.lines.len()).sum();
        self.events.chunks_merging(&ChunksMerging {
            run_id,
            chunk_count,
            total_lines_before_merge,
        });

        let merge_start = Instant::now();
        let merged = merge_outcomes(&outcomes)?;
        let merge_ms = merge_start.elapsed().as_millis() as u64;

        self.events.chunks_merged(&ChunksMerged {
            run_id,
            chunk_count,
            total_lines_before_merge,
            final_line_count: merged.lines.len(),
            duplicates_removed: merged.duplicates_removed,
            elapsed_ms: merge_ms,
        });

        let reports = metadata
            .into_iter()
            .zip(&outcomes)
            .map(|(metadata, outcome)| ChunkReport {
                metadata,
                elapsed_ms: outcome.elapsed_ms,
                line_count: outcome.lines.len(),
            })
            .collect();

        let result = ChunkedCompilationResult {
            run_id,
            started_at,
            finished_at: Utc::now(),
            total_elapsed_ms: start_time.elapsed().as_millis() as u64,
            chunks: reports,
            merged_lines: merged.lines,
            duplicates_removed: merged.duplicates_removed,
        };

        info!(
            "Run {} completed: {} chunks, {} lines ({} duplicates removed) in {}ms, speedup {:.2}x",
            run_id,
            chunk_count,
            result.merged_lines.len(),
            result.duplicates_removed,
            result.total_elapsed_ms,
            result.estimated_speedup()
        );

        Ok(result)
    }

    async fn compile_single(
        &self,
        config: &RuleSourceConfig,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let compile = self
            .compiler
            .compile(config, cancel)
            .map(|result| result.map_err(ChunkingError::Compilation));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ChunkingError::Cancelled),
            compiled = compile => compiled.map(|c| c.lines),
        }
    }
}

impl std::fmt::Debug for ChunkedCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedCompiler")
            .field("options", &self.options)
            .field("events", &self.events)
            .finish()
    }
}
