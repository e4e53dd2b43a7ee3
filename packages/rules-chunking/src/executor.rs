use crate::config::RuleSourceConfig;
use crate::error::{ChunkingError, Result};
use crate::events::{ChunkCompleted, ChunkStarted, EventDispatcher};
use crate::planner::Chunk;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Output of one delegate invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledLines {
    pub lines: Vec<String>,
    pub elapsed_ms: u64,
}

impl CompiledLines {
    pub fn new(lines: Vec<String>, elapsed_ms: u64) -> Self {
        Self { lines, elapsed_ms }
    }
}

/// Delegate compiler (pluggable)
///
/// Turns one configuration into an ordered list of output lines. The token is
/// cancelled when a sibling chunk fails or the caller gives up; implementations
/// may watch it, but the executor also drops the in-flight future.
#[async_trait]
pub trait ChunkCompiler: Send + Sync {
    async fn compile(
        &self,
        config: &RuleSourceConfig,
        cancel: &CancellationToken,
    ) -> anyhow::Result<CompiledLines>;
}

/// Successful result of one chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub chunk_index: usize,
    pub lines: Vec<String>,
    pub elapsed_ms: u64,
}

/// Fork-join executor over a bounded pool
///
/// All-or-nothing: the first chunk failure cancels every other chunk and is
/// returned as the run's error.
pub struct ParallelCompilationExecutor {
    compiler: Arc<dyn ChunkCompiler>,
    max_parallel: usize,
    events: EventDispatcher,
    run_id: Uuid,
}

impl ParallelCompilationExecutor {
    pub fn new(compiler: Arc<dyn ChunkCompiler>, max_parallel: usize) -> Result<Self> {
        if max_parallel == 0 {
            return Err(ChunkingError::config(
                "max_parallel",
                max_parallel,
                "At least one chunk must be allowed to run",
            ));
        }

        Ok(Self {
            compiler,
            max_parallel,
            events: EventDispatcher::default(),
            run_id: Uuid::new_v4(),
        })
    }

    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    /// Tag log lines and events with an existing run id
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Compile every chunk, returning outcomes ordered by chunk index
    pub async fn run_all(
        &self,
        chunks: Vec<Chunk>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ChunkOutcome>> {
        let total = chunks.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        info!(
            "Run {}: compiling {} chunks with max {} parallel workers",
            self.run_id, total, self.max_parallel
        );

        let run_token = cancel.child_token();
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut tasks = JoinSet::new();

        for chunk in chunks {
            let worker = ChunkWorker {
                compiler: Arc::clone(&self.compiler),
                semaphore: Arc::clone(&semaphore),
                cancel: run_token.clone(),
                events: self.events.clone(),
                run_id: self.run_id,
            };
            tasks.spawn(worker.run(chunk));
        }

        // Join barrier: slots are addressed by chunk index, completion order is irrelevant
        let mut slots: Vec<Option<ChunkOutcome>> = vec![None; total];
        let mut failure: Option<ChunkingError> = None;

        while let Some(joined) = tasks.join_next().await {
            let result = joined.map_err(ChunkingError::from).and_then(|r| r);

            match result {
                Ok(outcome) => {
                    let index = outcome.chunk_index;
                    match slots.get_mut(index) {
                        Some(slot) if slot.is_none() => *slot = Some(outcome),
                        _ => {
                            let err = ChunkingError::merge_invariant(format!(
                                "chunk index {} is duplicated or outside 0..{}",
                                index, total
                            ));
                            run_token.cancel();
                            failure = Some(keep_first_failure(failure, err));
                        }
                    }
                }
                Err(err) => {
                    run_token.cancel();
                    failure = Some(keep_first_failure(failure, err));
                }
            }
        }

        if let Some(err) = failure {
            error!("Run {}: chunked compilation aborted: {}", self.run_id, err);
            return Err(err);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    ChunkingError::merge_invariant(format!("chunk {} produced no outcome", index))
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for ParallelCompilationExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelCompilationExecutor")
            .field("max_parallel", &self.max_parallel)
            .field("run_id", &self.run_id)
            .field("events", &self.events)
            .finish()
    }
}

/// A sibling's `Cancelled` can be joined before the failure that caused it.
fn keep_first_failure(current: Option<ChunkingError>, next: ChunkingError) -> ChunkingError {
    match current {
        None => next,
        Some(existing) if existing.is_cancelled() && !next.is_cancelled() => next,
        Some(existing) => existing,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

struct ChunkWorker {
    compiler: Arc<dyn ChunkCompiler>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    events: EventDispatcher,
    run_id: Uuid,
}

impl ChunkWorker {
    async fn run(self, chunk: Chunk) -> Result<ChunkOutcome> {
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ChunkingError::Cancelled),
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                permit.map_err(|_| ChunkingError::Cancelled)?
            }
        };

        debug!(
            "Run {}: starting chunk {}/{} ({} sources)",
            self.run_id,
            chunk.index + 1,
            chunk.total,
            chunk.metadata.sources.len()
        );
        self.events.chunk_started(&ChunkStarted {
            run_id: self.run_id,
            chunk_index: chunk.index,
            total_chunks: chunk.total,
            source_count: chunk.metadata.sources.len(),
        });

        let start_time = Instant::now();
        let compile =
            AssertUnwindSafe(self.compiler.compile(&chunk.config, &self.cancel)).catch_unwind();

        let compiled = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(
                    "Run {}: chunk {}/{} cancelled",
                    self.run_id,
                    chunk.index + 1,
                    chunk.total
                );
                return Err(ChunkingError::Cancelled);
            }
            result = compile => result.unwrap_or_else(|panic| {
                Err(anyhow::anyhow!("delegate panicked: {}", panic_message(&*panic)))
            }),
        };

        match compiled {
            Ok(compiled) => {
                info!(
                    "Run {}: chunk {}/{} complete: {} lines in {}ms",
                    self.run_id,
                    chunk.index + 1,
                    chunk.total,
                    compiled.lines.len(),
                    compiled.elapsed_ms
                );
                self.events.chunk_completed(&ChunkCompleted {
                    run_id: self.run_id,
                    chunk_index: chunk.index,
                    total_chunks: chunk.total,
                    success: true,
                    error_message: None,
                    line_count: compiled.lines.len(),
                    elapsed_ms: compiled.elapsed_ms,
                });

                Ok(ChunkOutcome {
                    chunk_index: chunk.index,
                    lines: compiled.lines,
                    elapsed_ms: compiled.elapsed_ms,
                })
            }
            Err(cause) => {
                // Fail fast: stop siblings before the join loop sees this error
                self.cancel.cancel();

                error!(
                    "Run {}: chunk {}/{} failed: {:#}",
                    self.run_id,
                    chunk.index + 1,
                    chunk.total,
                    cause
                );
                self.events.chunk_completed(&ChunkCompleted {
                    run_id: self.run_id,
                    chunk_index: chunk.index,
                    total_chunks: chunk.total,
                    success: false,
                    error_message: Some(format!("{:#}", cause)),
                    line_count: 0,
                    elapsed_ms: start_time.elapsed().as_millis() as u64,
                });

                Err(ChunkingError::ChunkCompilation {
                    chunk_index: chunk.index,
                    total_chunks: chunk.total,
                    sources: chunk.metadata.source_list(),
                    cause,
                })
            }
        }
    }
}
