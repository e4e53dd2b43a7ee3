use crate::merger::count_rules;
use crate::planner::ChunkMetadata;
use crate::speedup::measured_speedup;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Per-chunk statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkReport {
    pub metadata: ChunkMetadata,
    pub elapsed_ms: u64,
    /// Lines emitted by the delegate, before merge
    pub line_count: usize,
}

/// Outcome of a chunked (or single-unit) compilation
#[derive(Debug, Clone, Default)]
pub struct ChunkedCompilationResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_elapsed_ms: u64,
    /// Ordered by chunk index; empty for the single-unit path
    pub chunks: Vec<ChunkReport>,
    pub merged_lines: Vec<String>,
    pub duplicates_removed: usize,
}

impl ChunkedCompilationResult {
    pub fn estimated_speedup(&self) -> f64 {
        measured_speedup(
            self.chunks.iter().map(|c| c.elapsed_ms),
            self.total_elapsed_ms,
        )
    }

    pub fn final_rule_count(&self) -> usize {
        count_rules(&self.merged_lines)
    }

    pub fn is_chunked(&self) -> bool {
        !self.chunks.is_empty()
    }
}
