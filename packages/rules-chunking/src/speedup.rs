use crate::config::ChunkingOptions;

/// Theoretical speedup for a list of `total_rules` rules
///
/// Assumes one worker per `chunk_size` rules, capped at `max_parallel`.
pub fn estimate_speedup(total_rules: usize, options: &ChunkingOptions) -> f64 {
    if options.is_force_off() || total_rules == 0 {
        return 1.0;
    }

    let chunks = total_rules.div_ceil(options.chunk_size.max(1));
    chunks.min(options.max_parallel.max(1)) as f64
}

/// Sum of per-chunk times over wall-clock time
pub fn measured_speedup<I>(chunk_elapsed_ms: I, total_elapsed_ms: u64) -> f64
where
    I: IntoIterator<Item = u64>,
{
    if total_elapsed_ms == 0 {
        return 1.0;
    }

    let mut chunks = 0usize;
    let mut sequential_ms = 0u64;
    for elapsed in chunk_elapsed_ms {
        chunks += 1;
        sequential_ms = sequential_ms.saturating_add(elapsed);
    }

    if chunks == 0 {
        return 1.0;
    }
    sequential_ms as f64 / total_elapsed_ms as f64
}
