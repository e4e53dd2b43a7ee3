//! Merge per-chunk output into one rule list
//!
//! Lines are concatenated in chunk-index order and never reordered. Only rule
//! lines are deduplicated (exact string match, first occurrence wins); comment
//! and blank lines are kept in place so repeated section headers from
//! different chunks survive.

use crate::error::{ChunkingError, Result};
use crate::executor::ChunkOutcome;
use std::collections::HashSet;
use tracing::{debug, info};

/// Line classification used during merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    Comment,
    Blank,
    Rule,
}

pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim_start();
    if trimmed.starts_with('!') || trimmed.starts_with('#') {
        LineKind::Comment
    } else if trimmed.trim_end().is_empty() {
        LineKind::Blank
    } else {
        LineKind::Rule
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeResult {
    pub lines: Vec<String>,
    pub duplicates_removed: usize,
}

impl MergeResult {
    /// Rule lines in the merged output
    pub fn rule_count(&self) -> usize {
        count_rules(&self.lines)
    }
}

pub(crate) fn count_rules(lines: &[String]) -> usize {
    lines
        .iter()
        .filter(|line| classify_line(line) == LineKind::Rule)
        .count()
}

/// Merge line lists already ordered by chunk index
pub fn merge_chunks(chunk_results: &[Vec<String>]) -> MergeResult {
    merge_blocks(chunk_results.iter().map(Vec::as_slice))
}

/// Merge executor outcomes
///
/// Outcomes must carry indices `0..n` in ascending order.
pub fn merge_outcomes(outcomes: &[ChunkOutcome]) -> Result<MergeResult> {
    for (position, outcome) in outcomes.iter().enumerate() {
        if outcome.chunk_index != position {
            return Err(ChunkingError::merge_invariant(format!(
                "expected chunk {} at position {}, found chunk {}",
                position, position, outcome.chunk_index
            )));
        }
    }

    Ok(merge_blocks(outcomes.iter().map(|o| o.lines.as_slice())))
}

fn merge_blocks<'a, I>(blocks: I) -> MergeResult
where
    I: Iterator<Item = &'a [String]> + Clone,
{
    let chunk_count = blocks.clone().count();
    let total_before: usize = blocks.clone().map(<[String]>::len).sum();
    debug!(
        "Merging {} chunks ({} lines before deduplication)",
        chunk_count, total_before
    );

    let mut seen: HashSet<&str> = HashSet::new();
    let mut lines = Vec::with_capacity(total_before);
    let mut duplicates_removed = 0;

    for line in blocks.flatten() {
        match classify_line(line) {
            LineKind::Comment | LineKind::Blank => lines.push(line.clone()),
            LineKind::Rule => {
                if seen.insert(line.as_str()) {
                    lines.push(line.clone());
                } else {
                    duplicates_removed += 1;
                }
            }
        }
    }

    info!(
        "Merged to {} lines (removed {} duplicates)",
        lines.len(),
        duplicates_removed
    );

    MergeResult {
        lines,
        duplicates_removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn outcome(index: usize, items: &[&str]) -> ChunkOutcome {
        ChunkOutcome {
            chunk_index: index,
            lines: lines(items),
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_classify_line() {
        assert_eq!(classify_line("! Title: x"), LineKind::Comment);
        assert_eq!(classify_line("   # hosts comment"), LineKind::Comment);
        assert_eq!(classify_line(""), LineKind::Blank);
        assert_eq!(classify_line(" \t "), LineKind::Blank);
        assert_eq!(classify_line("||example.com^"), LineKind::Rule);
        assert_eq!(classify_line("0.0.0.0 ads.example.com"), LineKind::Rule);
        assert_eq!(classify_line("example.com##.banner"), LineKind::Rule);
    }

    #[test]
    fn test_merge_chunks_keeps_repeated_comments() {
        let result = merge_chunks(&[lines(&["!c", "r1"]), lines(&["!c", "r2"])]);
        assert_eq!(result.lines, lines(&["!c", "r1", "!c", "r2"]));
        assert_eq!(result.duplicates_removed, 0);
    }

    #[test]
    fn test_merge_chunks_removes_duplicate_rules() {
        let result = merge_chunks(&[lines(&["r1", "r2"]), lines(&["r1", "r3"])]);
        assert_eq!(result.lines, lines(&["r1", "r2", "r3"]));
        assert_eq!(result.duplicates_removed, 1);
    }

    #[test]
    fn test_merge_chunks_preserves_order() {
        let result = merge_chunks(&[lines(&["a", "b"]), lines(&["c", "d"])]);
        assert_eq!(result.lines, lines(&["a", "b", "c", "d"]));
    }

    #[test]
    fn test_merge_chunks_preserves_empty_lines() {
        let result = merge_chunks(&[
            lines(&["||example.com^", "", "||test.com^"]),
            lines(&["||other.com^", "", ""]),
        ]);
        assert_eq!(result.lines.len(), 6);
        assert_eq!(result.duplicates_removed, 0);
        assert_eq!(result.rule_count(), 3);
    }

    #[test]
    fn test_merge_dedups_within_a_single_chunk() {
        let result = merge_chunks(&[lines(&["r1", "! x", "r1"])]);
        assert_eq!(result.lines, lines(&["r1", "! x"]));
        assert_eq!(result.duplicates_removed, 1);
    }

    #[test]
    fn test_merge_equality_is_exact() {
        let result = merge_chunks(&[lines(&["||a.com^", "||A.com^", "||a.com^ "])]);
        assert_eq!(result.lines.len(), 3);
        assert_eq!(result.duplicates_removed, 0);
    }

    #[test]
    fn test_merge_empty() {
        let result = merge_chunks(&[]);
        assert!(result.lines.is_empty());
        assert_eq!(result.duplicates_removed, 0);
    }

    #[test]
    fn test_merge_outcomes_in_order() {
        let result =
            merge_outcomes(&[outcome(0, &["! a", "r1"]), outcome(1, &["! a", "r1", "r2"])])
                .unwrap();
        assert_eq!(result.lines, lines(&["! a", "r1", "! a", "r2"]));
        assert_eq!(result.duplicates_removed, 1);
    }

    #[test]
    fn test_merge_outcomes_rejects_out_of_order() {
        let err = merge_outcomes(&[outcome(1, &["r"]), outcome(0, &["r"])]).unwrap_err();
        assert!(matches!(err, ChunkingError::MergeInvariantViolation(_)));
    }

    #[test]
    fn test_merge_outcomes_rejects_gap() {
        let err = merge_outcomes(&[outcome(0, &["r"]), outcome(2, &["r"])]).unwrap_err();
        assert!(matches!(err, ChunkingError::MergeInvariantViolation(_)));
    }
}
