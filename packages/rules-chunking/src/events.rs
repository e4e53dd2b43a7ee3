//! Chunk lifecycle events
//!
//! Handlers are notified from executor tasks, so they must be `Send + Sync`
//! and should return quickly.

use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ChunkStarted {
    pub run_id: Uuid,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub source_count: usize,
}

#[derive(Debug, Clone)]
pub struct ChunkCompleted {
    pub run_id: Uuid,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub success: bool,
    pub error_message: Option<String>,
    pub line_count: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ChunksMerging {
    pub run_id: Uuid,
    pub chunk_count: usize,
    pub total_lines_before_merge: usize,
}

#[derive(Debug, Clone)]
pub struct ChunksMerged {
    pub run_id: Uuid,
    pub chunk_count: usize,
    pub total_lines_before_merge: usize,
    pub final_line_count: usize,
    pub duplicates_removed: usize,
    pub elapsed_ms: u64,
}

/// Observer for chunked compilation progress
pub trait ChunkEventHandler: Send + Sync {
    fn on_chunk_started(&self, _event: &ChunkStarted) {}

    fn on_chunk_completed(&self, _event: &ChunkCompleted) {}

    fn on_chunks_merging(&self, _event: &ChunksMerging) {}

    fn on_chunks_merged(&self, _event: &ChunksMerged) {}
}

/// Fans events out to registered handlers
#[derive(Clone, Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn ChunkEventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&mut self, handler: Arc<dyn ChunkEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn chunk_started(&self, event: &ChunkStarted) {
        for handler in &self.handlers {
            handler.on_chunk_started(event);
        }
    }

    pub fn chunk_completed(&self, event: &ChunkCompleted) {
        for handler in &self.handlers {
            handler.on_chunk_completed(event);
        }
    }

    pub fn chunks_merging(&self, event: &ChunksMerging) {
        for handler in &self.handlers {
            handler.on_chunks_merging(event);
        }
    }

    pub fn chunks_merged(&self, event: &ChunksMerged) {
        for handler in &self.handlers {
            handler.on_chunks_merged(event);
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl ChunkEventHandler for Recorder {
        fn on_chunk_started(&self, event: &ChunkStarted) {
            self.seen.lock().push(format!("started {}", event.chunk_index));
        }

        fn on_chunks_merged(&self, event: &ChunksMerged) {
            self.seen
                .lock()
                .push(format!("merged {}", event.duplicates_removed));
        }
    }

    #[test]
    fn test_dispatch_to_all_handlers() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());

        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_handler(first.clone());
        dispatcher.add_handler(second.clone());
        assert_eq!(dispatcher.handler_count(), 2);

        let run_id = Uuid::new_v4();
        dispatcher.chunk_started(&ChunkStarted {
            run_id,
            chunk_index: 3,
            total_chunks: 4,
            source_count: 1,
        });
        dispatcher.chunks_merged(&ChunksMerged {
            run_id,
            chunk_count: 4,
            total_lines_before_merge: 10,
            final_line_count: 8,
            duplicates_removed: 2,
            elapsed_ms: 1,
        });

        assert_eq!(*first.seen.lock(), vec!["started 3", "merged 2"]);
        assert_eq!(*second.seen.lock(), vec!["started 3", "merged 2"]);
    }

    #[test]
    fn test_default_handler_methods_are_noops() {
        struct Silent;
        impl ChunkEventHandler for Silent {}

        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_handler(Arc::new(Silent));
        dispatcher.chunks_merging(&ChunksMerging {
            run_id: Uuid::nil(),
            chunk_count: 1,
            total_lines_before_merge: 0,
        });
    }
}
