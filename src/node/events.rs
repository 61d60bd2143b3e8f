//! Pipeline events and the observers that receive them.
//!
//! The chunker and assembler report progress through a [`PipelineObserver`]
//! instead of logging directly. [`TracingObserver`] is the usual sink.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info};

/// Which pipeline produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Chunk,
    Verify,
    Assemble,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Chunk => "chunk",
            Operation::Verify => "verify",
            Operation::Assemble => "assemble",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    Started {
        operation: Operation,
        target: PathBuf,
    },
    ChunkCreated {
        index: usize,
        size: usize,
        digest: String,
    },
    ChunkVerified {
        index: usize,
    },
    ChunkAppended {
        index: usize,
    },
    Completed {
        operation: Operation,
        chunk_count: usize,
        total_size: u64,
    },
    Failed {
        operation: Operation,
        reason: String,
    },
}

/// Receives pipeline events. Implementations must not block for long.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Renders events as `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Started { operation, target } => {
                info!(%operation, target = %target.display(), "started");
            }
            PipelineEvent::ChunkCreated {
                index,
                size,
                digest,
            } => {
                debug!(index, size, %digest, "chunk created");
            }
            PipelineEvent::ChunkVerified { index } => debug!(index, "chunk verified"),
            PipelineEvent::ChunkAppended { index } => debug!(index, "chunk appended"),
            PipelineEvent::Completed {
                operation,
                chunk_count,
                total_size,
            } => {
                info!(%operation, chunk_count, total_size, "completed");
            }
            PipelineEvent::Failed { operation, reason } => {
                error!(%operation, %reason, "failed");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn on_event(&self, _event: &PipelineEvent) {}
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        observer.on_event(&PipelineEvent::ChunkVerified { index: 0 });
        observer.on_event(&PipelineEvent::ChunkVerified { index: 1 });
        assert_eq!(
            observer.events(),
            vec![
                PipelineEvent::ChunkVerified { index: 0 },
                PipelineEvent::ChunkVerified { index: 1 },
            ]
        );
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Chunk.to_string(), "chunk");
        assert_eq!(Operation::Assemble.to_string(), "assemble");
    }
}
