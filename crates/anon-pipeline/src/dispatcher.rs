//! Parallel chunk dispatch
//!
//! Chunks are read on a blocking thread and passed over a bounded channel
//! to at most `concurrency` blocking workers at a time. Each worker tokenizes its chunk
//! and writes `chunk_<index>.csv`, then returns a [`ChunkOutcome`]. The
//! dispatch loop is the only place that touches the checkpoint store: it
//! commits each written chunk in completion order and reports progress.
//!
//! A failed chunk is logged and recorded but never stops its siblings. It is
//! left out of the checkpoint, so the next run picks it up again.

use anon_common::{AnonError, Result};
use csv::StringRecord;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::checkpoint::CheckpointStore;
use crate::layout::write_chunk_file;
use crate::processor::{ChunkProcessor, ChunkTransform};
use crate::reader::Chunk;

/// Result of one worker
#[derive(Debug)]
pub enum ChunkOutcome {
    Written {
        index: u64,
        path: PathBuf,
        rows: usize,
    },
    Failed {
        index: u64,
        error: AnonError,
    },
}

/// A chunk that could not be written in this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkFailure {
    pub index: u64,
    pub reason: String,
}

/// What a dispatch pass did
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    /// Chunks in the input
    pub total_chunks: u64,
    /// Chunks already checkpointed before this run
    pub skipped: u64,
    /// Chunks written and committed in this run
    pub processed: u64,
    /// Rows written in this run
    pub rows_written: u64,
    /// Chunks that failed, sorted by index
    pub failed: Vec<ChunkFailure>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Receives progress notifications from the dispatch loop
///
/// All methods are called from the single dispatch task, never from workers.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, _total_chunks: u64, _already_done: u64) {}

    fn chunk_committed(&self, index: u64, done: u64, total: u64);

    fn chunk_failed(&self, _index: u64, _reason: &str) {}

    fn finish(&self) {}
}

/// Reporter that relies on the dispatch logs alone
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn chunk_committed(&self, _index: u64, _done: u64, _total: u64) {}
}

// Read-only state shared by every worker
struct WorkerContext<T> {
    processor: T,
    headers: StringRecord,
    output_dir: PathBuf,
}

impl<T: ChunkTransform> WorkerContext<T> {
    fn run(&self, chunk: Chunk) -> ChunkOutcome {
        let index = chunk.index;
        let rows = chunk.rows.len();
        let tokenized = self.processor.process(chunk);

        match write_chunk_file(&self.output_dir, &self.headers, &tokenized) {
            Ok(path) => ChunkOutcome::Written { index, path, rows },
            Err(e) => ChunkOutcome::Failed {
                index,
                error: AnonError::chunk(index, e.to_string()),
            },
        }
    }
}

pub struct Dispatcher<T = ChunkProcessor> {
    context: Arc<WorkerContext<T>>,
    concurrency: usize,
}

impl<T: ChunkTransform> Dispatcher<T> {
    pub fn new(
        processor: T,
        headers: StringRecord,
        output_dir: impl Into<PathBuf>,
        concurrency: usize,
    ) -> Self {
        Self {
            context: Arc::new(WorkerContext {
                processor,
                headers,
                output_dir: output_dir.into(),
            }),
            concurrency: concurrency.max(1),
        }
    }

    /// Process every chunk not yet in `store`
    ///
    /// Input errors abort the run, as do checkpoint write errors. Chunk
    /// processing and write errors end up in [`DispatchReport::failed`].
    pub async fn run<I>(
        &self,
        chunks: I,
        store: &mut CheckpointStore,
        total_chunks: u64,
        progress: &dyn ProgressReporter,
    ) -> Result<DispatchReport>
    where
        I: Iterator<Item = Result<Chunk>> + Send + 'static,
    {
        let completed = store.completed().clone();
        let skipped = completed.range(..total_chunks).count() as u64;

        let mut report = DispatchReport {
            total_chunks,
            skipped,
            ..Default::default()
        };

        info!(
            total_chunks,
            skipped,
            concurrency = self.concurrency,
            "Dispatching chunks"
        );
        progress.start(total_chunks, skipped);

        // CSV parsing is blocking I/O, so the reader gets its own thread
        let (sender, receiver) = mpsc::channel::<Result<Chunk>>(self.concurrency);
        let reader = tokio::task::spawn_blocking(move || {
            for chunk in chunks {
                if matches!(&chunk, Ok(pending) if completed.contains(&pending.index)) {
                    continue;
                }
                // A closed channel means dispatch stopped early
                if sender.blocking_send(chunk).is_err() {
                    break;
                }
            }
        });

        let pending = stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|chunk| (chunk, receiver))
        });

        let outcomes = pending
            .map(|chunk| {
                let context = Arc::clone(&self.context);
                async move {
                    let chunk = chunk?;
                    let index = chunk.index;
                    debug!(chunk_index = index, rows = chunk.rows.len(), "Chunk dispatched");

                    let outcome = tokio::task::spawn_blocking(move || context.run(chunk))
                        .await
                        .unwrap_or_else(|e| ChunkOutcome::Failed {
                            index,
                            error: AnonError::chunk(index, format!("worker aborted: {}", e)),
                        });
                    Ok::<_, AnonError>(outcome)
                }
            })
            .buffer_unordered(self.concurrency);
        let mut outcomes = std::pin::pin!(outcomes);

        let mut done = skipped;
        while let Some(outcome) = outcomes.next().await {
            match outcome? {
                ChunkOutcome::Written { index, path, rows } => {
                    store.commit(index)?;
                    done += 1;
                    report.processed += 1;
                    report.rows_written += rows as u64;

                    info!(
                        chunk_index = index,
                        path = %path.display(),
                        "Processed {}/{} chunks",
                        done,
                        total_chunks
                    );
                    progress.chunk_committed(index, done, total_chunks);
                },
                ChunkOutcome::Failed { index, error } => {
                    error!(
                        chunk_index = index,
                        error = %error,
                        "Chunk failed, it will be retried on the next run"
                    );
                    let reason = error.to_string();
                    progress.chunk_failed(index, &reason);
                    report.failed.push(ChunkFailure { index, reason });
                },
            }
        }

        reader
            .await
            .map_err(|e| AnonError::input(format!("chunk reader stopped: {}", e)))?;

        progress.finish();
        report.failed.sort_by_key(|failure| failure.index);

        info!(
            processed = report.processed,
            failed = report.failed.len(),
            "Dispatch finished"
        );
        Ok(report)
    }
}
