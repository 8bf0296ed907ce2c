//! One anonymization run: dispatch, then consolidate

use anon_common::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::checkpoint::CheckpointStore;
use crate::config::PipelineConfig;
use crate::consolidator::Consolidator;
use crate::dispatcher::{ChunkFailure, DispatchReport, Dispatcher, ProgressReporter};
use crate::processor::ChunkProcessor;
use crate::reader::{chunk_count, count_records, ChunkReader};
use crate::tokenizer::Tokenizer;

/// Outcome of [`Pipeline::run`]
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_chunks: u64,
    pub skipped: u64,
    pub processed: u64,
    pub rows_written: u64,
    pub failed: Vec<ChunkFailure>,
    /// Combined files created by this run, in order
    pub combined_files: Vec<PathBuf>,
    pub duration_seconds: f64,
}

impl RunSummary {
    /// True when every chunk is checkpointed and nothing failed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    tokenizer: Tokenizer,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, tokenizer: Tokenizer) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, tokenizer })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Tokenize all pending chunks and consolidate once every chunk is done
    ///
    /// When some chunks fail, their siblings' chunk files stay on disk and
    /// consolidation is skipped. Running again processes only the missing
    /// chunks and then consolidates everything in order.
    #[instrument(skip_all, fields(input = %self.config.input.display()))]
    pub async fn run(&self, progress: &dyn ProgressReporter) -> Result<RunSummary> {
        let start_time = Instant::now();

        std::fs::create_dir_all(&self.config.output_dir)?;
        let mut store = self.open_checkpoint()?;

        let report = self.dispatch(&mut store, progress).await?;

        let all_committed = (0..report.total_chunks).all(|index| store.contains(index));
        let combined_files = if all_committed {
            self.consolidate()?
        } else {
            warn!(
                failed = report.failed.len(),
                "Some chunks failed; skipping consolidation until a re-run completes them"
            );
            Vec::new()
        };

        let summary = RunSummary {
            total_chunks: report.total_chunks,
            skipped: report.skipped,
            processed: report.processed,
            rows_written: report.rows_written,
            failed: report.failed,
            combined_files,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        };

        info!(
            total_chunks = summary.total_chunks,
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed.len(),
            combined_files = summary.combined_files.len(),
            "Run finished in {:.2}s",
            summary.duration_seconds
        );
        Ok(summary)
    }

    pub fn open_checkpoint(&self) -> Result<CheckpointStore> {
        CheckpointStore::open(self.config.checkpoint_path())
    }

    /// Tokenize and write every chunk not yet in `store`
    pub async fn dispatch(
        &self,
        store: &mut CheckpointStore,
        progress: &dyn ProgressReporter,
    ) -> Result<DispatchReport> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let total_records = count_records(&self.config.input)?;
        let total_chunks = chunk_count(total_records, self.config.chunk_size);
        info!(total_records, total_chunks, chunk_size = self.config.chunk_size, "Input scanned");

        let reader = ChunkReader::from_path(&self.config.input, self.config.chunk_size)?;
        let processor =
            ChunkProcessor::new(self.tokenizer.clone(), reader.headers(), &self.config.columns);
        if processor.positions().is_empty() {
            warn!("None of the requested columns exist in the input; rows are copied unchanged");
        }
        let dispatcher = Dispatcher::new(
            processor,
            reader.headers().clone(),
            &self.config.output_dir,
            self.config.concurrency,
        );

        dispatcher.run(reader, store, total_chunks, progress).await
    }

    /// Merge chunk files left in the output directory
    pub fn consolidate(&self) -> Result<Vec<PathBuf>> {
        Consolidator::new(&self.config.output_dir, self.config.min_file_size).run()
    }
}
