//! Pipeline configuration
//!
//! Run settings come from the command line; the secret key comes from the
//! environment (optionally seeded from a `.env` file).

use anon_common::{AnonError, Result};
use std::path::PathBuf;

use crate::checkpoint::DEFAULT_CHECKPOINT_FILE;

// ============================================================================
// Defaults
// ============================================================================

/// Rows per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Minimum size estimate of a combined file before a new one is started
pub const DEFAULT_MIN_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Environment variable holding the tokenization key
pub const TOKENIZATION_KEY_VAR: &str = "TOKENIZATION_KEY";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// CSV input with a header row
    pub input: PathBuf,

    /// Directory for chunk files, combined files and (by default) the checkpoint
    pub output_dir: PathBuf,

    /// Columns to tokenize
    pub columns: Vec<String>,

    pub chunk_size: usize,

    pub min_file_size: u64,

    /// Checkpoint location; `<output_dir>/checkpoint.json` when unset
    pub checkpoint: Option<PathBuf>,

    /// Maximum chunks in flight
    pub concurrency: usize,
}

impl PipelineConfig {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, columns: Vec<String>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            columns,
            chunk_size: DEFAULT_CHUNK_SIZE,
            min_file_size: DEFAULT_MIN_FILE_SIZE,
            checkpoint: None,
            concurrency: default_concurrency(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_min_file_size(mut self, min_file_size: u64) -> Self {
        self.min_file_size = min_file_size;
        self
    }

    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint = Some(path.into());
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.checkpoint
            .clone()
            .unwrap_or_else(|| self.output_dir.join(DEFAULT_CHECKPOINT_FILE))
    }

    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(AnonError::config("at least one column to tokenize is required"));
        }
        if self.chunk_size == 0 {
            return Err(AnonError::config("chunk size must be greater than zero"));
        }
        if self.min_file_size == 0 {
            return Err(AnonError::config("minimum file size must be greater than zero"));
        }
        if self.concurrency == 0 {
            return Err(AnonError::config("concurrency must be greater than zero"));
        }
        Ok(())
    }
}

/// Split a comma-separated column list, dropping blanks
pub fn parse_columns(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .map(str::to_string)
        .collect()
}

/// One worker per available core
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Read the tokenization key, loading `.env` first if one exists
///
/// A missing or empty key is a configuration error.
pub fn load_secret_key() -> Result<String> {
    // A missing .env is fine, the variable may be set directly
    let _ = dotenvy::dotenv();
    secret_key_from(std::env::var(TOKENIZATION_KEY_VAR).ok())
}

fn secret_key_from(value: Option<String>) -> Result<String> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(AnonError::config(format!(
            "{} is not set; run `anonymize keygen` or export it",
            TOKENIZATION_KEY_VAR
        ))),
    }
}
