//! Anonymizer Pipeline Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Checkpointed, parallel tokenization of sensitive CSV columns.
//!
//! # Stages
//!
//! - [`reader`]: splits the input into numbered chunks
//! - [`processor`]: replaces selected columns with [`tokenizer`] tokens
//! - [`dispatcher`]: runs chunks on a bounded worker pool and commits each
//!   written chunk to the [`checkpoint`] store
//! - [`consolidator`]: merges chunk files into size-bounded combined files
//! - [`pipeline`]: ties the stages together for one run
//!
//! # Example
//!
//! ```no_run
//! use anon_pipeline::config::{load_secret_key, parse_columns, PipelineConfig};
//! use anon_pipeline::{NoProgress, Pipeline, Tokenizer};
//!
//! #[tokio::main]
//! async fn main() -> anon_common::Result<()> {
//!     let tokenizer = Tokenizer::new(&load_secret_key()?)?;
//!     let config = PipelineConfig::new("data/people.csv", "out", parse_columns("first_name,address"));
//!     let summary = Pipeline::new(config, tokenizer)?.run(&NoProgress).await?;
//!     println!("{} chunks processed", summary.processed);
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod config;
pub mod consolidator;
pub mod dispatcher;
pub mod layout;
pub mod pipeline;
pub mod processor;
pub mod reader;
pub mod tokenizer;

// Re-export commonly used types
pub use checkpoint::CheckpointStore;
pub use config::PipelineConfig;
pub use dispatcher::{ChunkFailure, DispatchReport, NoProgress, ProgressReporter};
pub use pipeline::{Pipeline, RunSummary};
pub use processor::{ChunkProcessor, ChunkTransform};
pub use reader::{Chunk, ChunkReader};
pub use tokenizer::Tokenizer;
