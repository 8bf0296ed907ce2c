//! Anonymizer CLI Library
//!
//! Command-line interface for anonymizing CSV columns.
//!
//! - **Tokenization**: replace sensitive columns with keyed tokens, resumable
//!   after interruption (`anonymize tokenize`)
//! - **Key provisioning**: write a fresh `TOKENIZATION_KEY` to `.env`
//!   (`anonymize keygen`)
//! - **Test data**: generate a random people CSV (`anonymize generate`)

pub mod commands;
pub mod progress;

use anon_pipeline::config::{DEFAULT_CHUNK_SIZE, DEFAULT_MIN_FILE_SIZE};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Exit code for fatal errors
pub const EXIT_FAILURE: i32 = 1;

/// Exit code when a run finished but some chunks failed
pub const EXIT_INCOMPLETE: i32 = 3;

/// Anonymize sensitive CSV columns with deterministic keyed tokens
#[derive(Parser, Debug)]
#[command(name = "anonymize")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Tokenize columns of a CSV file into size-bounded output files
    Tokenize(TokenizeArgs),

    /// Generate a tokenization key and store it in an env file
    Keygen {
        /// Env file to write
        #[arg(long, default_value = ".env")]
        env_file: PathBuf,

        /// Replace an existing key (previous tokens will no longer match)
        #[arg(short, long)]
        force: bool,
    },

    /// Generate a CSV of random people records for testing
    Generate {
        /// Output CSV path
        file: PathBuf,

        /// Number of records to write
        num_records: u64,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct TokenizeArgs {
    /// Input CSV file with a header row
    pub input: PathBuf,

    /// Directory for chunk files, combined files and the checkpoint
    pub output_dir: PathBuf,

    /// Comma-separated list of columns to tokenize
    pub columns: String,

    /// Rows per chunk
    #[arg(long, env = "ANON_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Minimum size in bytes of each combined file (except the last)
    #[arg(long, env = "ANON_MIN_FILE_SIZE", default_value_t = DEFAULT_MIN_FILE_SIZE)]
    pub min_file_size: u64,

    /// Checkpoint file [default: <OUTPUT_DIR>/checkpoint.json]
    #[arg(long, env = "ANON_CHECKPOINT")]
    pub checkpoint: Option<PathBuf>,

    /// Maximum chunks processed at once [default: number of CPU cores]
    #[arg(long, env = "ANON_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}
