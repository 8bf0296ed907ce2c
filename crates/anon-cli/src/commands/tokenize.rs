//! `anonymize tokenize` command implementation

use crate::progress::{format_bytes, BarProgress};
use crate::TokenizeArgs;
use anon_common::Result;
use anon_pipeline::config::{load_secret_key, parse_columns};
use anon_pipeline::{Pipeline, PipelineConfig, RunSummary, Tokenizer};
use colored::Colorize;
use std::fs;

/// Run the tokenization pipeline and print a summary
///
/// Returns the summary so the caller can pick the exit code.
pub async fn run(args: &TokenizeArgs) -> Result<RunSummary> {
    let config = build_config(args);
    config.validate()?;

    let key = load_secret_key()?;
    let pipeline = Pipeline::new(config, Tokenizer::new(&key)?)?;

    let progress = if args.no_progress {
        BarProgress::hidden()
    } else {
        BarProgress::new()
    };
    let summary = pipeline.run(&progress).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(summary)
}

/// Translate command-line arguments into a pipeline configuration
pub fn build_config(args: &TokenizeArgs) -> PipelineConfig {
    let mut config = PipelineConfig::new(
        &args.input,
        &args.output_dir,
        parse_columns(&args.columns),
    )
    .with_chunk_size(args.chunk_size)
    .with_min_file_size(args.min_file_size);

    if let Some(checkpoint) = &args.checkpoint {
        config = config.with_checkpoint(checkpoint);
    }
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    config
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{} Processed {} chunks ({} rows), {} already done",
        "✓".green(),
        summary.processed,
        summary.rows_written,
        summary.skipped
    );

    for path in &summary.combined_files {
        let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        println!("  {} ({})", path.display(), format_bytes(size).dimmed());
    }

    if summary.is_complete() {
        println!("Finished in {:.2}s", summary.duration_seconds);
        return;
    }

    println!(
        "{} {} of {} chunks failed:",
        "✗".red(),
        summary.failed.len(),
        summary.total_chunks
    );
    for failure in &summary.failed {
        println!("  chunk {}: {}", failure.index, failure.reason);
    }
    println!(
        "{}",
        "Output was not consolidated. Re-run the same command to retry the failed chunks."
            .yellow()
    );
}
