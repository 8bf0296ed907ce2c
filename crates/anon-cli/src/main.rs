//! anonymize CLI - Main entry point

use anon_cli::{commands, Cli, Commands, EXIT_FAILURE, EXIT_INCOMPLETE};
use anon_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use clap::Parser;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The progress bar owns the terminal unless it is disabled
    let level = match &cli.command {
        _ if cli.verbose => LogLevel::Debug,
        Commands::Tokenize(args) if args.no_progress => LogLevel::Info,
        _ => LogLevel::Warn,
    };
    let log_config = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("anonymize")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // CLI should work without logging
    let guard = init_logging(&log_config).ok().flatten();

    let code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            EXIT_FAILURE
        },
    };

    // Flush file logs before exiting
    drop(guard);
    if code != 0 {
        process::exit(code);
    }
}

/// Execute the CLI command, returning the process exit code
async fn execute_command(cli: &Cli) -> anon_common::Result<i32> {
    match &cli.command {
        Commands::Tokenize(args) => {
            let summary = commands::tokenize::run(args).await?;
            Ok(if summary.is_complete() { 0 } else { EXIT_INCOMPLETE })
        },
        Commands::Keygen { env_file, force } => {
            commands::keygen::run(env_file, *force)?;
            Ok(0)
        },
        Commands::Generate {
            file,
            num_records,
            seed,
        } => {
            commands::generate::run(file, *num_records, *seed)?;
            Ok(0)
        },
    }
}
