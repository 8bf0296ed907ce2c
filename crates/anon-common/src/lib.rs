//! Anonymizer Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the anonymizer workspace.
//!
//! - **Error Handling**: [`AnonError`] and the [`Result`] alias used by every
//!   library crate
//! - **Logging**: [`logging::init_logging`] and its [`logging::LogConfig`]
//!
//! # Example
//!
//! ```no_run
//! use anon_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{AnonError, Result};
