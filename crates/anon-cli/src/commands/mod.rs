//! Command implementations
//!
//! Each submodule exposes a `run` entry point called from `main`.

pub mod generate;
pub mod keygen;
pub mod tokenize;
