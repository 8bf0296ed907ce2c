//! File naming inside the output directory
//!
//! - `chunk_<index>.csv`: one tokenized chunk, written once per attempt
//! - `combined_<seq>.csv`: consolidated output, `seq` counting up from 0

use anon_common::Result;
use csv::StringRecord;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::reader::Chunk;

pub const CHUNK_PREFIX: &str = "chunk_";
pub const COMBINED_PREFIX: &str = "combined_";
pub const EXTENSION: &str = "csv";

pub fn chunk_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("{}{}.{}", CHUNK_PREFIX, index, EXTENSION))
}

pub fn combined_path(dir: &Path, seq: u64) -> PathBuf {
    dir.join(format!("{}{}.{}", COMBINED_PREFIX, seq, EXTENSION))
}

pub fn parse_chunk_index(file_name: &str) -> Option<u64> {
    parse_numbered(file_name, CHUNK_PREFIX)
}

pub fn parse_combined_seq(file_name: &str) -> Option<u64> {
    parse_numbered(file_name, COMBINED_PREFIX)
}

// Only canonical numbers match, so "chunk_01.csv" is not chunk 1
fn parse_numbered(file_name: &str, prefix: &str) -> Option<u64> {
    let digits = file_name
        .strip_prefix(prefix)?
        .strip_suffix(EXTENSION)?
        .strip_suffix('.')?;
    let value: u64 = digits.parse().ok()?;
    (value.to_string() == digits).then_some(value)
}

/// Per-chunk files in `dir`, sorted by ascending chunk index
pub fn list_chunk_files(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let mut files = numbered_files(dir, parse_chunk_index)?;
    files.sort_by_key(|(index, _)| *index);
    Ok(files)
}

/// First combined sequence number not already used in `dir`
pub fn next_combined_seq(dir: &Path) -> Result<u64> {
    Ok(numbered_files(dir, parse_combined_seq)?
        .into_iter()
        .map(|(seq, _)| seq + 1)
        .max()
        .unwrap_or(0))
}

fn numbered_files(dir: &Path, parse: fn(&str) -> Option<u64>) -> Result<Vec<(u64, PathBuf)>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(number) = entry.file_name().to_str().and_then(parse) {
            found.push((number, entry.path()));
        }
    }
    Ok(found)
}

/// Write a complete chunk file (header and rows)
///
/// The file is staged under a temporary name and renamed into place after
/// an fsync, so `chunk_<index>.csv` is either absent or complete. An earlier
/// file for the same index is replaced.
pub fn write_chunk_file(dir: &Path, headers: &StringRecord, chunk: &Chunk) -> Result<PathBuf> {
    let path = chunk_path(dir, chunk.index);
    let mut staged = NamedTempFile::new_in(dir)?;

    {
        let mut writer = csv::Writer::from_writer(staged.as_file_mut());
        writer.write_record(headers)?;
        for row in &chunk.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }

    staged.as_file().sync_all()?;
    staged.persist(&path).map_err(|e| e.error)?;
    Ok(path)
}
