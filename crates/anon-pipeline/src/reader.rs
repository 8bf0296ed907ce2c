//! Chunked CSV reading
//!
//! [`ChunkReader`] turns a CSV stream into a lazy sequence of [`Chunk`]s.
//! Chunk indices are assigned by position only, so reading the same input
//! twice always yields the same `index -> rows` mapping. Checkpoints rely on
//! this.

use anon_common::{AnonError, Result};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use std::fs::File;
use std::io::Read;
use std::path::Path;

// Upper bound on rows reserved up front; larger chunks grow as they fill
const MAX_PREALLOCATED_ROWS: usize = 4096;

/// A batch of consecutive input rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based position of this chunk in the input
    pub index: u64,

    /// Rows in input order, aligned with the header
    pub rows: Vec<StringRecord>,
}

/// Lazy iterator of chunks over a CSV source with a header row
pub struct ChunkReader<R: Read> {
    records: StringRecordsIntoIter<R>,
    headers: StringRecord,
    chunk_size: usize,
    next_index: u64,
    finished: bool,
}

impl ChunkReader<File> {
    /// Open a CSV file for chunked reading
    pub fn from_path(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            AnonError::input(format!("cannot open '{}': {}", path.display(), e))
        })?;
        Self::from_reader(file, chunk_size)
    }
}

impl<R: Read> ChunkReader<R> {
    /// Wrap any reader; the first line must be the header row
    pub fn from_reader(reader: R, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AnonError::config("chunk size must be greater than zero"));
        }

        let mut reader = strict_reader().from_reader(reader);
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(AnonError::input("input has no header row"));
        }

        Ok(Self {
            records: reader.into_records(),
            headers,
            chunk_size,
            next_index: 0,
            finished: false,
        })
    }

    /// Column names of the input
    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut rows = Vec::with_capacity(self.chunk_size.min(MAX_PREALLOCATED_ROWS));
        while rows.len() < self.chunk_size {
            match self.records.next() {
                Some(Ok(record)) => rows.push(record),
                Some(Err(e)) => {
                    // A malformed row poisons the whole run
                    self.finished = true;
                    return Some(Err(e.into()));
                },
                None => {
                    self.finished = true;
                    break;
                },
            }
        }

        if rows.is_empty() {
            return None;
        }

        let chunk = Chunk {
            index: self.next_index,
            rows,
        };
        self.next_index += 1;
        Some(Ok(chunk))
    }
}

/// Count data rows (header excluded) in one streaming pass
pub fn count_records(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let mut reader = strict_reader()
        .from_path(path)
        .map_err(|e| AnonError::input(format!("cannot open '{}': {}", path.display(), e)))?;

    let mut record = csv::ByteRecord::new();
    let mut count = 0u64;
    while reader.read_byte_record(&mut record)? {
        count += 1;
    }
    Ok(count)
}

/// Number of chunks needed for `records` rows
pub fn chunk_count(records: u64, chunk_size: usize) -> u64 {
    records.div_ceil(chunk_size as u64)
}

fn strict_reader() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(true).flexible(false);
    builder
}
