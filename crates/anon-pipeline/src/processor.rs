//! Column tokenization for one chunk

use csv::StringRecord;
use tracing::warn;

use crate::reader::Chunk;
use crate::tokenizer::Tokenizer;

/// Replaces the values of selected columns with tokens
///
/// Column names are resolved against the header once. Requested columns
/// that the input does not have are ignored. `process` does no I/O and holds
/// no mutable state, so one processor can be shared by every worker.
#[derive(Debug, Clone)]
pub struct ChunkProcessor {
    tokenizer: Tokenizer,
    // Sorted, deduplicated column positions
    positions: Vec<usize>,
}

impl ChunkProcessor {
    pub fn new(tokenizer: Tokenizer, headers: &StringRecord, columns: &[String]) -> Self {
        let mut positions = Vec::with_capacity(columns.len());
        for column in columns {
            match headers.iter().position(|header| header == column.as_str()) {
                Some(position) => positions.push(position),
                None => warn!(column = %column, "Column not present in input, leaving it untouched"),
            }
        }
        positions.sort_unstable();
        positions.dedup();

        Self {
            tokenizer,
            positions,
        }
    }

    /// Positions of the columns that will be tokenized
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    fn process_row(&self, row: &StringRecord) -> StringRecord {
        let mut out = StringRecord::with_capacity(row.as_slice().len(), row.len());
        for (position, value) in row.iter().enumerate() {
            if self.positions.binary_search(&position).is_ok() {
                out.push_field(&self.tokenizer.tokenize(value));
            } else {
                out.push_field(value);
            }
        }
        out
    }
}

/// Transform applied to each chunk by the dispatcher's workers
///
/// Implementations run on blocking worker threads and must not touch shared
/// mutable state.
pub trait ChunkTransform: Send + Sync + 'static {
    fn process(&self, chunk: Chunk) -> Chunk;
}

impl ChunkTransform for ChunkProcessor {
    fn process(&self, chunk: Chunk) -> Chunk {
        if self.positions.is_empty() {
            return chunk;
        }

        let rows = chunk.rows.iter().map(|row| self.process_row(row)).collect();
        Chunk {
            index: chunk.index,
            rows,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn processor(columns: &[&str]) -> ChunkProcessor {
        let headers = StringRecord::from(vec!["id", "name", "email"]);
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        ChunkProcessor::new(Tokenizer::new("secret").unwrap(), &headers, &columns)
    }

    fn chunk() -> Chunk {
        Chunk {
            index: 7,
            rows: vec![
                StringRecord::from(vec!["1", "alice", "a@example.com"]),
                StringRecord::from(vec!["2", "bob", "b@example.com"]),
            ],
        }
    }

    #[test]
    fn test_tokenizes_selected_columns_only() {
        let out = processor(&["name"]).process(chunk());

        assert_eq!(out.index, 7);
        assert_eq!(&out.rows[0][0], "1");
        assert_eq!(&out.rows[0][1], "d7e3797855cb8e42");
        assert_eq!(&out.rows[0][2], "a@example.com");
        assert_eq!(&out.rows[1][1], "d29ac9af39173371");
    }

    #[test]
    fn test_unknown_columns_are_ignored() {
        let p = processor(&["ssn", "email"]);
        assert_eq!(p.positions(), &[2]);

        let out = p.process(chunk());
        assert_eq!(&out.rows[0][1], "alice");
        assert_ne!(&out.rows[0][2], "a@example.com");
    }

    #[test]
    fn test_duplicate_columns_tokenized_once() {
        let once = processor(&["name"]).process(chunk());
        let twice = processor(&["name", "name"]).process(chunk());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_columns_is_identity() {
        assert_eq!(processor(&[]).process(chunk()), chunk());
    }
}
