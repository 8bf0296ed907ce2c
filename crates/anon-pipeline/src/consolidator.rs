//! Merge per-chunk files into size-bounded combined files
//!
//! Chunk files are read in ascending index order and their rows streamed into
//! `combined_<seq>.csv`. Once the running size estimate of the open file
//! reaches `min_file_size` the file is closed; the next one is opened only
//! when another row arrives. Each chunk file is deleted as soon as its rows
//! have been copied and flushed.

use anon_common::{AnonError, Result};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::layout::{combined_path, list_chunk_files, next_combined_seq};

/// Size estimate of one serialized row: field bytes, delimiters and newline
///
/// Quoting is not counted.
pub fn estimated_row_size(record: &StringRecord) -> u64 {
    (record.as_slice().len() + record.len()) as u64
}

pub struct Consolidator {
    output_dir: PathBuf,
    min_file_size: u64,
}

impl Consolidator {
    pub fn new(output_dir: impl Into<PathBuf>, min_file_size: u64) -> Self {
        Self {
            output_dir: output_dir.into(),
            min_file_size,
        }
    }

    /// Consolidate every chunk file in the output directory
    ///
    /// Returns the combined files created, in order. With no chunk files
    /// nothing is created.
    pub fn run(&self) -> Result<Vec<PathBuf>> {
        let chunk_files = list_chunk_files(&self.output_dir)?;
        if chunk_files.is_empty() {
            info!(output_dir = %self.output_dir.display(), "No chunk files to consolidate");
            return Ok(Vec::new());
        }

        let first_seq = next_combined_seq(&self.output_dir)?;
        info!(
            chunk_files = chunk_files.len(),
            first_seq,
            min_file_size = self.min_file_size,
            "Consolidating chunk files"
        );

        let mut sink = CombinedSink::new(&self.output_dir, first_seq, self.min_file_size);
        let mut record = StringRecord::new();

        for (index, path) in chunk_files {
            let mut reader = ReaderBuilder::new().has_headers(true).from_path(&path)?;
            sink.expect_headers(index, reader.headers()?)?;

            while reader.read_record(&mut record)? {
                sink.write(&record)?;
            }

            sink.flush()?;
            std::fs::remove_file(&path)?;
            debug!(chunk_index = index, "Chunk file consolidated and removed");
        }

        let created = sink.finish()?;
        info!(combined_files = created.len(), "Consolidation complete");
        Ok(created)
    }
}

struct CombinedFile {
    path: PathBuf,
    writer: csv::Writer<File>,
    size: u64,
}

// Owns the open combined file and rotates it once it is large enough
struct CombinedSink {
    dir: PathBuf,
    next_seq: u64,
    min_file_size: u64,
    headers: Option<StringRecord>,
    current: Option<CombinedFile>,
    created: Vec<PathBuf>,
}

impl CombinedSink {
    fn new(dir: &Path, first_seq: u64, min_file_size: u64) -> Self {
        Self {
            dir: dir.to_path_buf(),
            next_seq: first_seq,
            min_file_size,
            headers: None,
            current: None,
            created: Vec::new(),
        }
    }

    // Every chunk file must carry the same header
    fn expect_headers(&mut self, index: u64, headers: &StringRecord) -> Result<()> {
        match &self.headers {
            None => {
                self.headers = Some(headers.clone());
                Ok(())
            },
            Some(expected) if expected == headers => Ok(()),
            Some(expected) => Err(AnonError::consolidation(format!(
                "chunk {} has header {:?}, expected {:?}",
                index,
                headers.iter().collect::<Vec<_>>(),
                expected.iter().collect::<Vec<_>>()
            ))),
        }
    }

    fn write(&mut self, record: &StringRecord) -> Result<()> {
        let mut file = match self.current.take() {
            Some(file) => file,
            None => self.open_next()?,
        };

        file.writer.write_record(record)?;
        file.size += estimated_row_size(record);

        if file.size >= self.min_file_size {
            Self::close(file)?;
        } else {
            self.current = Some(file);
        }
        Ok(())
    }

    // Rows must be on disk before their chunk file is removed
    fn flush(&mut self) -> Result<()> {
        if let Some(file) = self.current.as_mut() {
            file.writer.flush()?;
            file.writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<PathBuf>> {
        if let Some(file) = self.current.take() {
            Self::close(file)?;
        }
        Ok(self.created)
    }

    fn open_next(&mut self) -> Result<CombinedFile> {
        let headers = self
            .headers
            .as_ref()
            .ok_or_else(|| AnonError::consolidation("row written before header"))?;

        let path = combined_path(&self.dir, self.next_seq);
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(headers)?;

        debug!(path = %path.display(), "Opened combined file");
        self.next_seq += 1;
        self.created.push(path.clone());
        Ok(CombinedFile {
            path,
            writer,
            size: 0,
        })
    }

    fn close(mut file: CombinedFile) -> Result<()> {
        file.writer.flush()?;
        file.writer.get_ref().sync_all()?;
        info!(path = %file.path.display(), estimated_size = file.size, "Closed combined file");
        Ok(())
    }
}
