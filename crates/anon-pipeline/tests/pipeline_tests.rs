//! End-to-end pipeline tests
//!
//! Each test runs the full reader -> dispatcher -> consolidator flow against a
//! scratch directory and checks the on-disk artifacts.

use anon_pipeline::config::PipelineConfig;
use anon_pipeline::consolidator::estimated_row_size;
use anon_pipeline::layout::{chunk_path, combined_path, list_chunk_files};
use anon_pipeline::{CheckpointStore, NoProgress, Pipeline, Tokenizer};
use csv::StringRecord;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const KEY: &str = "integration-test-key";

struct Fixture {
    _dir: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Fixture {
    /// Input with `rows` rows: id, name, email, city
    fn new(rows: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("people.csv");
        let output = dir.path().join("out");

        let mut writer = csv::Writer::from_path(&input).unwrap();
        writer.write_record(["id", "name", "email", "city"]).unwrap();
        for i in 0..rows {
            writer
                .write_record([
                    i.to_string(),
                    format!("person-{}", i),
                    format!("person-{}@example.com", i),
                    format!("City, {}", i % 7),
                ])
                .unwrap();
        }
        writer.flush().unwrap();

        Self {
            _dir: dir,
            input,
            output,
        }
    }

    fn config(&self, chunk_size: usize) -> PipelineConfig {
        PipelineConfig::new(
            &self.input,
            &self.output,
            vec!["name".to_string(), "email".to_string()],
        )
        .with_chunk_size(chunk_size)
        .with_concurrency(4)
    }

    fn pipeline(&self, config: PipelineConfig) -> Pipeline {
        Pipeline::new(config, Tokenizer::new(KEY).unwrap()).unwrap()
    }

    fn input_rows(&self) -> Vec<StringRecord> {
        read_rows(&self.input)
    }
}

fn read_rows(path: &Path) -> Vec<StringRecord> {
    csv::Reader::from_path(path)
        .unwrap()
        .records()
        .map(|r| r.unwrap())
        .collect()
}

fn combined_rows(files: &[PathBuf]) -> Vec<StringRecord> {
    files.iter().flat_map(|path| read_rows(path)).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_run_preserves_order_and_untouched_columns() {
    let fixture = Fixture::new(1_003);
    let summary = fixture
        .pipeline(fixture.config(100))
        .run(&NoProgress)
        .await
        .unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.total_chunks, 11);
    assert_eq!(summary.processed, 11);
    assert_eq!(summary.rows_written, 1_003);
    assert_eq!(summary.combined_files, vec![combined_path(&fixture.output, 0)]);
    assert!(list_chunk_files(&fixture.output).unwrap().is_empty());

    let tokenizer = Tokenizer::new(KEY).unwrap();
    let input = fixture.input_rows();
    let output = combined_rows(&summary.combined_files);
    assert_eq!(output.len(), input.len());

    for (original, anonymized) in input.iter().zip(&output) {
        // Untouched columns are byte-identical and in input order
        assert_eq!(&original[0], &anonymized[0]);
        assert_eq!(&original[3], &anonymized[3]);
        assert_eq!(tokenizer.tokenize(&original[1]), &anonymized[1]);
        assert_eq!(tokenizer.tokenize(&original[2]), &anonymized[2]);
    }
}

#[tokio::test]
async fn test_plaintext_never_reaches_output() {
    let fixture = Fixture::new(50);
    let summary = fixture
        .pipeline(fixture.config(8))
        .run(&NoProgress)
        .await
        .unwrap();

    let output: String = summary
        .combined_files
        .iter()
        .map(|path| std::fs::read_to_string(path).unwrap())
        .collect();

    for row in fixture.input_rows() {
        assert!(!output.contains(&row[1]), "name {} leaked", &row[1]);
        assert!(!output.contains(&row[2]), "email {} leaked", &row[2]);
    }
}

#[tokio::test]
async fn test_completeness_without_duplicates() {
    let fixture = Fixture::new(97);
    let config = fixture.config(10).with_min_file_size(u64::MAX);
    let pipeline = fixture.pipeline(config);
    let mut store = pipeline.open_checkpoint().unwrap();

    let report = pipeline.dispatch(&mut store, &NoProgress).await.unwrap();
    assert_eq!(report.total_chunks, 10);
    assert_eq!(store.len(), 10);

    let chunk_files = list_chunk_files(&fixture.output).unwrap();
    assert_eq!(chunk_files.len(), 10);

    let mut ids: Vec<u64> = chunk_files
        .iter()
        .flat_map(|(_, path)| read_rows(path))
        .map(|row| row[0].parse().unwrap())
        .collect();
    assert_eq!(read_rows(&chunk_files[9].1).len(), 7);
    ids.sort_unstable();
    assert_eq!(ids, (0..97).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_reprocessing_a_chunk_is_byte_identical() {
    let fixture = Fixture::new(40);
    let pipeline = fixture.pipeline(fixture.config(10));
    let mut store = pipeline.open_checkpoint().unwrap();
    pipeline.dispatch(&mut store, &NoProgress).await.unwrap();

    let path = chunk_path(&fixture.output, 2);
    let first = std::fs::read(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(store.remove(2).unwrap());

    // A fresh process would reopen the store from disk
    let mut store = pipeline.open_checkpoint().unwrap();
    let report = pipeline.dispatch(&mut store, &NoProgress).await.unwrap();

    assert_eq!(report.skipped, 3);
    assert_eq!(report.processed, 1);
    assert_eq!(std::fs::read(&path).unwrap(), first);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_partial_failure_then_resume() {
    let fixture = Fixture::new(45);
    std::fs::create_dir_all(&fixture.output).unwrap();
    // A directory squatting on chunk 3's file name makes its write fail
    let blocker = chunk_path(&fixture.output, 3);
    std::fs::create_dir(&blocker).unwrap();

    let pipeline = fixture.pipeline(fixture.config(10).with_min_file_size(200));
    let first = pipeline.run(&NoProgress).await.unwrap();

    assert!(!first.is_complete());
    assert_eq!(first.failed.len(), 1);
    assert_eq!(first.failed[0].index, 3);
    assert_eq!(first.processed, 4);
    assert!(first.combined_files.is_empty());

    let store = CheckpointStore::open(fixture.config(10).checkpoint_path()).unwrap();
    assert_eq!(store.completed().iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 4]);

    std::fs::remove_dir(&blocker).unwrap();
    let second = pipeline.run(&NoProgress).await.unwrap();

    assert!(second.is_complete());
    assert_eq!(second.skipped, 4);
    assert_eq!(second.processed, 1);
    assert!(!second.combined_files.is_empty());

    let ids: Vec<u64> = combined_rows(&second.combined_files)
        .iter()
        .map(|row| row[0].parse().unwrap())
        .collect();
    assert_eq!(ids, (0..45).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_combined_files_respect_min_size() {
    let fixture = Fixture::new(300);
    let min_file_size = 2_000;
    let summary = fixture
        .pipeline(fixture.config(25).with_min_file_size(min_file_size))
        .run(&NoProgress)
        .await
        .unwrap();

    assert!(summary.combined_files.len() > 1);
    let (last, full) = summary.combined_files.split_last().unwrap();
    for path in full {
        let size: u64 = read_rows(path).iter().map(estimated_row_size).sum();
        assert!(size >= min_file_size, "{} closed at {}", path.display(), size);
    }
    assert!(!read_rows(last).is_empty());
}

#[tokio::test]
async fn test_second_run_after_completion_does_nothing() {
    let fixture = Fixture::new(30);
    let pipeline = fixture.pipeline(fixture.config(10));
    pipeline.run(&NoProgress).await.unwrap();
    let before = std::fs::read(combined_path(&fixture.output, 0)).unwrap();

    let again = pipeline.run(&NoProgress).await.unwrap();

    assert_eq!(again.skipped, 3);
    assert_eq!(again.processed, 0);
    assert!(again.combined_files.is_empty());
    assert_eq!(std::fs::read(combined_path(&fixture.output, 0)).unwrap(), before);
}

#[tokio::test]
async fn test_chunk_size_larger_than_input_is_one_chunk() {
    let fixture = Fixture::new(2);
    let summary = fixture
        .pipeline(fixture.config(usize::MAX))
        .run(&NoProgress)
        .await
        .unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.total_chunks, 1);
    assert_eq!(summary.rows_written, 2);
    assert_eq!(combined_rows(&summary.combined_files).len(), 2);
}

#[tokio::test]
async fn test_header_only_input_creates_no_files() {
    let fixture = Fixture::new(0);
    let summary = fixture
        .pipeline(fixture.config(10))
        .run(&NoProgress)
        .await
        .unwrap();

    assert_eq!(summary.total_chunks, 0);
    assert!(summary.combined_files.is_empty());
    assert!(!combined_path(&fixture.output, 0).exists());
}

#[tokio::test]
async fn test_corrupt_checkpoint_aborts_before_work() {
    let fixture = Fixture::new(20);
    std::fs::create_dir_all(&fixture.output).unwrap();
    std::fs::write(fixture.output.join("checkpoint.json"), "not json").unwrap();

    let result = fixture.pipeline(fixture.config(10)).run(&NoProgress).await;

    assert!(matches!(
        result,
        Err(anon_common::AnonError::CheckpointCorrupt { .. })
    ));
    assert!(list_chunk_files(&fixture.output).unwrap().is_empty());
}
