//! Progress bar for tokenization runs

use anon_pipeline::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};

/// Create a chunk counter bar
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} chunks ({eta})")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Reports dispatch progress on an `indicatif` bar
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        Self {
            bar: create_progress_bar(0, "Tokenizing"),
        }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for BarProgress {
    fn start(&self, total_chunks: u64, already_done: u64) {
        self.bar.set_length(total_chunks);
        self.bar.set_position(already_done);
        if already_done > 0 {
            self.bar
                .set_message(format!("Resuming, {} chunks already done", already_done));
        }
    }

    fn chunk_committed(&self, _index: u64, done: u64, total: u64) {
        self.bar.set_position(done);
        self.bar.set_message(format!("Processed {}/{} chunks", done, total));
    }

    fn chunk_failed(&self, index: u64, reason: &str) {
        self.bar.println(format!("chunk {} failed: {}", index, reason));
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.00 MB");
    }

    #[test]
    fn test_bar_tracks_chunks() {
        let progress = BarProgress::hidden();
        progress.start(10, 4);
        progress.chunk_committed(7, 5, 10);

        assert_eq!(progress.bar.length(), Some(10));
        assert_eq!(progress.bar.position(), 5);
    }
}
