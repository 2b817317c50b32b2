//! Scratch directory assertions

use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// Every file currently under `dir`
pub fn scratch_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// Panic unless `dir` holds no files
pub fn assert_no_scratch_files(dir: &Path) {
    let files = scratch_files(dir);
    assert!(files.is_empty(), "leaked scratch files: {files:?}");
}

/// Poll until `dir` holds no files, panicking after `timeout`
pub async fn wait_for_no_scratch_files(dir: &Path, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    while !scratch_files(dir).is_empty() {
        if tokio::time::Instant::now() >= deadline {
            assert_no_scratch_files(dir);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
