//! Test configuration helpers

use history_prefetch::PrefetchConfig;
use tempfile::TempDir;

/// A private scratch directory and a config pointing at it
///
/// The directory must be kept alive for the duration of the test.
pub fn scratch_config(window_size: usize) -> (PrefetchConfig, TempDir) {
    let scratch = tempfile::tempdir().unwrap();
    let config = PrefetchConfig {
        window_size,
        scratch_prefix: "it-revision-".to_string(),
        ..PrefetchConfig::default()
    }
    .scratch_dir(scratch.path());
    (config, scratch)
}
