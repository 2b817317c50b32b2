//! Configuration types for history-prefetch

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefetch window configuration
///
/// Every field has a default, so an empty JSON/TOML object deserializes into
/// a usable configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefetchConfig {
    /// Number of revisions fetched ahead of the read position (default: 10)
    ///
    /// Also the maximum number of downloads running at once.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Directory for scratch files (default: the system temporary directory)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// File name prefix for scratch files (default: "revision-")
    #[serde(default = "default_scratch_prefix")]
    pub scratch_prefix: String,

    /// Capacity of the event broadcast channel (default: 256)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            scratch_dir: None,
            scratch_prefix: default_scratch_prefix(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl PrefetchConfig {
    /// Config with the given window size and defaults for everything else
    pub fn with_window_size(window_size: usize) -> Self {
        Self {
            window_size,
            ..Self::default()
        }
    }

    /// Set the scratch directory
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Directory scratch files are created in
    pub fn effective_scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Check the configuration for values the provider cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(config_error("window_size must be at least 1", "window_size"));
        }
        if self.event_capacity == 0 {
            return Err(config_error(
                "event_capacity must be at least 1",
                "event_capacity",
            ));
        }
        if let Some(dir) = &self.scratch_dir {
            if !Path::new(dir).is_dir() {
                return Err(config_error(
                    &format!("scratch_dir {} is not a directory", dir.display()),
                    "scratch_dir",
                ));
            }
        }
        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn default_window_size() -> usize {
    10
}

fn default_scratch_prefix() -> String {
    "revision-".to_string()
}

fn default_event_capacity() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_deserializes_to_defaults() {
        let config: PrefetchConfig = serde_json::from_str("{}").expect("deserialize failed");

        assert_eq!(config, PrefetchConfig::default());
        assert_eq!(config.window_size, 10);
        assert_eq!(config.scratch_prefix, "revision-");
        assert!(config.scratch_dir.is_none());
    }

    #[test]
    fn partial_object_keeps_remaining_defaults() {
        let json = r#"{"window_size": 3, "scratch_prefix": "blame-"}"#;
        let config: PrefetchConfig = serde_json::from_str(json).expect("deserialize failed");

        assert_eq!(config.window_size, 3);
        assert_eq!(config.scratch_prefix, "blame-");
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(PrefetchConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = PrefetchConfig::with_window_size(0).validate().unwrap_err();

        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("window_size")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_event_capacity_is_rejected() {
        let config = PrefetchConfig {
            event_capacity: 0,
            ..PrefetchConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(Error::Config { key: Some(k), .. }) if k == "event_capacity"
        ));
    }

    #[test]
    fn missing_scratch_dir_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let config = PrefetchConfig::default().scratch_dir(temp.path().join("does-not-exist"));

        assert!(matches!(
            config.validate(),
            Err(Error::Config { key: Some(k), .. }) if k == "scratch_dir"
        ));
    }

    #[test]
    fn effective_scratch_dir_falls_back_to_temp_dir() {
        let temp = tempfile::tempdir().unwrap();

        assert_eq!(
            PrefetchConfig::default().effective_scratch_dir(),
            std::env::temp_dir()
        );
        assert_eq!(
            PrefetchConfig::default()
                .scratch_dir(temp.path())
                .effective_scratch_dir(),
            temp.path()
        );
    }
}
