//! Fetcher backed by a local directory of revision snapshots

use super::traits::ContentFetcher;
use crate::types::Item;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Serves revisions from a directory laid out by content key
///
/// `Item::content_key` is interpreted as a path relative to `root`, so a
/// mirror with `root/26274/src/main.rs` serves the item whose key is
/// `26274/src/main.rs`.
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    /// Create a fetcher reading from `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the mirror
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn source_path(&self, item: &Item) -> PathBuf {
        self.root.join(&item.content_key)
    }
}

#[async_trait]
impl ContentFetcher for DirectoryFetcher {
    async fn download(&self, item: &Item, destination: &Path) -> crate::Result<()> {
        let source = self.source_path(item);
        let bytes = match tokio::fs::copy(&source, destination).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(crate::Error::NotFound(format!(
                    "{} at changeset {} ({})",
                    item.server_path,
                    item.changeset_id,
                    source.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        trace!(
            changeset = item.changeset_id.0,
            ?source,
            ?destination,
            bytes,
            "copied revision from mirror"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "directory"
    }
}
