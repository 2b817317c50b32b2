//! Trait for downloading revision content

use crate::types::Item;
use async_trait::async_trait;
use std::path::Path;

/// Downloads the content of one item version to a local file
///
/// Implementations are called from independent Tokio tasks, at most
/// `window_size` at a time, each with its own destination path. The
/// destination already exists (empty) when `download` is called and must
/// hold the complete content when it returns `Ok`.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use history_prefetch::{ContentFetcher, Item};
/// use std::path::Path;
///
/// struct Placeholder;
///
/// #[async_trait]
/// impl ContentFetcher for Placeholder {
///     async fn download(&self, item: &Item, destination: &Path) -> history_prefetch::Result<()> {
///         tokio::fs::write(destination, item.server_path.as_bytes()).await?;
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "placeholder"
///     }
/// }
/// ```
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Write the content of `item` to `destination`
    ///
    /// # Errors
    ///
    /// Any error is reported as a fetch failure for the item's position; the
    /// provider does not retry.
    async fn download(&self, item: &Item, destination: &Path) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
