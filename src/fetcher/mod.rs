//! Revision content fetching
//!
//! The provider never talks to a versioned store directly. It hands each
//! [`Item`](crate::types::Item) and a scratch path to a [`ContentFetcher`],
//! which writes the revision's bytes to that path.
//!
//! - [`DirectoryFetcher`]: reads revisions from a local mirror directory
//!
//! Hosts integrating a remote store implement [`ContentFetcher`] themselves.

mod directory;
mod traits;

pub use directory::DirectoryFetcher;
pub use traits::ContentFetcher;
