//! Link resolution: turning a user-supplied link into a filename and a
//! direct download URL.
//!
//! Resolution is a seam: the session only depends on the [`Resolver`] trait.
//!
//! - [`PageResolver`] - scrapes a file-host landing page
//! - [`DirectResolver`] - the link already is the file URL
//!
//! # Example
//!
//! ```no_run
//! use linkfetch_core::resolver::{DirectResolver, Resolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = DirectResolver::new();
//! let resolved = resolver.resolve("https://example.com/files/image.iso").await?;
//! println!("{} <- {}", resolved.filename, resolved.download_url);
//! # Ok(())
//! # }
//! ```

mod direct;
mod error;
mod page;

pub use direct::DirectResolver;
pub use error::ResolveError;
pub use page::{PageResolver, extract_download_url, extract_filename};

use async_trait::async_trait;

/// A resolved link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    /// Sanitized output filename.
    pub filename: String,
    /// Direct URL of the file.
    pub download_url: String,
}

impl ResolvedLink {
    /// Creates a resolved link.
    #[must_use]
    pub fn new(filename: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            download_url: download_url.into(),
        }
    }
}

/// Trait for link resolvers.
///
/// Implementors must be `Send + Sync` so one instance can be shared with the
/// background session task.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Returns the resolver's name (e.g., "page", "direct").
    fn name(&self) -> &str;

    /// Resolves `link` into a filename and download URL.
    async fn resolve(&self, link: &str) -> Result<ResolvedLink, ResolveError>;
}
