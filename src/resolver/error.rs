//! Error types for link resolution.
//!
//! Every variant carries the link, what went wrong and a suggestion line,
//! so a failed link can be reported to the user as-is.

use thiserror::Error;

/// Errors that can occur while turning a link into a download URL.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The link is not a usable http(s) URL.
    #[error("invalid link '{link}': {reason}\n  Suggestion: {suggestion}")]
    InvalidLink {
        /// The link as supplied.
        link: String,
        /// Why it was rejected.
        reason: String,
        /// How to fix the issue.
        suggestion: String,
    },

    /// The link page could not be fetched.
    #[error("failed to fetch page '{link}': {reason}\n  Suggestion: {suggestion}")]
    Fetch {
        /// The link whose page failed.
        link: String,
        /// Underlying transport or status error.
        reason: String,
        /// How to fix the issue.
        suggestion: String,
    },

    /// The page was fetched but contained no download URL.
    #[error("no download URL found for '{link}': {reason}\n  Suggestion: {suggestion}")]
    NoDownloadUrl {
        /// The link whose page was inspected.
        link: String,
        /// What was missing.
        reason: String,
        /// How to fix the issue.
        suggestion: String,
    },
}

impl ResolveError {
    /// Creates an `InvalidLink` error.
    #[must_use]
    pub fn invalid_link(link: &str, reason: &str) -> Self {
        Self::InvalidLink {
            link: link.to_string(),
            reason: reason.to_string(),
            suggestion: "Use a full http:// or https:// URL".to_string(),
        }
    }

    /// Creates a `Fetch` error.
    #[must_use]
    pub fn fetch(link: &str, reason: impl ToString) -> Self {
        Self::Fetch {
            link: link.to_string(),
            reason: reason.to_string(),
            suggestion: "Check that the page is reachable and try again".to_string(),
        }
    }

    /// Creates a `NoDownloadUrl` error.
    #[must_use]
    pub fn no_download_url(link: &str, reason: &str) -> Self {
        Self::NoDownloadUrl {
            link: link.to_string(),
            reason: reason.to_string(),
            suggestion: "Open the page in a browser; the site layout may have changed, \
                         or use --direct for direct file URLs"
                .to_string(),
        }
    }
}
