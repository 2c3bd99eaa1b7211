//! Direct link resolver - the link already is the download URL.

use async_trait::async_trait;
use url::Url;

use super::{ResolveError, ResolvedLink, Resolver};
use crate::download::filename::filename_from_link;

/// A resolver that passes http(s) links through unchanged.
///
/// The filename is derived from the last path segment of the link.
#[derive(Debug)]
pub struct DirectResolver;

impl DirectResolver {
    /// Creates a new `DirectResolver`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for DirectResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for DirectResolver {
    fn name(&self) -> &'static str {
        "direct"
    }

    #[tracing::instrument(skip(self), fields(resolver = "direct"))]
    async fn resolve(&self, link: &str) -> Result<ResolvedLink, ResolveError> {
        let url = validate_http_url(link)?;
        Ok(ResolvedLink::new(filename_from_link(url.as_str()), url.as_str()))
    }
}

/// Parses `link` and requires an http or https scheme.
pub(crate) fn validate_http_url(link: &str) -> Result<Url, ResolveError> {
    let url = Url::parse(link.trim())
        .map_err(|e| ResolveError::invalid_link(link, &e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ResolveError::invalid_link(
            link,
            &format!("unsupported scheme '{other}'"),
        )),
    }
}
