//! Page resolver - scrapes a file-host landing page for its download URL.
//!
//! The landing page names the file in `<meta name="title" content="...">` and
//! exposes the real URL inside a `<script>` that defines `function download`
//! and calls `window.open("https://...")`.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::direct::validate_http_url;
use super::{ResolveError, ResolvedLink, Resolver};
use crate::download::constants::PAGE_TIMEOUT;
use crate::download::filename::{FALLBACK_FILENAME, filename_from_link, sanitize_filename};
use crate::download::HttpClient;

fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static META_TITLE_NAME_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<meta\s+[^>]*name\s*=\s*["']title["'][^>]*content\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
    )
});

static META_TITLE_CONTENT_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<meta\s+[^>]*content\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*name\s*=\s*["']title["']"#,
    )
});

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<script\b[^>]*>(.*?)</script>"));

static WINDOW_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"window\.open\(["'](https?://[^\s"')]+)"#)
});

/// Resolves landing-page links by scraping their HTML.
#[derive(Debug, Clone)]
pub struct PageResolver {
    client: HttpClient,
    timeout: Duration,
}

impl PageResolver {
    /// Creates a resolver that fetches pages with `client`.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            timeout: PAGE_TIMEOUT,
        }
    }
}

#[async_trait]
impl Resolver for PageResolver {
    fn name(&self) -> &'static str {
        "page"
    }

    #[tracing::instrument(skip(self), fields(resolver = "page"))]
    async fn resolve(&self, link: &str) -> Result<ResolvedLink, ResolveError> {
        validate_http_url(link)?;
        let html = self
            .client
            .get_text(link, self.timeout)
            .await
            .map_err(|e| ResolveError::fetch(link, e))?;

        let filename = extract_filename(&html, link);
        let download_url = extract_download_url(&html, link)?;
        debug!(%filename, %download_url, "page resolved");
        Ok(ResolvedLink::new(filename, download_url))
    }
}

/// Filename from the page's title meta tag, else from the link itself.
#[must_use]
pub fn extract_filename(html: &str, link: &str) -> String {
    let title = META_TITLE_NAME_FIRST
        .captures(html)
        .or_else(|| META_TITLE_CONTENT_FIRST.captures(html))
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| decode_entities(m.as_str()));

    if let Some(title) = title {
        let sanitized = sanitize_filename(&title);
        if sanitized != FALLBACK_FILENAME {
            return sanitized;
        }
    }
    filename_from_link(link)
}

/// Download URL from the first script defining `function download`.
///
/// # Errors
///
/// Returns [`ResolveError::NoDownloadUrl`] when no such script exists or it
/// has no `window.open` call with an absolute URL.
pub fn extract_download_url(html: &str, link: &str) -> Result<String, ResolveError> {
    let script = SCRIPT_BLOCK
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|body| body.contains("function download"))
        .ok_or_else(|| {
            ResolveError::no_download_url(link, "page has no script defining a download function")
        })?;

    WINDOW_OPEN
        .captures(script)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            ResolveError::no_download_url(link, "download script has no window.open URL")
        })
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
