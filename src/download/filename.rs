//! Filename derivation and sanitization for downloaded files.
//!
//! Names come from resolver metadata or the link itself and always end up as
//! a single safe path segment inside the output directory.

use std::path::{Component, Path, PathBuf};

use url::Url;

/// Longest name kept when a filename is derived from a link.
pub const MAX_LINK_FILENAME_CHARS: usize = 120;

/// Name used when nothing usable can be derived.
pub const FALLBACK_FILENAME: &str = "download.bin";

/// Strips characters that are unsafe in a filename.
///
/// Removes `\ / * ? : " < > |` and control characters, trims surrounding
/// whitespace, and never returns `.`, `..` or an empty string (those become
/// [`FALLBACK_FILENAME`]).
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect();
    let trimmed = stripped.trim();

    if trimmed.is_empty() || !is_safe_filename_segment(trimmed) {
        return FALLBACK_FILENAME.to_string();
    }
    trimmed.to_string()
}

/// Derives a filename from a link: the last path segment without its query,
/// percent-decoded, sanitized and truncated to [`MAX_LINK_FILENAME_CHARS`].
#[must_use]
pub fn filename_from_link(link: &str) -> String {
    let segment = match Url::parse(link) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string)
            .unwrap_or_default(),
        Err(_) => link
            .split('?')
            .next()
            .unwrap_or_default()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let decoded = urlencoding::decode(&segment)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or(segment);
    let truncated: String = decoded.chars().take(MAX_LINK_FILENAME_CHARS).collect();
    sanitize_filename(&truncated)
}

/// Joins a sanitized filename onto `dir`.
///
/// An existing file at that path is overwritten by the transfer.
#[must_use]
pub fn destination_path(dir: &Path, filename: &str) -> PathBuf {
    dir.join(sanitize_filename(filename))
}

fn is_safe_filename_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
