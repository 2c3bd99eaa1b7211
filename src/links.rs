//! Link list store backed by a plain text file.
//!
//! One link per line. Blank lines and lines starting with `#` are ignored.
//! Completed links are removed from the file; failed links are only tracked
//! in memory so the user can see them.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

const FILE_HEADER: &str = "# Add one download link per line\n";

/// Errors from the link list file.
#[derive(Debug, Error)]
pub enum LinkListError {
    /// Reading or writing the list failed.
    #[error("link list {path}: {source}")]
    Io {
        /// The list file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl LinkListError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The on-disk link list plus in-memory failure marks.
#[derive(Debug)]
pub struct LinkList {
    path: PathBuf,
    links: Vec<String>,
    failed: BTreeSet<String>,
}

impl LinkList {
    /// Loads the list at `path`, creating it with a comment header if missing.
    ///
    /// # Errors
    ///
    /// Returns [`LinkListError::Io`] if the file cannot be created or read.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, LinkListError> {
        let path = path.into();
        if !tokio::fs::try_exists(&path)
            .await
            .map_err(|e| LinkListError::io(&path, e))?
        {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| LinkListError::io(&path, e))?;
            }
            tokio::fs::write(&path, FILE_HEADER)
                .await
                .map_err(|e| LinkListError::io(&path, e))?;
            info!(path = %path.display(), "created empty link list");
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LinkListError::io(&path, e))?;
        let links = parse_links(&content);
        debug!(path = %path.display(), count = links.len(), "loaded link list");

        Ok(Self {
            path,
            links,
            failed: BTreeSet::new(),
        })
    }

    /// Links as loaded, minus removed ones, in file order.
    #[must_use]
    pub fn links(&self) -> &[String] {
        &self.links
    }

    /// Removes `link` from memory and rewrites the file without it.
    ///
    /// Lines are compared after trimming; comments and other links keep their
    /// original text. The file is replaced atomically via a sibling temp file.
    ///
    /// # Errors
    ///
    /// Returns [`LinkListError::Io`] if the file cannot be read or replaced.
    pub async fn remove(&mut self, link: &str) -> Result<(), LinkListError> {
        let link = link.trim();
        self.links.retain(|l| l != link);

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| LinkListError::io(&self.path, e))?;
        let kept: String = content
            .lines()
            .filter(|line| line.trim() != link)
            .map(|line| format!("{line}\n"))
            .collect();

        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, kept)
            .await
            .map_err(|e| LinkListError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| LinkListError::io(&self.path, e))?;
        debug!(link, "removed link from list");
        Ok(())
    }

    /// Flags `link` as failed. The file is left untouched.
    pub fn mark_failed(&mut self, link: &str) {
        self.failed.insert(link.trim().to_string());
    }

    /// Links flagged as failed, sorted.
    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.failed.iter().map(String::as_str)
    }

    /// True if `link` was flagged as failed.
    #[must_use]
    pub fn is_failed(&self, link: &str) -> bool {
        self.failed.contains(link.trim())
    }
}

/// Trimmed, non-empty, non-comment lines.
#[must_use]
pub fn parse_links(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
