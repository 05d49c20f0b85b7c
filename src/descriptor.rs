//! Identities extracted from pages and listings.

use crate::download::filename::derive_filename;

/// One downloadable media file: full-size URL plus a filesystem-safe name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    url: String,
    filename: String,
}

impl FileDescriptor {
    /// Descriptor named after the URL's last path segment.
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        Self::with_title(url, None, None)
    }

    /// Descriptor named `title.ext` when a title is known, falling back to
    /// the URL's last path segment. A missing `ext` is taken from the URL.
    #[must_use]
    pub fn with_title(url: impl Into<String>, title: Option<&str>, ext: Option<&str>) -> Self {
        let url = url.into();
        let filename = derive_filename(&url, title, ext);
        Self { url, filename }
    }

    /// Origin URL of the full-size asset.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Local filename, safe to join onto a directory.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

/// What an HTML page describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// An album, identified by its hierarchical path.
    Album(String),
    /// A single media file.
    File(FileDescriptor),
}
