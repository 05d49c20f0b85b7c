//! Album handles and listing results.

use url::Url;

use crate::descriptor::FileDescriptor;
use crate::fetch::FetchError;

/// Page size agreed with the listing endpoint.
pub const DEFAULT_PER_PAGE: u32 = 24;

/// Number of pages needed to cover `total` items at `per_page` items each.
///
/// Always derived from the declared total, never from how many items a page
/// actually returned. `per_page` of zero is treated as one.
#[must_use]
pub fn pages_needed(total: u64, per_page: u32) -> u32 {
    let per_page = u64::from(per_page.max(1));
    u32::try_from(total.div_ceil(per_page)).unwrap_or(u32::MAX)
}

/// An album on the site and what is known about its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumHandle {
    origin: String,
    path: String,
    link_url: Option<String>,
    per_page: u32,
    total: Option<u64>,
}

impl AlbumHandle {
    /// Handle for the album at `path` on the site serving `page_url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] when `page_url` has no usable origin.
    pub fn for_page(page_url: &str, path: impl Into<String>) -> Result<Self, FetchError> {
        let parsed = Url::parse(page_url).map_err(|_| FetchError::invalid_url(page_url))?;
        let origin = parsed.origin();
        if !origin.is_tuple() {
            return Err(FetchError::invalid_url(page_url));
        }
        Ok(Self {
            origin: origin.ascii_serialization(),
            path: path.into(),
            link_url: Some(page_url.to_string()),
            per_page: DEFAULT_PER_PAGE,
            total: None,
        })
    }

    /// Child album sharing this handle's origin and page size.
    #[must_use]
    pub fn child(&self, path: impl Into<String>, link_url: Option<String>) -> Self {
        Self {
            origin: self.origin.clone(),
            path: path.into(),
            link_url,
            per_page: self.per_page,
            total: None,
        }
    }

    /// Overrides the page size (clamped to at least one).
    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    /// Scheme, host and port of the site, without a trailing slash.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Hierarchical album identifier.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Browser-facing URL of the album page, used as referer.
    #[must_use]
    pub fn link_url(&self) -> Option<&str> {
        self.link_url.as_deref()
    }

    /// Items per listing page.
    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Total item count, known after the first page fetch.
    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Records the total declared by a listing response.
    pub fn record_total(&mut self, total: u64) {
        self.total = Some(total);
    }

    /// Absolute URL of an endpoint path on this album's site.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }
}

/// One page of an album listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumPage {
    /// Files on this page, in listing order.
    pub files: Vec<FileDescriptor>,
    /// Zero-based item offset of the page.
    pub offset: u64,
    /// Album total declared by this response.
    pub total: u64,
}

/// A direct child of an album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubalbumRef {
    /// Display title, used (sanitized) as directory name.
    pub title: String,
    /// Handle for listing the child.
    pub handle: AlbumHandle,
}
