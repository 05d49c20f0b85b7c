//! Paginated album listing and subalbum discovery.

use std::sync::Arc;

use reqwest::header::REFERER;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::types::{AlbumHandle, AlbumPage, SubalbumRef, pages_needed};
use crate::descriptor::FileDescriptor;
use crate::events::EventSink;
use crate::fetch::{FetchError, PageFetcher, RequestSpec};

/// Path of the album listing component on the site.
pub const LISTING_ENDPOINT: &str = "/component/Common-PageCollection-Album-AlbumPageCollection";

/// Path of the subalbum listing component on the site.
pub const SUBALBUM_ENDPOINT: &str = "/component/Albums-SubalbumList";

/// Content filter value selecting photos and videos.
const ALBUM_CONTENT_ALL: &str = "2";

/// Sort order the site uses for the album grid.
const LISTING_SORT: &str = "9";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingBody {
    total: u64,
    #[serde(default)]
    current_offset: u64,
    objects: Vec<ListingObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingObject {
    fullsize_url: String,
    #[serde(default)]
    title_or_filename: Option<String>,
    #[serde(default)]
    ext: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubalbumBody {
    sub_albums: Vec<SubalbumObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubalbumObject {
    title: String,
    path: String,
    #[serde(default)]
    link_url: Option<String>,
}

/// Decodes `T` from the response's `body` member, or from the root when the
/// response is not wrapped.
fn decode_body<T: DeserializeOwned>(url: &str, mut value: serde_json::Value) -> Result<T, FetchError> {
    let inner = match value.get_mut("body") {
        Some(body) if body.is_object() => body.take(),
        _ => value,
    };
    serde_json::from_value(inner).map_err(|e| FetchError::parse(url, e.to_string()))
}

/// Lists album pages and subalbums through the site's JSON components.
///
/// Requests are strictly sequential; every request carries the proof token
/// scraped from the album page.
pub struct AlbumTraversal {
    fetcher: PageFetcher,
    token: String,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for AlbumTraversal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlbumTraversal")
            .field("fetcher", &self.fetcher)
            .finish_non_exhaustive()
    }
}

impl AlbumTraversal {
    /// Creates a traversal using `token` as listing proof.
    #[must_use]
    pub fn new(fetcher: PageFetcher, token: impl Into<String>, events: Arc<dyn EventSink>) -> Self {
        Self {
            fetcher,
            token: token.into(),
            events,
        }
    }

    fn listing_request(&self, handle: &AlbumHandle, page: u32) -> RequestSpec {
        let spec = RequestSpec::get(handle.endpoint(LISTING_ENDPOINT))
            .query("filters[album]", handle.path())
            .query("filters[album_content]", ALBUM_CONTENT_ALL)
            .query("limit", handle.per_page().to_string())
            .query("page", page.to_string())
            .query("linkerMode", "")
            .query("json", "1")
            .query("sort", LISTING_SORT)
            .query("hash", self.token.as_str())
            .json();
        with_referer(spec, handle)
    }

    fn subalbum_request(&self, handle: &AlbumHandle) -> RequestSpec {
        let spec = RequestSpec::get(handle.endpoint(SUBALBUM_ENDPOINT))
            .query("albumPath", handle.path())
            .query("fetchSubAlbumsOnly", "true")
            .query("deferCollapsed", "true")
            .query("json", "1")
            .query("hash", self.token.as_str())
            .json();
        with_referer(spec, handle)
    }

    /// Fetches one listing page and records the album total on `handle`.
    ///
    /// # Errors
    ///
    /// Returns the fetch error once retries are exhausted, or
    /// [`FetchError::Parse`] when the response lacks the listing fields.
    #[instrument(skip(self, handle), fields(album = %handle.path()))]
    pub async fn list_page(
        &self,
        handle: &mut AlbumHandle,
        page: u32,
    ) -> Result<AlbumPage, FetchError> {
        let spec = self.listing_request(handle, page);
        let value = self.fetcher.fetch_json(&spec).await?;
        let body: ListingBody = decode_body(spec.url(), value)?;

        handle.record_total(body.total);
        let files: Vec<FileDescriptor> = body
            .objects
            .into_iter()
            .map(|o| {
                FileDescriptor::with_title(
                    o.fullsize_url,
                    o.title_or_filename.as_deref(),
                    o.ext.as_deref(),
                )
            })
            .collect();
        debug!(page, files = files.len(), total = body.total, "listing page decoded");
        self.events
            .page_fetched(handle.path(), page, files.len(), body.total);

        Ok(AlbumPage {
            files,
            offset: body.current_offset,
            total: body.total,
        })
    }

    /// Lists every file of the album, starting at page 1.
    ///
    /// # Errors
    ///
    /// See [`list_files_from`](Self::list_files_from).
    pub async fn list_all_files(
        &self,
        handle: &mut AlbumHandle,
    ) -> Result<Vec<FileDescriptor>, FetchError> {
        self.list_files_from(handle, 1).await
    }

    /// Lists the album's files from `start_page` through its last page.
    ///
    /// The start page is fetched first; its declared total decides how many
    /// more pages follow. Pages are fetched in order and their files kept in
    /// listing order.
    ///
    /// # Errors
    ///
    /// Any page failure aborts the listing and no partial result is returned.
    pub async fn list_files_from(
        &self,
        handle: &mut AlbumHandle,
        start_page: u32,
    ) -> Result<Vec<FileDescriptor>, FetchError> {
        let start_page = start_page.max(1);
        let first = self.list_page(handle, start_page).await?;
        let last_page = pages_needed(first.total, handle.per_page());
        let mut files = first.files;

        for page in start_page.saturating_add(1)..=last_page {
            let next = self.list_page(handle, page).await?;
            files.extend(next.files);
        }

        self.events.album_listed(handle.path(), files.len());
        Ok(files)
    }

    /// Lists the direct children of the album.
    ///
    /// # Errors
    ///
    /// Returns the fetch error once retries are exhausted, or
    /// [`FetchError::Parse`] when the response has no subalbum list.
    #[instrument(skip(self, handle), fields(album = %handle.path()))]
    pub async fn list_subalbums(&self, handle: &AlbumHandle) -> Result<Vec<SubalbumRef>, FetchError> {
        let spec = self.subalbum_request(handle);
        let value = self.fetcher.fetch_json(&spec).await?;
        let body: SubalbumBody = decode_body(spec.url(), value)?;

        Ok(body
            .sub_albums
            .into_iter()
            .map(|s| SubalbumRef {
                handle: handle.child(s.path, s.link_url),
                title: s.title,
            })
            .collect())
    }
}

fn with_referer(spec: RequestSpec, handle: &AlbumHandle) -> RequestSpec {
    match handle.link_url() {
        Some(link) => spec.header(REFERER, link),
        None => spec,
    }
}
