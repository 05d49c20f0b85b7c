//! Top-level run: classify the page, then download one file or walk albums.

use std::collections::HashSet;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::album::{AlbumHandle, AlbumTraversal};
use crate::config::{OutputTarget, RunConfig, SubalbumFailurePolicy};
use crate::descriptor::{Descriptor, FileDescriptor};
use crate::download::{MediaDownloader, sanitize_path_component};
use crate::events::EventSink;
use crate::fetch::{FetchError, PageFetcher, RequestSpec};
use crate::scrape::{ExtractError, MetadataExtractor};

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// A page, listing or media request failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The page did not have the expected structure.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The links file could not be written.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Path being written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The run URL does not parse.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
    },
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Albums whose files were listed.
    pub albums_visited: usize,
    /// Files downloaded (or simulated).
    pub files_downloaded: usize,
    /// Downloads that replaced a file written earlier in the same run.
    pub files_overwritten: usize,
    /// URLs written in links mode.
    pub links_written: usize,
    /// Subalbums skipped after a failure.
    pub albums_failed: usize,
}

/// Drives one run from the page URL to files on disk.
pub struct Orchestrator {
    config: RunConfig,
    extractor: Box<dyn MetadataExtractor>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// One album waiting on the worklist.
struct PendingAlbum {
    handle: AlbumHandle,
    dir: PathBuf,
    root: bool,
}

impl Orchestrator {
    /// Creates an orchestrator for `config`.
    #[must_use]
    pub fn new(
        config: RunConfig,
        extractor: Box<dyn MetadataExtractor>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            extractor,
            events,
        }
    }

    /// Runs to completion.
    ///
    /// # Errors
    ///
    /// Any failure on the page, a single file or the root album ends the run.
    /// Subalbum failures end it only under [`SubalbumFailurePolicy::Abort`].
    #[instrument(skip(self), fields(url = %self.config.url))]
    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let fetcher = PageFetcher::new(self.config.site_policy)?;
        let request = page_request(&self.config.url, self.config.start_page)?;
        let html = fetcher.fetch_text(&request).await?;

        let summary = match self.extractor.extract(&html)? {
            Descriptor::File(file) => self.run_single(&file).await?,
            Descriptor::Album(path) => {
                let token = self.extractor.proof_token(&html)?;
                let handle = AlbumHandle::for_page(&self.config.url, path)?;
                let traversal = AlbumTraversal::new(fetcher, token, Arc::clone(&self.events));
                self.run_albums(&traversal, handle).await?
            }
        };

        info!(
            albums = summary.albums_visited,
            files = summary.files_downloaded,
            overwritten = summary.files_overwritten,
            links = summary.links_written,
            failed = summary.albums_failed,
            "run complete"
        );
        Ok(summary)
    }

    async fn run_single(&self, file: &FileDescriptor) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary::default();
        match &self.config.output {
            OutputTarget::Links(path) => {
                write_links(path, &[file.url()]).await?;
                summary.links_written = 1;
            }
            OutputTarget::Path(output) => {
                let destination = single_file_destination(output, file.filename());
                self.downloader()?.download(file, &destination).await?;
                summary.files_downloaded = 1;
            }
        }
        Ok(summary)
    }

    async fn run_albums(
        &self,
        traversal: &AlbumTraversal,
        root: AlbumHandle,
    ) -> Result<RunSummary, RunError> {
        let downloader = self.downloader()?;
        let mut summary = RunSummary::default();
        let mut links: Vec<String> = Vec::new();
        let mut written: HashSet<PathBuf> = HashSet::new();
        let mut stack = vec![PendingAlbum {
            handle: root,
            dir: self.config.output.path().to_path_buf(),
            root: true,
        }];

        while let Some(pending) = stack.pop() {
            let path = pending.handle.path().to_string();
            let outcome = self
                .visit_album(traversal, &downloader, pending, &mut links, &mut written, &mut summary)
                .await;

            match outcome {
                Ok(children) => stack.extend(children.into_iter().rev()),
                Err((root, e)) => {
                    self.events.album_failed(&path, &e);
                    if root || self.config.subalbum_failure == SubalbumFailurePolicy::Abort {
                        return Err(e);
                    }
                    warn!(album = %path, error = %e, "skipping subalbum");
                    summary.albums_failed += 1;
                }
            }
        }

        if let OutputTarget::Links(path) = &self.config.output {
            write_links(path, &links).await?;
            summary.links_written = links.len();
        }
        Ok(summary)
    }

    /// Lists one album, downloads (or collects) its files and returns its
    /// children in listing order. Errors carry whether the album was the root.
    ///
    /// `written` holds every destination downloaded so far in this run; a
    /// repeated destination is still downloaded but logged and counted.
    async fn visit_album(
        &self,
        traversal: &AlbumTraversal,
        downloader: &MediaDownloader,
        pending: PendingAlbum,
        links: &mut Vec<String>,
        written: &mut HashSet<PathBuf>,
        summary: &mut RunSummary,
    ) -> Result<Vec<PendingAlbum>, (bool, RunError)> {
        let PendingAlbum {
            mut handle,
            dir,
            root,
        } = pending;
        let fail = |e: FetchError| (root, RunError::from(e));

        self.events.album_started(handle.path(), &dir);
        let start_page = if root { self.config.start_page } else { 1 };
        let files = traversal
            .list_files_from(&mut handle, start_page)
            .await
            .map_err(fail)?;
        summary.albums_visited += 1;

        if self.config.links_mode() {
            links.extend(files.iter().map(|f| f.url().to_string()));
        } else {
            for file in &files {
                let destination = dir.join(file.filename());
                if !written.insert(destination.clone()) {
                    warn!(
                        path = %destination.display(),
                        url = %file.url(),
                        "destination already written in this run; overwriting"
                    );
                    summary.files_overwritten += 1;
                }
                downloader.download(file, &destination).await.map_err(fail)?;
                summary.files_downloaded += 1;
            }
        }

        if !self.config.recursive {
            return Ok(Vec::new());
        }

        let children = traversal.list_subalbums(&handle).await.map_err(fail)?;
        debug!(album = %handle.path(), children = children.len(), "subalbums listed");
        Ok(children
            .into_iter()
            .map(|child| PendingAlbum {
                dir: dir.join(sanitize_path_component(&child.title)),
                handle: child.handle,
                root: false,
            })
            .collect())
    }

    fn downloader(&self) -> Result<MediaDownloader, FetchError> {
        MediaDownloader::new(
            self.config.media_policy,
            self.config.simulate,
            Arc::clone(&self.events),
        )
    }
}

/// Request for the HTML page behind `url`: query and fragment dropped, and
/// `page=<start_page>` added for album and library pages.
fn page_request(url: &str, start_page: u32) -> Result<RequestSpec, RunError> {
    let mut parsed = Url::parse(url).map_err(|_| RunError::InvalidUrl {
        url: url.to_string(),
    })?;
    parsed.set_query(None);
    parsed.set_fragment(None);

    let paged = parsed.path().contains("album") || parsed.path().contains("library");
    let spec = RequestSpec::get(parsed.as_str());
    Ok(if paged {
        spec.query("page", start_page.max(1).to_string())
    } else {
        spec
    })
}

/// Where a single file goes: into `output` when it is an existing directory
/// or ends with a separator, otherwise at `output` itself.
fn single_file_destination(output: &Path, filename: &str) -> PathBuf {
    let raw = output.as_os_str().to_string_lossy();
    let names_dir = raw.ends_with('/') || raw.ends_with(MAIN_SEPARATOR);
    if names_dir || output.is_dir() {
        output.join(filename)
    } else {
        output.to_path_buf()
    }
}

/// Writes one URL per line, creating parent directories.
async fn write_links<S: AsRef<str>>(path: &Path, links: &[S]) -> Result<(), RunError> {
    let io = |source| RunError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io)?;
    }

    let mut body = String::new();
    for link in links {
        body.push_str(link.as_ref());
        body.push('\n');
    }
    tokio::fs::write(path, body).await.map_err(io)?;
    info!(path = %path.display(), count = links.len(), "links written");
    Ok(())
}
