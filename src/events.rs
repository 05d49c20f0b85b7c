//! Lifecycle notifications from the traversal and download engine.
//!
//! Components call an [`EventSink`] at each lifecycle point instead of
//! logging directly. Every method has a no-op default, so a sink only
//! implements what it cares about.

use std::error::Error;
use std::path::Path;

use tracing::{info, warn};

use crate::descriptor::FileDescriptor;

/// Observer of album traversal and download progress.
pub trait EventSink: Send + Sync {
    /// An album is about to be listed; its files go to `dir`.
    fn album_started(&self, _album: &str, _dir: &Path) {}

    /// One listing page was fetched.
    fn page_fetched(&self, _album: &str, _page: u32, _files: usize, _total: u64) {}

    /// All files of an album are known.
    fn album_listed(&self, _album: &str, _files: usize) {}

    /// An album could not be processed.
    fn album_failed(&self, _album: &str, _error: &dyn Error) {}

    /// A download is about to start.
    fn download_started(&self, _file: &FileDescriptor, _destination: &Path) {}

    /// A download completed (or was simulated).
    fn download_finished(&self, _file: &FileDescriptor, _destination: &Path) {}
}

/// Sink that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl EventSink for NoopEvents {}

/// Sink that reports events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl EventSink for TracingEvents {
    fn album_started(&self, album: &str, dir: &Path) {
        info!(album, dir = %dir.display(), "processing album");
    }

    fn page_fetched(&self, album: &str, page: u32, files: usize, total: u64) {
        info!(album, page, files, total, "fetched listing page");
    }

    fn album_listed(&self, album: &str, files: usize) {
        info!(album, files, "album listed");
    }

    fn album_failed(&self, album: &str, error: &dyn Error) {
        warn!(album, error = %error, "album failed");
    }

    fn download_finished(&self, file: &FileDescriptor, destination: &Path) {
        info!(url = %file.url(), path = %destination.display(), "downloaded");
    }
}
