//! Progress UI (one bar per album) layered over the tracing sink.

use std::error::Error;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use indicatif::{ProgressBar, ProgressStyle};
use photobucket_core::FileDescriptor;
use photobucket_core::events::{EventSink, TracingEvents};

/// Shows a download bar per album and forwards every event to
/// [`TracingEvents`].
pub(crate) struct ProgressEvents {
    enabled: bool,
    bar: Mutex<Option<ProgressBar>>,
    log: TracingEvents,
}

impl ProgressEvents {
    /// With `enabled` false only the tracing output remains.
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            bar: Mutex::new(None),
            log: TracingEvents,
        }
    }

    /// Clears the current bar, if any.
    pub(crate) fn finish(&self) {
        if let Some(bar) = self.slot().take() {
            bar.finish_and_clear();
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for ProgressEvents {
    fn album_started(&self, album: &str, dir: &Path) {
        self.finish();
        self.log.album_started(album, dir);
    }

    fn page_fetched(&self, album: &str, page: u32, files: usize, total: u64) {
        self.log.page_fetched(album, page, files, total);
    }

    fn album_listed(&self, album: &str, files: usize) {
        self.log.album_listed(album, files);
        if !self.enabled || files == 0 {
            return;
        }
        let bar = ProgressBar::new(files as u64);
        bar.set_style(
            ProgressStyle::with_template("{prefix} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_prefix(album.to_string());
        *self.slot() = Some(bar);
    }

    fn album_failed(&self, album: &str, error: &dyn Error) {
        if let Some(bar) = self.slot().take() {
            bar.abandon();
        }
        self.log.album_failed(album, error);
    }

    fn download_started(&self, file: &FileDescriptor, destination: &Path) {
        if let Some(bar) = self.slot().as_ref() {
            bar.set_message(file.filename().to_string());
        }
        self.log.download_started(file, destination);
    }

    fn download_finished(&self, file: &FileDescriptor, destination: &Path) {
        if let Some(bar) = self.slot().as_ref() {
            bar.inc(1);
        }
        self.log.download_finished(file, destination);
    }
}
