//! Photobucket Downloader Core Library
//!
//! Downloads single media files or whole, optionally nested, albums from a
//! photo-hosting site that has no public API. Album and file identities are
//! scraped from the page HTML and fed into the site's JSON listing endpoint.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - Bounded-retry requests for pages and listing JSON
//! - [`scrape`] - Album/file classification and proof token from page HTML
//! - [`album`] - Album pagination and subalbum discovery
//! - [`download`] - Streaming media download and path sanitization
//! - [`orchestrator`] - One run from page URL to files on disk
//! - [`events`] - Lifecycle notifications for logging and progress UIs
//! - [`config`] - Immutable run configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod album;
pub mod config;
pub mod descriptor;
pub mod download;
pub mod events;
pub mod fetch;
pub mod orchestrator;
pub mod scrape;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use album::{AlbumHandle, AlbumPage, AlbumTraversal, DEFAULT_PER_PAGE, SubalbumRef, pages_needed};
pub use config::{OutputTarget, RunConfig, SubalbumFailurePolicy};
pub use descriptor::{Descriptor, FileDescriptor};
pub use download::{MediaDownloader, sanitize_path_component};
pub use events::{EventSink, NoopEvents, TracingEvents};
pub use fetch::{FailureType, FetchError, PageFetcher, RequestSpec, RetryPolicy, classify_error};
pub use orchestrator::{Orchestrator, RunError, RunSummary};
pub use scrape::{ExtractError, LineScanExtractor, MetadataExtractor};
