//! Media download to disk.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large videos)
//! - Media retry policy, partial files removed between attempts
//! - File modification time taken from `Last-Modified`
//! - Simulate mode for dry runs
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use photobucket_core::FileDescriptor;
//! use photobucket_core::download::MediaDownloader;
//! use photobucket_core::events::NoopEvents;
//! use photobucket_core::fetch::RetryPolicy;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = MediaDownloader::new(RetryPolicy::default(), false, Arc::new(NoopEvents))?;
//! let file = FileDescriptor::from_url("https://i.example.com/albums/ab12/alice/IMG_0001.jpg");
//! downloader.download(&file, Path::new("./Trip/IMG_0001.jpg")).await?;
//! # Ok(())
//! # }
//! ```

mod downloader;
pub(crate) mod filename;

pub use downloader::{MEDIA_CONNECT_TIMEOUT_SECS, MEDIA_READ_TIMEOUT_SECS, MediaDownloader};
pub use filename::sanitize_path_component;
