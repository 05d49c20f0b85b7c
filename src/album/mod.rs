//! Album pagination and subalbum discovery.
//!
//! An album's size is only known after its first listing page has been
//! fetched: the response declares a `total`, and the number of pages follows
//! from it with [`pages_needed`]. The remaining pages are then fetched in
//! order, one at a time.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use photobucket_core::album::{AlbumHandle, AlbumTraversal};
//! use photobucket_core::events::NoopEvents;
//! use photobucket_core::fetch::{PageFetcher, RetryPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = PageFetcher::new(RetryPolicy::default())?;
//! let traversal = AlbumTraversal::new(fetcher, "token", Arc::new(NoopEvents));
//! let mut album = AlbumHandle::for_page(
//!     "https://photobucket.com/user/alice/library/Trip",
//!     "/albums/ab12/alice/Trip",
//! )?;
//! let files = traversal.list_all_files(&mut album).await?;
//! println!("{} files", files.len());
//! # Ok(())
//! # }
//! ```

mod traversal;
mod types;

pub use traversal::{AlbumTraversal, LISTING_ENDPOINT, SUBALBUM_ENDPOINT};
pub use types::{AlbumHandle, AlbumPage, DEFAULT_PER_PAGE, SubalbumRef, pages_needed};
