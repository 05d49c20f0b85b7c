//! Network foundation: bounded retries, page and listing fetches.
//!
//! # Features
//!
//! - Fixed-cadence retry of transport failures and error statuses
//! - Browser-like headers, gzip transfer, connect/read timeouts
//! - JSON decoding that fails fast on structural mismatch
//!
//! # Example
//!
//! ```no_run
//! use photobucket_core::fetch::{PageFetcher, RequestSpec, RetryPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = PageFetcher::new(RetryPolicy::default())?;
//! let html = fetcher
//!     .fetch_text(&RequestSpec::get("https://photobucket.com/user/alice/library/Trip").query("page", "1"))
//!     .await?;
//! println!("{} bytes", html.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod retry;

pub use client::{PageFetcher, RequestSpec, SITE_CONNECT_TIMEOUT_SECS, SITE_READ_TIMEOUT_SECS};
pub(crate) use client::build_client;
pub use error::FetchError;
pub use retry::{
    DEFAULT_ATTEMPTS, DEFAULT_MEDIA_DELAY, DEFAULT_SITE_DELAY, FailureType, RetryPolicy,
    classify_error, run_with_retry,
};
