//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser};

use photobucket_core::fetch::{DEFAULT_ATTEMPTS, DEFAULT_MEDIA_DELAY, DEFAULT_SITE_DELAY, RetryPolicy};
use photobucket_core::{OutputTarget, RunConfig, SubalbumFailurePolicy};

const DEFAULT_SITE_DELAY_MS: u64 = millis(DEFAULT_SITE_DELAY);
const DEFAULT_MEDIA_DELAY_MS: u64 = millis(DEFAULT_MEDIA_DELAY);

#[allow(clippy::cast_possible_truncation)]
const fn millis(delay: Duration) -> u64 {
    delay.as_millis() as u64
}

/// Download single photos or whole albums from Photobucket.
///
/// Give the URL of a photo page or an album page. Albums are fetched page by
/// page; with --recursive their subalbums are mirrored as directories.
#[derive(Parser, Debug)]
#[command(name = "photobucket-downloader")]
#[command(author, version, about)]
#[command(group(ArgGroup::new("target").required(true).args(["output", "links"])))]
pub struct Args {
    /// URL of the photo or album page
    #[arg(short, long)]
    pub url: String,

    /// Output file (single photo) or directory (album)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write full-size URLs to this file instead of downloading
    #[arg(short, long)]
    pub links: Option<PathBuf>,

    /// Attempts per request before giving up (1-20)
    #[arg(short, long, default_value_t = DEFAULT_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub attempts: u32,

    /// Delay before each media request in milliseconds (max 60000)
    #[arg(short, long, default_value_t = DEFAULT_MEDIA_DELAY_MS, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub media_timeout: u64,

    /// Delay before each page or listing request in milliseconds (max 60000)
    #[arg(short, long, default_value_t = DEFAULT_SITE_DELAY_MS, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub site_timeout: u64,

    /// Listing page to start the album at
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Descend into subalbums
    #[arg(short, long)]
    pub recursive: bool,

    /// List what would be downloaded but skip the media downloads
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip subalbums that fail instead of stopping the run
    #[arg(long)]
    pub continue_on_error: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Builds the immutable run configuration.
    #[must_use]
    pub fn to_run_config(&self) -> RunConfig {
        let output = match (&self.links, &self.output) {
            (Some(links), _) => OutputTarget::Links(links.clone()),
            (None, Some(output)) => OutputTarget::Path(output.clone()),
            (None, None) => OutputTarget::Path(PathBuf::from(".")),
        };

        let mut config = RunConfig::new(self.url.clone(), output);
        config.site_policy = RetryPolicy::new(self.attempts, Duration::from_millis(self.site_timeout));
        config.media_policy =
            RetryPolicy::new(self.attempts, Duration::from_millis(self.media_timeout));
        config.simulate = self.dry_run;
        config.recursive = self.recursive;
        config.start_page = self.page;
        config.subalbum_failure = if self.continue_on_error {
            SubalbumFailurePolicy::Continue
        } else {
            SubalbumFailurePolicy::Abort
        };
        config
    }
}
