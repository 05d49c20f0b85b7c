//! Immutable run configuration, built once and handed to the orchestrator.

use std::path::PathBuf;

use crate::fetch::{DEFAULT_ATTEMPTS, DEFAULT_MEDIA_DELAY, DEFAULT_SITE_DELAY, RetryPolicy};

/// Where the run's results go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Download media. For a single file this is the file path (or a
    /// directory to put it in); for an album, the directory to fill.
    Path(PathBuf),
    /// Write the full-size URLs, one per line, to this file.
    Links(PathBuf),
}

impl OutputTarget {
    /// The configured path, whatever the mode.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Path(p) | Self::Links(p) => p,
        }
    }
}

/// What happens when a subalbum cannot be listed during a recursive run.
///
/// The root album always aborts the run on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubalbumFailurePolicy {
    /// Stop the whole run.
    #[default]
    Abort,
    /// Report the failure, skip that subalbum and its descendants, go on.
    Continue,
}

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Page URL of a single file or an album.
    pub url: String,
    /// Download destination or links file.
    pub output: OutputTarget,
    /// Retry policy for HTML pages and listing calls.
    pub site_policy: RetryPolicy,
    /// Retry policy for media downloads.
    pub media_policy: RetryPolicy,
    /// Report what would be downloaded without doing it.
    pub simulate: bool,
    /// Descend into subalbums.
    pub recursive: bool,
    /// First listing page of the root album (1-based).
    pub start_page: u32,
    /// Handling of subalbum failures in recursive runs.
    pub subalbum_failure: SubalbumFailurePolicy,
}

impl RunConfig {
    /// Configuration with default policies: download `url` into `output`.
    #[must_use]
    pub fn new(url: impl Into<String>, output: OutputTarget) -> Self {
        Self {
            url: url.into(),
            output,
            site_policy: RetryPolicy::new(DEFAULT_ATTEMPTS, DEFAULT_SITE_DELAY),
            media_policy: RetryPolicy::new(DEFAULT_ATTEMPTS, DEFAULT_MEDIA_DELAY),
            simulate: false,
            recursive: false,
            start_page: 1,
            subalbum_failure: SubalbumFailurePolicy::default(),
        }
    }

    /// Whether URLs are collected instead of downloaded.
    #[must_use]
    pub fn links_mode(&self) -> bool {
        matches!(self.output, OutputTarget::Links(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_defaults() {
        let config = RunConfig::new("https://x.com/a", OutputTarget::Path("out".into()));
        assert_eq!(config.site_policy.attempts(), 3);
        assert_eq!(config.site_policy.delay(), DEFAULT_SITE_DELAY);
        assert_eq!(config.media_policy.delay(), DEFAULT_MEDIA_DELAY);
        assert_eq!(config.start_page, 1);
        assert!(!config.recursive);
        assert!(!config.simulate);
        assert!(!config.links_mode());
        assert_eq!(config.subalbum_failure, SubalbumFailurePolicy::Abort);
    }

    #[test]
    fn test_links_target_path() {
        let config = RunConfig::new("https://x.com/a", OutputTarget::Links("links.txt".into()));
        assert!(config.links_mode());
        assert_eq!(config.output.path(), std::path::Path::new("links.txt"));
    }
}
