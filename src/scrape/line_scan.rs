//! Line-oriented extractor for the inline page state.
//!
//! The page embeds one script line per state object, e.g.
//!
//! ```text
//! Pb.albumQuery = {"album":"\/albums\/ab12\/alice\/Trip","sort":"3"};
//! Pb.mediaDetail = {"originalUrl":"http:\/\/i.example.com\/a.jpg","title":"Beach"};
//! <input type="hidden" name="hash" id="token" value="3f2a..."/>
//! ```
//!
//! A marker line is located by substring tests, the value is captured with a
//! pattern restricted to a conservative character set, then decoded as a JSON
//! string literal to undo the `\/` and `\uXXXX` escapes.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{ExtractError, MetadataExtractor};
use crate::descriptor::{Descriptor, FileDescriptor};

/// Marker of the album query object line.
pub const ALBUM_QUERY_MARKER: &str = "albumQuery";

/// Key carrying the album path inside the album query object.
pub const ALBUM_KEY: &str = "\"album\"";

/// Marker of the single-media object line.
pub const MEDIA_MARKER: &str = "mediaDetail";

/// Key carrying the full-size URL inside the single-media object.
pub const ORIGINAL_URL_KEY: &str = "\"originalUrl\"";

const TOKEN_INPUT_MARKER: &str = r#"<input type="hidden""#;
const TOKEN_ID_MARKER: &str = r#"id="token""#;

fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static ALBUM_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#""album"\s*:\s*"((?:[A-Za-z0-9%_.~+\-\s/]|\\/|\\u[0-9A-Fa-f]{4})+)""#)
});
static ORIGINAL_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#""originalUrl"\s*:\s*"((?:[A-Za-z0-9%_.~+\-:?=&#;,@!$'()*\[\]/]|\\/|\\u[0-9A-Fa-f]{4})+)""#,
    )
});
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#""title"\s*:\s*"((?:[^"\\]|\\.)*)""#));
static TOKEN_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"value="([^"]+)""#));

/// Default [`MetadataExtractor`]: line scan + bounded pattern + JSON unescape.
#[derive(Debug, Clone)]
pub struct LineScanExtractor {
    album_marker: String,
    media_marker: String,
}

impl Default for LineScanExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineScanExtractor {
    /// Extractor using the site's current markers.
    #[must_use]
    pub fn new() -> Self {
        Self::with_markers(ALBUM_QUERY_MARKER, MEDIA_MARKER)
    }

    /// Extractor looking for different object markers.
    #[must_use]
    pub fn with_markers(album_marker: impl Into<String>, media_marker: impl Into<String>) -> Self {
        Self {
            album_marker: album_marker.into(),
            media_marker: media_marker.into(),
        }
    }

    fn album_path(line: &str) -> Result<String, ExtractError> {
        let raw = capture(&ALBUM_PATH_RE, line, "album path")?;
        json_unescape(raw, "album path")
    }

    fn media_file(line: &str) -> Result<FileDescriptor, ExtractError> {
        let raw = capture(&ORIGINAL_URL_RE, line, "original URL")?;
        let url = json_unescape(raw, "original URL")?;
        // Undecodable titles fall back to the URL basename.
        let title = TITLE_RE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| json_unescape(m.as_str(), "title").ok());
        Ok(FileDescriptor::with_title(url, title.as_deref(), None))
    }
}

impl MetadataExtractor for LineScanExtractor {
    fn extract(&self, html: &str) -> Result<Descriptor, ExtractError> {
        let album_lines = marker_lines(html, &[self.album_marker.as_str(), ALBUM_KEY]);
        match album_lines.as_slice() {
            [line] => {
                let path = Self::album_path(line)?;
                debug!(album = %path, "page describes an album");
                return Ok(Descriptor::Album(path));
            }
            [] => {}
            many => {
                return Err(ExtractError::Ambiguous {
                    what: "album query",
                    count: many.len(),
                });
            }
        }

        let media_lines = marker_lines(html, &[self.media_marker.as_str(), ORIGINAL_URL_KEY]);
        match media_lines.as_slice() {
            [line] => {
                let file = Self::media_file(line)?;
                debug!(url = %file.url(), "page describes a single file");
                Ok(Descriptor::File(file))
            }
            [] => Err(ExtractError::MarkerNotFound {
                what: "album query or media detail",
            }),
            many => Err(ExtractError::Ambiguous {
                what: "media detail",
                count: many.len(),
            }),
        }
    }

    fn proof_token(&self, html: &str) -> Result<String, ExtractError> {
        let lines = marker_lines(html, &[TOKEN_INPUT_MARKER, TOKEN_ID_MARKER]);
        match lines.as_slice() {
            [line] => capture(&TOKEN_VALUE_RE, line, "proof token").map(str::to_string),
            [] => Err(ExtractError::MarkerNotFound {
                what: "proof token input",
            }),
            many => Err(ExtractError::Ambiguous {
                what: "proof token input",
                count: many.len(),
            }),
        }
    }
}

/// Lines of `html` containing every one of `needles`.
fn marker_lines<'a>(html: &'a str, needles: &[&str]) -> Vec<&'a str> {
    html.lines()
        .filter(|line| needles.iter().all(|needle| line.contains(needle)))
        .collect()
}

fn capture<'a>(
    regex: &Regex,
    line: &'a str,
    field: &'static str,
) -> Result<&'a str, ExtractError> {
    regex
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or(ExtractError::PatternMismatch { field })
}

/// Decodes `raw` as the body of a JSON string literal.
fn json_unescape(raw: &str, field: &'static str) -> Result<String, ExtractError> {
    serde_json::from_str::<String>(&format!("\"{raw}\""))
        .map_err(|source| ExtractError::Decode { field, source })
}
