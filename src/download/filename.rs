//! Filename derivation and sanitization for downloads and album directories.

use std::path::{Component, Path};

use url::Url;

/// Fallback name when a media URL has no usable last path segment.
const FALLBACK_FILENAME: &str = "download";

/// Replaces path-hostile characters so `value` is safe as one path component.
///
/// Each of `\ / > < | : & " ? *` and every control character becomes `_`,
/// one-for-one. Empty input and dot segments (`.`, `..`) are rewritten so the
/// result can never climb out of its parent directory.
#[must_use]
pub fn sanitize_path_component(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| match c {
            '\\' | '/' | '>' | '<' | '|' | ':' | '&' | '"' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.trim().is_empty() {
        return "_".to_string();
    }

    if is_safe_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Percent-decoded last path segment of `url`, if any.
pub(crate) fn url_basename(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last)
        .map_or_else(|_| last.to_string(), std::borrow::Cow::into_owned);
    Some(decoded)
}

/// Extension (without the dot) of the last path segment of `url`.
pub(crate) fn extension_from_url(url: &str) -> Option<String> {
    let basename = url_basename(url)?;
    let (stem, ext) = basename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 12 {
        return None;
    }
    Some(ext.to_string())
}

/// Local filename for a media URL: `title.ext` when both are known, else the
/// URL's basename.
pub(crate) fn derive_filename(url: &str, title: Option<&str>, ext: Option<&str>) -> String {
    let title = title.map(str::trim).filter(|t| !t.is_empty());
    let ext = ext
        .map(|e| e.trim().trim_start_matches('.').to_string())
        .filter(|e| !e.is_empty())
        .or_else(|| extension_from_url(url));

    if let (Some(title), Some(ext)) = (title, ext) {
        return sanitize_path_component(&format!("{title}.{ext}"));
    }

    url_basename(url).map_or_else(
        || FALLBACK_FILENAME.to_string(),
        |name| sanitize_path_component(&name),
    )
}
