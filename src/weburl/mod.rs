//! URL normalization and validity checks.
//!
//! Normalization removes the fragment and any trailing `/` from the path so
//! that `https://a.edu/x` and `https://a.edu/x/` hash to the same [`Nurl`](crate::nurl::Nurl).

use thiserror::Error;
use url::Url;

/// Extensions the crawler never follows: binary/media formats that carry no
/// link-graph or text value for this crawl.
const DISALLOWED_EXTENSIONS: &[&str] = &[
    "css", "js", "mjs", "json", "map", "xml",
    "png", "jpg", "jpeg", "gif", "bmp", "svg", "webp", "ico", "tiff",
    "mp3", "mp4", "wav", "avi", "mov", "mkv", "flac", "ogg", "webm",
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp",
    "zip", "tar", "gz", "bz2", "7z", "rar",
    "exe", "dll", "so", "dmg", "apk", "bin", "iso",
    "woff", "woff2", "ttf", "eot", "otf",
];

#[derive(Debug, Error)]
pub enum WebUrlError {
    #[error(transparent)]
    Parse(#[from] url::ParseError),
}

/// Removes the fragment and a single trailing `/` (other than the root path)
/// from `raw`, returning the parsed, normalized [`Url`].
pub fn normalize(raw: &str) -> Result<Url, WebUrlError> {
    let mut parsed = Url::parse(raw)?;
    parsed.set_fragment(None);
    let path = parsed.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        let trimmed = if trimmed.is_empty() { "/" } else { &trimmed };
        parsed.set_path(trimmed);
    }
    Ok(parsed)
}

/// Accepts only `http`/`https`; in strict mode the host must end with one of
/// `allowed_suffixes`; rejects paths whose final segment has a disallowed
/// media/binary extension.
pub fn is_valid(url: &Url, strict: bool, allowed_suffixes: &[String]) -> bool {
    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }

    if strict {
        let Some(host) = url.host_str() else {
            return false;
        };
        if !allowed_suffixes.iter().any(|suffix| host.ends_with(suffix.as_str())) {
            return false;
        }
    }

    if let Some(segment) = url.path_segments().and_then(|mut s| s.next_back()) {
        if let Some((_, ext)) = segment.rsplit_once('.') {
            let ext = ext.to_ascii_lowercase();
            if DISALLOWED_EXTENSIONS.contains(&ext.as_str()) {
                return false;
            }
        }
    }

    true
}

/// True iff `child` and `parent` share a scheme and host.
pub fn same_scheme_host(child: &Url, parent: &Url) -> bool {
    child.scheme() == parent.scheme() && child.host_str() == parent.host_str()
}

/// Counts `/` occurrences in the URL path, used by the depth computation in
/// [`crate::nurl`].
pub fn path_slash_count(url: &Url) -> usize {
    url.path().matches('/').count()
}
