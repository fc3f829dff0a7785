// Network-free checks used by the probe chain

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};

static STREAMING_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\.m3u8(?:\?|#|$)|manifest|/hls/|/dash/|/m3u8/)").unwrap()
});

/// Bytes of a response body inspected for a markup signature
const HTML_SNIFF_LEN: usize = 512;

/// True for URLs that point at segment manifests rather than files
///
/// This is only a cheap true-negative: a URL that does not match still has
/// to be proven live over the network.
pub fn is_streaming_manifest(url: &str) -> bool {
    STREAMING_HINT.is_match(url)
}

/// Whether response headers describe downloadable file content
pub fn looks_like_file(headers: &HeaderMap) -> bool {
    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_lowercase())
            .unwrap_or_default()
    };

    let disposition = header(CONTENT_DISPOSITION);
    if disposition.contains("attachment") {
        return true;
    }

    let content_type = header(CONTENT_TYPE);
    if content_type.starts_with("video/")
        || content_type.contains("application")
        || content_type.contains("octet-stream")
    {
        return true;
    }

    header(CONTENT_LENGTH)
        .trim()
        .parse::<u64>()
        .map(|len| len > 0)
        .unwrap_or(false)
}

/// Whether the first bytes of a body look like an HTML document
pub fn chunk_seems_html(first_bytes: &[u8]) -> bool {
    if first_bytes.is_empty() {
        return false;
    }
    let sample = &first_bytes[..first_bytes.len().min(HTML_SNIFF_LEN)];
    let lower = sample.to_ascii_lowercase();
    contains(&lower, b"<html") || lower.trim_ascii_start().starts_with(b"<!doctype")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
