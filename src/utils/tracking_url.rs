//! Tracking URL helpers: destination checks and segment joining/extraction.

use url::Url;

/// Checks that `candidate` is an absolute `http` or `https` URL with a host.
///
/// Only such URLs are accepted as click destinations and rewritten by the HTML adapter.
/// Relative paths, anchors, `mailto:`, `javascript:` and every other scheme are rejected.
///
/// # Examples
///
/// ```ignore
/// assert!(is_trackable_url("https://example.com/offer"));
/// assert!(!is_trackable_url("/relative/path"));
/// assert!(!is_trackable_url("mailto:team@example.com"));
/// ```
pub fn is_trackable_url(candidate: &str) -> bool {
    Url::parse(candidate.trim())
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false)
}

/// Appends one encoded path segment to a base URL without a trailing slash.
pub fn join_segment(base: &str, segment: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), segment)
}

/// Returns the encoded path segment of `url` if it was issued under `base`.
///
/// Query string and fragment are ignored, as is one trailing slash that some mail
/// proxies append. Returns `None` when the URL does not start with `base` or when more
/// than one segment follows it.
pub fn extract_segment<'a>(url: &'a str, base: &str) -> Option<&'a str> {
    let base = base.trim_end_matches('/');
    let rest = url.strip_prefix(base)?.strip_prefix('/')?;

    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    let segment = rest[..end].strip_suffix('/').unwrap_or(&rest[..end]);

    if segment.is_empty() || segment.contains('/') {
        return None;
    }

    Some(segment)
}

/// Checks that a segment only uses the URL-safe base64 alphabet `[A-Za-z0-9_-]`.
pub fn is_segment_alphabet(segment: &str) -> bool {
    segment
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trackable_http_and_https() {
        assert!(is_trackable_url("http://example.com"));
        assert!(is_trackable_url("https://example.com/path?q=1#frag"));
        assert!(is_trackable_url("HTTPS://EXAMPLE.COM/"));
        assert!(is_trackable_url("  https://example.com/padded  "));
    }

    #[test]
    fn test_untrackable_destinations() {
        for href in [
            "/relative",
            "relative/page.html",
            "#section",
            "mailto:a@example.com",
            "tel:+123",
            "javascript:void(0)",
            "ftp://example.com/file",
            "data:text/html,hi",
            "",
        ] {
            assert!(!is_trackable_url(href), "{href:?} should not be trackable");
        }
    }

    #[test]
    fn test_join_segment() {
        assert_eq!(join_segment("https://t.example.com/open", "abc"), "https://t.example.com/open/abc");
        assert_eq!(join_segment("https://t.example.com/open/", "abc"), "https://t.example.com/open/abc");
    }

    #[test]
    fn test_extract_segment() {
        let base = "https://t.example.com/track/open";

        assert_eq!(extract_segment("https://t.example.com/track/open/abc_-1", base), Some("abc_-1"));
        assert_eq!(extract_segment("https://t.example.com/track/open/abc/", base), Some("abc"));
        assert_eq!(extract_segment("https://t.example.com/track/open/abc?utm=x", base), Some("abc"));
        assert_eq!(extract_segment("https://t.example.com/track/open/abc#top", base), Some("abc"));
    }

    #[test]
    fn test_extract_segment_rejects_foreign_urls() {
        let base = "https://t.example.com/track/open";

        assert_eq!(extract_segment("https://t.example.com/track/click/abc", base), None);
        assert_eq!(extract_segment("https://t.example.com/track/open/", base), None);
        assert_eq!(extract_segment("https://t.example.com/track/open/a/b", base), None);
        assert_eq!(extract_segment("https://t.example.com/track/openabc", base), None);
    }

    #[test]
    fn test_segment_alphabet() {
        assert!(is_segment_alphabet("AZaz09-_"));
        assert!(!is_segment_alphabet("abc="));
        assert!(!is_segment_alphabet("a+b/c"));
    }
}
