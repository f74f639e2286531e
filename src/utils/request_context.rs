//! Request context extraction from HTTP request headers.

use axum::http::{HeaderMap, header};
use std::net::{IpAddr, SocketAddr};

use crate::domain::RequestContext;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Builds the [`RequestContext`] for a tracking fetch.
///
/// The client IP is the peer address unless `behind_proxy` is set, in which case the
/// first `X-Forwarded-For` entry wins, then `X-Real-IP`, then the peer address.
/// Forwarded values that do not parse as an IP address are ignored.
///
/// Header values with invalid UTF-8 are treated as absent.
///
/// # Examples
///
/// ```ignore
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
///
/// let ctx = request_context_from_headers(&headers, "10.0.0.1:5000".parse().unwrap(), true);
/// assert_eq!(ctx.client_ip.as_deref(), Some("203.0.113.7"));
/// ```
pub fn request_context_from_headers(
    headers: &HeaderMap,
    peer: SocketAddr,
    behind_proxy: bool,
) -> RequestContext {
    let forwarded = if behind_proxy {
        forwarded_client_ip(headers)
    } else {
        None
    };
    let client_ip = forwarded.unwrap_or_else(|| peer.ip());

    RequestContext::new(
        Some(client_ip.to_string()),
        header_str(headers, header::USER_AGENT.as_str()),
        header_str(headers, header::REFERER.as_str()),
    )
}

fn forwarded_client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    header_str(headers, X_FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .or_else(|| header_str(headers, X_REAL_IP).and_then(|v| v.trim().parse().ok()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "10.0.0.1:54321".parse().unwrap()
    }

    #[test]
    fn test_peer_address_without_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("203.0.113.7"));

        let ctx = request_context_from_headers(&headers, peer(), false);

        assert_eq!(ctx.client_ip.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_first_forwarded_entry_behind_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static("203.0.113.7, 198.51.100.2, 10.0.0.1"),
        );
        headers.insert(X_REAL_IP, HeaderValue::from_static("198.51.100.2"));

        let ctx = request_context_from_headers(&headers, peer(), true);

        assert_eq!(ctx.client_ip.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("unknown"));
        headers.insert(X_REAL_IP, HeaderValue::from_static("2001:db8::1"));

        let ctx = request_context_from_headers(&headers, peer(), true);

        assert_eq!(ctx.client_ip.as_deref(), Some("2001:db8::1"));
    }

    #[test]
    fn test_no_forwarding_headers_behind_proxy() {
        let ctx = request_context_from_headers(&HeaderMap::new(), peer(), true);

        assert_eq!(ctx.client_ip.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_user_agent_and_referrer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("GoogleImageProxy"));
        headers.insert(header::REFERER, HeaderValue::from_static("https://mail.example.com/"));

        let ctx = request_context_from_headers(&headers, peer(), false);

        assert_eq!(ctx.user_agent.as_deref(), Some("GoogleImageProxy"));
        assert_eq!(ctx.referrer.as_deref(), Some("https://mail.example.com/"));
    }

    #[test]
    fn test_missing_and_invalid_headers_are_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_bytes(b"\xff\xfe").unwrap());
        headers.insert(header::REFERER, HeaderValue::from_static(""));

        let ctx = request_context_from_headers(&headers, peer(), false);

        assert_eq!(ctx.user_agent, None);
        assert_eq!(ctx.referrer, None);
    }
}
