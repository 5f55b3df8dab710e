//! Client IP extraction for rate-limit keys.
//!
//! # Security Warning: IP Spoofing Risk
//!
//! These functions trust proxy-set headers. The service is expected to run
//! behind an edge proxy/CDN that overwrites (not appends to) the client IP
//! headers; deployed any other way, clients can rotate spoofed
//! `X-Forwarded-For` values to dodge per-IP limits. Requests with no IP
//! headers all share the `"unknown"` key, which keeps header-less traffic
//! collectively limited.

use std::borrow::Cow;

use axum::http::Request;

/// Fallback key when no client IP can be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// Extract the client IP from request headers.
///
/// Checks in order (returns first match):
/// 1. `X-Forwarded-For` - first IP in the comma-separated chain, which the
///    edge proxy sets to the original client
/// 2. `X-Real-IP`
/// 3. Falls back to [`UNKNOWN_IP`]
///
/// Returns `Cow<'static, str>`: borrowed for the no-allocation "unknown"
/// fallback, owned for actual addresses.
pub fn extract_client_ip<B>(req: &Request<B>) -> Cow<'static, str> {
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(first_ip) = value.split(',').next()
    {
        return Cow::Owned(first_ip.trim().to_string());
    }

    if let Some(real_ip) = req.headers().get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
    {
        return Cow::Owned(value.trim().to_string());
    }

    Cow::Borrowed(UNKNOWN_IP)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_extract_ip_from_xff() {
        let req = Request::builder()
            .header("x-forwarded-for", "192.168.1.1, 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "192.168.1.1");
    }

    #[test]
    fn test_extract_ip_from_real_ip() {
        let req = Request::builder()
            .header("x-real-ip", "203.0.113.50")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "203.0.113.50");
    }

    #[test]
    fn test_xff_takes_priority_over_real_ip() {
        let req = Request::builder()
            .header("x-forwarded-for", "10.0.0.1")
            .header("x-real-ip", "192.168.1.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "10.0.0.1");
    }

    #[test]
    fn test_missing_headers_fall_back_to_unknown() {
        let req = Request::builder().body(Body::empty()).unwrap();

        let ip = extract_client_ip(&req);
        assert_eq!(ip, UNKNOWN_IP);
        assert!(matches!(ip, Cow::Borrowed(_)));
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let req = Request::builder()
            .header("x-forwarded-for", "  192.168.1.1  , 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "192.168.1.1");
    }

    #[test]
    fn test_ipv6_addresses_pass_through() {
        let req = Request::builder()
            .header("x-forwarded-for", "2001:db8::1, 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "2001:db8::1");
    }
}
