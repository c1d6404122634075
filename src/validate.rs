//! Target URL validation, run synchronously before any job is created.

use std::net::{IpAddr, Ipv6Addr};

use url::Url;

use crate::{ErrorKind, Result};

/// Normalize and authorize a submitted target URL.
///
/// Adds `https://` when the input carries no scheme. Rejects non-http(s)
/// schemes and hostnames that lexically name loopback, RFC 1918 private,
/// link-local or IPv6 unique-local addresses. The check never resolves DNS;
/// it only inspects the hostname string.
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidTarget`] when the input cannot be parsed or
/// names a forbidden host.
pub fn validate(raw: &str) -> Result<Url> {
    validate_with(raw, false)
}

/// Like [`validate`], but optionally admitting loopback and private hosts.
///
/// Intended for deployments that deliberately check intranet sites (and for
/// exercising the pipeline against local servers).
///
/// # Errors
///
/// Same as [`validate`], except host authorization when
/// `allow_private_hosts` is set.
pub fn validate_with(raw: &str, allow_private_hosts: bool) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ErrorKind::InvalidTarget(
            raw.to_string(),
            "empty input".to_string(),
        ));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| ErrorKind::InvalidTarget(raw.to_string(), e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ErrorKind::InvalidTarget(
                raw.to_string(),
                format!("unsupported scheme `{other}`"),
            ));
        }
    }

    let host = url.host_str().ok_or_else(|| {
        ErrorKind::InvalidTarget(raw.to_string(), "missing host".to_string())
    })?;

    if !allow_private_hosts && is_forbidden_host(host) {
        return Err(ErrorKind::InvalidTarget(
            raw.to_string(),
            format!("host `{host}` is not publicly routable"),
        ));
    }

    Ok(url)
}

/// Lexical check for hosts that must never be probed: loopback, private
/// ranges, link-local and IPv6 unique-local addresses.
fn is_forbidden_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }

    // IPv6 hosts arrive bracketed from the URL parser
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    let Ok(ip) = bare.parse::<IpAddr>() else {
        return false;
    };

    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback() || is_unique_local(&v6) || is_v6_link_local(&v6),
    }
}

/// `fc00::/7`, see RFC 4193
fn is_unique_local(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xfe00) == 0xfc00
}

/// `fe80::/10`, see RFC 4291 section 2.4
fn is_v6_link_local(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}
