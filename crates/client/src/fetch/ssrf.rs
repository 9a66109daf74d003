//! SSRF protection.
//!
//! Declared icon URLs come from token metadata anyone can publish, so a URL
//! whose host is a private, internal or reserved IP literal is never requested.
use std::net::IpAddr;

/// Error type for SSRF validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SsrfError {
    #[error("blocked IP: {0} (private/reserved)")]
    BlockedIp(IpAddr),

    #[error("blocked host: {0}")]
    BlockedHost(String),
}

/// Check if an IP address is private, reserved, or otherwise blocked.
///
/// This covers:
/// - Loopback addresses (127.0.0.0/8, ::1)
/// - RFC 1918 private ranges (10/8, 172.16/12, 192.168/16)
/// - Link-local addresses (169.254/16, fe80::/10)
/// - Multicast addresses (224/4, ff00::/8)
/// - Unspecified addresses (0.0.0.0/8, ::)
/// - IPv6 unique local (fc00::/7)
pub fn is_private_or_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_multicast()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.octets()[0] == 0
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_or_reserved(IpAddr::V4(mapped));
            }
            v6.is_loopback()
                || v6.is_multicast()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Validate that an IP address is not private or reserved.
pub fn validate_ip(ip: IpAddr) -> Result<(), SsrfError> {
    if is_private_or_reserved(ip) { Err(SsrfError::BlockedIp(ip)) } else { Ok(()) }
}

/// Reject URLs whose host is `localhost` or a private/reserved IP literal.
///
/// Names are not resolved here; that happens inside the HTTP client.
pub fn check_url_host(url: &url::Url) -> Result<(), SsrfError> {
    match url.host() {
        Some(url::Host::Ipv4(v4)) => validate_ip(IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => validate_ip(IpAddr::V6(v6)),
        Some(url::Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            if domain == "localhost" || domain.ends_with(".localhost") {
                Err(SsrfError::BlockedHost(domain))
            } else {
                Ok(())
            }
        }
        None => Err(SsrfError::BlockedHost(String::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{Ipv4Addr, Ipv6Addr};

    fn url(s: &str) -> url::Url {
        url::Url::parse(s).unwrap()
    }

    #[test]
    fn test_is_private_or_reserved_v4() {
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))));
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(172, 31, 255, 255))));
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1))));
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(169, 254, 169, 254))));
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 1))));
    }

    #[test]
    fn test_is_private_or_reserved_v6() {
        assert!(is_private_or_reserved(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert!(is_private_or_reserved(IpAddr::V6(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 1))));
        assert!(is_private_or_reserved(IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1))));
        assert!(is_private_or_reserved(IpAddr::V6(Ipv4Addr::new(10, 1, 2, 3).to_ipv6_mapped())));
    }

    #[test]
    fn test_is_private_or_reserved_public() {
        assert!(!is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1))));
        assert!(!is_private_or_reserved(IpAddr::V6(Ipv6Addr::new(0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 1))));
    }

    #[test]
    fn test_check_url_host() {
        assert!(check_url_host(&url("https://ipfs.io/ipfs/Qm")).is_ok());
        assert!(check_url_host(&url("https://8.8.8.8/icon.png")).is_ok());
        assert!(matches!(check_url_host(&url("http://192.168.1.1/x")), Err(SsrfError::BlockedIp(_))));
        assert!(matches!(check_url_host(&url("http://[::1]/x")), Err(SsrfError::BlockedIp(_))));
        assert!(matches!(check_url_host(&url("http://LOCALHOST:8080/x")), Err(SsrfError::BlockedHost(_))));
    }
}
