//! SSRF guard for outbound HTTP tools.
//!
//! Blocks loopback, private, link-local, and cloud metadata addresses so a
//! `web.fetch`/`web.http_request` call can't be used to probe internal
//! infrastructure from inside the gateway's network.

use std::net::IpAddr;

pub fn validate_url(url_str: &str) -> Result<(), String> {
    let parsed = url::Url::parse(url_str).map_err(|e| format!("invalid URL: {e}"))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("only http/https allowed, got '{}'", parsed.scheme()));
    }

    let host = parsed.host().ok_or("URL has no host")?;

    match host {
        url::Host::Ipv4(v4) => check_ip_allowed(IpAddr::V4(v4))?,
        url::Host::Ipv6(v6) => check_ip_allowed(IpAddr::V6(v6))?,
        url::Host::Domain(domain) => match std::net::ToSocketAddrs::to_socket_addrs(&(domain, 80)) {
            Ok(addrs) => {
                for addr in addrs {
                    check_ip_allowed(addr.ip())?;
                }
            }
            Err(_) => {}
        },
    }

    Ok(())
}

fn check_ip_allowed(ip: IpAddr) -> Result<(), String> {
    match ip {
        IpAddr::V4(v4) => {
            if v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.octets()[0] == 0
            {
                return Err(format!("blocked: requests to {v4} are not allowed"));
            }
        }
        IpAddr::V6(v6) => {
            if v6.is_loopback() || v6.is_unspecified() {
                return Err(format!("blocked: requests to {v6} are not allowed"));
            }
            if let Some(v4) = v6.to_ipv4_mapped() {
                return check_ip_allowed(IpAddr::V4(v4));
            }
            let segments = v6.segments();
            if segments[0] & 0xffc0 == 0xfe80 {
                return Err(format!("blocked: requests to {v6} are not allowed"));
            }
            if segments[0] & 0xfe00 == 0xfc00 {
                return Err(format!("blocked: requests to {v6} are not allowed"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_public_https() {
        assert!(validate_url("https://example.com").is_ok());
    }

    #[test]
    fn blocks_file_scheme() {
        assert!(validate_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn blocks_localhost() {
        assert!(validate_url("http://localhost/secret").is_err());
    }

    #[test]
    fn blocks_loopback() {
        assert!(validate_url("http://127.0.0.1/admin").is_err());
    }

    #[test]
    fn blocks_private_ranges() {
        assert!(validate_url("http://10.0.0.1").is_err());
        assert!(validate_url("http://172.16.0.1").is_err());
        assert!(validate_url("http://192.168.1.1").is_err());
    }

    #[test]
    fn blocks_metadata_endpoint() {
        assert!(validate_url("http://169.254.169.254/latest/meta-data/").is_err());
    }

    #[test]
    fn blocks_ipv6_loopback() {
        assert!(validate_url("http://[::1]:8080").is_err());
    }
}
