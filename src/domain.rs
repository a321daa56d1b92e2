use crate::error::SchedulerError;
use std::net::IpAddr;

/// Second-level suffixes under which registrations happen one label deeper.
const MULTI_LABEL_SUFFIXES: &[&str] = &[
    "ac.cn", "ac.jp", "ac.uk", "co.jp", "co.kr", "co.nz", "co.uk", "co.za", "com.au",
    "com.br", "com.cn", "com.hk", "com.sg", "com.tw", "edu.au", "edu.cn", "gov.cn",
    "gov.uk", "ne.jp", "net.au", "net.cn", "or.jp", "org.au", "org.cn", "org.uk",
];

/// Reduces a host name to its registrable domain, e.g. `blog.csdn.net` to
/// `csdn.net`. IP addresses and single-label hosts are returned unchanged.
pub fn primary_domain(host: &str) -> Result<String, SchedulerError> {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .map(str::to_string)
        .unwrap_or(host);
    let host = match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            name.to_string()
        }
        _ => host,
    };

    if host.is_empty() || host.split('.').any(str::is_empty) {
        return Err(SchedulerError::InvalidDomain(host));
    }
    if host.parse::<IpAddr>().is_ok() {
        return Ok(host);
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return Ok(host);
    }

    let last_two = labels[labels.len() - 2..].join(".");
    let keep = if MULTI_LABEL_SUFFIXES.contains(&last_two.as_str()) {
        3
    } else {
        2
    };
    Ok(labels[labels.len() - keep..].join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdomains_collapse_to_registrable_domain() {
        assert_eq!(primary_domain("blog.csdn.net").unwrap(), "csdn.net");
        assert_eq!(primary_domain("a.b.example.test").unwrap(), "example.test");
        assert_eq!(primary_domain("example.test").unwrap(), "example.test");
    }

    #[test]
    fn test_multi_label_suffixes() {
        assert_eq!(primary_domain("www.cbhb.com.cn").unwrap(), "cbhb.com.cn");
        assert_eq!(primary_domain("news.bbc.co.uk").unwrap(), "bbc.co.uk");
    }

    #[test]
    fn test_case_port_and_trailing_dot() {
        assert_eq!(primary_domain("WWW.Example.Test.").unwrap(), "example.test");
        assert_eq!(primary_domain("www.example.test:8080").unwrap(), "example.test");
    }

    #[test]
    fn test_ip_and_single_label_hosts() {
        assert_eq!(primary_domain("127.0.0.1").unwrap(), "127.0.0.1");
        assert_eq!(primary_domain("[::1]").unwrap(), "::1");
        assert_eq!(primary_domain("localhost").unwrap(), "localhost");
    }

    #[test]
    fn test_empty_hosts_are_rejected() {
        assert!(primary_domain("").is_err());
        assert!(primary_domain("a..b").is_err());
    }
}
