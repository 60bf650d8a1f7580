use std::net::IpAddr;
use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use seoscan::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Strips a leading `www.` from a host
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Returns true when the host starts with `www.`
pub fn has_www(host: &str) -> bool {
    host.starts_with("www.")
}

/// Checks whether two hosts belong to the same site
///
/// Two hosts are the same site when they are equal, differ only by a `www.`
/// prefix, or one is a subdomain of the other.
pub fn is_same_site(a: &str, b: &str) -> bool {
    let a = strip_www(a);
    let b = strip_www(b);

    a == b || a.ends_with(&format!(".{}", b)) || b.ends_with(&format!(".{}", a))
}

/// Key under which a URL is deduplicated
///
/// A leading `www.` is dropped from the host so that both host forms of a
/// page share one key, whichever form normalization produced at the time.
pub fn dedup_key(url: &Url) -> String {
    let Some(host) = url.host_str().filter(|h| has_www(h)) else {
        return url.to_string();
    };

    let mut bare = url.clone();
    match bare.set_host(Some(strip_www(host))) {
        Ok(()) => bare.to_string(),
        Err(_) => url.to_string(),
    }
}

/// Returns true for hosts where a `www.` variant makes no sense
pub fn is_ip_or_local(host: &str) -> bool {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    bare == "localhost" || bare.parse::<IpAddr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_ignores_www() {
        let bare = Url::parse("https://example.com/a?x=1").unwrap();
        let www = Url::parse("https://www.example.com/a?x=1").unwrap();
        assert_eq!(dedup_key(&bare), dedup_key(&www));
        assert_eq!(dedup_key(&www), "https://example.com/a?x=1");

        let other = Url::parse("https://blog.example.com/a?x=1").unwrap();
        assert_ne!(dedup_key(&other), dedup_key(&bare));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_strip_www() {
        assert_eq!(strip_www("www.example.com"), "example.com");
        assert_eq!(strip_www("example.com"), "example.com");
        assert_eq!(strip_www("wwwexample.com"), "wwwexample.com");
        assert!(has_www("www.example.com"));
        assert!(!has_www("blog.example.com"));
    }

    #[test]
    fn test_same_site() {
        assert!(is_same_site("example.com", "example.com"));
        assert!(is_same_site("www.example.com", "example.com"));
        assert!(is_same_site("blog.example.com", "example.com"));
        assert!(is_same_site("example.com", "shop.example.com"));
        assert!(is_same_site("www.example.com", "blog.example.com"));
    }

    #[test]
    fn test_not_same_site() {
        assert!(!is_same_site("example.com", "example.org"));
        assert!(!is_same_site("myexample.com", "example.com"));
        assert!(!is_same_site("example.com.evil.net", "example.com"));
    }

    #[test]
    fn test_ip_or_local() {
        assert!(is_ip_or_local("127.0.0.1"));
        assert!(is_ip_or_local("localhost"));
        assert!(is_ip_or_local("[::1]"));
        assert!(!is_ip_or_local("example.com"));
    }
}
