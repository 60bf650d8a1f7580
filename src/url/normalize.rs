use crate::url::domain::{is_ip_or_local, strip_www};
use crate::url::WwwPreference;
use crate::UrlError;
use url::Url;

/// Exact-match tracking query parameters removed during normalization
///
/// Any parameter starting with `utm_` is removed as well.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "msclkid", "ref", "_ga", "mc_cid", "mc_eid",
];

/// Schemes that are never rewritten into `https://host` form
const OPAQUE_SCHEMES: &[&str] = &["mailto", "tel", "javascript", "data", "ftp", "file"];

/// Rewrite rule for hosts belonging to the crawled site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WwwRule {
    /// Bare (www-less) lowercase domain of the crawl base
    pub base_domain: String,
    /// Learned preference for that domain
    pub preference: WwwPreference,
    /// Scheme the seed declared; site URLs are pinned to it
    pub scheme: Option<String>,
}

/// Normalizes a URL without any learned www preference
///
/// # Normalization Steps
///
/// 1. Default to `https://` when no scheme is given, and upgrade `http` to
///    `https` for public hosts (IP addresses and `localhost` keep theirs)
/// 2. Lowercase the host
/// 3. Remove duplicate slashes and dot segments from the path
/// 4. Remove the fragment
/// 5. Remove tracking query parameters, sort the remaining ones
/// 6. Remove the trailing slash unless the path is `/`
///
/// # Examples
///
/// ```
/// use seoscan::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.com/Shop/Shoes/?utm_source=ig&color=red#info").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/Shop/Shoes?color=red");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    normalize_url_with(url_str, None)
}

/// Normalizes a URL, rewriting `www.` and the scheme according to `rule` when
/// the host belongs to the rule's base domain
///
/// With a rule, hosts outside the base domain keep their scheme.
pub fn normalize_url_with(url_str: &str, rule: Option<&WwwRule>) -> Result<Url, UrlError> {
    let mut url = parse_with_default_scheme(url_str)?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .map(|h| h.to_lowercase())
        .filter(|h| !h.is_empty())
        .ok_or(UrlError::MissingDomain)?;

    let scheme = match rule {
        Some(WwwRule {
            base_domain,
            scheme: Some(scheme),
            ..
        }) if strip_www(&host) == base_domain.as_str() => Some(scheme.as_str()),
        Some(_) => None,
        None if url.scheme() == "http" && !is_ip_or_local(&host) => Some("https"),
        None => None,
    };
    if let Some(scheme) = scheme {
        if url.scheme() != scheme {
            url.set_scheme(scheme)
                .map_err(|_| UrlError::InvalidScheme(scheme.to_string()))?;
        }
    }

    let host = match rule {
        Some(rule) => rule.preference.apply(&host, &rule.base_domain),
        None => host,
    };

    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Parses a URL string, assuming `https` when the scheme is missing
pub(crate) fn parse_with_default_scheme(url_str: &str) -> Result<Url, UrlError> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    if let Some(rest) = trimmed.strip_prefix("//") {
        return Url::parse(&format!("https://{}", rest)).map_err(|e| UrlError::Parse(e.to_string()));
    }

    match Url::parse(trimmed) {
        Ok(url) if trimmed.contains("://") => Ok(url),
        Ok(url) if OPAQUE_SCHEMES.contains(&url.scheme()) => Ok(url),
        // "example.com:8080/x" and "localhost:3000" parse as a scheme named after the host
        Ok(url) if looks_like_host_with_port(&url) => Url::parse(&format!("https://{}", trimmed))
            .map_err(|e| UrlError::Parse(e.to_string())),
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{}", trimmed)).map_err(|e| UrlError::Parse(e.to_string()))
        }
        Err(e) => Err(UrlError::Parse(e.to_string())),
    }
}

fn looks_like_host_with_port(url: &Url) -> bool {
    url.cannot_be_a_base()
        && (url.scheme().contains('.')
            || url.path().chars().next().is_some_and(|c| c.is_ascii_digit()))
}

/// Normalizes a URL path by removing dot segments, duplicate slashes and the
/// trailing slash
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts the remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

/// Checks if a query parameter is a tracking parameter
pub(crate) fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

impl WwwPreference {
    /// Rewrites `host` to this preference when it is the bare or `www.` form
    /// of `base_domain`; any other host is returned unchanged
    pub fn apply(&self, host: &str, base_domain: &str) -> String {
        if strip_www(host) != base_domain {
            return host.to_string();
        }

        match self {
            Self::Www => format!("www.{}", base_domain),
            Self::NonWww => base_domain.to_string(),
            Self::Unknown => host.to_string(),
        }
    }
}
