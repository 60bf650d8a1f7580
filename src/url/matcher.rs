use regex::Regex;

/// Checks if a host matches a wildcard pattern
///
/// `"example.com"` matches only itself; `"*.example.com"` matches the bare
/// domain and any subdomain of it.
///
/// # Examples
///
/// ```
/// use seoscan::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.wixsite.com", "shop.wixsite.com"));
/// assert!(matches_wildcard("*.wixsite.com", "wixsite.com"));
/// assert!(!matches_wildcard("example.com", "blog.example.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

#[derive(Debug, Clone)]
enum ExcludePattern {
    Regex(Regex),
    Substring(String),
}

/// Compiled URL exclusion patterns
///
/// Each pattern is tried as a regular expression; a pattern that does not
/// compile is matched as a plain substring.
#[derive(Debug, Clone, Default)]
pub struct ExcludePatterns {
    patterns: Vec<ExcludePattern>,
}

impl ExcludePatterns {
    /// Compiles the given patterns, ignoring blank entries
    pub fn compile(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| match Regex::new(p) {
                Ok(re) => ExcludePattern::Regex(re),
                Err(_) => {
                    tracing::debug!("Exclude pattern '{}' is not a regex, matching as text", p);
                    ExcludePattern::Substring(p.to_string())
                }
            })
            .collect();

        Self { patterns }
    }

    /// Returns true if any pattern matches the URL
    pub fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| match p {
            ExcludePattern::Regex(re) => re.is_match(url),
            ExcludePattern::Substring(s) => url.contains(s.as_str()),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}

/// Returns true if `url` matches any of `patterns`
pub fn should_exclude(url: &str, patterns: &[String]) -> bool {
    ExcludePatterns::compile(patterns).matches(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_wildcard("example.com", "example.com"));
        assert!(!matches_wildcard("example.com", "other.com"));
    }

    #[test]
    fn test_wildcard_matches_bare_and_nested() {
        assert!(matches_wildcard("*.example.com", "example.com"));
        assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
        assert!(!matches_wildcard("*.example.com", "myexample.com"));
        assert!(!matches_wildcard("*.example.com", "example.com.org"));
    }

    #[test]
    fn test_regex_patterns() {
        let patterns = ExcludePatterns::compile(&[r"/admin(/|$)".to_string(), r"\.pdf$".to_string()]);
        assert!(patterns.matches("https://example.com/admin"));
        assert!(patterns.matches("https://example.com/admin/users"));
        assert!(patterns.matches("https://example.com/files/report.pdf"));
        assert!(!patterns.matches("https://example.com/administrator-guide"));
        assert!(!patterns.matches("https://example.com/"));
    }

    #[test]
    fn test_invalid_regex_falls_back_to_substring() {
        let patterns = ExcludePatterns::compile(&["/cart(".to_string()]);
        assert_eq!(patterns.len(), 1);
        assert!(patterns.matches("https://example.com/cart(1)"));
        assert!(!patterns.matches("https://example.com/cart"));
    }

    #[test]
    fn test_blank_patterns_ignored() {
        let patterns = ExcludePatterns::compile(&["".to_string(), "   ".to_string()]);
        assert!(patterns.is_empty());
        assert!(!patterns.matches("https://example.com/"));
    }

    #[test]
    fn test_should_exclude_helper() {
        assert!(should_exclude(
            "https://example.com/wp-admin/x",
            &["wp-admin".to_string()]
        ));
        assert!(!should_exclude("https://example.com/blog", &[]));
    }
}
