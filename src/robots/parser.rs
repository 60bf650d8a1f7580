//! Robots.txt parser implementation
//!
//! Walks the file line by line, tracking which `User-agent` group is active,
//! and keeps the rules that apply to the crawler's own product token apart
//! from the wildcard rules. Own-agent rules replace wildcard rules per
//! directive type.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Parsed robots.txt data for one host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotsData {
    /// `Sitemap:` URLs, collected regardless of group
    pub sitemaps: Vec<String>,
    /// `Crawl-delay` converted to milliseconds
    pub crawl_delay_ms: Option<u64>,
    pub allowed_paths: Vec<String>,
    pub disallowed_paths: Vec<String>,
}

impl RobotsData {
    /// Robots data that places no restrictions
    ///
    /// Used when robots.txt is missing, unreachable or not respected.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Checks a path (with optional query) against the rules
    pub fn is_allowed(&self, path: &str) -> bool {
        is_path_allowed(path, self)
    }
}

#[derive(Debug, Default)]
struct RuleSet {
    allow: Vec<String>,
    disallow: Vec<String>,
    crawl_delay: Option<f64>,
}

/// Parses robots.txt content for the given user agent
///
/// # Examples
///
/// ```
/// use seoscan::robots::parse;
///
/// let data = parse("User-agent: *\nDisallow: /private/\nCrawl-delay: 2", "seoscan/1.0");
/// assert!(!data.is_allowed("/private/a"));
/// assert!(data.is_allowed("/public"));
/// assert_eq!(data.crawl_delay_ms, Some(2000));
/// ```
pub fn parse(content: &str, user_agent: &str) -> RobotsData {
    let token = product_token(user_agent);

    let mut own = RuleSet::default();
    let mut wildcard = RuleSet::default();
    let mut sitemaps: Vec<String> = Vec::new();

    let mut current_agents: Vec<String> = Vec::new();
    // Consecutive User-agent lines belong to one group; any other directive
    // closes the list of agents for that group
    let mut collecting_agents = false;

    for line in content.lines() {
        let line = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let Some((key, value)) = trimmed.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        if key == "sitemap" {
            if !value.is_empty() && !sitemaps.iter().any(|s| s == value) {
                sitemaps.push(value.to_string());
            }
            continue;
        }

        if key == "user-agent" {
            if !collecting_agents {
                current_agents.clear();
                collecting_agents = true;
            }
            current_agents.push(value.to_lowercase());
            continue;
        }
        collecting_agents = false;

        let applies_to_own = current_agents
            .iter()
            .any(|agent| agent != "*" && !agent.is_empty() && product_token(agent) == token);
        let applies_to_wildcard = current_agents.iter().any(|agent| agent == "*");

        let target = if applies_to_own {
            &mut own
        } else if applies_to_wildcard {
            &mut wildcard
        } else {
            continue;
        };

        match key.as_str() {
            "allow" if !value.is_empty() => target.allow.push(value.to_string()),
            "disallow" if !value.is_empty() => target.disallow.push(value.to_string()),
            "crawl-delay" => {
                if let Ok(delay) = value.parse::<f64>() {
                    if delay.is_finite() && delay >= 0.0 {
                        target.crawl_delay = Some(delay);
                    }
                }
            }
            _ => {}
        }
    }

    let allowed_paths = if own.allow.is_empty() {
        wildcard.allow
    } else {
        own.allow
    };
    let disallowed_paths = if own.disallow.is_empty() {
        wildcard.disallow
    } else {
        own.disallow
    };
    let crawl_delay = own.crawl_delay.or(wildcard.crawl_delay);

    RobotsData {
        sitemaps,
        crawl_delay_ms: crawl_delay.map(|secs| (secs * 1000.0).round() as u64),
        allowed_paths,
        disallowed_paths,
    }
}

/// Checks whether a path is allowed by the parsed rules
///
/// Allow beats Disallow; a path matched by no rule is allowed.
pub fn is_path_allowed(path: &str, data: &RobotsData) -> bool {
    let path = if path.is_empty() { "/" } else { path };

    if data
        .allowed_paths
        .iter()
        .any(|pattern| pattern_matches(pattern, path))
    {
        return true;
    }

    !data
        .disallowed_paths
        .iter()
        .any(|pattern| pattern_matches(pattern, path))
}

/// Lowercase product token of a user agent ("SeoScan/1.0 (+url)" -> "seoscan")
fn product_token(user_agent: &str) -> String {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    match pattern_to_regex(pattern) {
        Some(re) => re.is_match(path),
        None => path.starts_with(pattern),
    }
}

/// Converts a robots.txt path pattern into an anchored regex
///
/// `*` matches any sequence, a trailing `$` anchors the end, everything else
/// is literal.
fn pattern_to_regex(pattern: &str) -> Option<Regex> {
    let (body, anchored_end) = match pattern.strip_suffix('$') {
        Some(body) => (body, true),
        None => (pattern, false),
    };

    let mut expr = String::from("^");
    let escaped: Vec<String> = body.split('*').map(regex::escape).collect();
    expr.push_str(&escaped.join(".*"));
    if anchored_end {
        expr.push('$');
    }

    Regex::new(&expr).ok()
}
