use regex::Regex;
use std::sync::LazyLock;
use url::Url;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 10;

/// Priority assigned to the seed URL
pub const SEED_PRIORITY: u8 = 10;

/// Priority assigned to URLs discovered through sitemaps
pub const SITEMAP_PRIORITY: u8 = 8;

const CONTENT_HUB_BONUS: i32 = 3;
const COMMERCE_BONUS: i32 = 2;
const PAGINATION_PENALTY: i32 = 2;

const CONTENT_HUB_SEGMENTS: &[&str] = &["/blog/", "/article/", "/post/"];
const COMMERCE_SEGMENTS: &[&str] = &["/product/", "/category/", "/service/"];

static PAGINATION_PATH: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"/page/\d+(/|$)").ok());

/// Scores a URL for the crawl queue
///
/// Starts from `10 - depth`, adds bonuses for content hubs and commerce
/// categories, subtracts a penalty for pagination and clamps to `[1, 10]`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use seoscan::url::score_priority;
///
/// let post = Url::parse("https://example.com/blog/hello").unwrap();
/// assert_eq!(score_priority(&post, 2), 10);
///
/// let page = Url::parse("https://example.com/news/page/3").unwrap();
/// assert_eq!(score_priority(&page, 2), 6);
/// ```
pub fn score_priority(url: &Url, depth: u32) -> u8 {
    let depth = i32::try_from(depth).unwrap_or(i32::MAX);
    let base = (10i32.saturating_sub(depth)).clamp(MIN_PRIORITY as i32, MAX_PRIORITY as i32);

    // Trailing slashes are normalized away, so match against "<path>/"
    let path = format!("{}/", url.path().to_lowercase());

    let mut score = base;
    if CONTENT_HUB_SEGMENTS.iter().any(|s| path.contains(s)) {
        score += CONTENT_HUB_BONUS;
    }
    if COMMERCE_SEGMENTS.iter().any(|s| path.contains(s)) {
        score += COMMERCE_BONUS;
    }
    if is_pagination(url) {
        score -= PAGINATION_PENALTY;
    }

    score.clamp(MIN_PRIORITY as i32, MAX_PRIORITY as i32) as u8
}

/// Returns true for `/page/<n>` paths and `?page=<n>` queries
pub fn is_pagination(url: &Url) -> bool {
    let in_path = PAGINATION_PATH
        .as_ref()
        .is_some_and(|re| re.is_match(url.path()));

    in_path
        || url
            .query_pairs()
            .any(|(k, v)| k == "page" && !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()))
}

/// Demotes a priority after a failed attempt, never below the minimum
pub fn demote(priority: u8, by: u8) -> u8 {
    priority.saturating_sub(by).max(MIN_PRIORITY)
}
