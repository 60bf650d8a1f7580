//! Statistics over the results of a crawl

use crate::scanner::{ScanMethod, ScanResult};
use std::collections::BTreeMap;
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStatistics {
    /// Number of recorded results
    pub pages_scanned: usize,

    /// Results by HTTP status (0 = no response)
    pub pages_by_status: BTreeMap<u16, usize>,

    /// Results by scan method
    pub http_scans: usize,
    pub headless_scans: usize,

    pub internal_links: usize,
    pub external_links: usize,
    pub images: usize,

    /// Results with at least one error
    pub pages_with_errors: usize,

    /// Pages flagged noindex by meta tag or header
    pub noindex_pages: usize,

    /// HTML pages without a title
    pub missing_titles: usize,

    /// HTML pages without a meta description
    pub missing_descriptions: usize,

    /// Pages per depth
    pub depth_breakdown: BTreeMap<u32, usize>,

    /// Mean load time over pages that answered
    pub average_load_ms: u64,

    /// Wall-clock duration of the crawl
    pub duration: Duration,
}

impl CrawlStatistics {
    /// Computes statistics over `results`
    pub fn from_results(results: &[ScanResult], duration: Duration) -> Self {
        let mut stats = Self {
            pages_scanned: results.len(),
            duration,
            ..Self::default()
        };

        let mut load_total: u64 = 0;
        let mut answered: u64 = 0;

        for result in results {
            *stats.pages_by_status.entry(result.status).or_insert(0) += 1;
            *stats.depth_breakdown.entry(result.depth).or_insert(0) += 1;

            match result.scan_method {
                ScanMethod::Http => stats.http_scans += 1,
                ScanMethod::Headless => stats.headless_scans += 1,
            }

            stats.internal_links += result.internal_links.len();
            stats.external_links += result.external_links.len();
            stats.images += result.images.len();

            if !result.errors.is_empty() {
                stats.pages_with_errors += 1;
            }
            if result.noindex {
                stats.noindex_pages += 1;
            }
            if result.is_html() {
                if result.title.is_none() {
                    stats.missing_titles += 1;
                }
                if result.meta_description.is_none() {
                    stats.missing_descriptions += 1;
                }
            }

            if result.status != 0 {
                load_total += result.load_time_ms;
                answered += 1;
            }
        }

        if answered > 0 {
            stats.average_load_ms = load_total / answered;
        }
        stats
    }

    /// Share of results with a 2xx status, in percent
    pub fn success_rate(&self) -> f64 {
        if self.pages_scanned == 0 {
            return 0.0;
        }
        let ok: usize = self
            .pages_by_status
            .range(200..300)
            .map(|(_, count)| count)
            .sum();
        (ok as f64 / self.pages_scanned as f64) * 100.0
    }
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages scanned: {}", stats.pages_scanned);
    println!(
        "  Scan methods: {} http, {} headless",
        stats.http_scans, stats.headless_scans
    );
    println!(
        "  Links found: {} internal, {} external",
        stats.internal_links, stats.external_links
    );
    println!("  Images found: {}", stats.images);
    println!("  Average load time: {} ms", stats.average_load_ms);
    println!("  Duration: {:.1}s", stats.duration.as_secs_f64());
    println!();

    println!("Pages by Status:");
    for (status, count) in &stats.pages_by_status {
        let label = if *status == 0 {
            "no response".to_string()
        } else {
            status.to_string()
        };
        println!("  {}: {}", label, count);
    }
    println!();

    println!("Pages by Depth:");
    for (depth, count) in &stats.depth_breakdown {
        println!("  {}: {}", depth, count);
    }
    println!();

    println!("SEO Findings:");
    println!("  Missing titles: {}", stats.missing_titles);
    println!("  Missing meta descriptions: {}", stats.missing_descriptions);
    println!("  Noindex pages: {}", stats.noindex_pages);
    println!("  Pages with errors: {}", stats.pages_with_errors);
    println!();

    println!(
        "Success Rate: {:.1}% of {} pages",
        stats.success_rate(),
        stats.pages_scanned
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn create_test_result(path: &str, status: u16, method: ScanMethod) -> ScanResult {
        let url = Url::parse(&format!("https://example.com{}", path)).unwrap();
        let mut result = ScanResult::new(&url, 1, method);
        result.status = status;
        result.content_type = Some("text/html".to_string());
        result.load_time_ms = 100;
        result
    }

    #[test]
    fn test_empty_results() {
        let stats = CrawlStatistics::from_results(&[], Duration::ZERO);
        assert_eq!(stats.pages_scanned, 0);
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.average_load_ms, 0);
    }

    #[test]
    fn test_counts() {
        let mut ok = create_test_result("/", 200, ScanMethod::Http);
        ok.title = Some("Home".to_string());
        ok.depth = 0;
        let mut missing = create_test_result("/missing", 404, ScanMethod::Http);
        missing.load_time_ms = 300;
        let mut failed = create_test_result("/down", 0, ScanMethod::Headless);
        failed.content_type = None;
        failed.errors.push("Request timeout".to_string());

        let stats = CrawlStatistics::from_results(&[ok, missing, failed], Duration::from_secs(2));

        assert_eq!(stats.pages_scanned, 3);
        assert_eq!(stats.pages_by_status.get(&200), Some(&1));
        assert_eq!(stats.pages_by_status.get(&0), Some(&1));
        assert_eq!(stats.http_scans, 2);
        assert_eq!(stats.headless_scans, 1);
        assert_eq!(stats.pages_with_errors, 1);
        assert_eq!(stats.missing_titles, 1);
        assert_eq!(stats.missing_descriptions, 2);
        assert_eq!(stats.depth_breakdown.get(&0), Some(&1));
        assert_eq!(stats.depth_breakdown.get(&1), Some(&2));
        assert_eq!(stats.average_load_ms, 200);
        assert!((stats.success_rate() - 33.33).abs() < 0.01);
    }
}
