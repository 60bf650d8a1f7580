use crate::config::types::{Config, CrawlOptions, HeadlessConfig, StateBackend, StateConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_options(&config.crawl)?;
    validate_headless_config(&config.headless)?;
    validate_state_config(&config.state)?;
    Ok(())
}

/// Validates the options of a single crawl
pub fn validate_crawl_options(options: &CrawlOptions) -> Result<(), ConfigError> {
    if options.concurrent_requests < 1 || options.concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrent_requests must be between 1 and 100, got {}",
            options.concurrent_requests
        )));
    }

    if options.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            options.max_pages
        )));
    }

    if options.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            options.request_timeout_ms
        )));
    }

    if options.timeout_ms <= options.request_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "timeout_ms ({}ms) must be greater than request_timeout_ms ({}ms)",
            options.timeout_ms, options.request_timeout_ms
        )));
    }

    if options.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    for pattern in &options.exclude_patterns {
        if pattern.trim().is_empty() {
            return Err(ConfigError::InvalidPattern(
                "Exclude pattern cannot be empty".to_string(),
            ));
        }
    }

    for host in &options.js_heavy_hosts {
        validate_domain_pattern(host)?;
    }

    Ok(())
}

/// Validates headless browser configuration
fn validate_headless_config(config: &HeadlessConfig) -> Result<(), ConfigError> {
    if let Some(webdriver_url) = &config.webdriver_url {
        let url = Url::parse(webdriver_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid webdriver_url: {}", e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "webdriver_url '{}' must use http or https",
                webdriver_url
            )));
        }
    }

    if config.network_idle_ms > config.network_idle_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "network_idle_ms ({}ms) cannot exceed network_idle_timeout_ms ({}ms)",
            config.network_idle_ms, config.network_idle_timeout_ms
        )));
    }

    Ok(())
}

/// Validates crawl state configuration
fn validate_state_config(config: &StateConfig) -> Result<(), ConfigError> {
    if config.backend == StateBackend::Redis {
        let redis_url = config.redis_url.as_deref().unwrap_or_default();
        if redis_url.is_empty() {
            return Err(ConfigError::Validation(
                "redis_url is required when the redis state backend is selected".to_string(),
            ));
        }

        Url::parse(redis_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid redis_url: {}", e)))?;
    }

    Ok(())
}

/// Validates a host pattern (supports a leading `*.` wildcard)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut options = CrawlOptions::default();
        options.concurrent_requests = 0;
        assert!(validate_crawl_options(&options).is_err());

        options.concurrent_requests = 101;
        assert!(validate_crawl_options(&options).is_err());

        options.concurrent_requests = 100;
        assert!(validate_crawl_options(&options).is_ok());
    }

    #[test]
    fn test_timeouts() {
        let mut options = CrawlOptions::default();
        options.timeout_ms = 1000;
        options.request_timeout_ms = 1000;
        assert!(matches!(
            validate_crawl_options(&options),
            Err(ConfigError::Validation(_))
        ));

        options.request_timeout_ms = 50;
        assert!(validate_crawl_options(&options).is_err());

        options.request_timeout_ms = 500;
        assert!(validate_crawl_options(&options).is_ok());
    }

    #[test]
    fn test_max_pages_and_user_agent() {
        let mut options = CrawlOptions::default();
        options.max_pages = 0;
        assert!(validate_crawl_options(&options).is_err());

        let mut options = CrawlOptions::default();
        options.user_agent = "  ".to_string();
        assert!(validate_crawl_options(&options).is_err());
    }

    #[test]
    fn test_exclude_patterns() {
        let mut options = CrawlOptions::default();
        options.exclude_patterns = vec!["/admin".to_string(), "/cart(".to_string()];
        assert!(validate_crawl_options(&options).is_ok());

        options.exclude_patterns.push(String::new());
        assert!(matches!(
            validate_crawl_options(&options),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_validate_domain_pattern() {
        assert!(validate_domain_pattern("example.com").is_ok());
        assert!(validate_domain_pattern("*.wixsite.com").is_ok());
        assert!(validate_domain_pattern("localhost").is_ok());

        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("*.").is_err());
        assert!(validate_domain_pattern(".example.com").is_err());
        assert!(validate_domain_pattern("example..com").is_err());
        assert!(validate_domain_pattern("exa mple.com").is_err());
    }

    #[test]
    fn test_redis_backend_needs_url() {
        let mut config = Config::default();
        config.state.backend = StateBackend::Redis;
        assert!(validate(&config).is_err());

        config.state.redis_url = Some("redis://127.0.0.1:6379/".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_webdriver_url() {
        let mut config = Config::default();
        config.headless.webdriver_url = Some("not a url".to_string());
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.headless.webdriver_url = Some("http://localhost:9515".to_string());
        assert!(validate(&config).is_ok());
    }
}
