use std::time::{Duration, Instant};

/// Politeness bookkeeping for one domain
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of items dispatched for this domain
    pub dispatch_count: u32,

    /// When the last item for this domain was handed to a worker
    pub last_dispatch_time: Option<Instant>,

    /// Crawl-delay declared by robots.txt, if any
    pub crawl_delay: Option<Duration>,
}

impl DomainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay between dispatches: the larger of the configured default and
    /// the robots.txt crawl-delay
    pub fn effective_delay(&self, default_delay: Duration) -> Duration {
        self.crawl_delay
            .map_or(default_delay, |robots| robots.max(default_delay))
    }

    /// Checks whether an item for this domain may be dispatched at `now`
    pub fn can_dispatch(&self, default_delay: Duration, now: Instant) -> bool {
        self.time_until_ready(default_delay, now).is_none()
    }

    /// Records a dispatch at `now`
    pub fn record_dispatch(&mut self, now: Instant) {
        self.dispatch_count += 1;
        self.last_dispatch_time = Some(now);
    }

    /// Remaining cool-down, or None when the domain is ready
    pub fn time_until_ready(&self, default_delay: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_dispatch_time?;
        let delay = self.effective_delay(default_delay);
        let elapsed = now.saturating_duration_since(last);
        if elapsed < delay {
            Some(delay - elapsed)
        } else {
            None
        }
    }
}
