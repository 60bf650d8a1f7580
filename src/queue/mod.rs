//! Priority work queue with per-domain politeness
//!
//! This module handles:
//! - Priority ordering of discovered URLs (higher first, FIFO on ties)
//! - Deduplication of everything ever queued or dispatched
//! - Per-domain cool-downs between dispatches, including robots.txt
//!   crawl-delays
//!
//! All state lives behind one mutex so dispatch decisions and the domain
//! timestamps they update are serialized.

mod domain_state;

pub use domain_state::DomainState;

use crate::url::{dedup_key, extract_domain};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use url::Url;

/// A URL waiting to be scanned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub url: Url,
    pub depth: u32,
    /// 1-10, higher is scanned first
    pub priority: u8,
    /// Number of failed attempts so far
    pub retries: u32,
}

impl QueueItem {
    pub fn new(url: Url, depth: u32, priority: u8) -> Self {
        Self {
            url,
            depth,
            priority,
            retries: 0,
        }
    }

    /// The item to queue after a failed attempt: one more retry and a lower
    /// priority
    pub fn retried(&self, demotion: u8) -> Self {
        Self {
            url: self.url.clone(),
            depth: self.depth,
            priority: crate::url::demote(self.priority, demotion),
            retries: self.retries + 1,
        }
    }
}

/// Heap entry; `seq` keeps insertion order among equal priorities
#[derive(Debug)]
struct Entry {
    item: QueueItem,
    domain: String,
    seq: u64,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.item
            .priority
            .cmp(&other.item.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Entry {}

#[derive(Debug, Default)]
struct QueueInner {
    heap: BinaryHeap<Entry>,
    /// Dedup keys of every URL ever accepted by `add_to_queue`
    known: HashSet<String>,
    /// URLs currently in the heap, with multiplicity
    pending: HashMap<String, usize>,
    /// Heap entries per domain
    queued_per_domain: HashMap<String, usize>,
    domains: HashMap<String, DomainState>,
    next_seq: u64,
}

impl QueueInner {
    fn push(&mut self, item: QueueItem) {
        let domain = extract_domain(&item.url).unwrap_or_default();
        *self.pending.entry(item.url.to_string()).or_insert(0) += 1;
        *self.queued_per_domain.entry(domain.clone()).or_insert(0) += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { item, domain, seq });
    }

    /// Remaining cool-down of a domain, None when it may dispatch now
    fn domain_wait(&self, domain: &str, default_delay: Duration, now: Instant) -> Option<Duration> {
        self.domains
            .get(domain)
            .and_then(|state| state.time_until_ready(default_delay, now))
    }

    /// True when some domain with queued items is out of its cool-down
    fn any_domain_ready(&self, default_delay: Duration, now: Instant) -> bool {
        self.queued_per_domain
            .keys()
            .any(|domain| self.domain_wait(domain, default_delay, now).is_none())
    }

    fn forget_queued(&mut self, domain: &str) {
        if let Some(count) = self.queued_per_domain.get_mut(domain) {
            *count -= 1;
            if *count == 0 {
                self.queued_per_domain.remove(domain);
            }
        }
    }

    fn forget_pending(&mut self, url: &str) {
        if let Some(count) = self.pending.get_mut(url) {
            *count -= 1;
            if *count == 0 {
                self.pending.remove(url);
            }
        }
    }
}

/// Work queue shared by all crawl workers
#[derive(Debug)]
pub struct QueueManager {
    inner: Mutex<QueueInner>,
    default_delay: Duration,
}

impl QueueManager {
    /// Creates a queue with `default_delay` between dispatches to one domain
    pub fn new(default_delay: Duration) -> Self {
        Self {
            inner: Mutex::new(QueueInner::default()),
            default_delay,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a newly discovered item
    ///
    /// Returns false (and drops the item) when the URL was queued before.
    pub fn add_to_queue(&self, item: QueueItem) -> bool {
        let mut inner = self.lock();
        if !inner.known.insert(dedup_key(&item.url)) {
            tracing::trace!("Already queued: {}", item.url);
            return false;
        }
        inner.push(item);
        true
    }

    /// Puts an item back after a failed attempt, bypassing deduplication
    pub fn requeue(&self, item: QueueItem) {
        let mut inner = self.lock();
        inner.known.insert(dedup_key(&item.url));
        inner.push(item);
    }

    /// Takes the best item whose domain is not cooling down
    ///
    /// Items skipped because of politeness stay in the queue in their
    /// original order. When every queued domain is cooling down the heap is
    /// not touched.
    pub fn get_next_item(&self) -> Option<QueueItem> {
        let now = Instant::now();
        let default_delay = self.default_delay;
        let mut inner = self.lock();

        if !inner.any_domain_ready(default_delay, now) {
            return None;
        }

        let mut not_ready = Vec::new();
        let mut found = None;

        while let Some(entry) = inner.heap.pop() {
            if inner.domain_wait(&entry.domain, default_delay, now).is_none() {
                found = Some(entry);
                break;
            }
            not_ready.push(entry);
        }

        for entry in not_ready {
            inner.heap.push(entry);
        }

        let entry = found?;
        inner
            .domains
            .entry(entry.domain.clone())
            .or_default()
            .record_dispatch(now);
        inner.forget_queued(&entry.domain);
        inner.forget_pending(entry.item.url.as_str());

        tracing::trace!("Dispatching {} (priority {})", entry.item.url, entry.item.priority);
        Some(entry.item)
    }

    /// True while the URL waits in the queue
    pub fn is_queued(&self, url: &Url) -> bool {
        self.lock().pending.contains_key(url.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.lock().heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    /// Registers a robots.txt crawl-delay for a domain
    pub fn set_crawl_delay(&self, domain: &str, delay_ms: u64) {
        let mut inner = self.lock();
        inner
            .domains
            .entry(domain.to_lowercase())
            .or_default()
            .crawl_delay = Some(Duration::from_millis(delay_ms));
    }

    /// Effective delay currently applied to a domain
    pub fn delay_for(&self, domain: &str) -> Duration {
        self.lock()
            .domains
            .get(domain)
            .map_or(self.default_delay, |state| state.effective_delay(self.default_delay))
    }

    /// Shortest wait until some queued item becomes eligible
    ///
    /// `None` when the queue is empty, zero when an item is ready now.
    pub fn time_until_ready(&self) -> Option<Duration> {
        let now = Instant::now();
        let inner = self.lock();

        inner
            .queued_per_domain
            .keys()
            .map(|domain| {
                inner
                    .domain_wait(domain, self.default_delay, now)
                    .unwrap_or(Duration::ZERO)
            })
            .min()
    }
}
