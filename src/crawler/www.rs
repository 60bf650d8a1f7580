//! Detection of the site's preferred host form (`www.` or bare)
//!
//! Three sources, in order:
//! 1. HEAD probes of both host forms without following redirects; a
//!    redirect from one form to the other settles it
//! 2. after a sample of scanned pages, a 70% majority of internal links
//! 3. the seed's own form
//!
//! IP addresses and `localhost` skip detection entirely.

use crate::scanner::Link;
use crate::url::{has_www, is_ip_or_local, strip_www, WwwPreference};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Share of internal links (percent) one host form needs to win the vote
pub const MAJORITY_PERCENT: usize = 70;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Probes both host forms of `seed`
///
/// Returns `Unknown` when neither redirects to the other, on network errors,
/// and for IP or localhost seeds.
pub async fn probe_www_preference(seed: &Url, user_agent: &str) -> WwwPreference {
    let Some(host) = seed.host_str().map(str::to_lowercase) else {
        return WwwPreference::Unknown;
    };
    if is_ip_or_local(&host) {
        return WwwPreference::Unknown;
    }

    let client = match Client::builder()
        .redirect(Policy::none())
        .timeout(PROBE_TIMEOUT)
        .user_agent(user_agent)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("Cannot build probe client: {}", e);
            return WwwPreference::Unknown;
        }
    };

    let bare = strip_www(&host).to_string();
    let www = format!("www.{}", bare);

    if let Some(target) = redirect_target(&client, seed, &www).await {
        if target == bare {
            return WwwPreference::NonWww;
        }
    }
    if let Some(target) = redirect_target(&client, seed, &bare).await {
        if target == www {
            return WwwPreference::Www;
        }
    }

    WwwPreference::Unknown
}

/// Host a HEAD request to `host` redirects to, if it redirects at all
async fn redirect_target(client: &Client, seed: &Url, host: &str) -> Option<String> {
    let mut probe = seed.clone();
    probe.set_host(Some(host)).ok()?;
    probe.set_path("/");
    probe.set_query(None);

    let response = match client.head(probe.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("www probe of {} failed: {}", probe, e);
            return None;
        }
    };

    if !response.status().is_redirection() {
        return None;
    }

    let location = response
        .headers()
        .get(reqwest::header::LOCATION)?
        .to_str()
        .ok()?;
    location_host(&probe, location)
}

fn location_host(probe: &Url, location: &str) -> Option<String> {
    let target = probe.join(location).ok()?;
    target.host_str().map(str::to_lowercase)
}

/// Tallies host forms of internal links until a sample is complete
#[derive(Debug)]
pub struct WwwTally {
    base_domain: String,
    seed_prefers_www: bool,
    sample_pages: usize,
    pages: usize,
    www_links: usize,
    bare_links: usize,
    decided: bool,
}

impl WwwTally {
    /// `base_host` is the seed host as given; `decided` disables the tally
    /// (preference already known or detection not applicable)
    pub fn new(base_host: &str, sample_pages: usize, decided: bool) -> Self {
        Self {
            base_domain: strip_www(base_host).to_string(),
            seed_prefers_www: has_www(base_host),
            sample_pages: sample_pages.max(1),
            pages: 0,
            www_links: 0,
            bare_links: 0,
            decided: decided || is_ip_or_local(base_host),
        }
    }

    pub fn is_decided(&self) -> bool {
        self.decided
    }

    /// Counts the internal links of one scanned page
    ///
    /// Returns the preference once the sample is complete; afterwards the
    /// tally ignores further pages.
    pub fn observe(&mut self, internal_links: &[Link]) -> Option<WwwPreference> {
        if self.decided {
            return None;
        }

        let www_host = format!("www.{}", self.base_domain);
        for link in internal_links {
            let Some(host) = Url::parse(&link.url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_lowercase))
            else {
                continue;
            };
            if host == www_host {
                self.www_links += 1;
            } else if host == self.base_domain {
                self.bare_links += 1;
            }
        }

        self.pages += 1;
        if self.pages < self.sample_pages {
            return None;
        }

        self.decided = true;
        Some(self.verdict())
    }

    fn verdict(&self) -> WwwPreference {
        let total = self.www_links + self.bare_links;
        if total > 0 {
            if self.www_links * 100 >= total * MAJORITY_PERCENT {
                return WwwPreference::Www;
            }
            if self.bare_links * 100 >= total * MAJORITY_PERCENT {
                return WwwPreference::NonWww;
            }
        }

        if self.seed_prefers_www {
            WwwPreference::Www
        } else {
            WwwPreference::NonWww
        }
    }
}
