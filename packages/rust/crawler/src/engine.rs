//! Concurrent competitor-site fetcher.
//!
//! Every URL is an independent unit of work: fetch, then extract. All units
//! are dispatched at once (a semaphore bounds how many are in flight) and the
//! fetcher waits for every one to settle. A failing unit is logged and
//! dropped; it never aborts or delays its siblings.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use reqwest::redirect::Policy;
use rivalscope_shared::{FetchConfig, PartialProfile, Result, RivalScopeError};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::extract::{HeuristicExtractor, ProfileExtractor};

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; RivalScope/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Maximum redirect hops followed per request.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// FetchSummary
// ---------------------------------------------------------------------------

/// Summary of a completed `fetch_all` call.
#[derive(Debug, Clone)]
pub struct FetchSummary {
    /// Number of units dispatched.
    pub requested: usize,
    /// Profiles extracted from successful units, in input order.
    pub profiles: Vec<PartialProfile>,
    /// Failed units (URL, error message).
    pub errors: Vec<(String, String)>,
    /// Wall-clock time for the whole batch.
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Fetches competitor sites and hands each page to a [`ProfileExtractor`].
pub struct Fetcher {
    config: FetchConfig,
    client: Client,
    extractor: Arc<dyn ProfileExtractor>,
}

impl Fetcher {
    /// Create a fetcher using the [`HeuristicExtractor`].
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect_policy(config.allow_private_hosts))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RivalScopeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            extractor: Arc::new(HeuristicExtractor),
        })
    }

    /// Replace the extraction strategy.
    pub fn with_extractor(mut self, extractor: Arc<dyn ProfileExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Fetch and extract every URL, dropping the ones that fail.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<PartialProfile> {
        self.fetch_all_with_summary(urls).await.profiles
    }

    /// Like [`fetch_all`](Self::fetch_all), also reporting failures and timing.
    #[instrument(skip_all, fields(urls = urls.len(), extractor = self.extractor.name()))]
    pub async fn fetch_all_with_summary(&self, urls: &[String]) -> FetchSummary {
        let start_time = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1) as usize));

        info!(
            concurrency = self.config.concurrency,
            timeout_secs = self.config.timeout_secs,
            "fetching competitor sites"
        );

        // Dispatch every unit before awaiting any of them.
        let mut handles = Vec::with_capacity(urls.len());
        for raw_url in urls {
            let client = self.client.clone();
            let sem = semaphore.clone();
            let extractor = self.extractor.clone();
            let allow_private = self.config.allow_private_hosts;
            let raw_url = raw_url.clone();

            let handle = tokio::spawn({
                let raw_url = raw_url.clone();
                async move {
                    let _permit = sem.acquire_owned().await.map_err(|e| {
                        RivalScopeError::Network(format!("fetch slot unavailable: {e}"))
                    })?;
                    fetch_profile(&client, extractor.as_ref(), &raw_url, allow_private).await
                }
            });
            handles.push((raw_url, handle));
        }

        // Settle all, in input order.
        let mut profiles = Vec::new();
        let mut errors = Vec::new();
        for (url, handle) in handles {
            match handle.await {
                Ok(Ok(profile)) => profiles.push(profile),
                Ok(Err(e)) => {
                    warn!(%url, error = %e, "fetch failed, dropping competitor");
                    errors.push((url, e.to_string()));
                }
                Err(e) => {
                    warn!(%url, error = %e, "fetch task aborted, dropping competitor");
                    errors.push((url, e.to_string()));
                }
            }
        }

        let summary = FetchSummary {
            requested: urls.len(),
            profiles,
            errors,
            duration: start_time.elapsed(),
        };

        info!(
            requested = summary.requested,
            fetched = summary.profiles.len(),
            failed = summary.errors.len(),
            duration_ms = summary.duration.as_millis(),
            "fetch completed"
        );

        summary
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Follow at most [`MAX_REDIRECTS`] hops, re-checking every target against the SSRF guard.
fn redirect_policy(allow_private: bool) -> Policy {
    Policy::custom(move |attempt| {
        match check_redirect(attempt.url(), attempt.previous().len(), allow_private) {
            Ok(()) => attempt.follow(),
            Err(reason) => attempt.error(reason),
        }
    })
}

/// Decide whether one redirect hop may be followed.
fn check_redirect(
    target: &Url,
    previous: usize,
    allow_private: bool,
) -> std::result::Result<(), String> {
    if previous > MAX_REDIRECTS {
        return Err(format!("too many redirects (max {MAX_REDIRECTS})"));
    }
    if !allow_private && is_ssrf_target(target) {
        return Err(format!("redirect to {target} blocked by SSRF protection"));
    }
    Ok(())
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

// ---------------------------------------------------------------------------
// Unit of work
// ---------------------------------------------------------------------------

/// Fetch one site and extract its profile signals.
///
/// The profile's `url` is the caller's string (trimmed), not the normalized form.
async fn fetch_profile(
    client: &Client,
    extractor: &dyn ProfileExtractor,
    raw_url: &str,
    allow_private: bool,
) -> Result<PartialProfile> {
    let raw_url = raw_url.trim();
    let url = Url::parse(raw_url)
        .map_err(|e| RivalScopeError::parse(format!("invalid URL '{raw_url}': {e}")))?;

    if !allow_private && is_ssrf_target(&url) {
        return Err(RivalScopeError::Network(format!(
            "{url}: blocked by SSRF protection"
        )));
    }

    debug!(%url, "fetching site");

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| RivalScopeError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RivalScopeError::Network(format!("{url}: HTTP {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| RivalScopeError::Network(format!("{url}: body read failed: {e}")))?;

    let mut profile = extractor.extract(&body);
    profile.url = Some(raw_url.to_string());

    debug!(%url, name = ?profile.name, bytes = body.len(), "site extracted");
    Ok(profile)
}
