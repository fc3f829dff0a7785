//! Liveness probing of stream URLs
//!
//! A URL is live when it currently serves genuine file content. Expired
//! links, HTML error pages and segment manifests are all offline. Probing is
//! never fatal: every failure becomes an offline verdict with a reason.
//!
//! # Examples
//!
//! ```no_run
//! use strmsync::core::config::ProbeSettings;
//! use strmsync::core::prober::LivenessProber;
//!
//! let prober = LivenessProber::new(ProbeSettings::default())?;
//! let runtime = tokio::runtime::Runtime::new()?;
//! let verdicts = runtime.block_on(prober.probe_all(
//!     vec!["http://example.com/movie/u/p/1.mp4".to_string()],
//!     |_| {},
//! ));
//! println!("{} live", verdicts.values().filter(|v| v.is_live).count());
//! # Ok::<(), anyhow::Error>(())
//! ```

mod cache;
pub mod heuristics;
pub mod strategy;

pub use cache::VerdictCache;

use crate::core::config::ProbeSettings;
use crate::error::Result;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use strategy::{ProbeContext, StepOutcome, PROBE_CHAIN};

/// Outcome of probing one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LivenessVerdict {
    pub url: String,
    pub is_live: bool,
    pub reason: String,
}

impl LivenessVerdict {
    pub fn live<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        Self {
            url: url.into(),
            is_live: true,
            reason: reason.into(),
        }
    }

    pub fn offline<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        Self {
            url: url.into(),
            is_live: false,
            reason: reason.into(),
        }
    }
}

/// Probes URLs with a shared pooled client and a per-run verdict cache
pub struct LivenessProber {
    client: reqwest::Client,
    settings: ProbeSettings,
    cache: Arc<VerdictCache>,
    network_probes: AtomicUsize,
}

impl LivenessProber {
    pub fn new(settings: ProbeSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .pool_max_idle_per_host(settings.concurrency)
            .build()?;

        Ok(Self::with_client(client, settings))
    }

    /// Create a prober around an existing client (useful for testing)
    pub fn with_client(client: reqwest::Client, settings: ProbeSettings) -> Self {
        Self {
            client,
            settings,
            cache: Arc::new(VerdictCache::new()),
            network_probes: AtomicUsize::new(0),
        }
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    pub fn cache(&self) -> &VerdictCache {
        &self.cache
    }

    /// Number of URLs that went through the network probe chain
    pub fn network_probes(&self) -> usize {
        self.network_probes.load(Ordering::Relaxed)
    }

    /// Verdict for one URL, probing it at most once per prober
    pub async fn probe(&self, url: &str) -> LivenessVerdict {
        let cell = self.cache.cell(url);
        cell.get_or_init(|| self.probe_uncached(url)).await.clone()
    }

    async fn probe_uncached(&self, url: &str) -> LivenessVerdict {
        if heuristics::is_streaming_manifest(url) {
            log::debug!("Streaming manifest, skipping network probe: {}", url);
            return LivenessVerdict::offline(url, "streaming-manifest");
        }

        self.network_probes.fetch_add(1, Ordering::Relaxed);
        let ctx = ProbeContext {
            client: &self.client,
            settings: &self.settings,
        };

        for step in PROBE_CHAIN {
            if let StepOutcome::Settled(verdict) = step.run(&ctx, url).await {
                if !verdict.is_live {
                    log::info!("Liveness check failed ({}): {}", verdict.reason, url);
                }
                return verdict;
            }
        }

        log::info!("Liveness check failed: {}", url);
        LivenessVerdict::offline(url, "no-indicator")
    }

    /// Probe every distinct URL with at most `concurrency` probes in flight
    ///
    /// `on_verdict` runs inside the worker that produced the verdict, so it
    /// must tolerate concurrent calls. The returned map is complete: every
    /// input URL has a verdict once this resolves.
    pub async fn probe_all<I, F>(&self, urls: I, on_verdict: F) -> HashMap<String, LivenessVerdict>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&LivenessVerdict) + Sync,
    {
        let distinct: BTreeSet<String> = urls.into_iter().collect();
        let on_verdict = &on_verdict;

        log::info!(
            "Probing {} distinct URLs with up to {} concurrent probes",
            distinct.len(),
            self.settings.concurrency
        );

        stream::iter(distinct)
            .map(|url| async move {
                let verdict = self.probe(&url).await;
                on_verdict(&verdict);
                (url, verdict)
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect::<HashMap<_, _>>()
            .await
    }
}
