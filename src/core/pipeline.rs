//! The coordinating flow of one sync run
//!
//! ```text
//! read manifest -> parse -> exclude -> scan roots -> probe -> reconcile
//!                      \-> export streams playlist
//! ```
//!
//! Only the probe stage runs concurrently. It is joined completely before
//! reconciliation starts, and all filesystem mutations happen on the calling
//! thread.

use crate::core::config::Config;
use crate::core::exclusion::ExclusionSet;
use crate::core::manifest::{CatalogEntry, EntryKind, EntryParser, ParseStats};
use crate::core::naming::NamingResolver;
use crate::core::offline::{OfflineRecord, OfflineRecorder};
use crate::core::prober::{LivenessProber, LivenessVerdict};
use crate::core::reconciler::{ReconcileReport, Reconciler};
use crate::core::scanner::ArtifactScanner;
use crate::core::streams::export_streams;
use crate::error::{Result, StrmError};
use crate::ui::progress::{clear_line, show_progress_bar};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::runtime::Runtime;

/// Per-invocation switches layered over the config
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub dry_run: bool,
    /// Draw a progress bar on stdout while probing
    pub show_progress: bool,
}

/// Everything a run did, for the terminal and the summary report
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub duration_secs: f64,
    pub dry_run: bool,
    pub parse: ParseStats,
    pub cam_titles: Vec<String>,
    pub excluded: usize,
    pub distinct_urls: usize,
    pub network_probes: usize,
    pub live_urls: usize,
    pub offline_entries: usize,
    /// Whether the streams playlist was (or would be) rewritten
    pub streams_playlist_updated: bool,
    pub movies: ReconcileReport,
    pub series: ReconcileReport,
}

impl RunSummary {
    pub fn created(&self) -> usize {
        self.movies.created.len() + self.series.created.len()
    }

    pub fn updated(&self) -> usize {
        self.movies.updated.len() + self.series.updated.len()
    }

    pub fn deleted(&self) -> usize {
        self.movies.deleted.len() + self.series.deleted.len()
    }

    pub fn failures(&self) -> usize {
        self.movies.failures.len() + self.series.failures.len()
    }

    /// Write the summary as pretty-printed JSON
    pub fn dump_json(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Wrote run summary to {}", path.display());
        Ok(())
    }
}

/// One sync run over a loaded config
pub struct CatalogSync<'c> {
    config: &'c Config,
    options: SyncOptions,
    recorder: OfflineRecorder,
}

impl<'c> CatalogSync<'c> {
    pub fn new(config: &'c Config, options: SyncOptions) -> Self {
        Self {
            config,
            options,
            recorder: OfflineRecorder::new(),
        }
    }

    /// Offline records collected by the last run
    pub fn recorder(&self) -> &OfflineRecorder {
        &self.recorder
    }

    /// Execute the run on a dedicated probe runtime
    ///
    /// Must not be called from inside an async context.
    pub fn run(&self) -> Result<RunSummary> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("probe-worker")
            .build()?;
        let prober = LivenessProber::new(self.config.probe.clone())?;
        self.run_with(&runtime, &prober)
    }

    /// Execute the run with a caller-provided runtime and prober
    pub fn run_with(&self, runtime: &Runtime, prober: &LivenessProber) -> Result<RunSummary> {
        let started_at = Local::now();
        let timer = Instant::now();
        let config = self.config;
        let dry_run = self.options.dry_run;

        log::info!("==== Run started{} ====", if dry_run { " (dry-run)" } else { "" });
        self.recorder.clear();

        let bytes = fs::read(&config.manifest)
            .map_err(|e| StrmError::manifest(&config.manifest, e))?;
        let content = String::from_utf8_lossy(&bytes);

        let exclusions = match &config.exclusion_list {
            Some(path) => ExclusionSet::load_from_file(path)
                .map_err(|e| StrmError::config(format!("{:#}", e)))?,
            None => ExclusionSet::new(),
        };

        let parsed = EntryParser::new(&config.catalog).parse(&content);
        let (entries, excluded) = exclusions.filter(parsed.entries);
        log::info!("{} entries after exclusion ({} excluded)", entries.len(), excluded);

        // Both roots must be accessible before any network work
        let movies_state = ArtifactScanner::new(&config.movies_root).scan(!dry_run)?;
        let series_state = ArtifactScanner::new(&config.series_root).scan(!dry_run)?;

        let mut by_url: HashMap<String, Vec<&CatalogEntry>> = HashMap::new();
        for entry in &entries {
            by_url.entry(entry.source_url.clone()).or_default().push(entry);
        }
        let total = by_url.len();
        let processed = AtomicUsize::new(0);
        let show_progress = self.options.show_progress;
        let recorder = &self.recorder;
        let groups = &by_url;

        let on_verdict = move |verdict: &LivenessVerdict| {
            if !verdict.is_live {
                for entry in groups.get(&verdict.url).into_iter().flatten() {
                    recorder.add(OfflineRecord {
                        title: entry.display_title.clone(),
                        url: verdict.url.clone(),
                        kind: entry.kind,
                        reason: verdict.reason.clone(),
                    });
                }
            }
            let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
            if show_progress {
                show_progress_bar(done, total, "Probing");
            }
        };

        let verdicts = runtime.block_on(prober.probe_all(by_url.keys().cloned(), on_verdict));
        if show_progress && total > 0 {
            clear_line();
        }

        let live_urls = verdicts.values().filter(|v| v.is_live).count();
        log::info!("{} of {} URLs are live", live_urls, total);

        let resolver = NamingResolver::new(&config.movies_root, &config.series_root);
        let mut movies_desired: BTreeMap<PathBuf, String> = BTreeMap::new();
        let mut series_desired: BTreeMap<PathBuf, String> = BTreeMap::new();

        for entry in &entries {
            let live = verdicts
                .get(&entry.source_url)
                .map(|v| v.is_live)
                .unwrap_or(false);
            if !live {
                continue;
            }

            let target = resolver.resolve(entry).into_path_buf();
            let desired = match entry.kind {
                EntryKind::Movie => &mut movies_desired,
                EntryKind::Episode => &mut series_desired,
            };
            if let Some(previous) = desired.insert(target.clone(), entry.source_url.clone()) {
                if previous != entry.source_url {
                    log::warn!(
                        "{} is listed twice, using {} instead of {}",
                        target.display(),
                        entry.source_url,
                        previous
                    );
                }
            }
        }

        let movies = Reconciler::new(&config.movies_root)
            .dry_run(dry_run)
            .reconcile(&movies_desired, &movies_state);
        let series = Reconciler::new(&config.series_root)
            .dry_run(dry_run)
            .reconcile(&series_desired, &series_state);

        if let Some(path) = &config.offline_report {
            if dry_run {
                log::info!("[dry-run] Skipping offline report {}", path.display());
            } else if let Err(e) = self.recorder.dump_json(path) {
                log::error!("Failed to write offline report {}: {}", path.display(), e);
            }
        }

        let streams_playlist_updated = match &config.streams_playlist {
            Some(path) => export_streams(path, &parsed.streams, dry_run).unwrap_or_else(|e| {
                log::error!("Failed to write streams playlist {}: {}", path.display(), e);
                false
            }),
            None => false,
        };

        let summary = RunSummary {
            started_at,
            duration_secs: timer.elapsed().as_secs_f64(),
            dry_run,
            parse: parsed.stats,
            cam_titles: parsed.cam_titles,
            excluded,
            distinct_urls: total,
            network_probes: prober.network_probes(),
            live_urls,
            offline_entries: self.recorder.len(),
            streams_playlist_updated,
            movies,
            series,
        };

        if let Some(path) = &config.summary_report {
            if let Err(e) = summary.dump_json(path) {
                log::error!("Failed to write run summary {}: {}", path.display(), e);
            }
        }

        log::info!(
            "==== Run finished in {:.1}s: {} created, {} updated, {} deleted, {} offline, {} failures ====",
            summary.duration_secs,
            summary.created(),
            summary.updated(),
            summary.deleted(),
            summary.offline_entries,
            summary.failures()
        );

        Ok(summary)
    }
}

/// Run one sync with a fresh runtime and prober
pub fn run(config: &Config, options: SyncOptions) -> Result<RunSummary> {
    CatalogSync::new(config, options).run()
}
