//! Playlist manifest parsing
//!
//! The manifest is an extended M3U file: a header line followed by
//! `(#EXTINF, url)` line pairs. Only pairs that describe catalog items
//! (movies and series episodes in the configured language) become
//! [`CatalogEntry`] values. Everything else is skipped and counted.
//! Pairs whose URL is not a video file are live streams; they are collected
//! separately for the streams playlist.

use crate::core::config::CatalogRules;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use url::Url;

static EPISODE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\sS(\d+)\sE(\d+)").unwrap());

/// One metadata/url line pair of the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPair<'a> {
    pub metadata_line: &'a str,
    pub url_line: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Movie,
    Episode,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Movie => write!(f, "movie"),
            EntryKind::Episode => write!(f, "episode"),
        }
    }
}

/// A categorized manifest item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub kind: EntryKind,
    /// Full title as listed, including any episode token
    pub display_title: String,
    /// Series name without the episode token; `None` for movies
    pub series_title: Option<String>,
    /// `None` means the entry goes into the unknown-season bucket
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub source_url: String,
}

impl CatalogEntry {
    /// The series title for episodes, the display title for movies
    pub fn grouping_title(&self) -> &str {
        self.series_title.as_deref().unwrap_or(&self.display_title)
    }
}

/// A live-stream pair, kept verbatim for the streams playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPair {
    pub metadata_line: String,
    pub url: String,
}

/// Why a line pair did not become a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotInfoLine,
    EmptyTitle,
    ForeignLanguage,
    NotVideo,
    Cam,
    Uncategorized,
}

/// Per-reason counters of a parse pass
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub pairs: usize,
    pub entries: usize,
    pub not_info: usize,
    pub empty_title: usize,
    pub foreign_language: usize,
    pub not_video: usize,
    pub cam: usize,
    pub uncategorized: usize,
    /// Pairs collected for the streams playlist
    pub streams: usize,
}

impl ParseStats {
    fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::NotInfoLine => self.not_info += 1,
            SkipReason::EmptyTitle => self.empty_title += 1,
            SkipReason::ForeignLanguage => self.foreign_language += 1,
            SkipReason::NotVideo => self.not_video += 1,
            SkipReason::Cam => self.cam += 1,
            SkipReason::Uncategorized => self.uncategorized += 1,
        }
    }
}

/// Result of parsing a whole manifest
#[derive(Debug, Default, Clone)]
pub struct ParsedManifest {
    pub entries: Vec<CatalogEntry>,
    /// Titles of camera recordings that were screened out
    pub cam_titles: Vec<String>,
    /// Non-video pairs in manifest order
    pub streams: Vec<StreamPair>,
    pub stats: ParseStats,
}

/// Split manifest content into line pairs, skipping the header line
pub fn raw_pairs(content: &str) -> impl Iterator<Item = RawPair<'_>> {
    let lines: Vec<&str> = content.lines().skip(1).collect();
    let pair_count = lines.len() / 2;
    (0..pair_count).map(move |i| RawPair {
        metadata_line: lines[2 * i].trim(),
        url_line: lines[2 * i + 1].trim(),
    })
}

/// Parser for manifest content according to a set of [`CatalogRules`]
pub struct EntryParser<'r> {
    rules: &'r CatalogRules,
    video_extensions: Vec<String>,
}

impl<'r> EntryParser<'r> {
    pub fn new(rules: &'r CatalogRules) -> Self {
        let video_extensions = rules
            .video_extensions
            .iter()
            .map(|ext| ext.to_lowercase())
            .collect();
        Self {
            rules,
            video_extensions,
        }
    }

    pub fn parse(&self, content: &str) -> ParsedManifest {
        let mut parsed = ParsedManifest::default();

        for pair in raw_pairs(content) {
            parsed.stats.pairs += 1;
            if !pair.url_line.is_empty() && !self.is_video_url(pair.url_line) {
                parsed.streams.push(StreamPair {
                    metadata_line: pair.metadata_line.to_string(),
                    url: pair.url_line.to_string(),
                });
            }
            match self.parse_pair(pair) {
                Ok(entry) => parsed.entries.push(entry),
                Err(SkipReason::Cam) => {
                    parsed.stats.record(SkipReason::Cam);
                    parsed.cam_titles.push(self.title_of(pair).to_string());
                }
                Err(reason) => parsed.stats.record(reason),
            }
        }

        parsed.stats.entries = parsed.entries.len();
        parsed.stats.streams = parsed.streams.len();
        if parsed.cam_titles.is_empty() {
            log::info!("CAM scan: no CAM entries found");
        } else {
            log::info!("CAM scan: {} entries screened out", parsed.cam_titles.len());
        }
        log::info!(
            "Parsed {} catalog entries from {} line pairs",
            parsed.stats.entries,
            parsed.stats.pairs
        );

        parsed
    }

    /// Whether the URL ends with one of the video extensions, ignoring case
    pub fn is_video_url(&self, url: &str) -> bool {
        let url_lower = url.to_lowercase();
        self.video_extensions
            .iter()
            .any(|ext| url_lower.ends_with(ext.as_str()))
    }

    fn title_of<'a>(&self, pair: RawPair<'a>) -> &'a str {
        pair.metadata_line
            .strip_prefix(self.rules.info_prefix.as_str())
            .unwrap_or(pair.metadata_line)
            .trim()
    }

    /// Classify one pair, or return why it is not part of the catalog
    pub fn parse_pair(&self, pair: RawPair<'_>) -> Result<CatalogEntry, SkipReason> {
        if !pair.metadata_line.starts_with(self.rules.info_prefix.as_str()) {
            return Err(SkipReason::NotInfoLine);
        }

        let title = self.title_of(pair);
        if title.is_empty() || pair.url_line.is_empty() {
            return Err(SkipReason::EmptyTitle);
        }

        if !self
            .rules
            .language_markers
            .iter()
            .any(|marker| pair.metadata_line.contains(marker.as_str()))
        {
            return Err(SkipReason::ForeignLanguage);
        }

        if !self.is_video_url(pair.url_line) {
            return Err(SkipReason::NotVideo);
        }

        if !self.rules.cam_marker.is_empty() && pair.metadata_line.contains(&self.rules.cam_marker) {
            return Err(SkipReason::Cam);
        }

        let kind = self.classify(pair.url_line)?;
        let source_url = pair.url_line.to_string();

        let entry = match kind {
            EntryKind::Movie => CatalogEntry {
                kind,
                display_title: title.to_string(),
                series_title: None,
                season_number: None,
                episode_number: None,
                source_url,
            },
            EntryKind::Episode => {
                let (series_title, season_number, episode_number) = split_episode_title(title);
                CatalogEntry {
                    kind,
                    display_title: title.to_string(),
                    series_title: Some(series_title),
                    season_number,
                    episode_number,
                    source_url,
                }
            }
        };

        Ok(entry)
    }

    fn classify(&self, url: &str) -> Result<EntryKind, SkipReason> {
        let parsed = Url::parse(url).ok();
        let path = parsed.as_ref().map(|u| u.path()).unwrap_or(url);

        if path.contains(self.rules.series_marker.as_str()) {
            Ok(EntryKind::Episode)
        } else if path.contains(self.rules.movie_marker.as_str()) {
            Ok(EntryKind::Movie)
        } else {
            Err(SkipReason::Uncategorized)
        }
    }
}

/// Split `"Show S01 E02"` into series title, season and episode numbers
///
/// Without an episode token the whole title is the series title and the
/// season is unknown.
pub fn split_episode_title(title: &str) -> (String, Option<u32>, Option<u32>) {
    match EPISODE_TOKEN.captures(title) {
        Some(caps) => {
            let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
            let series = title[..start].trim();
            let season = caps.get(1).map(|m| parse_number(m.as_str(), title));
            let episode = caps.get(2).map(|m| parse_number(m.as_str(), title));
            let series = if series.is_empty() { title.trim() } else { series };
            (series.to_string(), season, episode)
        }
        None => (title.trim().to_string(), None, None),
    }
}

/// Parse an all-digit token, saturating at `u32::MAX`
fn parse_number(digits: &str, title: &str) -> u32 {
    digits.parse().unwrap_or_else(|_| {
        log::debug!("Number {} in {:?} is out of range", digits, title);
        u32::MAX
    })
}
