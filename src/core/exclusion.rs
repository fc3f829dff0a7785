use crate::core::manifest::CatalogEntry;
use crate::core::naming::sanitize_filename;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Exclusion list of sanitized titles that must never be materialized
///
/// The list file holds one sanitized title per line. Blocking a bare series
/// title blocks every episode of that series; blocking a full episode title
/// blocks only that episode.
#[derive(Debug, Default, Clone)]
pub struct ExclusionSet {
    titles: HashSet<String>,
}

impl ExclusionSet {
    /// Create a new empty exclusion set
    pub fn new() -> Self {
        Self {
            titles: HashSet::new(),
        }
    }

    /// Load the exclusion list from a newline-delimited file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut set = Self::new();

        if !path.exists() {
            // No list yet, nothing is excluded
            log::debug!("Exclusion list {} not found, using empty set", path.display());
            return Ok(set);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read exclusion list: {}", path.display()))?;

        set.extend_from_str(&content);
        log::info!("Loaded {} excluded titles from {}", set.len(), path.display());
        Ok(set)
    }

    fn extend_from_str(&mut self, content: &str) {
        for line in content.lines() {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                self.titles.insert(trimmed.to_string());
            }
        }
    }

    /// Check whether an already-sanitized title is listed
    pub fn contains(&self, safe_title: &str) -> bool {
        self.titles.contains(safe_title)
    }

    /// Check both the full title and the series/movie title of an entry
    pub fn is_excluded(&self, entry: &CatalogEntry) -> bool {
        self.contains(&sanitize_filename(&entry.display_title))
            || self.contains(&sanitize_filename(entry.grouping_title()))
    }

    /// Drop excluded entries, returning the survivors and the number removed
    pub fn filter(&self, entries: Vec<CatalogEntry>) -> (Vec<CatalogEntry>, usize) {
        let before = entries.len();
        let kept: Vec<CatalogEntry> = entries
            .into_iter()
            .filter(|entry| {
                let blocked = self.is_excluded(entry);
                if blocked {
                    log::info!("Excluded: {}", entry.display_title);
                }
                !blocked
            })
            .collect();
        let removed = before - kept.len();
        (kept, removed)
    }

    /// Get the number of titles in the set
    pub fn len(&self) -> usize {
        self.titles.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

/// Append a title to the exclusion list file unless it is already present
///
/// The title is sanitized first. Returns `true` when the file was changed.
pub fn append_to_list(path: &Path, title: &str) -> Result<bool> {
    let safe = sanitize_filename(title.trim());
    if safe.is_empty() {
        return Ok(false);
    }

    let existing = ExclusionSet::load_from_file(path)?;
    if existing.contains(&safe) {
        log::info!("Already excluded: {}", safe);
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let needs_separator = fs::read(path)
        .map(|data| !data.is_empty() && !data.ends_with(b"\n"))
        .unwrap_or(false);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open exclusion list: {}", path.display()))?;

    if needs_separator {
        writeln!(file)?;
    }
    writeln!(file, "{}", safe)?;

    log::info!("Added to exclusion list: {}", safe);
    Ok(true)
}
