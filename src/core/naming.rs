//! Filesystem identities for catalog entries
//!
//! Every entry maps to exactly one pointer file below one of the two target
//! roots. The same [`sanitize_filename`] is used by the exclusion filter, so a
//! title blocked by its on-disk name is always recognised.
//!
//! ```text
//! <movies_root>/<title>/<title>.strm
//! <series_root>/<series>/Season 01/<full title>.strm
//! <series_root>/<series>/Season Unknown/<full title>.strm
//! ```

use crate::core::manifest::{CatalogEntry, EntryKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};

/// File extension of pointer files
pub const ARTIFACT_EXTENSION: &str = "strm";

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

/// Replace characters that are not allowed in file names with `_`
///
/// Names consisting only of dots would address the current or parent
/// directory, so those dots are replaced as well.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized = UNSAFE_CHARS.replace_all(name, "_").into_owned();
    if !sanitized.is_empty() && sanitized.chars().all(|c| c == '.') {
        return "_".repeat(sanitized.len());
    }
    sanitized
}

/// Season directory an episode is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeasonBucket {
    Numbered(u32),
    Unknown,
}

impl From<Option<u32>> for SeasonBucket {
    fn from(season: Option<u32>) -> Self {
        match season {
            Some(n) => SeasonBucket::Numbered(n),
            None => SeasonBucket::Unknown,
        }
    }
}

impl fmt::Display for SeasonBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonBucket::Numbered(n) => write!(f, "Season {:02}", n),
            SeasonBucket::Unknown => write!(f, "Season Unknown"),
        }
    }
}

/// Resolved on-disk location of one artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetPath(PathBuf);

impl TargetPath {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    /// Identifier used in run summaries: the file stem
    pub fn identifier(&self) -> String {
        artifact_identifier(&self.0)
    }
}

impl AsRef<Path> for TargetPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// File stem of an artifact path, lossily converted
pub fn artifact_identifier(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Maps catalog entries to their target paths
#[derive(Debug, Clone)]
pub struct NamingResolver {
    movies_root: PathBuf,
    series_root: PathBuf,
}

impl NamingResolver {
    pub fn new<M: Into<PathBuf>, S: Into<PathBuf>>(movies_root: M, series_root: S) -> Self {
        Self {
            movies_root: movies_root.into(),
            series_root: series_root.into(),
        }
    }

    pub fn resolve(&self, entry: &CatalogEntry) -> TargetPath {
        let safe_title = sanitize_filename(&entry.display_title);
        let file_name = format!("{}.{}", safe_title, ARTIFACT_EXTENSION);

        match entry.kind {
            EntryKind::Movie => TargetPath::new(self.movies_root.join(&safe_title).join(file_name)),
            EntryKind::Episode => {
                let series = sanitize_filename(entry.grouping_title());
                let season = SeasonBucket::from(entry.season_number);
                TargetPath::new(
                    self.series_root
                        .join(series)
                        .join(season.to_string())
                        .join(file_name),
                )
            }
        }
    }
}
