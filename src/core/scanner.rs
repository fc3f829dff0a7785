//! Recursive scan of a target root for existing pointer files
//!
//! The scan runs once per root before any mutation and yields the existing
//! state the reconciler diffs against. It also records every directory it
//! visits, so empty directories can be pruned later without walking the tree
//! a second time.
//!
//! # Examples
//!
//! ```no_run
//! use strmsync::core::scanner::ArtifactScanner;
//! use std::path::Path;
//!
//! let state = ArtifactScanner::new(Path::new("/media/movies")).scan(true)?;
//!
//! for artifact in state.artifacts.values() {
//!     println!("{}", artifact.path.display());
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::core::naming::ARTIFACT_EXTENSION;
use crate::error::{Result, StrmError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// An existing pointer file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    pub path: PathBuf,
    /// Stored URL with surrounding whitespace removed; `None` if unreadable
    pub content: Option<String>,
}

/// Existing state of one root
#[derive(Debug, Default, Clone)]
pub struct ExistingState {
    pub root: PathBuf,
    pub artifacts: BTreeMap<PathBuf, ArtifactFile>,
    /// Every directory below the root that was visited
    pub directories: Vec<PathBuf>,
    /// Directories whose contents could not be listed
    pub unreadable: Vec<PathBuf>,
}

impl ExistingState {
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Scanner for the pointer files below one root
pub struct ArtifactScanner {
    root: PathBuf,
}

impl ArtifactScanner {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Scan the root recursively
    ///
    /// # Arguments
    /// * `create_missing` - Create the root if it does not exist yet; when
    ///   false a missing root is reported as empty
    pub fn scan(&self, create_missing: bool) -> Result<ExistingState> {
        log::debug!("Scanning artifacts below {:?}", self.root);

        let mut state = ExistingState {
            root: self.root.clone(),
            ..ExistingState::default()
        };

        if !self.root.exists() {
            if !create_missing {
                return Ok(state);
            }
            fs::create_dir_all(&self.root).map_err(|e| StrmError::root(&self.root, e))?;
            log::info!("Created target root {}", self.root.display());
            return Ok(state);
        }

        // The root itself must be listable, anything below is best-effort
        let entries = fs::read_dir(&self.root).map_err(|e| StrmError::root(&self.root, e))?;
        let mut stack: Vec<fs::ReadDir> = vec![entries];

        while let Some(entries) = stack.pop() {
            for entry in entries.flatten() {
                let path = entry.path();
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };

                if file_type.is_dir() {
                    state.directories.push(path.clone());
                    match fs::read_dir(&path) {
                        Ok(children) => stack.push(children),
                        Err(e) => {
                            log::warn!("Cannot list {}: {}", path.display(), e);
                            state.unreadable.push(path);
                        }
                    }
                } else if file_type.is_file() && is_artifact(&path) {
                    let content = match fs::read_to_string(&path) {
                        Ok(text) => Some(text.trim().to_string()),
                        Err(e) => {
                            log::warn!("Cannot read {}: {}", path.display(), e);
                            None
                        }
                    };
                    state
                        .artifacts
                        .insert(path.clone(), ArtifactFile { path, content });
                }
            }
        }

        log::info!(
            "Found {} existing artifacts in {} directories below {}",
            state.artifacts.len(),
            state.directories.len(),
            self.root.display()
        );

        Ok(state)
    }
}

/// Whether a path names a pointer file
pub fn is_artifact(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == ARTIFACT_EXTENSION)
        .unwrap_or(false)
}
