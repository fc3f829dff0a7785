//! Reconciliation of one target root against its desired state
//!
//! The reconciler diffs the desired `{path -> url}` map against the state
//! captured by [`ArtifactScanner`] before any mutation, then applies the
//! minimal set of writes and deletions. Every mutation is attempted on its
//! own; a failure is recorded and the remaining paths are still processed,
//! so the next run picks up whatever is left over.
//!
//! After deletions, directories that hold no artifact anywhere below them
//! are removed deepest first. The root itself is never removed.

use crate::core::naming::artifact_identifier;
use crate::core::scanner::{ArtifactScanner, ExistingState};
use crate::error::Result;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem mutation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Create,
    Update,
    Delete,
    Prune,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileAction::Create => "create",
            FileAction::Update => "update",
            FileAction::Delete => "delete",
            FileAction::Prune => "prune",
        };
        write!(f, "{}", s)
    }
}

/// A mutation that failed and will be retried by the next run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedOp {
    pub path: PathBuf,
    pub action: FileAction,
    pub cause: String,
}

impl FailedOp {
    fn new(path: &Path, action: FileAction, err: std::io::Error) -> Self {
        log::error!("Failed to {} {}: {}", action, path.display(), err);
        Self {
            path: path.to_path_buf(),
            action,
            cause: err.to_string(),
        }
    }
}

/// Outcome of reconciling one root
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReconcileReport {
    pub root: PathBuf,
    /// Identifiers (file stems) of created artifacts
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: usize,
    pub pruned_dirs: Vec<PathBuf>,
    pub failures: Vec<FailedOp>,
    pub dry_run: bool,
}

impl ReconcileReport {
    /// Number of filesystem mutations performed (or planned in dry-run)
    pub fn mutations(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len() + self.pruned_dirs.len()
    }
}

/// Outcome of a standalone prune pass
#[derive(Debug, Default, Clone, Serialize)]
pub struct PruneReport {
    pub root: PathBuf,
    pub pruned_dirs: Vec<PathBuf>,
    pub failures: Vec<FailedOp>,
    pub dry_run: bool,
}

/// Applies a desired state to one root
pub struct Reconciler {
    root: PathBuf,
    dry_run: bool,
}

impl Reconciler {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
        }
    }

    /// Plan every mutation without touching the filesystem
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reconcile `existing` towards `desired`
    ///
    /// `existing` must come from a scan of this reconciler's root taken
    /// before any mutation in the current run.
    pub fn reconcile(
        &self,
        desired: &BTreeMap<PathBuf, String>,
        existing: &ExistingState,
    ) -> ReconcileReport {
        let mut report = ReconcileReport {
            root: self.root.clone(),
            dry_run: self.dry_run,
            ..ReconcileReport::default()
        };
        // Artifacts present once all mutations are applied
        let mut remaining: BTreeSet<PathBuf> = BTreeSet::new();

        for (path, url) in desired {
            let id = artifact_identifier(path);
            match existing.artifacts.get(path) {
                Some(artifact) if artifact.content.as_deref() == Some(url.trim()) => {
                    log::debug!("Unchanged: {}", path.display());
                    report.unchanged += 1;
                    remaining.insert(path.clone());
                }
                Some(_) => match self.write(path, url, false) {
                    Ok(()) => {
                        log::info!("{}Updated: {}", self.prefix(), id);
                        report.updated.push(id);
                        remaining.insert(path.clone());
                    }
                    Err(e) => {
                        report.failures.push(FailedOp::new(path, FileAction::Update, e));
                        // The stale file is still on disk
                        remaining.insert(path.clone());
                    }
                },
                None => match self.write(path, url, true) {
                    Ok(()) => {
                        log::info!("{}Created: {}", self.prefix(), id);
                        report.created.push(id);
                        remaining.insert(path.clone());
                    }
                    Err(e) => report.failures.push(FailedOp::new(path, FileAction::Create, e)),
                },
            }
        }

        for path in existing.artifacts.keys() {
            if desired.contains_key(path) {
                continue;
            }
            let id = artifact_identifier(path);
            let result = if self.dry_run {
                Ok(())
            } else {
                fs::remove_file(path)
            };
            match result {
                Ok(()) => {
                    log::info!("{}Deleted: {}", self.prefix(), id);
                    report.deleted.push(id);
                }
                Err(e) => {
                    report.failures.push(FailedOp::new(path, FileAction::Delete, e));
                    remaining.insert(path.clone());
                }
            }
        }

        let (pruned, failures) = prune_dirs(
            &self.root,
            remaining.iter().map(PathBuf::as_path),
            existing,
            self.dry_run,
        );
        report.pruned_dirs = pruned;
        report.failures.extend(failures);

        log::info!(
            "{}: {} created, {} updated, {} deleted, {} unchanged, {} directories pruned, {} failures",
            self.root.display(),
            report.created.len(),
            report.updated.len(),
            report.deleted.len(),
            report.unchanged,
            report.pruned_dirs.len(),
            report.failures.len()
        );

        report
    }

    fn write(&self, path: &Path, url: &str, create_parent: bool) -> std::io::Result<()> {
        if self.dry_run {
            return Ok(());
        }
        let created = match path.parent() {
            Some(parent) if create_parent => create_parents(parent)?,
            _ => Vec::new(),
        };
        let result = fs::write(path, url.trim());
        if result.is_err() {
            remove_created(&created);
        }
        result
    }

    fn prefix(&self) -> &'static str {
        if self.dry_run {
            "[dry-run] "
        } else {
            ""
        }
    }
}

/// Create `dir` and its missing ancestors
///
/// Returns the directories that did not exist before, deepest first.
fn create_parents(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let missing: Vec<PathBuf> = dir
        .ancestors()
        .take_while(|d| !d.as_os_str().is_empty() && !d.exists())
        .map(Path::to_path_buf)
        .collect();
    if let Err(e) = fs::create_dir_all(dir) {
        remove_created(&missing);
        return Err(e);
    }
    Ok(missing)
}

/// Undo [`create_parents`] for a file that could not be written
fn remove_created(dirs: &[PathBuf]) {
    for dir in dirs.iter().filter(|d| d.exists()) {
        if let Err(e) = fs::remove_dir(dir) {
            log::warn!("Cannot remove {}: {}", dir.display(), e);
            break;
        }
    }
}

/// Remove every directory below `root` that holds no artifact
pub fn prune_empty_dirs(root: &Path, dry_run: bool) -> Result<PruneReport> {
    let existing = ArtifactScanner::new(root).scan(false)?;
    let (pruned_dirs, failures) = prune_dirs(
        root,
        existing.artifacts.keys().map(PathBuf::as_path),
        &existing,
        dry_run,
    );

    log::info!(
        "{}: {} directories pruned, {} failures",
        root.display(),
        pruned_dirs.len(),
        failures.len()
    );

    Ok(PruneReport {
        root: root.to_path_buf(),
        pruned_dirs,
        failures,
        dry_run,
    })
}

/// Bottom-up removal of artifact-free directories
///
/// Candidates are the directories recorded by the scan. A directory survives
/// when an artifact in `remaining` or an unreadable directory lies below it.
fn prune_dirs<'a, I>(
    root: &Path,
    remaining: I,
    existing: &'a ExistingState,
    dry_run: bool,
) -> (Vec<PathBuf>, Vec<FailedOp>)
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut occupied: HashMap<&Path, usize> = HashMap::new();
    let mut mark = |start: &'a Path| {
        for dir in start.ancestors() {
            if dir == root || !dir.starts_with(root) {
                break;
            }
            *occupied.entry(dir).or_default() += 1;
        }
    };

    for artifact in remaining {
        if let Some(parent) = artifact.parent() {
            mark(parent);
        }
    }
    for dir in &existing.unreadable {
        mark(dir.as_path());
    }

    let mut candidates: Vec<&Path> = existing
        .directories
        .iter()
        .map(PathBuf::as_path)
        .filter(|dir| *dir != root && dir.starts_with(root))
        .filter(|dir| !occupied.contains_key(dir))
        .collect();
    candidates.sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));
    candidates.dedup();

    let mut pruned = Vec::new();
    let mut failures = Vec::new();

    for dir in candidates {
        if dry_run {
            log::info!("[dry-run] Pruned: {}", dir.display());
            pruned.push(dir.to_path_buf());
            continue;
        }
        if !dir.exists() {
            continue;
        }
        match fs::remove_dir_all(dir) {
            Ok(()) => {
                log::info!("Pruned: {}", dir.display());
                pruned.push(dir.to_path_buf());
            }
            Err(e) => failures.push(FailedOp::new(dir, FileAction::Prune, e)),
        }
    }

    (pruned, failures)
}
