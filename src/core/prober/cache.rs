// Per-run URL verdict cache

use super::LivenessVerdict;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Write-once verdict store shared by all probe workers
///
/// Each URL owns one cell. The first worker to reach a cell runs the probe;
/// concurrent workers for the same URL wait on that cell and observe the same
/// verdict. The map lock is only held while looking up or inserting a cell,
/// never across a network call.
#[derive(Debug, Default)]
pub struct VerdictCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<LivenessVerdict>>>>,
}

impl VerdictCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cell for a URL, inserting an empty one if needed
    pub(crate) fn cell(&self, url: &str) -> Arc<OnceCell<LivenessVerdict>> {
        let mut cells = self.cells.lock();
        cells
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Get a settled verdict
    pub fn get(&self, url: &str) -> Option<LivenessVerdict> {
        let cells = self.cells.lock();
        cells.get(url).and_then(|cell| cell.get().cloned())
    }

    /// Number of settled verdicts
    pub fn len(&self) -> usize {
        let cells = self.cells.lock();
        cells.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
