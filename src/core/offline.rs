// Offline entry bookkeeping for one run

use crate::core::manifest::EntryKind;
use crate::error::Result;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// A catalog entry that was not materialized because its URL is not live
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfflineRecord {
    pub title: String,
    pub url: String,
    pub kind: EntryKind,
    pub reason: String,
}

/// Append-only list of offline records shared by the probe workers
///
/// Clones share the same underlying list.
#[derive(Debug, Clone, Default)]
pub struct OfflineRecorder {
    records: Arc<Mutex<Vec<OfflineRecord>>>,
}

impl OfflineRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, record: OfflineRecord) {
        self.records.lock().push(record);
    }

    /// Drop every record, e.g. before the next run
    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// Copy of the records collected so far, in append order
    pub fn records(&self) -> Vec<OfflineRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the records as a pretty-printed JSON array
    ///
    /// Parent directories are created as needed. Returns the number of
    /// records written.
    pub fn dump_json(&self, path: &Path) -> Result<usize> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let records = self.records();
        let json = serde_json::to_string_pretty(&records)?;
        fs::write(path, json)?;

        log::info!("Wrote {} offline entries to {}", records.len(), path.display());
        Ok(records.len())
    }
}
