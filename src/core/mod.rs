// Core reconciliation engine

pub mod config;
pub mod exclusion;
pub mod manifest;
pub mod naming;
pub mod offline;
pub mod pipeline;
pub mod prober;
pub mod reconciler;
pub mod scanner;
pub mod streams;

// Re-export commonly used items
pub use config::Config;
pub use exclusion::ExclusionSet;
pub use manifest::{CatalogEntry, EntryKind, EntryParser, StreamPair};
pub use naming::{NamingResolver, TargetPath};
pub use offline::{OfflineRecord, OfflineRecorder};
pub use pipeline::{CatalogSync, RunSummary, SyncOptions};
pub use prober::{LivenessProber, LivenessVerdict};
pub use reconciler::{FailedOp, ReconcileReport, Reconciler};
pub use scanner::{ArtifactScanner, ExistingState};
