// strmsync library - public API

// Re-export error types
pub mod error;
pub use error::{Result, StrmError};

// Module declarations
pub mod commands;
pub mod core;
pub mod logging;
pub mod ui;

// Re-export commonly used types
pub use core::config::Config;
pub use core::pipeline::{CatalogSync, RunSummary, SyncOptions};
