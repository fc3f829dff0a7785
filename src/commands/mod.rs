// Command handlers module
pub mod block;
pub mod completions;
pub mod prune;
pub mod sync;
pub mod version;

// Re-exports for cleaner imports
pub use version::execute as version;
