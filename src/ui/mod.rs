// UI and formatting module

pub mod messages;
pub mod progress;
pub mod summary;

// Re-export commonly used items for cleaner imports
pub use messages::{dimmed, error, info, success, warn};
pub use progress::{clear_line, show_progress_bar};
pub use summary::{print_prune_report, print_run_summary};
